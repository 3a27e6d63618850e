//! Order and reservation rows, with the call-tag idempotency guard.

use crate::error::StoreError;
use hostline_types::{OrderItem, ReservationStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// Returns the idempotency tag embedded in a record's notes for a call.
///
/// Materialization checks for this tag by substring match before inserting,
/// so a second materialization attempt for the same call finds the existing
/// row and backs off.
pub fn call_tag(call_sid: &str) -> String {
    format!("[call:{}]", call_sid)
}

/// A persisted order row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub call_sid: Option<String>,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub pickup_time: Option<String>,
    pub total_cents: i64,
    pub items: Vec<OrderItem>,
    pub notes: Option<String>,
    pub created_at: String,
}

/// Parameters for creating an order row.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub call_sid: Option<String>,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub pickup_time: Option<String>,
    pub total_cents: i64,
    pub items: Vec<OrderItem>,
    pub notes: Option<String>,
}

/// Inserts an order row and returns its database ID.
pub fn create_order(conn: &Connection, order: &NewOrder) -> Result<i64, StoreError> {
    let items_json = serde_json::to_string(&order.items)?;
    conn.execute(
        "INSERT INTO orders
            (call_sid, customer_name, customer_phone, pickup_time, total_cents, items_json, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            order.call_sid,
            order.customer_name,
            order.customer_phone,
            order.pickup_time,
            order.total_cents,
            items_json,
            order.notes,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Lists orders, newest first, bounded by `limit`.
pub fn list_orders(conn: &Connection, limit: i64) -> Result<Vec<Order>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, call_sid, customer_name, customer_phone, pickup_time,
                total_cents, items_json, notes, created_at
         FROM orders ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit], map_row_to_order)?;
    let mut orders = Vec::new();
    for row in rows {
        orders.push(row?);
    }
    Ok(orders)
}

/// Finds the order (if any) already tagged with this call identifier.
pub fn find_tagged_order(conn: &Connection, call_sid: &str) -> Result<Option<i64>, StoreError> {
    let tag = format!("%{}%", call_tag(call_sid));
    let id = conn
        .query_row(
            "SELECT id FROM orders WHERE notes LIKE ?1 LIMIT 1",
            [tag],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// A persisted reservation row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub call_sid: Option<String>,
    pub guest_name: String,
    pub guest_phone: Option<String>,
    pub party_size: u32,
    pub reservation_date: Option<String>,
    pub reservation_time: Option<String>,
    pub occasion: Option<String>,
    pub status: ReservationStatus,
    pub notes: Option<String>,
    pub created_at: String,
}

/// Parameters for creating a reservation row.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub call_sid: Option<String>,
    pub guest_name: String,
    pub guest_phone: Option<String>,
    pub party_size: u32,
    pub reservation_date: Option<String>,
    pub reservation_time: Option<String>,
    pub occasion: Option<String>,
    pub status: ReservationStatus,
    pub notes: Option<String>,
}

/// Inserts a reservation row and returns its database ID.
pub fn create_reservation(
    conn: &Connection,
    reservation: &NewReservation,
) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO reservations
            (call_sid, guest_name, guest_phone, party_size, reservation_date,
             reservation_time, occasion, status, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            reservation.call_sid,
            reservation.guest_name,
            reservation.guest_phone,
            reservation.party_size,
            reservation.reservation_date,
            reservation.reservation_time,
            reservation.occasion,
            reservation.status.as_str(),
            reservation.notes,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Lists reservations, newest first, bounded by `limit`.
pub fn list_reservations(conn: &Connection, limit: i64) -> Result<Vec<Reservation>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, call_sid, guest_name, guest_phone, party_size, reservation_date,
                reservation_time, occasion, status, notes, created_at
         FROM reservations ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit], map_row_to_reservation)?;
    let mut reservations = Vec::new();
    for row in rows {
        reservations.push(row?);
    }
    Ok(reservations)
}

/// Finds the reservation (if any) already tagged with this call identifier.
pub fn find_tagged_reservation(
    conn: &Connection,
    call_sid: &str,
) -> Result<Option<i64>, StoreError> {
    let tag = format!("%{}%", call_tag(call_sid));
    let id = conn
        .query_row(
            "SELECT id FROM reservations WHERE notes LIKE ?1 LIMIT 1",
            [tag],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn map_row_to_order(row: &Row) -> rusqlite::Result<Order> {
    let items_json: String = row.get(6)?;
    let items: Vec<OrderItem> = serde_json::from_str(&items_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Order {
        id: row.get(0)?,
        call_sid: row.get(1)?,
        customer_name: row.get(2)?,
        customer_phone: row.get(3)?,
        pickup_time: row.get(4)?,
        total_cents: row.get(5)?,
        items,
        notes: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn map_row_to_reservation(row: &Row) -> rusqlite::Result<Reservation> {
    let status_str: String = row.get(8)?;
    let status: ReservationStatus = status_str.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Reservation {
        id: row.get(0)?,
        call_sid: row.get(1)?,
        guest_name: row.get(2)?,
        guest_phone: row.get(3)?,
        party_size: row.get(4)?,
        reservation_date: row.get(5)?,
        reservation_time: row.get(6)?,
        occasion: row.get(7)?,
        status,
        notes: row.get(9)?,
        created_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostline_db::run_migrations;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        run_migrations(&conn).expect("migrations should succeed");
        conn
    }

    #[test]
    fn order_round_trips_items_json() {
        let conn = test_conn();
        let id = create_order(
            &conn,
            &NewOrder {
                call_sid: Some("CA-ord".to_string()),
                customer_name: "Dana".to_string(),
                customer_phone: None,
                pickup_time: Some("6 pm".to_string()),
                total_cents: 2400,
                items: vec![OrderItem {
                    name: "pepperoni pizza".to_string(),
                    menu_item_id: Some(2),
                    qty: 1,
                    line_total_cents: 1650,
                }],
                notes: Some(format!("phone order {}", call_tag("CA-ord"))),
            },
        )
        .expect("create");
        assert!(id > 0);

        let orders = list_orders(&conn, 10).expect("list");
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].items[0].name, "pepperoni pizza");
        assert_eq!(orders[0].total_cents, 2400);
    }

    #[test]
    fn tagged_lookup_matches_by_substring() {
        let conn = test_conn();
        assert!(find_tagged_order(&conn, "CA-tag").expect("lookup").is_none());

        create_order(
            &conn,
            &NewOrder {
                call_sid: Some("CA-tag".to_string()),
                customer_name: "Sam".to_string(),
                customer_phone: None,
                pickup_time: None,
                total_cents: 0,
                items: vec![],
                notes: Some(format!("Auto-created. {}", call_tag("CA-tag"))),
            },
        )
        .expect("create");

        assert!(find_tagged_order(&conn, "CA-tag").expect("lookup").is_some());
        // A different call must not match.
        assert!(find_tagged_order(&conn, "CA-other").expect("lookup").is_none());
    }

    #[test]
    fn reservation_status_round_trips() {
        let conn = test_conn();
        create_reservation(
            &conn,
            &NewReservation {
                call_sid: Some("CA-res".to_string()),
                guest_name: "Priya".to_string(),
                guest_phone: Some("+15550003333".to_string()),
                party_size: 4,
                reservation_date: Some("today".to_string()),
                reservation_time: Some("7 pm".to_string()),
                occasion: Some("birthday".to_string()),
                status: ReservationStatus::Confirmed,
                notes: Some(call_tag("CA-res")),
            },
        )
        .expect("create");

        let rows = list_reservations(&conn, 10).expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, ReservationStatus::Confirmed);
        assert_eq!(rows[0].party_size, 4);
    }
}
