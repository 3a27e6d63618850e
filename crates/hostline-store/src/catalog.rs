//! Menu catalog access and the guardrail prompt derived from it.

use crate::error::StoreError;
use hostline_types::CatalogItem;
use rusqlite::Connection;

/// Static substitute sent to the agent when the catalog cannot be fetched
/// or is empty. Never blocks the handshake.
pub const CATALOG_UNAVAILABLE_FALLBACK: &str =
    "The menu catalog is currently unavailable. Apologize and ask the caller \
     to hold for a staff member before taking any order.";

/// Fetches the currently orderable catalog (available items only).
pub fn fetch_active_catalog(conn: &Connection) -> Result<Vec<CatalogItem>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, price_cents, available FROM menu_items
         WHERE available = 1 ORDER BY name ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(CatalogItem {
            id: row.get(0)?,
            name: row.get(1)?,
            price_cents: row.get(2)?,
            available: row.get::<_, i64>(3)? != 0,
        })
    })?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

/// Builds the guardrail prompt fragment enumerating the orderable catalog.
///
/// The fragment constrains the agent to the listed items: anything not on
/// the list is declined with a listed alternative offered instead. An empty
/// catalog yields [`CATALOG_UNAVAILABLE_FALLBACK`].
pub fn guardrail_prompt(catalog: &[CatalogItem]) -> String {
    if catalog.is_empty() {
        return CATALOG_UNAVAILABLE_FALLBACK.to_string();
    }

    let mut prompt = String::from(
        "The only items available to order are listed below with prices. \
         Decline anything not listed and offer a listed alternative instead.\n",
    );
    for item in catalog {
        prompt.push_str(&format!(
            "- {} (${}.{:02})\n",
            item.name,
            item.price_cents / 100,
            item.price_cents % 100
        ));
    }
    prompt
}
