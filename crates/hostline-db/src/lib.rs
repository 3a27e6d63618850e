//! Database layer for the Hostline platform.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! embedded SQL migrations, and query helpers. Every table Hostline writes
//! — calls, transcript turns, the call event log, orders, reservations, and
//! the menu catalog — is created through versioned migrations managed here.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: a single-binary deployment needs no external
//!   database process. WAL allows concurrent readers with a single writer,
//!   which matches the per-call write pattern.
//! - **`r2d2` connection pool**: bounded connection reuse without manual
//!   lifetime management; all async callers go through `spawn_blocking`.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, ensuring migrations ship with the server and cannot
//!   drift from the code that depends on them.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
