//! # SQLite database methods
//!
//! This module contains the "low-level" SQLite interactions.
//!
//! Everything here is a simple async function (rather than a stateful struct) accepting a
//! `&mut SqliteConnection`. Callers obtain a connection from a pool, or open a transaction and
//! pass `&mut *tx`, so the transaction boundary always belongs to the caller. The order
//! aggregate builder and the reconciliation transition lean on this to keep their work atomic.

use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod orders;
pub mod products;
pub mod shops;
pub mod transactions;

const SQLITE_DB_URL: &str = "sqlite://data/marketplace.db";

pub fn db_url() -> String {
    let result = env::var("MPS_DATABASE_URL").unwrap_or_else(|_| {
        info!("MPS_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
