//! SQLite backend for the marketplace payment engine.

pub(crate) mod db;
mod sqlite_impl;

pub use sqlite_impl::SqliteDatabase;
