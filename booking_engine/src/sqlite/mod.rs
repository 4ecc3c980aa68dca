//! SQLite database module for the booking reconciliation engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
