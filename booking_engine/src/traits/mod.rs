mod reconciliation_database;

pub use reconciliation_database::{ReconciliationDatabase, ReconciliationError};
