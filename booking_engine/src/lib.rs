//! Booking Reconciliation Engine
//!
//! The engine keeps a single `orders` table synchronized from two independent, unordered webhook streams: booking
//! lifecycle events from the scheduling provider, and checkout-completion events from the payment provider. The two
//! streams carry no reliable shared identifier, so association happens through an ordered list of matching
//! strategies (see [`mod@matching`]) applied against a snapshot of candidate orders.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the only supported backend at present. You should
//!    never need to access the database directly; use [`ReconciliationApi`] instead. The exception is the data types
//!    used in the database, defined in [`mod@db_types`], which are public.
//! 2. The reconciliation API ([`ReconciliationApi`]), generic over any backend implementing
//!    [`traits::ReconciliationDatabase`].
pub mod db_types;
pub mod matching;
mod reconciliation_api;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use matching::{BookingFacts, PaymentFacts};
pub use reconciliation_api::{BookingOutcome, CancellationOutcome, PaymentOutcome, ReconciliationApi};
