//! Safaricom Daraja payment integration
//!
//! Request signing, the provider HTTP client, wire types, and the
//! reconciliation of asynchronous provider callbacks into one normalized
//! payment record.

pub mod daraja;
pub mod reconcile;
pub mod signer;
pub mod types;

pub use daraja::DarajaClient;
