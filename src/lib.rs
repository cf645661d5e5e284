//! Gridpay payment backend
//!
//! Integration layer for the Safaricom Daraja mobile-money API: initiates
//! STK push payments, receives the provider's asynchronous result callbacks,
//! and registers the C2B paybill callback URLs.

pub mod api;
pub mod config;
pub mod error;
pub mod payments;
