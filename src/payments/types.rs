//! Wire and domain types for the Safaricom Daraja integration
//!
//! Request payloads are serialized with the provider's PascalCase wire
//! names; both callback shapes normalize into [`PaymentRecord`].

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::config::DarajaConfig;
use crate::payments::signer::RequestSignature;

/// Bearer token from the provider's OAuth endpoint. Fetched fresh for every
/// initiating request; expiry is not tracked.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
}

/// STK push payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushRequest {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    pub transaction_type: &'static str,
    /// Inbound amount passed through verbatim so integers stay integers on
    /// the wire.
    pub amount: Number,
    pub party_a: String,
    pub party_b: String,
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub call_back_url: String,
    pub account_reference: &'static str,
    pub transaction_desc: &'static str,
}

impl StkPushRequest {
    /// Assembles the payload from validated inputs and per-request signing
    /// material.
    pub fn new(
        config: &DarajaConfig,
        signature: &RequestSignature,
        amount: Number,
        phone: &str,
        call_back_url: String,
    ) -> Self {
        Self {
            business_short_code: config.short_code.clone(),
            password: signature.password.clone(),
            timestamp: signature.timestamp.clone(),
            transaction_type: "CustomerPayBillOnline",
            amount,
            party_a: phone.to_string(),
            party_b: config.short_code.clone(),
            phone_number: phone.to_string(),
            call_back_url,
            account_reference: "Shasa Test",
            transaction_desc: "Payment for goods n stuff",
        }
    }
}

/// C2B URL-registration payload. The provider expects the short code as a
/// JSON number and the same URL in both roles.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegisterUrlsRequest {
    pub short_code: u64,
    pub response_type: &'static str,
    #[serde(rename = "ConfirmationURL")]
    pub confirmation_url: String,
    #[serde(rename = "ValidationURL")]
    pub validation_url: String,
}

/// Flat C2B paybill callback payload. `TransTime` is the only field the
/// reconciler cannot proceed without; everything else is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaybillCallback {
    #[serde(rename = "TransID")]
    pub trans_id: Option<String>,
    pub trans_time: String,
    pub bill_ref_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// The provider sends this as either a number or a numeric string.
    pub trans_amount: Option<Value>,
    #[serde(rename = "MSISDN")]
    pub msisdn: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Success,
    Failed,
}

/// Normalized payment-result record, the single shape both callback paths
/// reduce to.
///
/// Serialized field names match what downstream record consumers already
/// expect; absent identity fields are omitted, while `date` and `amount`
/// serialize as null when undecodable.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_provider: Option<&'static str>,
    #[serde(
        rename = "service_provider_ref",
        skip_serializing_if = "Option::is_none"
    )]
    pub provider_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    pub amount: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_provided: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(rename = "hashedPhoneNumber", skip_serializing_if = "Option::is_none")]
    pub hashed_phone_number: Option<String>,
    /// Original provider payload, kept for diagnostics.
    #[serde(skip)]
    pub raw_callback: Value,
}

/// Result of reconciling a push-result callback.
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    /// Provider reported success and the normalized record was extracted.
    Settled(PaymentRecord),
    /// Provider reported failure; `detail` carries the stkCallback object
    /// verbatim for the logs.
    Failed { detail: Value },
}

/// Business outcome of a C2B URL registration. A rejection carries the
/// provider's response payload and is an expected outcome, not a transport
/// error.
#[derive(Debug, Clone)]
pub enum RegistrationOutcome {
    Accepted(Value),
    Rejected(Value),
}
