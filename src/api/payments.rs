//! Handlers for the `/payment/safpayment` routes.
//!
//! The push pipeline runs validate -> token -> timestamp -> password ->
//! initiate, each stage feeding the next explicitly. The two callback
//! routes are called by the provider itself; they carry no signature and
//! none is verified, a known gap inherited from the provider contract.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{json, Number, Value};
use tracing::{info, warn};

use crate::api::AppState;
use crate::error::{AppError, AppResult};
use crate::payments::reconcile;
use crate::payments::signer::RequestSignature;
use crate::payments::types::{
    PaybillCallback, PaymentOutcome, PaymentRecord, RegistrationOutcome, StkPushRequest,
};

/// Inbound push-payment request.
#[derive(Debug, Deserialize)]
pub struct StkPushBody {
    #[serde(rename = "ammount")] // sic, the wire name
    pub amount: Option<Number>,
    pub phone: Option<String>,
}

impl StkPushBody {
    /// Amount must be present and non-zero, phone present and non-empty.
    fn validate(self) -> AppResult<(Number, String)> {
        let amount = self.amount.filter(|a| a.as_f64() != Some(0.0));
        let phone = self.phone.filter(|p| !p.is_empty());
        match (amount, phone) {
            (Some(amount), Some(phone)) => Ok((amount, phone)),
            _ => Err(AppError::validation(
                "Amount and phone number are required.",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterPaybillBody {
    pub confirmation_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaybillAck {
    #[serde(rename = "paymentData")]
    pub payment_data: PaymentRecord,
}

/// POST /payment/safpayment/stkpush
///
/// Returns 201 with the provider's acceptance payload. That payload is only
/// a submission acknowledgment; the payment result arrives later on the
/// callback route.
pub async fn initiate_stk_push(
    State(state): State<AppState>,
    body: Result<Json<StkPushBody>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(body) = body.map_err(bad_request_body)?;
    let (amount, phone) = body.validate()?;

    let token = state.daraja.fetch_access_token().await?;
    let signature = RequestSignature::derive(
        &state.config.daraja.short_code,
        &state.config.daraja.pass_key,
        Local::now().naive_local(),
    );

    let request = StkPushRequest::new(
        &state.config.daraja,
        &signature,
        amount,
        &phone,
        state.stk_callback_url(),
    );
    let details = state.daraja.initiate_stk_push(&token, &request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "Request sent", "details": details })),
    ))
}

/// POST /payment/safpayment/callback
///
/// Push-result callback. Always acks with a generic success body whether
/// the payment succeeded or not; the ack is a transport signal, and the
/// provider retries integrations that fail to send it. The business
/// outcome goes to the logs.
pub async fn stk_callback(body: Result<Json<Value>, JsonRejection>) -> AppResult<Json<Value>> {
    let Json(callback) = body.map_err(bad_request_body)?;

    match reconcile::push_result(&callback)? {
        PaymentOutcome::Settled(record) => {
            info!(
                amount = ?record.amount,
                phone = ?record.phone_number,
                receipt = ?record.payment_id,
                date = ?record.date,
                "stk payment processed successfully"
            );
        }
        PaymentOutcome::Failed { detail } => {
            warn!(%detail, "stk payment failed");
        }
    }

    Ok(Json(json!({ "status": "success" })))
}

/// POST /payment/safpayment/paybillcallback
///
/// Direct C2B payment callback. Echoes the normalized record back to the
/// caller.
pub async fn paybill_callback(
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<PaybillAck>> {
    let Json(raw) = body.map_err(bad_request_body)?;

    let callback: PaybillCallback = serde_json::from_value(raw.clone())
        .map_err(|e| AppError::malformed_response(format!("invalid paybill callback: {e}")))?;

    let record = reconcile::direct_payment(callback, raw);

    // TODO: persist the record and assign the purchased grid bundles
    info!(payment = ?record, "paybill payment received");

    Ok(Json(PaybillAck {
        payment_data: record,
    }))
}

/// POST /payment/safpayment/registerpaybill
///
/// Administrative: points the provider's C2B confirmation and validation
/// roles at the given URL. The URL check runs before the token fetch so bad
/// input never costs a network round trip.
pub async fn register_paybill(
    State(state): State<AppState>,
    body: Result<Json<RegisterPaybillBody>, JsonRejection>,
) -> AppResult<Response> {
    let Json(body) = body.map_err(bad_request_body)?;
    let confirmation_url = body
        .confirmation_url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| AppError::validation("No url provided in register paybill endpoint"))?;

    let token = state.daraja.fetch_access_token().await?;

    match state
        .daraja
        .register_callback_urls(&token, &confirmation_url)
        .await?
    {
        RegistrationOutcome::Accepted(details) => {
            Ok(Json(json!({ "status": "success", "details": details })).into_response())
        }
        RegistrationOutcome::Rejected(details) => Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "error", "details": details })),
        )
            .into_response()),
    }
}

fn bad_request_body(rejection: JsonRejection) -> AppError {
    AppError::validation(rejection.body_text())
}
