//! Callback reconciliation
//!
//! Two differently-shaped provider callbacks (push result and direct C2B
//! payment) reduce to the same normalized [`PaymentRecord`].

use serde_json::{Number, Value};

use crate::error::{AppError, AppResult};
use crate::payments::signer;
use crate::payments::types::{PaybillCallback, PaymentOutcome, PaymentRecord, PaymentStatus};

/// The provider signals push success with this exact description plus a
/// numeric result code of zero.
pub const STK_SUCCESS_DESC: &str = "The service request is processed successfully.";

/// Reconciles a push-result callback.
///
/// Payload navigation is lenient: a missing or oddly-shaped body selects the
/// failure branch instead of erroring, because the provider must still be
/// acked. The only hard failure is a success result without its
/// `CallbackMetadata.Item` list.
pub fn push_result(callback: &Value) -> AppResult<PaymentOutcome> {
    let stk = callback.pointer("/Body/stkCallback");

    let result_desc = stk.and_then(|s| s.get("ResultDesc")).and_then(Value::as_str);
    let result_code = stk.and_then(|s| s.get("ResultCode")).and_then(Value::as_f64);

    if result_desc != Some(STK_SUCCESS_DESC) || result_code != Some(0.0) {
        let detail = stk.cloned().unwrap_or(Value::Null);
        return Ok(PaymentOutcome::Failed { detail });
    }

    let items = stk
        .and_then(|s| s.pointer("/CallbackMetadata/Item"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            AppError::malformed_response(
                "CallbackMetadata.Item missing from successful stk callback",
            )
        })?;

    let amount = metadata_value(items, "Amount").and_then(value_as_number);
    let phone_number = metadata_value(items, "PhoneNumber").and_then(value_as_plain_string);
    let receipt = metadata_value(items, "MpesaReceiptNumber").and_then(value_as_plain_string);
    let date = metadata_value(items, "TransactionDate")
        .and_then(value_as_plain_string)
        .and_then(|raw| signer::decode_timestamp(&raw));

    Ok(PaymentOutcome::Settled(PaymentRecord {
        payment_id: receipt.clone(),
        date,
        service_provider: None,
        provider_ref: receipt,
        customer_id: None,
        customer_name: None,
        amount,
        service_provided: None,
        description: None,
        payment_status: PaymentStatus::Success,
        phone_number,
        hashed_phone_number: None,
        raw_callback: callback.clone(),
    }))
}

/// Normalizes a direct C2B paybill payment. This callback shape carries no
/// result code; the payment is taken as successful unconditionally.
pub fn direct_payment(callback: PaybillCallback, raw: Value) -> PaymentRecord {
    let date = signer::decode_timestamp(&callback.trans_time);

    // customer id is the numeric part of the bill reference, e.g. "ACCT-00123" -> "00123"
    let customer_id = callback.bill_ref_number.as_ref().map(|reference| {
        reference
            .chars()
            .filter(char::is_ascii_digit)
            .collect::<String>()
    });

    let customer_name = match (&callback.first_name, &callback.last_name) {
        (None, None) => None,
        (first, last) => Some(
            format!(
                "{} {}",
                first.as_deref().unwrap_or_default(),
                last.as_deref().unwrap_or_default()
            )
            .trim()
            .to_string(),
        ),
    };

    let amount = callback.trans_amount.as_ref().and_then(value_as_number);

    PaymentRecord {
        payment_id: callback.trans_id.clone(),
        date,
        service_provider: Some("SAFARICOMC2B"),
        provider_ref: callback.trans_id,
        customer_id,
        customer_name,
        amount,
        service_provided: Some("GRIDPAYMENT"),
        description: Some("Customer payment for grid bundles"),
        payment_status: PaymentStatus::Success,
        phone_number: None,
        hashed_phone_number: callback.msisdn,
        raw_callback: raw,
    }
}

/// Looks up a `{Name, Value}` metadata item by name, first match wins.
/// Item order is not guaranteed by the provider.
fn metadata_value<'a>(items: &'a [Value], name: &str) -> Option<&'a Value> {
    items
        .iter()
        .find(|item| item.get("Name").and_then(Value::as_str) == Some(name))
        .and_then(|item| item.get("Value"))
}

fn value_as_plain_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads a JSON number or a numeric string, preserving integer-ness. The
/// provider formats whole amounts as "750.00"; those must come out as the
/// integer 750, not 750.0.
fn value_as_number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(collapse_integral(n.clone())),
        Value::String(s) => {
            if let Ok(whole) = s.parse::<i64>() {
                Some(Number::from(whole))
            } else {
                s.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(collapse_integral)
            }
        }
        _ => None,
    }
}

/// Turns a float with no fractional part back into an integer number.
fn collapse_integral(n: Number) -> Number {
    if !n.is_f64() {
        return n;
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Number::from(f as i64)
        }
        _ => n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn successful_callback() -> Value {
        json!({
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "29115-34620561-1",
                    "CheckoutRequestID": "ws_CO_191220191020363925",
                    "ResultCode": 0,
                    "ResultDesc": "The service request is processed successfully.",
                    "CallbackMetadata": {
                        "Item": [
                            { "Name": "Amount", "Value": 500 },
                            { "Name": "MpesaReceiptNumber", "Value": "ABC123" },
                            { "Name": "TransactionDate", "Value": 20240115103000u64 },
                            { "Name": "PhoneNumber", "Value": 254712345678u64 }
                        ]
                    }
                }
            }
        })
    }

    fn expected_date() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    #[test]
    fn settles_successful_push_result() {
        let outcome = push_result(&successful_callback()).unwrap();
        let record = match outcome {
            PaymentOutcome::Settled(record) => record,
            PaymentOutcome::Failed { detail } => panic!("unexpected failure: {detail}"),
        };

        assert_eq!(record.amount, Some(Number::from(500u64)));
        assert_eq!(record.phone_number.as_deref(), Some("254712345678"));
        assert_eq!(record.payment_id.as_deref(), Some("ABC123"));
        assert_eq!(record.provider_ref.as_deref(), Some("ABC123"));
        assert_eq!(record.date, Some(expected_date()));
        assert_eq!(record.payment_status, PaymentStatus::Success);
    }

    #[test]
    fn metadata_lookup_is_order_independent() {
        let mut callback = successful_callback();
        let items = callback
            .pointer_mut("/Body/stkCallback/CallbackMetadata/Item")
            .unwrap()
            .as_array_mut()
            .unwrap();
        items.reverse();

        let outcome = push_result(&callback).unwrap();
        match outcome {
            PaymentOutcome::Settled(record) => {
                assert_eq!(record.amount, Some(Number::from(500u64)));
                assert_eq!(record.payment_id.as_deref(), Some("ABC123"));
            }
            PaymentOutcome::Failed { .. } => panic!("expected settled outcome"),
        }
    }

    #[test]
    fn nonzero_result_code_is_failure_not_error() {
        let callback = json!({
            "Body": {
                "stkCallback": {
                    "ResultCode": 1032,
                    "ResultDesc": "Request cancelled by user"
                }
            }
        });

        match push_result(&callback).unwrap() {
            PaymentOutcome::Failed { detail } => {
                assert_eq!(detail["ResultCode"], json!(1032));
                assert_eq!(detail["ResultDesc"], "Request cancelled by user");
            }
            PaymentOutcome::Settled(_) => panic!("expected failure outcome"),
        }
    }

    #[test]
    fn string_result_code_is_not_success() {
        let callback = json!({
            "Body": {
                "stkCallback": {
                    "ResultCode": "0",
                    "ResultDesc": "The service request is processed successfully."
                }
            }
        });

        assert!(matches!(
            push_result(&callback).unwrap(),
            PaymentOutcome::Failed { .. }
        ));
    }

    #[test]
    fn missing_body_is_failure_with_null_detail() {
        match push_result(&json!({})).unwrap() {
            PaymentOutcome::Failed { detail } => assert!(detail.is_null()),
            PaymentOutcome::Settled(_) => panic!("expected failure outcome"),
        }
    }

    #[test]
    fn success_without_metadata_is_malformed() {
        let callback = json!({
            "Body": {
                "stkCallback": {
                    "ResultCode": 0,
                    "ResultDesc": "The service request is processed successfully."
                }
            }
        });

        let err = push_result(&callback).unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse { .. }));
    }

    #[test]
    fn missing_metadata_items_leave_fields_empty() {
        let callback = json!({
            "Body": {
                "stkCallback": {
                    "ResultCode": 0,
                    "ResultDesc": "The service request is processed successfully.",
                    "CallbackMetadata": { "Item": [] }
                }
            }
        });

        match push_result(&callback).unwrap() {
            PaymentOutcome::Settled(record) => {
                assert!(record.amount.is_none());
                assert!(record.phone_number.is_none());
                assert!(record.payment_id.is_none());
                assert!(record.date.is_none());
            }
            PaymentOutcome::Failed { .. } => panic!("expected settled outcome"),
        }
    }

    fn paybill_callback(raw: &Value) -> PaybillCallback {
        serde_json::from_value(raw.clone()).unwrap()
    }

    #[test]
    fn direct_payment_normalizes_record() {
        let raw = json!({
            "TransID": "XYZ",
            "TransTime": "20240115103000",
            "BillRefNumber": "ACCT-00123",
            "FirstName": "Jane",
            "LastName": "Doe",
            "TransAmount": "750",
            "MSISDN": "hash1"
        });

        let record = direct_payment(paybill_callback(&raw), raw.clone());

        assert_eq!(record.payment_id.as_deref(), Some("XYZ"));
        assert_eq!(record.provider_ref.as_deref(), Some("XYZ"));
        assert_eq!(record.customer_id.as_deref(), Some("00123"));
        assert_eq!(record.customer_name.as_deref(), Some("Jane Doe"));
        assert_eq!(record.amount, Some(Number::from(750)));
        assert_eq!(record.date, Some(expected_date()));
        assert_eq!(record.payment_status, PaymentStatus::Success);
        assert_eq!(record.service_provider, Some("SAFARICOMC2B"));
        assert_eq!(record.service_provided, Some("GRIDPAYMENT"));
        assert_eq!(record.description, Some("Customer payment for grid bundles"));
        assert_eq!(record.hashed_phone_number.as_deref(), Some("hash1"));
        assert!(record.phone_number.is_none());
    }

    #[test]
    fn direct_payment_accepts_numeric_amount() {
        let raw = json!({
            "TransTime": "20240115103000",
            "TransAmount": 750.5
        });

        let record = direct_payment(paybill_callback(&raw), raw.clone());
        assert_eq!(record.amount.and_then(|n| n.as_f64()), Some(750.5));
    }

    #[test]
    fn whole_amount_with_decimal_suffix_stays_an_integer() {
        let raw = json!({
            "TransTime": "20240115103000",
            "TransAmount": "750.00"
        });

        let record = direct_payment(paybill_callback(&raw), raw.clone());
        assert_eq!(record.amount, Some(Number::from(750)));
        assert_eq!(serde_json::to_string(&record.amount).unwrap(), "750");
    }

    #[test]
    fn whole_float_amount_stays_an_integer() {
        let raw = json!({
            "TransTime": "20240115103000",
            "TransAmount": 750.0
        });

        let record = direct_payment(paybill_callback(&raw), raw.clone());
        assert_eq!(record.amount, Some(Number::from(750)));
    }

    #[test]
    fn direct_payment_with_undecodable_time_has_null_date() {
        let raw = json!({
            "TransID": "XYZ",
            "TransTime": "not-a-time"
        });

        let record = direct_payment(paybill_callback(&raw), raw.clone());
        assert!(record.date.is_none());
        assert_eq!(record.payment_status, PaymentStatus::Success);
    }
}
