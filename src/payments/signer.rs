use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{NaiveDate, NaiveDateTime};

/// Formats an instant as the provider's compact `YYYYMMDDHHMMSS` form,
/// exactly 14 digits, zero-padded.
pub fn generate_timestamp(now: NaiveDateTime) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

/// Derives the request password: `Base64(shortCode + passKey + timestamp)`.
/// The provider validates this exact concatenation order and encoding.
pub fn generate_password(short_code: &str, pass_key: &str, timestamp: &str) -> String {
    STANDARD.encode(format!("{short_code}{pass_key}{timestamp}"))
}

/// Decodes the provider's compact timestamp back into an instant.
///
/// Substrings at fixed offsets: [0,4) year, [4,6) month, [6,8) day,
/// [8,10) hour, [10,12) minute, [12,14) second. Returns `None` for wrong
/// length, non-digit input, or out-of-range components.
pub fn decode_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if raw.len() != 14 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let year: i32 = raw[0..4].parse().ok()?;
    let month: u32 = raw[4..6].parse().ok()?;
    let day: u32 = raw[6..8].parse().ok()?;
    let hour: u32 = raw[8..10].parse().ok()?;
    let minute: u32 = raw[10..12].parse().ok()?;
    let second: u32 = raw[12..14].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

/// Per-request signing material. The timestamp is embedded in the password,
/// so both must come from the same instant; derive this immediately before
/// submitting a request.
#[derive(Debug, Clone)]
pub struct RequestSignature {
    pub timestamp: String,
    pub password: String,
}

impl RequestSignature {
    pub fn derive(short_code: &str, pass_key: &str, now: NaiveDateTime) -> Self {
        let timestamp = generate_timestamp(now);
        let password = generate_password(short_code, pass_key, &timestamp);
        Self {
            timestamp,
            password,
        }
    }
}
