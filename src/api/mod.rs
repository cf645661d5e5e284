//! HTTP surface
//!
//! Router assembly, shared application state, and the ambient layers:
//! request tracing, CORS, and the JSON body limit. All routes speak JSON.

pub mod health;
pub mod payments;

use axum::extract::{DefaultBodyLimit, Query};
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderName, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::map::Entry;
use serde_json::{json, Map, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::payments::DarajaClient;

/// Shared application state: the immutable configuration plus the provider
/// client handle, cloned into each request.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub daraja: DarajaClient,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let daraja = DarajaClient::new(config.daraja.clone());
        Self { config, daraja }
    }

    /// Callback URL handed to the provider with every STK push. Points at
    /// the push-result route this service serves.
    pub fn stk_callback_url(&self) -> String {
        format!(
            "{}/payment/safpayment/callback",
            self.config.server.callback_base_url.trim_end_matches('/')
        )
    }
}

/// Builds the service router with all routes and layers applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(
            [
                HeaderName::from_static("x-requested-with"),
                HeaderName::from_static("x-access-token"),
                ORIGIN,
                CONTENT_TYPE,
                ACCEPT,
                AUTHORIZATION,
            ]
            .into_iter()
            .collect::<Vec<_>>(),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/payment/safpayment/stkpush",
            post(payments::initiate_stk_push),
        )
        .route(
            "/payment/safpayment/callback",
            post(payments::stk_callback),
        )
        .route(
            "/payment/safpayment/paybillcallback",
            post(payments::paybill_callback),
        )
        .route(
            "/payment/safpayment/registerpaybill",
            post(payments::register_paybill),
        )
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(2_000 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Fallback for unmatched routes: a 404 body echoing back the method, url,
/// and decoded query of the request.
async fn not_found(
    method: Method,
    uri: Uri,
    query: Option<Query<Vec<(String, String)>>>,
) -> impl IntoResponse {
    let pairs = query.map(|Query(q)| q).unwrap_or_default();
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "message": "The route you requested was not found on this server",
            "status": 404,
            "method": method.as_str(),
            "url": uri.to_string(),
            "query": decoded_query(pairs),
        })),
    )
}

/// Folds query pairs into an object. A repeated key collects its values into
/// an array instead of overwriting.
fn decoded_query(pairs: Vec<(String, String)>) -> Map<String, Value> {
    let mut query = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match query.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                if let Value::Array(values) = existing {
                    values.push(value);
                } else {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
            }
        }
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DarajaConfig, ServerConfig};

    fn state_with_base(callback_base_url: &str) -> AppState {
        AppState::new(Config {
            server: ServerConfig {
                port: 3001,
                environment: "development".to_string(),
                callback_base_url: callback_base_url.to_string(),
            },
            daraja: DarajaConfig {
                auth_url: "https://sandbox.safaricom.co.ke/oauth/v1/generate".to_string(),
                stk_push_url: "https://sandbox.safaricom.co.ke/mpesa/stkpush/v1/processrequest"
                    .to_string(),
                register_url: "https://sandbox.safaricom.co.ke/mpesa/c2b/v1/registerurl"
                    .to_string(),
                consumer_key: "key".to_string(),
                consumer_secret: "secret".to_string(),
                pass_key: "passkey".to_string(),
                short_code: "174379".to_string(),
                short_code_numeric: 174379,
            },
        })
    }

    #[test]
    fn stk_callback_url_targets_the_callback_route() {
        let state = state_with_base("https://pay.example.com");
        assert_eq!(
            state.stk_callback_url(),
            "https://pay.example.com/payment/safpayment/callback"
        );
    }

    #[test]
    fn stk_callback_url_tolerates_a_trailing_slash() {
        let state = state_with_base("https://pay.example.com/");
        assert_eq!(
            state.stk_callback_url(),
            "https://pay.example.com/payment/safpayment/callback"
        );
    }

    #[test]
    fn repeated_query_keys_collect_into_an_array() {
        let pairs = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "x".to_string()),
            ("a".to_string(), "2".to_string()),
            ("a".to_string(), "3".to_string()),
        ];

        assert_eq!(
            Value::Object(decoded_query(pairs)),
            json!({ "a": ["1", "2", "3"], "b": "x" })
        );
    }
}
