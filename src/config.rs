use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub daraja: DarajaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub environment: String,
    /// Externally reachable base URL of this service, used to build the
    /// callback URL handed to the provider.
    pub callback_base_url: String,
}

/// Safaricom Daraja endpoints and credentials. Immutable after load.
#[derive(Debug, Clone, Deserialize)]
pub struct DarajaConfig {
    pub auth_url: String,
    pub stk_push_url: String,
    pub register_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub pass_key: String,
    /// Merchant short code. The string form feeds password derivation and
    /// the STK payload; the numeric form goes into the C2B registration
    /// body, which carries it as a JSON number.
    pub short_code: String,
    pub short_code_numeric: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let server = ServerConfig {
            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            callback_base_url: env::var("CALLBACK_BASE_URL")
                .context("CALLBACK_BASE_URL not set")?,
        };

        let short_code =
            env::var("SAFARICOM_SHORTCODE").context("SAFARICOM_SHORTCODE not set")?;
        let short_code_numeric = short_code
            .parse()
            .context("SAFARICOM_SHORTCODE must be numeric")?;

        let daraja = DarajaConfig {
            auth_url: env::var("SAFARICOM_AUTH_URL").context("SAFARICOM_AUTH_URL not set")?,
            stk_push_url: env::var("SAFARICOM_STK_ENDPOINT")
                .context("SAFARICOM_STK_ENDPOINT not set")?,
            register_url: env::var("SAFARICOM_REGISTER_PAYBILL")
                .context("SAFARICOM_REGISTER_PAYBILL not set")?,
            consumer_key: env::var("SAFARICOM_CONSUMER_KEY")
                .context("SAFARICOM_CONSUMER_KEY not set")?,
            consumer_secret: env::var("SAFARICOM_CONSUMER_SECRET")
                .context("SAFARICOM_CONSUMER_SECRET not set")?,
            pass_key: env::var("SAFARICOM_PASSKEY").context("SAFARICOM_PASSKEY not set")?,
            short_code,
            short_code_numeric,
        };

        let config = Config { server, daraja };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Validate port range
        if self.server.port < 1024 {
            return Err(anyhow!(
                "Port must be at least 1024, got {}",
                self.server.port
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        // Validate endpoint URLs
        if !self.server.callback_base_url.starts_with("http") {
            return Err(anyhow!("CALLBACK_BASE_URL must be an http(s) URL"));
        }

        if !self.daraja.auth_url.starts_with("http") {
            return Err(anyhow!("SAFARICOM_AUTH_URL must be an http(s) URL"));
        }

        if !self.daraja.stk_push_url.starts_with("http") {
            return Err(anyhow!("SAFARICOM_STK_ENDPOINT must be an http(s) URL"));
        }

        if !self.daraja.register_url.starts_with("http") {
            return Err(anyhow!("SAFARICOM_REGISTER_PAYBILL must be an http(s) URL"));
        }

        // Validate credentials are not empty
        if self.daraja.consumer_key.trim().is_empty() {
            return Err(anyhow!("SAFARICOM_CONSUMER_KEY cannot be empty"));
        }

        if self.daraja.consumer_secret.trim().is_empty() {
            return Err(anyhow!("SAFARICOM_CONSUMER_SECRET cannot be empty"));
        }

        if self.daraja.pass_key.trim().is_empty() {
            return Err(anyhow!("SAFARICOM_PASSKEY cannot be empty"));
        }

        if self.daraja.short_code.trim().is_empty() {
            return Err(anyhow!("SAFARICOM_SHORTCODE cannot be empty"));
        }

        Ok(())
    }
}
