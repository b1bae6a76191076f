// chatbud_backend/src/config.rs
// Process configuration, read once from the environment at startup.

use thiserror::Error;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RAZORPAY_API_BASE: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

// ═══════════════════════════════════════════════════════════════════════════════
// RAZORPAY CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
    pub api_base: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// FIREBASE CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct FirebaseConfig {
    /// Service-account JSON, either raw or base64 encoded.
    pub service_account: String,
    pub database_url: String,
}

#[derive(Clone)]
pub struct Config {
    pub razorpay: RazorpayConfig,
    pub firebase: FirebaseConfig,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Values are kept byte-exact; secrets feed the HMAC key as-is.
        let required = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingRequired(name))
        };

        let razorpay = RazorpayConfig {
            key_id: required("RAZORPAY_KEY_ID")?,
            key_secret: required("RAZORPAY_KEY_SECRET")?,
            webhook_secret: required("RAZORPAY_WEBHOOK_SECRET")?,
            api_base: lookup("RAZORPAY_API_BASE")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_RAZORPAY_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
        };

        let firebase = FirebaseConfig {
            service_account: required("FIREBASE_SERVICE_ACCOUNT")?,
            database_url: required("FIREBASE_DATABASE_URL")?
                .trim_end_matches('/')
                .to_string(),
        };

        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let request_timeout_secs =
            parse_or(&lookup, "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;

        Ok(Self {
            razorpay,
            firebase,
            port,
            request_timeout_secs,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { name, value: raw })
        }
        _ => Ok(default),
    }
}
