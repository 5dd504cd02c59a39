//! Server Configuration
//!
//! Read once at startup from the environment (and `.env`), immutable afterwards.

use std::fmt;
use std::time::Duration;

use payments_core::{RedirectUrls, DEFAULT_TOLERANCE};

/// Payments service configuration
#[derive(Clone)]
pub struct Config {
    /// HTTP listen port
    pub port: u16,
    /// NATS servers, e.g. `nats://localhost:4222`
    pub nats_servers: Vec<String>,
    /// Stripe API secret key
    pub stripe_secret: String,
    /// Webhook endpoint signing secret (`whsec_...`)
    pub stripe_endpoint_secret: String,
    pub success_url: String,
    pub cancel_url: String,
    /// Max age of a signed webhook
    pub webhook_tolerance: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let port = lookup("PORT")
            .unwrap_or_else(|| "3003".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let nats_servers: Vec<String> = required("NATS_SERVERS")?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        if nats_servers.is_empty() {
            return Err(ConfigError::Invalid("NATS_SERVERS"));
        }

        let tolerance_secs: u64 = lookup("STRIPE_WEBHOOK_TOLERANCE_SECS")
            .map(|v| v.parse::<u64>().map_err(|_| ConfigError::Invalid("STRIPE_WEBHOOK_TOLERANCE_SECS")))
            .transpose()?
            .unwrap_or(DEFAULT_TOLERANCE.as_secs());

        Ok(Self {
            port,
            nats_servers,
            stripe_secret: required("STRIPE_SECRET")?,
            stripe_endpoint_secret: required("STRIPE_ENDPOINT_SECRET")?,
            success_url: required("STRIPE_SUCCESS_URL")?,
            cancel_url: required("STRIPE_CANCEL_URL")?,
            webhook_tolerance: Duration::from_secs(tolerance_secs),
        })
    }

    pub fn redirect_urls(&self) -> RedirectUrls {
        RedirectUrls {
            success_url: self.success_url.clone(),
            cancel_url: self.cancel_url.clone(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("nats_servers", &self.nats_servers)
            .field("stripe_secret", &"<redacted>")
            .field("stripe_endpoint_secret", &"<redacted>")
            .field("success_url", &self.success_url)
            .field("cancel_url", &self.cancel_url)
            .field("webhook_tolerance", &self.webhook_tolerance)
            .finish()
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        let mut vars: HashMap<String, String> = [
            ("NATS_SERVERS", "nats://localhost:4222"),
            ("STRIPE_SECRET", "sk_test_123"),
            ("STRIPE_ENDPOINT_SECRET", "whsec_123"),
            ("STRIPE_SUCCESS_URL", "http://localhost:3003/payments/success"),
            ("STRIPE_CANCEL_URL", "http://localhost:3003/payments/cancel"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in pairs {
            vars.insert(k.to_string(), v.to_string());
        }
        vars
    }

    fn load(vars: &HashMap<String, String>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&env(&[])).unwrap();
        assert_eq!(config.port, 3003);
        assert_eq!(config.nats_servers, vec!["nats://localhost:4222"]);
        assert_eq!(config.webhook_tolerance, Duration::from_secs(300));
        assert_eq!(config.redirect_urls().cancel_url, "http://localhost:3003/payments/cancel");
    }

    #[test]
    fn test_server_list_and_overrides() {
        let config = load(&env(&[
            ("PORT", "8080"),
            ("NATS_SERVERS", "nats://a:4222, nats://b:4222,"),
            ("STRIPE_WEBHOOK_TOLERANCE_SECS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.nats_servers, vec!["nats://a:4222", "nats://b:4222"]);
        assert_eq!(config.webhook_tolerance, Duration::ZERO);
    }

    #[test]
    fn test_missing_and_invalid() {
        let mut vars = env(&[]);
        vars.remove("STRIPE_ENDPOINT_SECRET");
        assert_eq!(load(&vars).unwrap_err(), ConfigError::Missing("STRIPE_ENDPOINT_SECRET"));

        assert_eq!(
            load(&env(&[("STRIPE_SECRET", "  ")])).unwrap_err(),
            ConfigError::Missing("STRIPE_SECRET")
        );
        assert_eq!(load(&env(&[("PORT", "http")])).unwrap_err(), ConfigError::Invalid("PORT"));
        assert_eq!(
            load(&env(&[("NATS_SERVERS", " , ")])).unwrap_err(),
            ConfigError::Invalid("NATS_SERVERS")
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&env(&[])).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk_test_123"));
        assert!(!debug.contains("whsec_123"));
        assert!(debug.contains("nats://localhost:4222"));
    }
}
