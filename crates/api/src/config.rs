//! Application configuration loaded from environment variables.

use domain::booking::CodInitialStatus;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `GATEWAY_SECRET` — shared secret for payment-callback signatures
/// - `GATEWAY_NAME` — payment gateway label stored on paid bookings
///   (default: `"razorpay"`)
/// - `ADMIN_KEY` — admin API key checked by the credential store
/// - `COD_INITIAL_STATUS` — `pending` or `confirmed` (default: `confirmed`)
/// - `SEQUENCE_PREFIX` — booking sequence-id prefix (default: `"Retrowoods"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub gateway_secret: String,
    pub gateway_name: String,
    pub admin_key: String,
    pub cod_initial_status: CodInitialStatus,
    pub sequence_prefix: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            gateway_secret: std::env::var("GATEWAY_SECRET")
                .unwrap_or_else(|_| "dev_gateway_secret".to_string()),
            gateway_name: std::env::var("GATEWAY_NAME").unwrap_or_else(|_| "razorpay".to_string()),
            admin_key: std::env::var("ADMIN_KEY").unwrap_or_else(|_| "dev_admin_key".to_string()),
            cod_initial_status: std::env::var("COD_INITIAL_STATUS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            sequence_prefix: std::env::var("SEQUENCE_PREFIX")
                .unwrap_or_else(|_| "Retrowoods".to_string()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            gateway_secret: "dev_gateway_secret".to_string(),
            gateway_name: "razorpay".to_string(),
            admin_key: "dev_admin_key".to_string(),
            cod_initial_status: CodInitialStatus::default(),
            sequence_prefix: "Retrowoods".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.gateway_name, "razorpay");
        assert_eq!(config.cod_initial_status, CodInitialStatus::Confirmed);
        assert_eq!(config.sequence_prefix, "Retrowoods");
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_cod_initial_status_parses() {
        let status: CodInitialStatus = "pending".parse().unwrap();
        assert_eq!(status, CodInitialStatus::Pending);
        assert!("sideways".parse::<CodInitialStatus>().is_err());
    }
}
