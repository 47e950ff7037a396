use std::env;
use std::io;
use std::net::SocketAddr;

use chrono::TimeDelta;
use tokio::net::lookup_host;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/progdealer";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com";
const DEFAULT_NOTIFY_FROM: &str = "ProgDealer <notifications@progdealer.online>";
const DEFAULT_NOTIFY_RECIPIENT: &str = "albo@progdealer.com";
const DEFAULT_GOODBYE_FROM: &str = "hello@progdealer.online";
const DEFAULT_SITE_URL: &str = "http://localhost:5173";
const DEFAULT_SESSION_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Comma-separated origins; see [`cors::create_cors_layer`].
    pub cors_allowed_origins: Option<String>,
    /// `RUST_ENV=production` turns on HSTS.
    pub production: bool,
    /// Email delivery is disabled when unset.
    pub resend_api_key: Option<String>,
    pub resend_api_url: String,
    pub notify_from: String,
    pub notify_recipient: String,
    pub goodbye_from: String,
    pub site_url: String,
    pub session_ttl_days: i64,
    /// Lower-cased emails whose profiles are created with the admin role.
    pub admin_emails: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT").map(|p| p.parse::<u16>()) {
            Some(Ok(port)) => port,
            Some(Err(e)) => {
                tracing::warn!("Config: invalid PORT ({e}), using {DEFAULT_PORT}");
                DEFAULT_PORT
            }
            None => DEFAULT_PORT,
        };

        let session_ttl_days = var("SESSION_TTL_DAYS")
            .and_then(|d| d.parse::<i64>().ok())
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_SESSION_TTL_DAYS);

        let admin_emails = var("ADMIN_EMAILS")
            .map(|list| {
                list.split(',')
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            cors_allowed_origins: var("CORS_ALLOWED_ORIGINS"),
            production: var("RUST_ENV")
                .map(|v| v.to_lowercase() == "production")
                .unwrap_or(false),
            resend_api_key: var("RESEND_API_KEY"),
            resend_api_url: var("RESEND_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_RESEND_API_URL.to_string()),
            notify_from: var("NOTIFY_FROM").unwrap_or_else(|| DEFAULT_NOTIFY_FROM.to_string()),
            notify_recipient: var("NOTIFY_RECIPIENT")
                .unwrap_or_else(|| DEFAULT_NOTIFY_RECIPIENT.to_string()),
            goodbye_from: var("GOODBYE_FROM").unwrap_or_else(|| DEFAULT_GOODBYE_FROM.to_string()),
            site_url: var("SITE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_SITE_URL.to_string()),
            session_ttl_days,
            admin_emails,
        }
    }

    /// Resolves `HOST:PORT`, so names like `localhost` work as well as IPs.
    pub async fn socket_addr(&self) -> io::Result<SocketAddr> {
        lookup_host((self.host.as_str(), self.port))
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!("HOST '{}' did not resolve to an address", self.host),
                )
            })
    }

    pub fn session_ttl(&self) -> TimeDelta {
        TimeDelta::days(self.session_ttl_days)
    }

    pub fn is_bootstrap_admin(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|e| *e == email)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[tokio::test]
    async fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.session_ttl_days, DEFAULT_SESSION_TTL_DAYS);
        assert!(config.resend_api_key.is_none());
        assert!(!config.production);
        assert_eq!(config.socket_addr().await.unwrap().port(), DEFAULT_PORT);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("RUST_ENV", "Production"),
            ("RESEND_API_KEY", "re_123"),
            ("SITE_URL", "https://progdealer.online/"),
            ("ADMIN_EMAILS", " Albo@ProgDealer.com, ,ops@example.org"),
        ]);
        assert_eq!(config.port, 8080);
        assert!(config.production);
        assert_eq!(config.resend_api_key.as_deref(), Some("re_123"));
        assert_eq!(config.site_url, "https://progdealer.online");
        assert!(config.is_bootstrap_admin("albo@progdealer.com"));
        assert!(config.is_bootstrap_admin("OPS@example.org"));
        assert!(!config.is_bootstrap_admin("someone@example.org"));
    }

    #[tokio::test]
    async fn test_host_name_resolves() {
        let config = config_from(&[("HOST", "localhost"), ("PORT", "4000")]);
        let addr = config.socket_addr().await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 4000);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[("PORT", "not-a-port"), ("SESSION_TTL_DAYS", "-3")]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.session_ttl_days, DEFAULT_SESSION_TTL_DAYS);
    }
}
