//! # Configuration (§9.3)
//!
//! A single struct loaded from environment variables with typed defaults,
//! following the `DATABASE_URL`-optional pattern in [`crate::db`].

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub cache_url: Option<String>,
    pub port: u16,
    pub log_level: String,
    pub disposable_list_url: Option<String>,
    pub geocoder_url: Option<String>,
    pub geocoder_key: Option<String>,
    pub vat_registry_url: Option<String>,
    pub otp_provider_url: Option<String>,
    pub otp_api_key: Option<String>,
    pub retention_days: i64,
    pub rate_limit_count: u32,
    pub rate_limit_burst: u32,
    pub encryption_key: Option<String>,
    pub jwt_secret: String,
    pub session_secret: String,
    pub webhook_max_attempts: u32,
}

impl Config {
    /// Load from the process environment, falling back to the documented
    /// defaults for anything optional or unset. Never panics — a missing
    /// `JWT_SECRET`/`SESSION_SECRET` in production is an operator mistake,
    /// not something this layer can recover from, so those two fall back to
    /// a fixed dev value with a loud warning rather than refusing to boot.
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set — using an insecure development default");
            "dev-jwt-secret-do-not-use-in-production".to_string()
        });
        let session_secret = std::env::var("SESSION_SECRET").unwrap_or_else(|_| {
            tracing::warn!("SESSION_SECRET not set — using an insecure development default");
            "dev-session-secret-do-not-use-in-production".to_string()
        });

        Self {
            database_url: std::env::var("DATABASE_URL").ok(),
            cache_url: std::env::var("CACHE_URL").ok(),
            port: parse_or("PORT", 8080),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            disposable_list_url: std::env::var("DISPOSABLE_LIST_URL").ok(),
            geocoder_url: std::env::var("GEOCODER_URL").ok(),
            geocoder_key: std::env::var("GEOCODER_KEY").ok(),
            vat_registry_url: std::env::var("VAT_REGISTRY_URL").ok(),
            otp_provider_url: std::env::var("OTP_PROVIDER_URL").ok(),
            otp_api_key: std::env::var("OTP_API_KEY").ok(),
            retention_days: parse_or("RETENTION_DAYS", 90),
            rate_limit_count: parse_or("RATE_LIMIT_COUNT", 100),
            rate_limit_burst: parse_or("RATE_LIMIT_BURST", 20),
            encryption_key: std::env::var("ENCRYPTION_KEY").ok(),
            jwt_secret,
            session_secret,
            webhook_max_attempts: parse_or("WEBHOOK_MAX_ATTEMPTS", 5),
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_when_unset() {
        std::env::remove_var("ORBICHECK_TEST_PARSE_OR");
        assert_eq!(parse_or::<u16>("ORBICHECK_TEST_PARSE_OR", 42), 42);
    }

    #[test]
    fn parse_or_falls_back_on_garbage() {
        std::env::set_var("ORBICHECK_TEST_PARSE_OR_2", "not-a-number");
        assert_eq!(parse_or::<u16>("ORBICHECK_TEST_PARSE_OR_2", 7), 7);
        std::env::remove_var("ORBICHECK_TEST_PARSE_OR_2");
    }
}
