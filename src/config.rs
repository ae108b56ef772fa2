//! Environment-driven configuration (§6 "Environment contract": the
//! process reads no configuration except the bind port and optionally the
//! token verification endpoint).
//!
//! Grounded on `congress/src/auth.rs::AuthConfig::from_env` and
//! `congress/src/abuse.rs::AbuseConfig::from_env`'s `std::env::var`-driven
//! defaulting idiom.

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_port: u16,
    /// External token verification endpoint. `None` runs in permissive dev
    /// mode (see `crate::auth::AuthConfig::from_env`).
    pub token_verify_url: Option<String>,
    /// Grace period a room is kept alive with no host and no connected
    /// team before the directory retires it (§3 Lifecycles, §5
    /// Cancellation).
    pub room_idle_grace_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_port: 6573,
            token_verify_url: None,
            room_idle_grace_secs: 600,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let bind_port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.bind_port);
        let token_verify_url = std::env::var("TOKEN_VERIFY_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let room_idle_grace_secs = std::env::var("ROOM_IDLE_GRACE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.room_idle_grace_secs);

        if token_verify_url.is_none() {
            tracing::warn!(
                "TOKEN_VERIFY_URL not set - host connections run in permissive dev mode"
            );
        }

        Self {
            bind_port,
            token_verify_url,
            room_idle_grace_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_permissive_dev_mode() {
        let config = AppConfig::default();
        assert!(config.token_verify_url.is_none());
        assert_eq!(config.bind_port, 6573);
    }
}
