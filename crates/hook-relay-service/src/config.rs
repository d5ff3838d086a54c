//! Service configuration.
//!
//! Configuration is assembled once at startup from an optional TOML file and
//! environment variables, deserialized into a typed [`ServiceConfig`], and
//! validated before any listener binds. Components receive the resulting
//! value explicitly; nothing reads ambient process state at request time.
//!
//! Sources (later sources override earlier ones):
//!  1. `./config/hook-relay.toml` — deployment-local file
//!  2. Environment variables prefixed `HOOK_RELAY` with `__` separators,
//!     e.g. `HOOK_RELAY__INGRESS__PORT=9000` sets `ingress.port`.
//!
//! The webhook secret has no default: a deployment without one must fail at
//! startup, never at request time.

use serde::{Deserialize, Serialize};

// ============================================================================
// Configuration Types
// ============================================================================

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Webhook receiver endpoint (verify, classify, republish).
    #[serde(default = "ListenerConfig::default_ingress")]
    pub ingress: ListenerConfig,

    /// Queue push-delivery endpoint (decode, normalize, persist).
    #[serde(default = "ListenerConfig::default_consumer")]
    pub consumer: ListenerConfig,

    /// Shared secret for webhook signature verification. Required.
    #[serde(default)]
    pub webhook_secret: String,
}

/// Bind settings for one HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    #[serde(default = "ListenerConfig::default_host")]
    pub host: String,

    pub port: u16,

    #[serde(default = "ListenerConfig::default_enabled")]
    pub enabled: bool,
}

impl ListenerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_enabled() -> bool {
        true
    }

    fn default_ingress() -> Self {
        Self {
            host: Self::default_host(),
            port: 8000,
            enabled: true,
        }
    }

    fn default_consumer() -> Self {
        Self {
            host: Self::default_host(),
            port: 8080,
            enabled: true,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            ingress: ListenerConfig::default_ingress(),
            consumer: ListenerConfig::default_consumer(),
            webhook_secret: String::new(),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Failure loading or validating configuration. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("webhook secret is not configured; set HOOK_RELAY__WEBHOOK_SECRET")]
    MissingWebhookSecret,

    #[error("both listeners are disabled; nothing to serve")]
    NoListeners,
}

// ============================================================================
// Loading and Validation
// ============================================================================

impl ServiceConfig {
    /// Load configuration from the layered file/environment sources.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(
                config::File::with_name("config/hook-relay")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::Environment::with_prefix("HOOK_RELAY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let service_config: ServiceConfig = settings.try_deserialize()?;
        Ok(service_config)
    }

    /// Validate the assembled configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webhook_secret.is_empty() {
            return Err(ConfigError::MissingWebhookSecret);
        }

        if !self.ingress.enabled && !self.consumer.enabled {
            return Err(ConfigError::NoListeners);
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
