//! Configuration management for the booking server.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Default `tracing` filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str =
    "info,mentorship_booking=debug,mentorship_web=debug,mentorship_postgres=debug,sqlx=warn,tower_http=info";

/// Shortest hold Stripe can honor: its checkout sessions stay open for at
/// least 30 minutes.
pub const MIN_STRIPE_HOLD_TTL_SECONDS: u64 = 1800;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// `PostgreSQL` configuration
    pub database: DatabaseConfig,
    /// Booking policy
    pub booking: BookingConfig,
    /// Email provider configuration
    pub email: EmailConfig,
    /// Payment processor configuration
    pub payment: PaymentConfig,
    /// Session verification configuration
    pub auth: AuthConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// `tracing` filter directives (`RUST_LOG` syntax)
    pub log_level: String,
    /// Metrics server host (for Prometheus scraping)
    pub metrics_host: String,
    /// Metrics server port
    pub metrics_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL; `None` runs on the in-memory backend
    pub url: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections in the pool
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
}

/// Booking policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// How long an unpaid hold blocks a slot, in seconds
    pub hold_ttl_seconds: u64,
    /// Service types booked at no cost
    pub free_service_types: HashSet<String>,
    /// Period of the background hold sweeper in seconds (0 disables it)
    pub hold_sweep_interval_seconds: u64,
}

/// Which mailer delivers notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    /// Log messages instead of sending them
    Console,
    /// Resend HTTP API
    Resend,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Provider to use
    pub provider: EmailProvider,
    /// Resend API key
    pub resend_api_key: Option<String>,
    /// Sender address
    pub from: String,
}

/// Which payment processor creates checkout sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    /// Fake sessions, no network
    Mock,
    /// Stripe Checkout
    Stripe,
}

/// Payment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Provider to use
    pub provider: PaymentProvider,
    /// Stripe secret key
    pub stripe_secret_key: Option<String>,
    /// Redirect after a successful checkout
    pub success_url: String,
    /// Redirect after an abandoned checkout
    pub cancel_url: String,
    /// Shared secret the processor's webhook must present; `None` disables
    /// `/appointment/paid`
    pub webhook_secret: Option<String>,
}

/// How bearer tokens are turned into user ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// The token is the user id. Local development only.
    Dev,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Verification mode
    pub mode: AuthMode,
}

/// A setting that cannot work as configured.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A provider was selected without its credentials.
    #[error("{0} must be set when {1}")]
    Missing(&'static str, &'static str),

    /// A numeric setting is below what the selected provider supports.
    #[error("{name} must be at least {min} when {context}, got {value}")]
    TooSmall {
        /// Variable name
        name: &'static str,
        /// Value found
        value: u64,
        /// Smallest accepted value
        min: u64,
        /// Setting that imposes the minimum
        context: &'static str,
    },

    /// An enumerated setting has an unknown value.
    #[error("{name} has unsupported value {value:?}")]
    Unsupported {
        /// Variable name
        name: &'static str,
        /// Value found
        value: String,
    },
}

impl FromStr for EmailProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "resend" => Ok(Self::Resend),
            other => Err(ConfigError::Unsupported {
                name: "EMAIL_PROVIDER",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for PaymentProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "stripe" => Ok(Self::Stripe),
            other => Err(ConfigError::Unsupported {
                name: "PAYMENT_PROVIDER",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for AuthMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            other => Err(ConfigError::Unsupported {
                name: "AUTH_MODE",
                value: other.to_string(),
            }),
        }
    }
}

fn parsed<T: FromStr>(name: &str, default: T) -> T {
    env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn choice<T: FromStr<Err = ConfigError>>(name: &str, default: T) -> Result<T, ConfigError> {
    non_empty(name).map_or(Ok(default), |raw| raw.parse())
}

/// Split a comma-separated list of service types, dropping blanks.
///
/// Entries are lower-cased to match how service types are stored.
#[must_use]
pub fn split_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unknown provider names or a provider
    /// selected without its credentials.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parsed("PORT", 8080),
                log_level: non_empty("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
                metrics_host: env::var("METRICS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                metrics_port: parsed("METRICS_PORT", 9090),
                shutdown_timeout: parsed("SHUTDOWN_TIMEOUT", 30),
            },
            database: DatabaseConfig {
                url: non_empty("DATABASE_URL"),
                max_connections: parsed("DATABASE_MAX_CONNECTIONS", 10),
                min_connections: parsed("DATABASE_MIN_CONNECTIONS", 1),
                connect_timeout: parsed("DATABASE_CONNECT_TIMEOUT", 5),
            },
            booking: BookingConfig {
                hold_ttl_seconds: parsed("HOLD_TTL_SECONDS", MIN_STRIPE_HOLD_TTL_SECONDS),
                free_service_types: split_list(
                    &env::var("FREE_SERVICE_TYPES").unwrap_or_else(|_| "coffee_chat".to_string()),
                ),
                hold_sweep_interval_seconds: parsed("HOLD_SWEEP_INTERVAL_SECONDS", 60),
            },
            email: EmailConfig {
                provider: choice("EMAIL_PROVIDER", EmailProvider::Console)?,
                resend_api_key: non_empty("RESEND_API_KEY"),
                from: env::var("EMAIL_FROM")
                    .unwrap_or_else(|_| "Mentorship <bookings@example.com>".to_string()),
            },
            payment: PaymentConfig {
                provider: choice("PAYMENT_PROVIDER", PaymentProvider::Mock)?,
                stripe_secret_key: non_empty("STRIPE_SECRET_KEY"),
                success_url: env::var("CHECKOUT_SUCCESS_URL")
                    .unwrap_or_else(|_| "http://localhost:3000/checkout/success".to_string()),
                cancel_url: env::var("CHECKOUT_CANCEL_URL")
                    .unwrap_or_else(|_| "http://localhost:3000/checkout/cancel".to_string()),
                webhook_secret: non_empty("PAYMENT_WEBHOOK_SECRET"),
            },
            auth: AuthConfig {
                mode: choice("AUTH_MODE", AuthMode::Dev)?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that every selected provider has its credentials and that the
    /// hold TTL is one the payment processor can honor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] naming the absent variable, or
    /// [`ConfigError::TooSmall`] for a hold shorter than a Stripe checkout
    /// session.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.email.provider == EmailProvider::Resend && self.email.resend_api_key.is_none() {
            return Err(ConfigError::Missing("RESEND_API_KEY", "EMAIL_PROVIDER=resend"));
        }
        if self.payment.provider == PaymentProvider::Stripe && self.payment.stripe_secret_key.is_none() {
            return Err(ConfigError::Missing("STRIPE_SECRET_KEY", "PAYMENT_PROVIDER=stripe"));
        }
        if self.payment.provider == PaymentProvider::Stripe
            && self.booking.hold_ttl_seconds < MIN_STRIPE_HOLD_TTL_SECONDS
        {
            return Err(ConfigError::TooSmall {
                name: "HOLD_TTL_SECONDS",
                value: self.booking.hold_ttl_seconds,
                min: MIN_STRIPE_HOLD_TTL_SECONDS,
                context: "PAYMENT_PROVIDER=stripe",
            });
        }
        Ok(())
    }

    /// Hold TTL as a chrono duration.
    #[must_use]
    pub fn hold_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.booking.hold_ttl_seconds).unwrap_or(i64::MAX))
    }

    /// Get server bind address
    #[must_use]
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Get metrics bind address
    #[must_use]
    pub fn metrics_address(&self) -> String {
        format!("{}:{}", self.server.metrics_host, self.server.metrics_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                log_level: DEFAULT_LOG_FILTER.to_string(),
                metrics_host: "127.0.0.1".to_string(),
                metrics_port: 9090,
                shutdown_timeout: 30,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                min_connections: 1,
                connect_timeout: 5,
            },
            booking: BookingConfig {
                hold_ttl_seconds: 900,
                free_service_types: split_list("coffee_chat"),
                hold_sweep_interval_seconds: 0,
            },
            email: EmailConfig {
                provider: EmailProvider::Console,
                resend_api_key: None,
                from: "bookings@example.com".to_string(),
            },
            payment: PaymentConfig {
                provider: PaymentProvider::Mock,
                stripe_secret_key: None,
                success_url: String::new(),
                cancel_url: String::new(),
                webhook_secret: None,
            },
            auth: AuthConfig { mode: AuthMode::Dev },
        }
    }

    #[test]
    fn provider_names_are_case_insensitive() {
        assert_eq!("Resend".parse::<EmailProvider>(), Ok(EmailProvider::Resend));
        assert_eq!(" stripe ".parse::<PaymentProvider>(), Ok(PaymentProvider::Stripe));
        assert!(matches!(
            "smtp".parse::<EmailProvider>(),
            Err(ConfigError::Unsupported { name: "EMAIL_PROVIDER", .. })
        ));
    }

    #[test]
    fn free_service_list_drops_blanks() {
        let parsed = split_list(" coffee_chat, ,intro_call ,");
        assert_eq!(parsed.len(), 2);
        assert!(parsed.contains("coffee_chat"));
        assert!(parsed.contains("intro_call"));
    }

    #[test]
    fn free_service_list_is_lower_cased() {
        let parsed = split_list("Coffee_Chat,INTRO_CALL");
        assert!(parsed.contains("coffee_chat"));
        assert!(parsed.contains("intro_call"));
    }

    #[test]
    fn stripe_without_key_is_rejected() {
        let mut config = sample();
        config.payment.provider = PaymentProvider::Stripe;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Missing("STRIPE_SECRET_KEY", "PAYMENT_PROVIDER=stripe"))
        );
    }

    #[test]
    fn stripe_needs_holds_as_long_as_a_checkout_session() {
        let mut config = sample();
        config.payment.provider = PaymentProvider::Stripe;
        config.payment.stripe_secret_key = Some("sk_test_123".to_string());
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooSmall {
                name: "HOLD_TTL_SECONDS",
                value: 900,
                min: MIN_STRIPE_HOLD_TTL_SECONDS,
                context: "PAYMENT_PROVIDER=stripe",
            })
        );

        config.booking.hold_ttl_seconds = MIN_STRIPE_HOLD_TTL_SECONDS;
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.hold_ttl(), chrono::Duration::minutes(30));
    }

    #[test]
    fn mock_payments_accept_short_holds() {
        let config = sample();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.hold_ttl(), chrono::Duration::minutes(15));
        assert_eq!(config.server_address(), "127.0.0.1:8080");
    }

    #[test]
    fn default_log_filter_parses() {
        assert!(tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }
}
