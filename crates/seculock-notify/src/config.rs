//! Mail settings.

use seculock_core::constants::{DEFAULT_SEND_TIMEOUT, DEFAULT_SMTP_PORT, DEFAULT_SMTP_RELAY};
use seculock_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which transport delivers notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Authenticated STARTTLS SMTP relay.
    #[default]
    Smtp,
    /// Write notifications to the log (bench setups without mail access).
    Log,
}

/// `[smtp]` section of the controller configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub transport: TransportKind,
    pub relay: String,
    pub port: u16,
    pub username: String,
    /// Usually supplied through the environment instead of the file.
    #[serde(skip_serializing)]
    pub password: String,
    /// Sender address; defaults to `username` when empty.
    pub from: String,
    /// Owner address every notification goes to.
    pub to: String,
    pub send_timeout_ms: u64,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            relay: DEFAULT_SMTP_RELAY.to_string(),
            port: DEFAULT_SMTP_PORT,
            username: String::new(),
            password: String::new(),
            from: String::new(),
            to: String::new(),
            send_timeout_ms: DEFAULT_SEND_TIMEOUT.as_millis() as u64,
        }
    }
}

impl SmtpConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Sender address, falling back to the login name.
    pub fn sender(&self) -> &str {
        if self.from.is_empty() {
            &self.username
        } else {
            &self.from
        }
    }

    /// Check that the settings can produce a working transport.
    pub fn validate(&self) -> Result<()> {
        if self.send_timeout_ms == 0 {
            return Err(Error::Config("smtp.send_timeout_ms must be positive".into()));
        }
        self.sender()
            .parse::<lettre::Address>()
            .map_err(|e| Error::Config(format!("smtp sender {:?}: {e}", self.sender())))?;
        self.to
            .parse::<lettre::Address>()
            .map_err(|e| Error::Config(format!("smtp.to {:?}: {e}", self.to)))?;
        if self.transport == TransportKind::Smtp {
            if self.relay.is_empty() {
                return Err(Error::Config("smtp.relay must be set".into()));
            }
            if self.username.is_empty() || self.password.is_empty() {
                return Err(Error::Config(
                    "smtp.username and a password are required for the smtp transport".into(),
                ));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("transport", &self.transport)
            .field("relay", &self.relay)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "******" })
            .field("from", &self.from)
            .field("to", &self.to)
            .field("send_timeout_ms", &self.send_timeout_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            username: "locker@example.com".into(),
            password: "app-password".into(),
            to: "owner@example.com".into(),
            ..SmtpConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = SmtpConfig::default();
        assert_eq!(config.relay, "smtp.gmail.com");
        assert_eq!(config.port, 587);
        assert_eq!(config.send_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_valid_config() {
        config().validate().unwrap();
    }

    #[test]
    fn test_sender_falls_back_to_username() {
        let mut config = config();
        assert_eq!(config.sender(), "locker@example.com");
        config.from = "alerts@example.com".into();
        assert_eq!(config.sender(), "alerts@example.com");
    }

    #[test]
    fn test_missing_password_rejected_for_smtp() {
        let config = SmtpConfig {
            password: String::new(),
            ..config()
        };
        assert!(config.validate().is_err());

        let log_only = SmtpConfig {
            transport: TransportKind::Log,
            ..config
        };
        log_only.validate().unwrap();
    }

    #[test]
    fn test_bad_recipient_rejected() {
        let config = SmtpConfig {
            to: "not an address".into(),
            ..config()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_password_not_printed_or_serialized() {
        let config = config();
        assert!(!format!("{config:?}").contains("app-password"));
        assert!(!toml::to_string(&config).unwrap().contains("app-password"));
    }
}
