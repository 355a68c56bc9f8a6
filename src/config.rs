use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::admin::LoginWorkflow;
use crate::crypto::PBKDF2_ITERATIONS;
use crate::messaging::MailSettings;
use crate::models::enums::MailBackend;

/// Application-level constants
pub const APP_NAME: &str = "Pestwatch";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_MAIL_FROM: &str = "noreply@pestwatch.local";
pub const COMMUNICATION_SUBJECT: &str = "New Communication from Government Official";
pub const DATABASE_FILE: &str = "pestwatch.db";

/// Environment variable prefix for every setting below
pub const ENV_PREFIX: &str = "PESTWATCH_";

/// Default `tracing` filter when `RUST_LOG` is unset
pub fn default_log_filter() -> &'static str {
    "pestwatch=info,pestwatch_lib=info"
}

/// Get the application data directory
/// ~/Pestwatch/ on all platforms, falling back to the working directory
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from(APP_NAME))
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("{0} requires {1} to be set")]
    Incomplete(String, String),
}

/// Credentials for the superuser created at startup when missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapSuperuser {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub mail_backend: MailBackend,
    pub mail: MailSettings,
    pub admin_login: LoginWorkflow,
    pub password_iterations: u32,
    pub bootstrap_superuser: Option<BootstrapSuperuser>,
}

impl AppConfig {
    /// Read `PESTWATCH_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.trim().is_empty())
        };

        let data_dir = get("DATA_DIR").map(PathBuf::from).unwrap_or_else(app_data_dir);
        let database_path = get("DATABASE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(DATABASE_FILE));

        let bind_raw = get("BIND").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = parse_value("BIND", &bind_raw)?;

        let mail_backend = match get("MAIL_BACKEND") {
            Some(raw) => MailBackend::from_str(&raw).map_err(|_| invalid("MAIL_BACKEND", &raw))?,
            None => MailBackend::Console,
        };

        let mail = MailSettings {
            from: get("MAIL_FROM").unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string()),
            subject: get("MAIL_SUBJECT").unwrap_or_else(|| COMMUNICATION_SUBJECT.to_string()),
        };

        let admin_login = match get("ADMIN_FORCE_ACCOUNT_LOGIN") {
            Some(raw) if parse_bool("ADMIN_FORCE_ACCOUNT_LOGIN", &raw)? => LoginWorkflow::Accounts,
            _ => LoginWorkflow::AdminCredentials,
        };

        let password_iterations = match get("PASSWORD_ITERATIONS") {
            Some(raw) => parse_value("PASSWORD_ITERATIONS", &raw)?,
            None => PBKDF2_ITERATIONS,
        };

        let bootstrap_superuser = match (get("SUPERUSER_EMAIL"), get("SUPERUSER_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapSuperuser { email, password }),
            (Some(_), None) => {
                return Err(ConfigError::Incomplete(
                    format!("{ENV_PREFIX}SUPERUSER_EMAIL"),
                    format!("{ENV_PREFIX}SUPERUSER_PASSWORD"),
                ))
            }
            _ => None,
        };

        Ok(Self {
            data_dir,
            database_path,
            bind_addr,
            mail_backend,
            mail,
            admin_login,
            password_iterations,
            bootstrap_superuser,
        })
    }
}

fn invalid(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: format!("{ENV_PREFIX}{name}"),
        value: value.to_string(),
    }
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| invalid(name, raw))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (format!("{ENV_PREFIX}{k}"), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.mail_backend, MailBackend::Console);
        assert_eq!(config.mail, MailSettings::default());
        assert_eq!(config.admin_login, LoginWorkflow::AdminCredentials);
        assert_eq!(config.password_iterations, PBKDF2_ITERATIONS);
        assert!(config.database_path.ends_with(DATABASE_FILE));
        assert!(config.bootstrap_superuser.is_none());
    }

    #[test]
    fn database_defaults_under_data_dir() {
        let config = config_from(&[("DATA_DIR", "/srv/pestwatch")]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/srv/pestwatch/pestwatch.db"));
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("DATABASE", "/tmp/p.db"),
            ("BIND", "0.0.0.0:9000"),
            ("MAIL_BACKEND", "memory"),
            ("MAIL_FROM", "alerts@agri.gov"),
            ("MAIL_SUBJECT", "Pest alert"),
            ("ADMIN_FORCE_ACCOUNT_LOGIN", "true"),
            ("PASSWORD_ITERATIONS", "1000"),
            ("SUPERUSER_EMAIL", "root@x.com"),
            ("SUPERUSER_PASSWORD", "pw"),
        ])
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/p.db"));
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.mail_backend, MailBackend::Memory);
        assert_eq!(config.mail.subject, "Pest alert");
        assert_eq!(config.admin_login, LoginWorkflow::Accounts);
        assert_eq!(config.password_iterations, 1000);
        assert_eq!(config.bootstrap_superuser.unwrap().email, "root@x.com");
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(
            config_from(&[("BIND", "not-an-addr")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config_from(&[("MAIL_BACKEND", "smtp")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config_from(&[("ADMIN_FORCE_ACCOUNT_LOGIN", "maybe")]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn superuser_email_without_password_is_incomplete() {
        assert!(matches!(
            config_from(&[("SUPERUSER_EMAIL", "root@x.com")]),
            Err(ConfigError::Incomplete(..))
        ));
    }

    #[test]
    fn app_data_dir_named_after_app() {
        assert!(app_data_dir().ends_with(APP_NAME));
    }

    #[test]
    fn app_name_is_pestwatch() {
        assert_eq!(APP_NAME, "Pestwatch");
    }
}
