pub mod accounts;
pub mod admin;
pub mod api;
pub mod config;
pub mod crypto;
pub mod db;
pub mod messaging;
pub mod models;
pub mod notification;
pub mod validation;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::accounts::{AccountError, Registration};
use crate::admin::{AdminError, AdminSite};
use crate::api::ApiContext;
use crate::config::{AppConfig, ConfigError};
use crate::crypto::PasswordHasher;
use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Admin(#[from] AdminError),
}

/// Start the service and block until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env()?;
    let ctx = bootstrap(&config)?;

    let listener = TcpListener::bind(config.bind_addr).await?;
    api::serve(listener, ctx, api::shutdown_signal()).await?;
    Ok(())
}

/// Everything `run` does before it starts listening.
pub fn bootstrap(config: &AppConfig) -> Result<ApiContext, StartupError> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = db::sqlite::open_database(&config.database_path)?;
    tracing::info!(path = %config.database_path.display(), "Database ready");

    if let Some(bootstrap) = &config.bootstrap_superuser {
        let hasher = PasswordHasher::new(config.password_iterations);
        let registration = Registration::new(bootstrap.email.clone(), bootstrap.password.clone());
        if let Some(user) = accounts::ensure_superuser(&conn, &hasher, &registration)? {
            tracing::info!(user_id = user.id, "Bootstrap superuser created");
        }
    }

    let admin = AdminSite::configure(config.admin_login)?;
    let mailer = notification::build_mailer(config.mail_backend);
    tracing::info!(backend = %config.mail_backend, "Mailer ready");

    Ok(ApiContext::new(conn, admin, mailer, config.mail.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_in(dir: &std::path::Path, extra: &[(&str, &str)]) -> AppConfig {
        let mut vars: HashMap<String, String> = extra
            .iter()
            .map(|(k, v)| (format!("{}{k}", config::ENV_PREFIX), v.to_string()))
            .collect();
        vars.insert(
            format!("{}DATA_DIR", config::ENV_PREFIX),
            dir.join("data").display().to_string(),
        );
        vars.insert(format!("{}PASSWORD_ITERATIONS", config::ENV_PREFIX), "1000".into());
        AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[test]
    fn bootstrap_creates_database_and_superuser_once() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path(), &[
            ("SUPERUSER_EMAIL", "root@x.com"),
            ("SUPERUSER_PASSWORD", "pw"),
        ]);

        let ctx = bootstrap(&config).unwrap();
        assert!(config.database_path.exists());
        {
            let conn = ctx.db.lock().unwrap();
            let root = db::get_user_by_email(&conn, "root@x.com").unwrap().unwrap();
            assert!(root.is_superuser);
        }
        drop(ctx);

        let again = bootstrap(&config).unwrap();
        let conn = again.db.lock().unwrap();
        assert_eq!(db::list_users(&conn).unwrap().len(), 1);
    }

    #[test]
    fn bootstrap_without_superuser_leaves_directory_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = bootstrap(&config_in(tmp.path(), &[])).unwrap();
        let conn = ctx.db.lock().unwrap();
        assert!(db::list_users(&conn).unwrap().is_empty());
    }
}
