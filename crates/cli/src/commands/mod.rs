//! `rd-cli` subcommands.

pub mod migrate;
pub mod token;
pub mod user;

use secrecy::SecretString;
use thiserror::Error;

use review_desk_server::config::ConfigError;
use review_desk_server::db::StoreError;
use review_desk_server::services::tokens::TokenError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Server configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid profile name.
    #[error("Invalid profile name: {0}")]
    InvalidProfileName(#[from] review_desk_core::ProfileNameError),

    /// User already exists.
    #[error("User already exists with profile name: {0}")]
    UserExists(String),

    /// Token signer could not be created.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

/// Database URL from `REVIEWS_DATABASE_URL`, falling back to `DATABASE_URL`.
fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    ["REVIEWS_DATABASE_URL", "DATABASE_URL"]
        .into_iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .map(SecretString::from)
        .ok_or(CommandError::MissingEnvVar("REVIEWS_DATABASE_URL"))
}
