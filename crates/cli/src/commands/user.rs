//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! rd-cli user create --profile-name "Karl"
//! ```
//!
//! # Environment Variables
//!
//! - `REVIEWS_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)

use review_desk_core::{ProfileName, UserId};
use review_desk_server::db::{self, PgStore, Store, StoreError};

use super::{CommandError, database_url};

/// Create a new user.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns `CommandError::UserExists` if the profile name is taken.
pub async fn create(profile_name: &str) -> Result<UserId, CommandError> {
    let profile_name = ProfileName::parse(profile_name)?;
    let database_url = database_url()?;

    tracing::info!("Connecting to review database...");
    let store = PgStore::new(db::create_pool(&database_url).await?);

    tracing::info!("Creating user: {}", profile_name);
    let mut tx = store.begin().await?;
    let user = tx
        .create_user(&profile_name)
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => CommandError::UserExists(profile_name.to_string()),
            other => CommandError::Store(other),
        })?;
    tx.commit().await?;

    tracing::info!(user_id = %user.id, "User created");
    Ok(user.id)
}
