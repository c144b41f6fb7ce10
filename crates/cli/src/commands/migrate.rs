//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! rd-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `REVIEWS_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//!
//! # Migration Files
//!
//! `crates/server/migrations/`

use review_desk_server::db;

use super::{CommandError, database_url};

/// Run the review database migrations.
///
/// # Errors
///
/// Returns `CommandError` if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to review database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running review migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Review migrations complete!");
    Ok(())
}
