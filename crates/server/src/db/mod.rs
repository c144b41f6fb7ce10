//! Persistence for users, reviews and the ownership between them.
//!
//! # Stores
//!
//! - [`postgres::PgStore`] - `PostgreSQL` (`reviews` schema), used in production
//! - [`memory::MemoryStore`] - process-local, used in tests and when no
//!   database URL is configured
//!
//! Both hand out [`StoreTransaction`]s. Every read and write of a request goes
//! through one transaction; nothing is visible to other requests until
//! [`StoreTransaction::commit`], and dropping a transaction discards it.
//!
//! ## Tables
//!
//! - `user` - Reviewers, unique by profile name
//! - `review` - Review content
//! - `user_review` - Ownership; `review_id` is the primary key, so a review has
//!   at most one owner
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p review-desk-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use review_desk_core::{NewReview, ProfileName, Review, ReviewId, User, UserId, WordCount};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate profile name).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// User lookups and ownership persistence.
#[async_trait]
pub trait UserStore: Send {
    /// Find a user, with their owned reviews, by profile name.
    async fn find_user_by_profile_name(
        &mut self,
        profile_name: &ProfileName,
    ) -> Result<Option<User>, StoreError>;

    /// Find a user, with their owned reviews, by id.
    async fn find_user_by_id(&mut self, id: UserId) -> Result<Option<User>, StoreError>;

    /// The id of the user owning a review, if anyone does.
    async fn find_owner_of_review(
        &mut self,
        review_id: ReviewId,
    ) -> Result<Option<UserId>, StoreError>;

    /// Persist the user's owned-review set.
    ///
    /// Reviews missing from `user` lose their ownership link; reviews present
    /// gain it. Returns `StoreError::NotFound` if the user does not exist and
    /// `StoreError::Conflict` if a review is owned by someone else.
    async fn save_user(&mut self, user: &User) -> Result<(), StoreError>;

    /// Create a user with no reviews.
    ///
    /// Returns `StoreError::Conflict` if the profile name is taken.
    async fn create_user(&mut self, profile_name: &ProfileName) -> Result<User, StoreError>;
}

/// Review persistence and statistics.
#[async_trait]
pub trait ReviewStore: Send {
    /// Find a review by id.
    async fn find_review_by_id(&mut self, id: ReviewId) -> Result<Option<Review>, StoreError>;

    /// Insert a new review and assign its id.
    async fn insert_review(&mut self, review: &NewReview) -> Result<Review, StoreError>;

    /// Persist an edited review. Returns `StoreError::NotFound` if it does not exist.
    async fn save_review(&mut self, review: &Review) -> Result<(), StoreError>;

    /// Delete a review. Returns `true` if it existed.
    async fn delete_review_by_id(&mut self, id: ReviewId) -> Result<bool, StoreError>;

    /// Occurrences of every distinct word across all review texts, in no
    /// particular order.
    async fn word_frequencies(&mut self) -> Result<Vec<WordCount>, StoreError>;
}

/// A unit of work spanning both user and review persistence.
#[async_trait]
pub trait StoreTransaction: UserStore + ReviewStore + Send {
    /// Make every change of this transaction visible.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Source of store transactions.
#[async_trait]
pub trait Store: Send + Sync {
    /// Start a transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Open the configured store: `PostgreSQL` when a URL is given, in-memory otherwise.
///
/// # Errors
///
/// Returns `sqlx::Error` if the database cannot be reached.
pub async fn open_store(
    database_url: Option<&secrecy::SecretString>,
) -> Result<Arc<dyn Store>, sqlx::Error> {
    match database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            tracing::info!("Database pool created");
            Ok(Arc::new(PgStore::new(pool)))
        }
        None => {
            tracing::warn!("No database URL configured, using in-memory store (data is lost on exit)");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
