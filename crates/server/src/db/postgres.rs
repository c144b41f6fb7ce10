//! `PostgreSQL` store.
//!
//! Rows read for mutation are locked with `FOR UPDATE`, so two requests
//! touching the same user or review serialize on the database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use review_desk_core::{NewReview, ProfileName, Review, ReviewId, User, UserId, WordCount};

use super::{ReviewStore, Store, StoreError, StoreTransaction, UserStore};

const REVIEW_COLUMNS: &str = "id, product_id, summary, text, score, \
     helpfulness_numerator, helpfulness_denominator, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    profile_name: String,
}

impl UserRow {
    fn into_user(self, reviews: Vec<Review>) -> Result<User, StoreError> {
        let profile_name = ProfileName::parse(&self.profile_name).map_err(|e| {
            StoreError::DataCorruption(format!("invalid profile name in database: {e}"))
        })?;
        Ok(User::with_reviews(self.id, profile_name, reviews))
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    product_id: String,
    summary: String,
    text: String,
    score: i16,
    helpfulness_numerator: i32,
    helpfulness_denominator: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            summary: row.summary,
            text: row.text,
            score: row.score,
            helpfulness_numerator: row.helpfulness_numerator,
            helpfulness_denominator: row.helpfulness_denominator,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct WordCountRow {
    word: String,
    count: i64,
}

/// `PostgreSQL`-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }
}

/// Transaction over a [`PgStore`].
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgTransaction {
    async fn owned_reviews(&mut self, user_id: UserId) -> Result<Vec<Review>, StoreError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT r.id, r.product_id, r.summary, r.text, r.score,
                   r.helpfulness_numerator, r.helpfulness_denominator,
                   r.created_at, r.updated_at
            FROM reviews.review r
            JOIN reviews.user_review ur ON ur.review_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.id
            ",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn load_user(&mut self, row: Option<UserRow>) -> Result<Option<User>, StoreError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let reviews = self.owned_reviews(row.id).await?;
        row.into_user(reviews).map(Some)
    }
}

#[async_trait]
impl UserStore for PgTransaction {
    #[instrument(skip(self))]
    async fn find_user_by_profile_name(
        &mut self,
        profile_name: &ProfileName,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, profile_name
            FROM reviews.user
            WHERE profile_name = $1
            FOR UPDATE
            ",
        )
        .bind(profile_name)
        .fetch_optional(&mut *self.tx)
        .await?;

        self.load_user(row).await
    }

    #[instrument(skip(self))]
    async fn find_user_by_id(&mut self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, profile_name
            FROM reviews.user
            WHERE id = $1
            FOR UPDATE
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        self.load_user(row).await
    }

    #[instrument(skip(self))]
    async fn find_owner_of_review(
        &mut self,
        review_id: ReviewId,
    ) -> Result<Option<UserId>, StoreError> {
        let row: Option<(UserId,)> = sqlx::query_as(
            r"
            SELECT user_id
            FROM reviews.user_review
            WHERE review_id = $1
            ",
        )
        .bind(review_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|(user_id,)| user_id))
    }

    #[instrument(skip(self, user), fields(user_id = %user.id, reviews = user.review_count()))]
    async fn save_user(&mut self, user: &User) -> Result<(), StoreError> {
        let exists: Option<(UserId,)> =
            sqlx::query_as("SELECT id FROM reviews.user WHERE id = $1 FOR UPDATE")
                .bind(user.id)
                .fetch_optional(&mut *self.tx)
                .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound);
        }

        let review_ids: Vec<i32> = user.review_ids().into_iter().map(i32::from).collect();

        sqlx::query(
            r"
            DELETE FROM reviews.user_review
            WHERE user_id = $1 AND NOT (review_id = ANY($2))
            ",
        )
        .bind(user.id)
        .bind(&review_ids)
        .execute(&mut *self.tx)
        .await?;

        // A row owned by another user is left alone and not counted.
        let linked = sqlx::query(
            r"
            INSERT INTO reviews.user_review AS ur (review_id, user_id)
            SELECT unnest($2::int4[]), $1
            ON CONFLICT (review_id) DO UPDATE
                SET user_id = EXCLUDED.user_id
                WHERE ur.user_id = EXCLUDED.user_id
            ",
        )
        .bind(user.id)
        .bind(&review_ids)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return StoreError::NotFound;
            }
            StoreError::Database(e)
        })?;

        if linked.rows_affected() != review_ids.len() as u64 {
            return Err(StoreError::Conflict(
                "review is owned by another user".to_owned(),
            ));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_user(&mut self, profile_name: &ProfileName) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO reviews.user (profile_name)
            VALUES ($1)
            RETURNING id, profile_name
            ",
        )
        .bind(profile_name)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Conflict("profile name already exists".to_owned());
            }
            StoreError::Database(e)
        })?;

        row.into_user(Vec::new())
    }
}

#[async_trait]
impl ReviewStore for PgTransaction {
    #[instrument(skip(self))]
    async fn find_review_by_id(&mut self, id: ReviewId) -> Result<Option<Review>, StoreError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews.review WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Review::from))
    }

    #[instrument(skip(self, review), fields(product_id = %review.product_id))]
    async fn insert_review(&mut self, review: &NewReview) -> Result<Review, StoreError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r"
            INSERT INTO reviews.review
                (product_id, summary, text, score, helpfulness_numerator, helpfulness_denominator)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {REVIEW_COLUMNS}
            "
        ))
        .bind(&review.product_id)
        .bind(&review.summary)
        .bind(&review.text)
        .bind(review.score)
        .bind(review.helpfulness_numerator)
        .bind(review.helpfulness_denominator)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    #[instrument(skip(self, review), fields(review_id = %review.id))]
    async fn save_review(&mut self, review: &Review) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE reviews.review
            SET product_id = $2,
                summary = $3,
                text = $4,
                score = $5,
                helpfulness_numerator = $6,
                helpfulness_denominator = $7,
                updated_at = $8
            WHERE id = $1
            ",
        )
        .bind(review.id)
        .bind(&review.product_id)
        .bind(&review.summary)
        .bind(&review.text)
        .bind(review.score)
        .bind(review.helpfulness_numerator)
        .bind(review.helpfulness_denominator)
        .bind(review.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_review_by_id(&mut self, id: ReviewId) -> Result<bool, StoreError> {
        // user_review rows go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM reviews.review WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn word_frequencies(&mut self) -> Result<Vec<WordCount>, StoreError> {
        let rows = sqlx::query_as::<_, WordCountRow>(
            r"
            SELECT word, COUNT(*) AS count
            FROM (
                SELECT btrim(token, '''') AS word
                FROM reviews.review,
                     regexp_split_to_table(lower(text), '[^[:alnum:]'']+') AS token
            ) words
            WHERE word <> ''
            GROUP BY word
            ",
        )
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| WordCount::new(row.word, u64::try_from(row.count).unwrap_or_default()))
            .collect())
    }
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self { tx } = *self;
        tx.commit().await?;
        Ok(())
    }
}
