//! Review access service.
//!
//! Enforces that only a review's owner can edit or delete it, and keeps each
//! user's owned-review set consistent with the review store. Every operation
//! runs in a single store transaction.

mod error;

pub use error::ReviewError;

use axum::http::HeaderMap;
use chrono::Utc;
use tracing::{Span, info, instrument};

use review_desk_core::words::top_words;
use review_desk_core::{NewReview, Review, ReviewChanges, ReviewId, User, WordCount};

use crate::db::{Store, StoreTransaction};
use crate::error::{add_breadcrumb, set_sentry_user};
use crate::services::tokens::TokenResolver;

/// Word limit used when the request does not give one.
pub const DEFAULT_WORD_LIMIT: usize = 1000;

const EDIT_FORBIDDEN: &str = "wrong review id, you can't edit other users' reviews";
const DELETE_FORBIDDEN: &str = "you can't delete other users' reviews";
const REVIEW_NOT_FOUND: &str = "there is no review with this id";

/// Review operations on behalf of a requester.
pub struct ReviewAccess<'a> {
    store: &'a dyn Store,
    tokens: &'a dyn TokenResolver,
}

impl<'a> ReviewAccess<'a> {
    /// Create a new review access service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, tokens: &'a dyn TokenResolver) -> Self {
        Self { store, tokens }
    }

    /// Resolve the requester from the request's bearer token.
    ///
    /// The user row is read inside `tx`, so it stays locked until the
    /// transaction ends.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Unauthenticated` if there is no valid token or it
    /// names an unknown user.
    pub async fn resolve_requester(
        &self,
        tx: &mut dyn StoreTransaction,
        headers: &HeaderMap,
    ) -> Result<User, ReviewError> {
        let profile_name = self
            .tokens
            .resolve(headers)
            .and_then(|token| self.tokens.user_name_for(&token))
            .ok_or(ReviewError::Unauthenticated)?;

        let user = tx
            .find_user_by_profile_name(&profile_name)
            .await?
            .ok_or(ReviewError::Unauthenticated)?;

        Span::current().record("user_id", user.id.as_i32());
        set_sentry_user(&user.id, Some(user.profile_name.as_str()));

        Ok(user)
    }

    /// Create a review owned by the requester.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Unauthenticated` without a valid token.
    #[instrument(skip_all, fields(user_id = tracing::field::Empty, product_id = %review.product_id))]
    pub async fn add_review(
        &self,
        headers: &HeaderMap,
        review: NewReview,
    ) -> Result<Review, ReviewError> {
        let mut tx = self.store.begin().await?;
        let mut user = self.resolve_requester(tx.as_mut(), headers).await?;

        let review = tx.insert_review(&review).await?;
        user.own(review.clone());
        tx.save_user(&user).await?;
        tx.commit().await?;

        info!(review_id = %review.id, "Review created");
        let review_id = review.id.to_string();
        add_breadcrumb("reviews", "Review created", Some(&[("review_id", review_id.as_str())]));

        Ok(review)
    }

    /// Apply `changes` to one of the requester's reviews.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Unauthenticated` without a valid token and
    /// `ReviewError::Forbidden` if the requester does not own `review_id`.
    #[instrument(skip(self, headers, changes), fields(user_id = tracing::field::Empty))]
    pub async fn edit_review(
        &self,
        headers: &HeaderMap,
        review_id: ReviewId,
        changes: ReviewChanges,
    ) -> Result<Review, ReviewError> {
        let mut tx = self.store.begin().await?;
        let mut user = self.resolve_requester(tx.as_mut(), headers).await?;

        let mut review = user
            .owned_review(review_id)
            .cloned()
            .ok_or_else(|| ReviewError::Forbidden(EDIT_FORBIDDEN.to_owned()))?;

        changes.apply(&mut review, Utc::now());
        tx.save_review(&review).await?;
        user.own(review.clone());
        tx.save_user(&user).await?;
        tx.commit().await?;

        info!("Review updated");
        let review_id = review.id.to_string();
        add_breadcrumb("reviews", "Review updated", Some(&[("review_id", review_id.as_str())]));

        Ok(review)
    }

    /// Delete one of the requester's reviews.
    ///
    /// `id` is the raw path segment; an id that does not parse is treated as
    /// unknown.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Unauthenticated` without a valid token,
    /// `ReviewError::NotFound` if there is no such review and
    /// `ReviewError::Forbidden` if it belongs to someone else.
    #[instrument(skip(self, headers), fields(user_id = tracing::field::Empty))]
    pub async fn delete_review(&self, headers: &HeaderMap, id: &str) -> Result<bool, ReviewError> {
        let mut tx = self.store.begin().await?;
        let mut user = self.resolve_requester(tx.as_mut(), headers).await?;

        let not_found = || ReviewError::NotFound(REVIEW_NOT_FOUND.to_owned());
        let review_id: ReviewId = id.parse().map_err(|_| not_found())?;
        let review = tx.find_review_by_id(review_id).await?.ok_or_else(not_found)?;

        let owner = tx.find_owner_of_review(review.id).await?;
        if owner != Some(user.id) {
            return Err(ReviewError::Forbidden(DELETE_FORBIDDEN.to_owned()));
        }

        user.disown(review.id);
        tx.save_user(&user).await?;
        tx.delete_review_by_id(review.id).await?;
        tx.commit().await?;

        info!(review_id = %review.id, "Review deleted");
        add_breadcrumb("reviews", "Review deleted", Some(&[("review_id", id)]));

        Ok(true)
    }

    /// The most frequent words across all reviews, most frequent first.
    ///
    /// `limit` defaults to [`DEFAULT_WORD_LIMIT`] when absent or blank.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::InvalidArgument` if `limit` is not a non-negative
    /// integer.
    #[instrument(skip(self))]
    pub async fn most_used_words(&self, limit: Option<&str>) -> Result<Vec<WordCount>, ReviewError> {
        let limit = match limit.map(str::trim).filter(|raw| !raw.is_empty()) {
            None => DEFAULT_WORD_LIMIT,
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                ReviewError::InvalidArgument(format!(
                    "limit must be a non-negative integer, got {raw:?}"
                ))
            })?,
        };

        let mut tx = self.store.begin().await?;
        let counts = tx.word_frequencies().await?;
        tx.commit().await?;

        Ok(top_words(counts, limit))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::http::{HeaderValue, header};
    use review_desk_core::{ProfileName, UserId};
    use secrecy::SecretString;

    use crate::config::TokenConfig;
    use crate::db::MemoryStore;
    use crate::services::tokens::HmacTokenResolver;

    struct Fixture {
        store: MemoryStore,
        tokens: HmacTokenResolver,
    }

    impl Fixture {
        fn new() -> Self {
            let tokens = HmacTokenResolver::new(&TokenConfig {
                secret: SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6d"),
                ttl: Duration::from_secs(3600),
            })
            .unwrap();
            Self {
                store: MemoryStore::new(),
                tokens,
            }
        }

        fn access(&self) -> ReviewAccess<'_> {
            ReviewAccess::new(&self.store, &self.tokens)
        }

        async fn user(&self, name: &str) -> (UserId, HeaderMap) {
            let profile_name = ProfileName::parse(name).unwrap();
            let mut tx = self.store.begin().await.unwrap();
            let user = tx.create_user(&profile_name).await.unwrap();
            tx.commit().await.unwrap();

            (user.id, self.bearer(&profile_name))
        }

        fn bearer(&self, profile_name: &ProfileName) -> HeaderMap {
            let token = self.tokens.issue(profile_name);
            let mut headers = HeaderMap::new();
            headers.insert(
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
            );
            headers
        }

        async fn owner_of(&self, id: ReviewId) -> Option<UserId> {
            let mut tx = self.store.begin().await.unwrap();
            tx.find_owner_of_review(id).await.unwrap()
        }

        async fn owned_by(&self, user_id: UserId) -> Vec<ReviewId> {
            let mut tx = self.store.begin().await.unwrap();
            tx.find_user_by_id(user_id)
                .await
                .unwrap()
                .unwrap()
                .review_ids()
        }

        async fn review(&self, id: ReviewId) -> Option<Review> {
            let mut tx = self.store.begin().await.unwrap();
            tx.find_review_by_id(id).await.unwrap()
        }
    }

    fn new_review(text: &str) -> NewReview {
        NewReview {
            product_id: "B001E4KFG0".to_string(),
            summary: "Good Quality Dog Food".to_string(),
            text: text.to_string(),
            score: 5,
            helpfulness_numerator: 1,
            helpfulness_denominator: 1,
        }
    }

    #[tokio::test]
    async fn test_add_review_is_owned_by_requester() {
        let fx = Fixture::new();
        let (karl, headers) = fx.user("Karl").await;

        let review = fx
            .access()
            .add_review(&headers, new_review("great product"))
            .await
            .unwrap();

        assert_eq!(review.text, "great product");
        assert_eq!(fx.owner_of(review.id).await, Some(karl));
        assert_eq!(fx.owned_by(karl).await, vec![review.id]);
    }

    #[tokio::test]
    async fn test_add_review_without_token_is_unauthenticated() {
        let fx = Fixture::new();

        let result = fx
            .access()
            .add_review(&HeaderMap::new(), new_review("anonymous"))
            .await;

        assert!(matches!(result, Err(ReviewError::Unauthenticated)));
        assert!(fx.access().most_used_words(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_review_for_unknown_user_is_unauthenticated() {
        let fx = Fixture::new();
        let headers = fx.bearer(&ProfileName::parse("Nobody").unwrap());

        let result = fx.access().add_review(&headers, new_review("hi")).await;

        assert!(matches!(result, Err(ReviewError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_add_review_with_garbage_token_is_unauthenticated() {
        let fx = Fixture::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer definitely.not.valid"),
        );

        let result = fx.access().add_review(&headers, new_review("hi")).await;

        assert!(matches!(result, Err(ReviewError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_edit_owned_review_preserves_id() {
        let fx = Fixture::new();
        let (karl, headers) = fx.user("Karl").await;
        let access = fx.access();
        let created = access
            .add_review(&headers, new_review("before"))
            .await
            .unwrap();

        let changes = ReviewChanges {
            text: Some("after".to_string()),
            score: Some(3),
            ..ReviewChanges::default()
        };
        let edited = access
            .edit_review(&headers, created.id, changes)
            .await
            .unwrap();

        assert_eq!(edited.id, created.id);
        assert_eq!(edited.text, "after");
        assert_eq!(edited.score, 3);
        assert_eq!(edited.summary, created.summary);
        assert_eq!(fx.review(created.id).await, Some(edited.clone()));
        assert_eq!(fx.owned_by(karl).await, vec![created.id]);
    }

    #[tokio::test]
    async fn test_edit_other_users_review_is_forbidden() {
        let fx = Fixture::new();
        let (_, karl) = fx.user("Karl").await;
        let (_, ann) = fx.user("Ann").await;
        let access = fx.access();

        let r1 = access.add_review(&karl, new_review("mine")).await.unwrap();
        let r2 = access.add_review(&ann, new_review("hers")).await.unwrap();

        let changes = ReviewChanges {
            text: Some("hijacked".to_string()),
            ..ReviewChanges::default()
        };
        let err = access.edit_review(&karl, r2.id, changes).await.unwrap_err();

        assert!(matches!(&err, ReviewError::Forbidden(_)));
        assert_eq!(
            err.to_string(),
            "wrong review id, you can't edit other users' reviews"
        );
        assert_eq!(fx.review(r2.id).await.unwrap().text, "hers");
        assert_eq!(fx.review(r1.id).await.unwrap().text, "mine");
    }

    #[tokio::test]
    async fn test_edit_unknown_review_is_forbidden() {
        let fx = Fixture::new();
        let (_, headers) = fx.user("Karl").await;

        let result = fx
            .access()
            .edit_review(&headers, ReviewId::new(42), ReviewChanges::default())
            .await;

        assert!(matches!(result, Err(ReviewError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_edit_without_token_is_unauthenticated() {
        let fx = Fixture::new();
        let (_, headers) = fx.user("Karl").await;
        let review = fx
            .access()
            .add_review(&headers, new_review("x"))
            .await
            .unwrap();

        let result = fx
            .access()
            .edit_review(&HeaderMap::new(), review.id, ReviewChanges::default())
            .await;

        assert!(matches!(result, Err(ReviewError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_delete_removes_review_and_ownership() {
        let fx = Fixture::new();
        let (karl, headers) = fx.user("Karl").await;
        let access = fx.access();
        let r1 = access.add_review(&headers, new_review("one")).await.unwrap();
        let r2 = access.add_review(&headers, new_review("two")).await.unwrap();

        let deleted = access
            .delete_review(&headers, &r1.id.to_string())
            .await
            .unwrap();

        assert!(deleted);
        assert!(fx.review(r1.id).await.is_none());
        assert_eq!(fx.owner_of(r1.id).await, None);
        assert_eq!(fx.owned_by(karl).await, vec![r2.id]);
    }

    #[tokio::test]
    async fn test_delete_twice_is_not_found() {
        let fx = Fixture::new();
        let (_, headers) = fx.user("Karl").await;
        let access = fx.access();
        let review = access.add_review(&headers, new_review("bye")).await.unwrap();
        let id = review.id.to_string();

        assert!(access.delete_review(&headers, &id).await.unwrap());

        let err = access.delete_review(&headers, &id).await.unwrap_err();
        assert!(matches!(&err, ReviewError::NotFound(_)));
        assert_eq!(err.to_string(), "there is no review with this id");
    }

    #[tokio::test]
    async fn test_delete_unparseable_id_is_not_found() {
        let fx = Fixture::new();
        let (_, headers) = fx.user("Karl").await;

        for id in ["abc", "", "1.5", "99999999999"] {
            let result = fx.access().delete_review(&headers, id).await;
            assert!(
                matches!(result, Err(ReviewError::NotFound(_))),
                "id {id:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_delete_other_users_review_is_forbidden() {
        let fx = Fixture::new();
        let (karl_id, karl) = fx.user("Karl").await;
        let (_, ann) = fx.user("Ann").await;
        let access = fx.access();
        let review = access.add_review(&karl, new_review("mine")).await.unwrap();

        let err = access
            .delete_review(&ann, &review.id.to_string())
            .await
            .unwrap_err();

        assert!(matches!(&err, ReviewError::Forbidden(_)));
        assert_eq!(err.to_string(), "you can't delete other users' reviews");
        assert!(fx.review(review.id).await.is_some());
        assert_eq!(fx.owner_of(review.id).await, Some(karl_id));
    }

    #[tokio::test]
    async fn test_delete_without_token_is_unauthenticated() {
        let fx = Fixture::new();
        let (_, headers) = fx.user("Karl").await;
        let review = fx
            .access()
            .add_review(&headers, new_review("x"))
            .await
            .unwrap();

        let result = fx
            .access()
            .delete_review(&HeaderMap::new(), &review.id.to_string())
            .await;

        assert!(matches!(result, Err(ReviewError::Unauthenticated)));
        assert!(fx.review(review.id).await.is_some());
    }

    #[tokio::test]
    async fn test_most_used_words_counts_across_reviews() {
        let fx = Fixture::new();
        let (_, headers) = fx.user("Karl").await;
        let access = fx.access();
        access
            .add_review(&headers, new_review("great product"))
            .await
            .unwrap();
        access
            .add_review(&headers, new_review("great service"))
            .await
            .unwrap();

        let words = access.most_used_words(Some("10")).await.unwrap();

        assert_eq!(
            words,
            vec![
                WordCount::new("great", 2),
                WordCount::new("product", 1),
                WordCount::new("service", 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_most_used_words_respects_limit() {
        let fx = Fixture::new();
        let (_, headers) = fx.user("Karl").await;
        let access = fx.access();
        access
            .add_review(&headers, new_review("a b c d e f"))
            .await
            .unwrap();

        assert!(access.most_used_words(Some("0")).await.unwrap().is_empty());
        assert_eq!(access.most_used_words(Some("4")).await.unwrap().len(), 4);
        assert_eq!(access.most_used_words(None).await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_most_used_words_blank_limit_uses_default() {
        let fx = Fixture::new();
        let (_, headers) = fx.user("Karl").await;
        let access = fx.access();
        access
            .add_review(&headers, new_review("a b c"))
            .await
            .unwrap();

        assert_eq!(access.most_used_words(Some("")).await.unwrap().len(), 3);
        assert_eq!(access.most_used_words(Some("  ")).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_most_used_words_rejects_malformed_limit() {
        let fx = Fixture::new();

        for limit in ["ten", "-1", "2.5", "1 0"] {
            let result = fx.access().most_used_words(Some(limit)).await;
            assert!(
                matches!(result, Err(ReviewError::InvalidArgument(_))),
                "limit {limit:?}"
            );
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutations_keep_ownership_in_sync() {
        use std::sync::Arc;

        const REVIEWS: i32 = 20;

        let fx = Arc::new(Fixture::new());
        let (user_id, headers) = fx.user("Karl").await;

        let adds: Vec<_> = (0..REVIEWS)
            .map(|i| {
                let fx = Arc::clone(&fx);
                let headers = headers.clone();
                tokio::spawn(async move {
                    fx.access()
                        .add_review(&headers, new_review(&format!("added{i}")))
                        .await
                        .map(|review| review.id)
                })
            })
            .collect();

        let mut ids = Vec::new();
        for add in adds {
            ids.push(add.await.unwrap().unwrap());
        }
        ids.sort();
        assert_eq!(fx.owned_by(user_id).await, ids);

        let (kept, dropped): (Vec<_>, Vec<_>) =
            ids.iter().copied().partition(|id| id.as_i32() % 2 == 1);

        let mut tasks = Vec::new();
        for &id in &dropped {
            let fx = Arc::clone(&fx);
            let headers = headers.clone();
            tasks.push(tokio::spawn(async move {
                fx.access()
                    .delete_review(&headers, &id.to_string())
                    .await
                    .map(|_| ())
            }));
        }
        for &id in &kept {
            let fx = Arc::clone(&fx);
            let headers = headers.clone();
            tasks.push(tokio::spawn(async move {
                let changes = ReviewChanges {
                    text: Some(format!("edited{id}")),
                    ..ReviewChanges::default()
                };
                fx.access()
                    .edit_review(&headers, id, changes)
                    .await
                    .map(|_| ())
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(fx.owned_by(user_id).await, kept);
        for &id in &dropped {
            assert_eq!(fx.review(id).await, None);
            assert_eq!(fx.owner_of(id).await, None);
        }
        for &id in &kept {
            assert_eq!(fx.review(id).await.unwrap().text, format!("edited{id}"));
            assert_eq!(fx.owner_of(id).await, Some(user_id));
        }

        let words = fx.access().most_used_words(None).await.unwrap();
        assert_eq!(words.len(), kept.len());
        assert!(words.iter().all(|w| w.word.starts_with("edited")));
    }
}
