//! In-memory store.
//!
//! A transaction holds the store's mutex for its whole lifetime and works on
//! a copy of the data, so transactions are fully serialized and a dropped
//! transaction leaves no trace.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use review_desk_core::words::count_words;
use review_desk_core::{NewReview, ProfileName, Review, ReviewId, User, UserId, WordCount};

use super::{ReviewStore, Store, StoreError, StoreTransaction, UserStore};

#[derive(Debug, Clone, Default)]
struct MemoryData {
    last_user_id: i32,
    last_review_id: i32,
    users: BTreeMap<UserId, ProfileName>,
    reviews: BTreeMap<ReviewId, Review>,
    owners: BTreeMap<ReviewId, UserId>,
}

impl MemoryData {
    fn load_user(&self, id: UserId) -> Option<User> {
        let profile_name = self.users.get(&id)?.clone();
        let owned = self
            .owners
            .iter()
            .filter(|(_, owner)| **owner == id)
            .filter_map(|(review_id, _)| self.reviews.get(review_id).cloned());
        Some(User::with_reviews(id, profile_name, owned))
    }
}

/// Process-local store.
///
/// Cheap to clone; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<MemoryData>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let guard = Arc::clone(&self.data).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

/// Transaction over a [`MemoryStore`].
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryData>,
    working: MemoryData,
}

#[async_trait]
impl UserStore for MemoryTransaction {
    async fn find_user_by_profile_name(
        &mut self,
        profile_name: &ProfileName,
    ) -> Result<Option<User>, StoreError> {
        let id = self
            .working
            .users
            .iter()
            .find(|(_, name)| *name == profile_name)
            .map(|(id, _)| *id);
        Ok(id.and_then(|id| self.working.load_user(id)))
    }

    async fn find_user_by_id(&mut self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.working.load_user(id))
    }

    async fn find_owner_of_review(
        &mut self,
        review_id: ReviewId,
    ) -> Result<Option<UserId>, StoreError> {
        Ok(self.working.owners.get(&review_id).copied())
    }

    async fn save_user(&mut self, user: &User) -> Result<(), StoreError> {
        let data = &mut self.working;

        if !data.users.contains_key(&user.id) {
            return Err(StoreError::NotFound);
        }

        for review_id in user.review_ids() {
            if !data.reviews.contains_key(&review_id) {
                return Err(StoreError::NotFound);
            }
            if let Some(owner) = data.owners.get(&review_id)
                && *owner != user.id
            {
                return Err(StoreError::Conflict(format!(
                    "review {review_id} is owned by another user"
                )));
            }
        }

        data.owners
            .retain(|review_id, owner| *owner != user.id || user.owns(*review_id));
        for review_id in user.review_ids() {
            data.owners.insert(review_id, user.id);
        }

        Ok(())
    }

    async fn create_user(&mut self, profile_name: &ProfileName) -> Result<User, StoreError> {
        let data = &mut self.working;

        if data.users.values().any(|name| name == profile_name) {
            return Err(StoreError::Conflict(
                "profile name already exists".to_owned(),
            ));
        }

        data.last_user_id += 1;
        let id = UserId::new(data.last_user_id);
        data.users.insert(id, profile_name.clone());

        Ok(User::new(id, profile_name.clone()))
    }
}

#[async_trait]
impl ReviewStore for MemoryTransaction {
    async fn find_review_by_id(&mut self, id: ReviewId) -> Result<Option<Review>, StoreError> {
        Ok(self.working.reviews.get(&id).cloned())
    }

    async fn insert_review(&mut self, review: &NewReview) -> Result<Review, StoreError> {
        let data = &mut self.working;
        data.last_review_id += 1;

        let review = review
            .clone()
            .into_review(ReviewId::new(data.last_review_id), Utc::now());
        data.reviews.insert(review.id, review.clone());

        Ok(review)
    }

    async fn save_review(&mut self, review: &Review) -> Result<(), StoreError> {
        let slot = self
            .working
            .reviews
            .get_mut(&review.id)
            .ok_or(StoreError::NotFound)?;
        *slot = review.clone();
        Ok(())
    }

    async fn delete_review_by_id(&mut self, id: ReviewId) -> Result<bool, StoreError> {
        self.working.owners.remove(&id);
        Ok(self.working.reviews.remove(&id).is_some())
    }

    async fn word_frequencies(&mut self) -> Result<Vec<WordCount>, StoreError> {
        Ok(count_words(
            self.working.reviews.values().map(|r| r.text.as_str()),
        ))
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_review(text: &str) -> NewReview {
        NewReview {
            product_id: "B006K2ZZ7K".to_string(),
            summary: "Nice Taffy".to_string(),
            text: text.to_string(),
            score: 5,
            helpfulness_numerator: 0,
            helpfulness_denominator: 0,
        }
    }

    fn name(s: &str) -> ProfileName {
        ProfileName::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_commit_makes_changes_visible() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let user = tx.create_user(&name("Karl")).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let found = tx.find_user_by_profile_name(&name("Karl")).await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn test_dropped_transaction_is_discarded() {
        let store = MemoryStore::new();

        {
            let mut tx = store.begin().await.unwrap();
            tx.create_user(&name("Karl")).await.unwrap();
            tx.insert_review(&new_review("gone")).await.unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        assert!(
            tx.find_user_by_profile_name(&name("Karl"))
                .await
                .unwrap()
                .is_none()
        );
        assert!(tx.word_frequencies().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_assigned_sequentially() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let first = tx.insert_review(&new_review("one")).await.unwrap();
        let second = tx.insert_review(&new_review("two")).await.unwrap();

        assert_eq!(first.id, ReviewId::new(1));
        assert_eq!(second.id, ReviewId::new(2));
    }

    #[tokio::test]
    async fn test_save_user_links_and_unlinks_reviews() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let mut user = tx.create_user(&name("Karl")).await.unwrap();
        let review = tx.insert_review(&new_review("great taffy")).await.unwrap();

        user.own(review.clone());
        tx.save_user(&user).await.unwrap();
        assert_eq!(
            tx.find_owner_of_review(review.id).await.unwrap(),
            Some(user.id)
        );

        user.disown(review.id);
        tx.save_user(&user).await.unwrap();
        assert_eq!(tx.find_owner_of_review(review.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_user_rejects_review_owned_by_someone_else() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let mut karl = tx.create_user(&name("Karl")).await.unwrap();
        let mut ann = tx.create_user(&name("Ann")).await.unwrap();
        let review = tx.insert_review(&new_review("mine")).await.unwrap();

        karl.own(review.clone());
        tx.save_user(&karl).await.unwrap();

        ann.own(review);
        assert!(matches!(
            tx.save_user(&ann).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_name() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        tx.create_user(&name("Karl")).await.unwrap();
        assert!(matches!(
            tx.create_user(&name("Karl")).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_find_user_loads_owned_reviews() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let mut user = tx.create_user(&name("Karl")).await.unwrap();
        let review = tx.insert_review(&new_review("chewy")).await.unwrap();
        user.own(review.clone());
        tx.save_user(&user).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let loaded = tx.find_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(loaded.owned_review(review.id), Some(&review));
    }

    #[tokio::test]
    async fn test_delete_review_clears_ownership() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let mut user = tx.create_user(&name("Karl")).await.unwrap();
        let review = tx.insert_review(&new_review("bye")).await.unwrap();
        user.own(review.clone());
        tx.save_user(&user).await.unwrap();

        assert!(tx.delete_review_by_id(review.id).await.unwrap());
        assert!(!tx.delete_review_by_id(review.id).await.unwrap());
        assert_eq!(tx.find_owner_of_review(review.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_review_missing() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let review = new_review("ghost").into_review(ReviewId::new(99), Utc::now());
        assert!(matches!(
            tx.save_review(&review).await,
            Err(StoreError::NotFound)
        ));
    }
}
