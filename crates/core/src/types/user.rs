//! User domain type and its owned-review bookkeeping.

use std::collections::BTreeMap;

use super::{ProfileName, Review, ReviewId, UserId};

/// A reviewer and the reviews they own.
///
/// Owned reviews are keyed by review id, so replacing an edited review is a
/// plain insert over the existing entry. A review id appears in at most one
/// user's map; the stores enforce that on persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Name the user is known by; bearer tokens resolve to it.
    pub profile_name: ProfileName,
    reviews: BTreeMap<ReviewId, Review>,
}

impl User {
    /// Create a user that owns no reviews yet.
    #[must_use]
    pub const fn new(id: UserId, profile_name: ProfileName) -> Self {
        Self {
            id,
            profile_name,
            reviews: BTreeMap::new(),
        }
    }

    /// Create a user with an existing set of owned reviews.
    #[must_use]
    pub fn with_reviews(
        id: UserId,
        profile_name: ProfileName,
        reviews: impl IntoIterator<Item = Review>,
    ) -> Self {
        Self {
            id,
            profile_name,
            reviews: reviews.into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    /// The owned review with the given id, if any.
    #[must_use]
    pub fn owned_review(&self, id: ReviewId) -> Option<&Review> {
        self.reviews.get(&id)
    }

    /// Whether the user owns the review.
    #[must_use]
    pub fn owns(&self, id: ReviewId) -> bool {
        self.reviews.contains_key(&id)
    }

    /// Add or replace an owned review. Returns the previous value.
    pub fn own(&mut self, review: Review) -> Option<Review> {
        self.reviews.insert(review.id, review)
    }

    /// Drop a review from the owned set. Returns it if it was owned.
    pub fn disown(&mut self, id: ReviewId) -> Option<Review> {
        self.reviews.remove(&id)
    }

    /// Owned review ids in ascending order.
    #[must_use]
    pub fn review_ids(&self) -> Vec<ReviewId> {
        self.reviews.keys().copied().collect()
    }

    /// Number of owned reviews.
    #[must_use]
    pub fn review_count(&self) -> usize {
        self.reviews.len()
    }
}
