//! Review domain types.
//!
//! A [`Review`] is what the stores hand out and what the API returns.
//! [`NewReview`] is the payload of the add operation (no id yet) and
//! [`ReviewChanges`] is the partial payload of the edit operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ReviewId;

/// A stored product review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Assigned by the store on insert, never changed afterwards.
    pub id: ReviewId,
    /// Identifier of the reviewed product (e.g. an ASIN).
    pub product_id: String,
    /// One-line summary.
    pub summary: String,
    /// Full review text; the input to word statistics.
    pub text: String,
    /// Star rating.
    pub score: i16,
    /// Number of readers who found the review helpful.
    pub helpfulness_numerator: i32,
    /// Number of readers who voted on helpfulness.
    pub helpfulness_denominator: i32,
    /// When the review was created.
    pub created_at: DateTime<Utc>,
    /// When the review was last edited.
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub product_id: String,
    #[serde(default)]
    pub summary: String,
    pub text: String,
    pub score: i16,
    #[serde(default)]
    pub helpfulness_numerator: i32,
    #[serde(default)]
    pub helpfulness_denominator: i32,
}

impl NewReview {
    /// Materialize the payload as a review with the given id and timestamp.
    #[must_use]
    pub fn into_review(self, id: ReviewId, now: DateTime<Utc>) -> Review {
        Review {
            id,
            product_id: self.product_id,
            summary: self.summary,
            text: self.text,
            score: self.score,
            helpfulness_numerator: self.helpfulness_numerator,
            helpfulness_denominator: self.helpfulness_denominator,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a review. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helpfulness_numerator: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helpfulness_denominator: Option<i32>,
}

impl ReviewChanges {
    /// Returns `true` if no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.product_id.is_none()
            && self.summary.is_none()
            && self.text.is_none()
            && self.score.is_none()
            && self.helpfulness_numerator.is_none()
            && self.helpfulness_denominator.is_none()
    }

    /// Apply the changes onto `review`, keeping its id and creation time.
    pub fn apply(self, review: &mut Review, now: DateTime<Utc>) {
        if let Some(product_id) = self.product_id {
            review.product_id = product_id;
        }
        if let Some(summary) = self.summary {
            review.summary = summary;
        }
        if let Some(text) = self.text {
            review.text = text;
        }
        if let Some(score) = self.score {
            review.score = score;
        }
        if let Some(numerator) = self.helpfulness_numerator {
            review.helpfulness_numerator = numerator;
        }
        if let Some(denominator) = self.helpfulness_denominator {
            review.helpfulness_denominator = denominator;
        }
        review.updated_at = now;
    }
}
