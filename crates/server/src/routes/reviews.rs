//! Review route handlers.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::HeaderMap,
};
use serde::Deserialize;
use tracing::{debug, instrument};

use review_desk_core::{NewReview, Review, ReviewChanges, ReviewId, WordCount};

use crate::error::Result;
use crate::state::AppState;

/// Body of `PUT /reviews/current-review`: the target id plus the fields to change.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditReviewRequest {
    pub review_id: ReviewId,
    #[serde(flatten)]
    pub changes: ReviewChanges,
}

/// Query parameters of `GET /reviews/most-used-words`.
#[derive(Debug, Deserialize)]
pub struct MostUsedWordsParams {
    pub limit: Option<String>,
}

/// GET /reviews/most-used-words - Word counts across all reviews.
#[instrument(skip(state))]
pub async fn most_used_words(
    State(state): State<AppState>,
    params: std::result::Result<Query<MostUsedWordsParams>, QueryRejection>,
) -> Result<Json<Vec<WordCount>>> {
    let Query(params) = params?;
    let words = state
        .reviews()
        .most_used_words(params.limit.as_deref())
        .await?;
    Ok(Json(words))
}

/// POST /reviews - Create a review owned by the requester.
#[instrument(skip_all)]
pub async fn add_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<NewReview>, JsonRejection>,
) -> Result<Json<Review>> {
    let Json(review) = payload?;
    let review = state.reviews().add_review(&headers, review).await?;
    Ok(Json(review))
}

/// PUT /reviews/current-review - Edit one of the requester's reviews.
#[instrument(skip_all)]
pub async fn edit_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<EditReviewRequest>, JsonRejection>,
) -> Result<Json<Review>> {
    let Json(request) = payload?;
    if request.changes.is_empty() {
        debug!(review_id = %request.review_id, "Edit request carries no changes");
    }

    let review = state
        .reviews()
        .edit_review(&headers, request.review_id, request.changes)
        .await?;
    Ok(Json(review))
}

/// DELETE /reviews/{id} - Delete one of the requester's reviews.
#[instrument(skip(state, headers))]
pub async fn delete_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<bool>> {
    let deleted = state.reviews().delete_review(&headers, &id).await?;
    Ok(Json(deleted))
}
