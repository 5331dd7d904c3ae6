//! JSON API under `/api/v1`.
//!
//! One module per resource. Reads are public unless stated; writes take a
//! [`CurrentUser`](crate::auth::CurrentUser).

pub mod amenities;
pub mod categories;
pub mod experiences;
pub mod medias;
pub mod perks;
pub mod rooms;
pub mod users;
pub mod wishlists;

use crate::persistence::{Page, StoreError};
use crate::server::state::AppState;
use crate::types::{
    CategoryId, CategoryKind, Listing, PublicUser, Review, ReviewDraft, ReviewId, User, UserId,
};
use serde::Serialize;
use stayhub_web::{AppError, PageQuery};

/// Message for writes by anyone but the record's owner.
const NOT_ALLOWED: &str = "You do not have permission to perform this action.";

/// Window for the requested page of a paginated list.
fn page(state: &AppState, query: PageQuery) -> Page {
    Page::new(query.0, state.page_size())
}

/// `403` unless `user` is `owner`.
fn ensure_owner(owner: UserId, user: &User) -> Result<(), AppError> {
    if owner == user.pk {
        Ok(())
    } else {
        Err(AppError::forbidden(NOT_ALLOWED))
    }
}

/// Resolve the category a listing is filed under; it must exist and be of `kind`.
async fn category_of_kind(
    state: &AppState,
    pk: Option<CategoryId>,
    kind: CategoryKind,
) -> Result<CategoryId, AppError> {
    let invalid =
        |message: String| AppError::bad_request(message.clone()).with_field("category", message);

    let pk = pk.ok_or_else(|| invalid("Category is required.".to_string()))?;
    let category = match state.repositories.catalog.category(pk).await {
        Ok(category) => category,
        Err(StoreError::NotFound { .. }) => return Err(invalid("Category Not Found".to_string())),
        Err(other) => return Err(other.into()),
    };

    if category.kind != kind {
        return Err(invalid(format!(
            "The Category kind should be '{}'",
            kind.as_str()
        )));
    }
    Ok(category.pk)
}

/// A review as returned over HTTP, with its author's public profile.
#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    /// Primary key
    pub pk: ReviewId,
    /// Author
    pub user: PublicUser,
    /// Text
    pub payload: String,
    /// 1 to 5
    pub rating: i32,
}

async fn review_response(state: &AppState, review: Review) -> Result<ReviewResponse, AppError> {
    let author = state.repositories.users.user(review.user).await?;
    Ok(ReviewResponse {
        pk: review.pk,
        user: (&author).into(),
        payload: review.payload,
        rating: review.rating,
    })
}

/// One page of a listing's reviews, newest first.
async fn list_reviews(
    state: &AppState,
    listing: Listing,
    query: PageQuery,
) -> Result<Vec<ReviewResponse>, AppError> {
    let reviews = state
        .repositories
        .reviews
        .reviews(listing, page(state, query))
        .await?;

    let mut responses = Vec::with_capacity(reviews.len());
    for review in reviews {
        responses.push(review_response(state, review).await?);
    }
    Ok(responses)
}

/// Validate and store a review by `user`.
async fn add_review(
    state: &AppState,
    listing: Listing,
    user: &User,
    draft: ReviewDraft,
) -> Result<ReviewResponse, AppError> {
    if !(1..=5).contains(&draft.rating) {
        return Err(AppError::invalid_field(
            "rating",
            "Rating must be between 1 and 5",
        ));
    }
    if draft.payload.trim().is_empty() {
        return Err(AppError::invalid_field("payload", "This field may not be blank."));
    }

    let review = state
        .repositories
        .reviews
        .add_review(listing, user.pk, draft)
        .await?;
    tracing::info!(review = %review.pk, ?listing, "Review added");
    review_response(state, review).await
}
