// handlers/protected/portfolio/update.rs - PUT /api/portfolios/:id handler

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use crate::database::models::portfolio::{PortfolioChanges, PortfolioView};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// PUT /api/portfolios/:id - edit content fields (owner only).
///
/// Edits bump `updatedAt` and leave the view counter and its cooldown alone.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    body: Result<Json<PortfolioChanges>, JsonRejection>,
) -> ApiResult<PortfolioView> {
    let Json(changes) = body?;

    if changes.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }
    if matches!(&changes.title, Some(title) if title.trim().is_empty()) {
        return Err(ApiError::invalid_field("title", "must not be empty"));
    }

    let existing = state
        .store
        .find(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Portfolio not found"))?;

    if existing.owner_id != user.user_id {
        // Drafts stay invisible to non-owners, even on the write path
        if !existing.published {
            return Err(ApiError::not_found("Portfolio not found"));
        }
        return Err(ApiError::forbidden("Only the owner can edit this portfolio"));
    }

    let updated = state
        .store
        .update_content(&id, changes, state.clock.now())
        .await?
        .ok_or_else(|| ApiError::not_found("Portfolio not found"))?;

    Ok(ApiResponse::success(PortfolioView::from(updated)))
}
