// handlers/protected/portfolio/create.rs - POST /api/portfolios handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::database::models::portfolio::{NewPortfolio, PortfolioView};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// POST /api/portfolios - create a portfolio owned by the caller
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<NewPortfolio>, JsonRejection>,
) -> ApiResult<PortfolioView> {
    let Json(mut new) = body?;

    if new.title.trim().is_empty() {
        return Err(ApiError::invalid_field("title", "must not be empty"));
    }
    new.owner_id = user.user_id;

    let portfolio = state.store.insert(new, state.clock.now()).await?;
    tracing::info!("Portfolio {} created by {}", portfolio.id, portfolio.owner_id);

    Ok(ApiResponse::created(PortfolioView::from(portfolio)))
}
