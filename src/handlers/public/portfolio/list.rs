// handlers/public/portfolio/list.rs - GET /api/portfolios handler

use axum::extract::{Query, State};
use serde::Deserialize;

use crate::database::models::portfolio::PortfolioView;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/portfolios - published portfolios, newest first. Listing never counts views.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<PortfolioView>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if limit < 1 {
        return Err(ApiError::invalid_field("limit", "must be at least 1"));
    }
    let offset = query.offset.unwrap_or(0);
    if offset < 0 {
        return Err(ApiError::invalid_field("offset", "must not be negative"));
    }

    let portfolios = state
        .store
        .list_published(limit.min(state.max_list_limit), offset)
        .await?;

    Ok(ApiResponse::success(
        portfolios.into_iter().map(PortfolioView::from).collect(),
    ))
}
