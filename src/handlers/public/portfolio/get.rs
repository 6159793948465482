// handlers/public/portfolio/get.rs - GET /api/portfolios/:id handler

use axum::extract::{Path, State};

use crate::database::models::portfolio::PortfolioView;
use crate::middleware::{ApiResponse, ApiResult, Viewer};
use crate::state::AppState;

/// GET /api/portfolios/:id - show one portfolio and count the view.
///
/// Credentials are optional here. The view counter is updated in the
/// background; the response carries the count as loaded.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Viewer(viewer): Viewer,
) -> ApiResult<PortfolioView> {
    let fetched = state.views.fetch(&id, &viewer).await?;

    // Dropping the handle detaches the increment task
    drop(fetched.recording);

    Ok(ApiResponse::success(PortfolioView::from(fetched.portfolio)))
}
