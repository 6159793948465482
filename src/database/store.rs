use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::database::manager::DatabaseError;
use crate::database::models::portfolio::{NewPortfolio, Portfolio, PortfolioChanges};

/// Persistence seam for portfolios.
///
/// `increment_views` is the only operation that may change `views` or
/// `view_counted_at`. Implementations must apply it atomically: the optional
/// idle check and the increment happen as one step, so concurrent callers
/// never lose or duplicate an update.
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    /// Connectivity check for `/health`
    async fn ping(&self) -> Result<(), DatabaseError>;

    async fn find(&self, id: &str) -> Result<Option<Portfolio>, DatabaseError>;

    /// Published portfolios, newest first
    async fn list_published(&self, limit: i64, offset: i64) -> Result<Vec<Portfolio>, DatabaseError>;

    async fn insert(&self, new: NewPortfolio, now: DateTime<Utc>) -> Result<Portfolio, DatabaseError>;

    /// Apply a content edit. Returns `None` when the id is unknown.
    async fn update_content(
        &self,
        id: &str,
        changes: PortfolioChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Portfolio>, DatabaseError>;

    /// Add one view and stamp `view_counted_at = now`.
    ///
    /// With `idle_before = Some(cutoff)` the update only applies when the last
    /// counted view is unset or not after `cutoff`. Returns the new count, or
    /// `None` when nothing was updated.
    async fn increment_views(
        &self,
        id: &str,
        now: DateTime<Utc>,
        idle_before: Option<DateTime<Utc>>,
    ) -> Result<Option<i64>, DatabaseError>;
}
