use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::portfolio::{
    encode_list, NewPortfolio, Portfolio, PortfolioChanges, PortfolioRow,
};
use crate::database::store::PortfolioStore;

/// Column list shared by every read; `p` is the portfolio row, `u` the joined owner.
const PORTFOLIO_COLUMNS: &str = "p.id, p.owner_id, u.name AS owner_name, p.title, p.description, \
     p.content, p.images, p.tags, p.views, p.published, p.created_at, p.updated_at, p.view_counted_at";

/// PostgreSQL-backed store. Table layout lives in `sql/portfolios.sql`.
#[derive(Clone)]
pub struct PgPortfolioStore {
    pool: PgPool,
}

impl PgPortfolioStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PortfolioStore for PgPortfolioStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<Portfolio>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM portfolios p LEFT JOIN users u ON u.id = p.owner_id WHERE p.id = $1",
            PORTFOLIO_COLUMNS
        );
        let row = sqlx::query_as::<_, PortfolioRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Portfolio::from))
    }

    async fn list_published(&self, limit: i64, offset: i64) -> Result<Vec<Portfolio>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM portfolios p LEFT JOIN users u ON u.id = p.owner_id \
             WHERE p.published ORDER BY p.created_at DESC, p.id LIMIT $1 OFFSET $2",
            PORTFOLIO_COLUMNS
        );
        let rows = sqlx::query_as::<_, PortfolioRow>(&sql)
            .bind(limit.max(0))
            .bind(offset.max(0))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Portfolio::from).collect())
    }

    async fn insert(&self, new: NewPortfolio, now: DateTime<Utc>) -> Result<Portfolio, DatabaseError> {
        let sql = format!(
            "WITH p AS ( \
                INSERT INTO portfolios \
                    (id, owner_id, title, description, content, images, tags, views, published, created_at, updated_at) \
                VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9, $9) \
                RETURNING * \
             ) SELECT {} FROM p LEFT JOIN users u ON u.id = p.owner_id",
            PORTFOLIO_COLUMNS
        );
        let row = sqlx::query_as::<_, PortfolioRow>(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(&new.owner_id)
            .bind(&new.title)
            .bind(&new.description)
            .bind(&new.content)
            .bind(encode_list(&new.images))
            .bind(encode_list(&new.tags))
            .bind(new.published)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        Ok(Portfolio::from(row))
    }

    async fn update_content(
        &self,
        id: &str,
        changes: PortfolioChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Portfolio>, DatabaseError> {
        // view_counted_at stays untouched: edits never move the view gate
        let sql = format!(
            "WITH p AS ( \
                UPDATE portfolios SET \
                    title = COALESCE($2, title), \
                    description = COALESCE($3, description), \
                    content = COALESCE($4, content), \
                    images = COALESCE($5, images), \
                    tags = COALESCE($6, tags), \
                    published = COALESCE($7, published), \
                    updated_at = $8 \
                WHERE id = $1 \
                RETURNING * \
             ) SELECT {} FROM p LEFT JOIN users u ON u.id = p.owner_id",
            PORTFOLIO_COLUMNS
        );
        let row = sqlx::query_as::<_, PortfolioRow>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.content)
            .bind(changes.images.as_deref().map(encode_list))
            .bind(changes.tags.as_deref().map(encode_list))
            .bind(changes.published)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Portfolio::from))
    }

    async fn increment_views(
        &self,
        id: &str,
        now: DateTime<Utc>,
        idle_before: Option<DateTime<Utc>>,
    ) -> Result<Option<i64>, DatabaseError> {
        let views = sqlx::query_scalar::<_, i64>(
            "UPDATE portfolios SET views = views + 1, view_counted_at = $2 \
             WHERE id = $1 \
               AND ($3::timestamptz IS NULL OR view_counted_at IS NULL OR view_counted_at <= $3) \
             RETURNING views",
        )
        .bind(id)
        .bind(now)
        .bind(idle_before)
        .fetch_optional(&self.pool)
        .await?;
        Ok(views)
    }
}
