use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Portfolio row as stored: list columns are JSON-encoded text
#[derive(Debug, Clone, FromRow)]
pub struct PortfolioRow {
    pub id: String,
    pub owner_id: String,
    pub owner_name: Option<String>,
    pub title: String,
    pub description: String,
    pub content: String,
    pub images: String,
    pub tags: String,
    pub views: i64,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub view_counted_at: Option<DateTime<Utc>>,
}

/// Portfolio with list fields decoded
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub id: String,
    pub owner_id: String,
    pub owner_name: Option<String>,
    pub title: String,
    pub description: String,
    pub content: String,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub views: i64,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Last time a view was counted. Content edits never touch it.
    pub view_counted_at: Option<DateTime<Utc>>,
}

impl From<PortfolioRow> for Portfolio {
    fn from(row: PortfolioRow) -> Self {
        let images = decode_list(&row.id, "images", &row.images);
        let tags = decode_list(&row.id, "tags", &row.tags);
        Self {
            id: row.id,
            owner_id: row.owner_id,
            owner_name: row.owner_name,
            title: row.title,
            description: row.description,
            content: row.content,
            images,
            tags,
            views: row.views,
            published: row.published,
            created_at: row.created_at,
            updated_at: row.updated_at,
            view_counted_at: row.view_counted_at,
        }
    }
}

/// Decode a JSON-encoded string list; malformed values degrade to an empty list
pub fn decode_list(id: &str, column: &str, raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(list) => list,
        Err(e) => {
            tracing::warn!("Portfolio {} has malformed {} column: {}", id, column, e);
            Vec::new()
        }
    }
}

/// Encode a string list for a text column
pub fn encode_list(list: &[String]) -> String {
    serde_json::to_string(list).unwrap_or_else(|_| "[]".to_string())
}

/// Fields accepted when creating a portfolio
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPortfolio {
    #[serde(skip)]
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published: bool,
}

/// Partial content edit; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub images: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub published: Option<bool>,
}

impl PortfolioChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.content.is_none()
            && self.images.is_none()
            && self.tags.is_none()
            && self.published.is_none()
    }

    /// Apply the edit in place
    pub fn apply(self, portfolio: &mut Portfolio, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            portfolio.title = title;
        }
        if let Some(description) = self.description {
            portfolio.description = description;
        }
        if let Some(content) = self.content {
            portfolio.content = content;
        }
        if let Some(images) = self.images {
            portfolio.images = images;
        }
        if let Some(tags) = self.tags {
            portfolio.tags = tags;
        }
        if let Some(published) = self.published {
            portfolio.published = published;
        }
        portfolio.updated_at = now;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnerSummary {
    pub id: String,
    pub name: Option<String>,
}

/// Public shape of a portfolio in API responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub views: i64,
    pub published: bool,
    pub owner: OwnerSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Portfolio> for PortfolioView {
    fn from(p: Portfolio) -> Self {
        Self {
            id: p.id,
            title: p.title,
            description: p.description,
            content: p.content,
            images: p.images,
            tags: p.tags,
            views: p.views,
            published: p.published,
            owner: OwnerSummary {
                id: p.owner_id,
                name: p.owner_name,
            },
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}
