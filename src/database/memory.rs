use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::portfolio::{NewPortfolio, Portfolio, PortfolioChanges};
use crate::database::store::PortfolioStore;

/// Process-local store used for development and tests.
///
/// Every mutation takes the write lock, which serializes increments per store.
#[derive(Default)]
pub struct MemoryPortfolioStore {
    portfolios: RwLock<HashMap<String, Portfolio>>,
    user_names: RwLock<HashMap<String, String>>,
}

impl MemoryPortfolioStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a display name joined onto portfolios owned by `user_id`
    pub async fn register_user(&self, user_id: &str, name: &str) {
        self.user_names
            .write()
            .await
            .insert(user_id.to_string(), name.to_string());
    }

    /// Insert a fully-formed portfolio, replacing any row with the same id
    pub async fn put(&self, portfolio: Portfolio) {
        self.portfolios
            .write()
            .await
            .insert(portfolio.id.clone(), portfolio);
    }

    async fn with_owner_name(&self, mut portfolio: Portfolio) -> Portfolio {
        if portfolio.owner_name.is_none() {
            portfolio.owner_name = self.user_names.read().await.get(&portfolio.owner_id).cloned();
        }
        portfolio
    }
}

#[async_trait]
impl PortfolioStore for MemoryPortfolioStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<Portfolio>, DatabaseError> {
        let found = self.portfolios.read().await.get(id).cloned();
        match found {
            Some(p) => Ok(Some(self.with_owner_name(p).await)),
            None => Ok(None),
        }
    }

    async fn list_published(&self, limit: i64, offset: i64) -> Result<Vec<Portfolio>, DatabaseError> {
        let mut published: Vec<Portfolio> = self
            .portfolios
            .read()
            .await
            .values()
            .filter(|p| p.published)
            .cloned()
            .collect();
        published.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        let mut page = Vec::new();
        for p in published
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
        {
            page.push(self.with_owner_name(p).await);
        }
        Ok(page)
    }

    async fn insert(&self, new: NewPortfolio, now: DateTime<Utc>) -> Result<Portfolio, DatabaseError> {
        let portfolio = Portfolio {
            id: Uuid::new_v4().to_string(),
            owner_id: new.owner_id,
            owner_name: None,
            title: new.title,
            description: new.description,
            content: new.content,
            images: new.images,
            tags: new.tags,
            views: 0,
            published: new.published,
            created_at: now,
            updated_at: now,
            view_counted_at: None,
        };
        self.portfolios
            .write()
            .await
            .insert(portfolio.id.clone(), portfolio.clone());
        Ok(self.with_owner_name(portfolio).await)
    }

    async fn update_content(
        &self,
        id: &str,
        changes: PortfolioChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Portfolio>, DatabaseError> {
        let updated = {
            let mut portfolios = self.portfolios.write().await;
            match portfolios.get_mut(id) {
                Some(p) => {
                    changes.apply(p, now);
                    p.clone()
                }
                None => return Ok(None),
            }
        };
        Ok(Some(self.with_owner_name(updated).await))
    }

    async fn increment_views(
        &self,
        id: &str,
        now: DateTime<Utc>,
        idle_before: Option<DateTime<Utc>>,
    ) -> Result<Option<i64>, DatabaseError> {
        let mut portfolios = self.portfolios.write().await;
        let Some(p) = portfolios.get_mut(id) else {
            return Ok(None);
        };

        if let (Some(cutoff), Some(last)) = (idle_before, p.view_counted_at) {
            if last > cutoff {
                return Ok(None);
            }
        }

        p.views += 1;
        p.view_counted_at = Some(now);
        Ok(Some(p.views))
    }
}
