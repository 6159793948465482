#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use folio_api::auth::encode_credential;
use folio_api::config::{AppConfig, GateScope};
use folio_api::database::models::portfolio::Portfolio;
use folio_api::database::{MemoryPortfolioStore, PortfolioStore};
use folio_api::server::app;
use folio_api::state::AppState;
use folio_api::views::ManualClock;

/// In-process server backed by the memory store and a manual clock
pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryPortfolioStore>,
    pub clock: Arc<ManualClock>,
    pub client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_server() -> Result<TestServer> {
    spawn_server_with(GateScope::Resource).await
}

pub async fn spawn_server_with(scope: GateScope) -> Result<TestServer> {
    // Pick an unused port for isolation
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let base_url = format!("http://127.0.0.1:{}", port);

    let mut config = AppConfig::development();
    config.views.gate_scope = scope;

    let store = Arc::new(MemoryPortfolioStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let state = AppState::new(store.clone(), clock.clone(), &config);
    let router = app(state, &config);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("failed to bind port {}", port))?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    Ok(TestServer {
        base_url,
        store,
        clock,
        client: reqwest::Client::new(),
        handle,
    })
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn now(&self) -> DateTime<Utc> {
        use folio_api::views::Clock;
        self.clock.now()
    }

    pub async fn views_of(&self, id: &str) -> Result<i64> {
        let p = self.store.find(id).await?.context("portfolio missing")?;
        Ok(p.views)
    }

    pub async fn store_view_timestamp(&self, id: &str) -> Result<Option<DateTime<Utc>>> {
        let p = self.store.find(id).await?.context("portfolio missing")?;
        Ok(p.view_counted_at)
    }

    /// Poll the store until the background increment lands
    pub async fn wait_for_views(&self, id: &str, expected: i64) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let views = self.views_of(id).await?;
            if views == expected {
                return Ok(());
            }
            if Instant::now() > deadline {
                anyhow::bail!("portfolio {} has {} views, expected {}", id, views, expected);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Give any in-flight increment a chance to land, then read the count
    pub async fn settled_views(&self, id: &str) -> Result<i64> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.views_of(id).await
    }
}

pub fn bearer(user_id: &str) -> String {
    format!("Bearer {}", encode_credential(user_id))
}

pub fn portfolio(
    id: &str,
    owner_id: &str,
    views: i64,
    view_counted_at: Option<DateTime<Utc>>,
    published: bool,
) -> Portfolio {
    let created = Utc::now() - chrono::Duration::days(1);
    Portfolio {
        id: id.to_string(),
        owner_id: owner_id.to_string(),
        owner_name: None,
        title: format!("Project {}", id),
        description: "A small project".to_string(),
        content: "Details".to_string(),
        images: vec!["cover.png".to_string(), "detail.png".to_string()],
        tags: vec!["rust".to_string(), "web".to_string()],
        views,
        published,
        created_at: created,
        updated_at: created,
        view_counted_at,
    }
}
