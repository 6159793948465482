use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

use super::identity::ViewerIdentity;

type LedgerKey = (String, ViewerIdentity);

/// Recently counted (portfolio, viewer) pairs for the per-viewer gate.
///
/// Bounded: when full, the oldest admission goes first. Expired entries are
/// always older than live ones, so they are evicted before any live entry.
pub struct ViewerLedger {
    window: Duration,
    capacity: usize,
    state: Mutex<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    seen: HashMap<LedgerKey, DateTime<Utc>>,
    /// Admissions in arrival order. An entry whose timestamp no longer
    /// matches `seen` was re-admitted or forgotten and is skipped.
    order: VecDeque<(LedgerKey, DateTime<Utc>)>,
}

impl LedgerState {
    fn is_current(&self, key: &LedgerKey, at: &DateTime<Utc>) -> bool {
        self.seen.get(key) == Some(at)
    }

    /// Drop expired admissions from the front, then the oldest live one if still full.
    fn evict(&mut self, now: DateTime<Utc>, window: Duration, capacity: usize) {
        while let Some((key, at)) = self.order.front() {
            let current = self.is_current(key, at);
            if current && now - *at < window && self.seen.len() < capacity {
                break;
            }
            if let Some((key, at)) = self.order.pop_front() {
                if current {
                    self.seen.remove(&key);
                }
                if current && now - at < window {
                    break;
                }
            }
        }
    }

    fn compact(&mut self, capacity: usize) {
        if self.order.len() > capacity.saturating_mul(2) {
            let seen = &self.seen;
            self.order.retain(|(key, at)| seen.get(key) == Some(at));
        }
    }
}

impl ViewerLedger {
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self {
            window,
            capacity: capacity.max(1),
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Record the viewer and return true if they were not counted for this
    /// portfolio within the window. Check and insert happen under one lock.
    pub async fn admit(&self, portfolio_id: &str, viewer: &ViewerIdentity, now: DateTime<Utc>) -> bool {
        let mut state = self.state.lock().await;
        let key = (portfolio_id.to_string(), viewer.clone());

        if let Some(last) = state.seen.get(&key) {
            if now - *last < self.window {
                return false;
            }
        }

        if !state.seen.contains_key(&key) && state.seen.len() >= self.capacity {
            state.evict(now, self.window, self.capacity);
        }

        state.seen.insert(key.clone(), now);
        state.order.push_back((key, now));
        state.compact(self.capacity);
        true
    }

    /// Drop the admission for a viewer whose increment never landed
    pub async fn forget(&self, portfolio_id: &str, viewer: &ViewerIdentity) {
        let mut state = self.state.lock().await;
        state.seen.remove(&(portfolio_id.to_string(), viewer.clone()));
        state.compact(self.capacity);
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.seen.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.seen.is_empty()
    }
}
