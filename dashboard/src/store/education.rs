//! Educational content browser state. The store remembers the signature of
//! the last successfully applied filter so re-applying the same filter is
//! free.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared::{ContentFilter, Difficulty, EducationalContent};
use std::sync::Arc;

use super::{Epoch, SessionBound, StoreContext, StoreEvent};
use crate::core::error::{AppError, Result};
use crate::services::api::education as api;

const STORE: &str = "education";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EducationState {
    pub items: Vec<EducationalContent>,
    pub filter: ContentFilter,
    pub categories: Vec<String>,
    pub selected: Option<EducationalContent>,
    pub is_loading: bool,
    pub error: Option<String>,
}

pub struct EducationStore {
    ctx: StoreContext,
    state: Arc<RwLock<EducationState>>,
    epoch: Epoch,
    last_signature: Mutex<Option<String>>,
}

impl EducationStore {
    pub fn new(ctx: StoreContext) -> Self {
        Self {
            ctx,
            state: Arc::new(RwLock::new(EducationState::default())),
            epoch: Epoch::default(),
            last_signature: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> EducationState {
        self.state.read().clone()
    }

    pub fn clear_error(&self) {
        self.state.write().error = None;
    }

    /// Fetch with the current filter, always hitting the network.
    pub async fn load(&self) -> Result<()> {
        if self.ctx.session.ready_user_id().is_none() {
            self.clear();
            return Ok(());
        }
        let filter = self.state.read().filter.clone();
        self.fetch(filter).await
    }

    /// Apply `filter`. Returns `false` when it matches the last applied one
    /// and no request was made.
    pub async fn apply_filter(&self, filter: ContentFilter) -> Result<bool> {
        self.ctx.require_user()?;
        if self.last_signature.lock().as_deref() == Some(filter.signature().as_str()) {
            tracing::debug!(signature = %filter.signature(), "Filter unchanged, skipping fetch");
            self.state.write().filter = filter;
            return Ok(false);
        }
        self.fetch(filter).await?;
        Ok(true)
    }

    /// Free-text search on top of the current category/difficulty filter.
    pub async fn search(&self, term: &str) -> Result<bool> {
        let mut filter = self.state.read().filter.clone();
        filter.search = Some(term.to_string()).filter(|t| !t.trim().is_empty());
        self.apply_filter(filter).await
    }

    pub async fn filter_by_category(&self, category: Option<String>) -> Result<bool> {
        let mut filter = self.state.read().filter.clone();
        filter.category = category;
        self.apply_filter(filter).await
    }

    pub async fn filter_by_difficulty(&self, difficulty: Option<Difficulty>) -> Result<bool> {
        let mut filter = self.state.read().filter.clone();
        filter.difficulty = difficulty;
        self.apply_filter(filter).await
    }

    /// Back to the unfiltered list.
    pub async fn clear_filters(&self) -> Result<bool> {
        self.apply_filter(ContentFilter::default()).await
    }

    pub async fn load_categories(&self) -> Result<Vec<String>> {
        self.ctx.require_user()?;
        let epoch = self.epoch.current();
        let result = api::get_categories(&self.ctx.client).await;
        if !self.epoch.is_current(epoch) {
            return result;
        }
        match result {
            Ok(categories) => {
                self.state.write().categories = categories.clone();
                Ok(categories)
            }
            Err(e) => Err(self.record_failure(e)),
        }
    }

    /// Select one piece of content. `None` when it no longer exists, or
    /// when the store was cleared before it arrived.
    pub async fn open(&self, content_id: i64) -> Result<Option<EducationalContent>> {
        self.ctx.require_user()?;
        let epoch = self.epoch.current();
        let result = api::get_content(&self.ctx.client, content_id).await;
        if !self.epoch.is_current(epoch) {
            return result.map(|_| None);
        }
        match result {
            Ok(content) => {
                self.state.write().selected = content.clone();
                self.ctx.events.publish(StoreEvent::EducationUpdated);
                Ok(content)
            }
            Err(e) => Err(self.record_failure(e)),
        }
    }

    pub fn close(&self) {
        self.state.write().selected = None;
    }

    async fn fetch(&self, filter: ContentFilter) -> Result<()> {
        let epoch = self.epoch.current();
        let signature = filter.signature();
        {
            let mut state = self.state.write();
            state.filter = filter.clone();
            state.is_loading = true;
            state.error = None;
        }

        let result = api::list_content(&self.ctx.client, &filter).await;
        if !self.epoch.is_current(epoch) {
            return Ok(());
        }

        match result {
            Ok(items) => {
                *self.last_signature.lock() = Some(signature);
                let mut state = self.state.write();
                state.items = items;
                state.is_loading = false;
                drop(state);
                self.ctx.events.publish(StoreEvent::EducationUpdated);
                Ok(())
            }
            Err(e) => {
                self.state.write().is_loading = false;
                Err(self.record_failure(e))
            }
        }
    }

    fn record_failure(&self, e: AppError) -> AppError {
        let message = self.ctx.failure(STORE, &e);
        self.state.write().error = Some(message);
        e
    }
}

#[async_trait]
impl SessionBound for EducationStore {
    fn name(&self) -> &'static str {
        STORE
    }

    async fn sync(&self) -> Result<()> {
        self.load().await
    }

    fn clear(&self) {
        self.epoch.bump();
        *self.last_signature.lock() = None;
        *self.state.write() = EducationState::default();
        self.ctx.events.publish(StoreEvent::Cleared(STORE));
    }
}
