use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;

use crate::{
    columns::VisiblePlans,
    credentials::TokenStore,
    layout::{build_layout, LayoutConfig, TimelineLayout},
    source::{JsonDirectorySource, TaskSource},
    task::{ingest, RejectedRecord, Task},
};

#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub accepted: usize,
    pub rejected: Vec<RejectedRecord>,
}

pub struct TimelineService {
    roots: Vec<PathBuf>,
    source: Box<dyn TaskSource>,
    token_store: Option<Arc<dyn TokenStore>>,
    config: RwLock<LayoutConfig>,
    tasks: RwLock<Arc<Vec<Task>>>,
    changed: Arc<AtomicBool>,
    watcher: Option<RecommendedWatcher>,
}

pub struct TimelineServiceBuilder {
    roots: Vec<PathBuf>,
    source: Option<Box<dyn TaskSource>>,
    token_store: Option<Arc<dyn TokenStore>>,
    config: LayoutConfig,
}

impl TimelineServiceBuilder {
    pub fn new() -> Self {
        Self {
            roots: Vec::new(),
            source: None,
            token_store: None,
            config: LayoutConfig::default(),
        }
    }

    /// Adds a directory (or single file) of saved task listings. Ignored when
    /// a custom source is supplied.
    pub fn add_root(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        if !self.roots.contains(&path) {
            self.roots.push(path);
        }
        self
    }

    pub fn with_source(mut self, source: Box<dyn TaskSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.token_store = Some(store);
        self
    }

    pub fn with_config(mut self, config: LayoutConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the service without fetching; call [`TimelineService::refresh`].
    pub fn build(self) -> TimelineService {
        let source = self.source.unwrap_or_else(|| {
            let directory = self
                .roots
                .iter()
                .fold(JsonDirectorySource::new(), |source, root| source.add_root(root));
            Box::new(directory)
        });
        TimelineService {
            roots: self.roots,
            source,
            token_store: self.token_store,
            config: RwLock::new(self.config),
            tasks: RwLock::new(Arc::new(Vec::new())),
            changed: Arc::new(AtomicBool::new(false)),
            watcher: None,
        }
    }
}

impl Default for TimelineServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineService {
    pub fn builder() -> TimelineServiceBuilder {
        TimelineServiceBuilder::new()
    }

    /// Fetches a fresh task list and swaps it in. On any failure the previous
    /// snapshot stays in place.
    pub fn refresh(&self) -> Result<IngestReport> {
        let token = match &self.token_store {
            Some(store) => Some(
                store
                    .token()
                    .ok_or_else(|| anyhow!("no access token available"))?,
            ),
            None => None,
        };
        let records = self
            .source
            .fetch(token.as_deref())
            .context("failed to fetch tasks")?;
        let ingested = ingest(records);
        let report = IngestReport {
            accepted: ingested.tasks.len(),
            rejected: ingested.rejected,
        };
        self.replace_tasks(ingested.tasks);
        tracing::info!(
            accepted = report.accepted,
            rejected = report.rejected.len(),
            "task snapshot refreshed"
        );
        Ok(report)
    }

    pub fn replace_tasks(&self, tasks: Vec<Task>) {
        *self.tasks.write() = Arc::new(tasks);
    }

    /// Current snapshot. Cheap to clone and unaffected by later refreshes.
    pub fn tasks(&self) -> Arc<Vec<Task>> {
        Arc::clone(&self.tasks.read())
    }

    pub fn config(&self) -> LayoutConfig {
        self.config.read().clone()
    }

    pub fn set_config(&self, config: LayoutConfig) {
        *self.config.write() = config;
    }

    pub fn set_visible_plans(&self, plans: VisiblePlans) {
        self.config.write().visible_plans = plans;
    }

    /// Distinct plan names in the current snapshot, first-seen order.
    pub fn plans(&self) -> Vec<String> {
        let tasks = self.tasks();
        let mut seen = HashSet::new();
        let mut plans = Vec::new();
        for task in tasks.iter() {
            if seen.insert(task.plan.as_str()) {
                plans.push(task.plan.clone());
            }
        }
        plans
    }

    pub fn layout(&self, now: DateTime<Utc>) -> TimelineLayout {
        let tasks = self.tasks();
        let config = self.config();
        build_layout(&tasks, now, &config)
    }

    pub fn sign_out(&self) {
        if let Some(store) = &self.token_store {
            store.clear();
        }
        self.replace_tasks(Vec::new());
    }

    /// Watches the listing roots. Change events only mark the snapshot stale;
    /// the reload happens on the caller's thread in [`Self::refresh_if_changed`].
    pub fn watch(&mut self) -> Result<()> {
        if self.watcher.is_some() {
            return Ok(());
        }
        let changed = Arc::clone(&self.changed);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) if !event.kind.is_access() => {
                    tracing::debug!(paths = ?event.paths, "task listing changed");
                    changed.store(true, Ordering::SeqCst);
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(error = %err, "task listing watch error"),
            }
        })?;
        for root in &self.roots {
            let mode = if root.is_file() {
                RecursiveMode::NonRecursive
            } else {
                RecursiveMode::Recursive
            };
            watcher
                .watch(root, mode)
                .with_context(|| format!("failed to watch {}", root.display()))?;
        }
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Refreshes only if a watched listing changed since the last call.
    /// Returns `Ok(None)` when nothing changed.
    pub fn refresh_if_changed(&self) -> Result<Option<IngestReport>> {
        if !self.changed.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        self.refresh().map(Some)
    }
}
