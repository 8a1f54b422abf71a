//! # Host Controller
//!
//! Drives the pipeline on behalf of a list or dashboard view. The controller
//! owns the current [`Query`], routes every change through [`plan_reload`]
//! and a [`Debouncer`], and publishes finished pages on a `watch` channel.
//!
//! Record acquisition, user notifications and drill-down navigation are
//! collaborators supplied by the host. Views may also reload on a fixed
//! interval; the schedule is released on [`ListController::shutdown`] or drop.

use crate::config::ViewProfile;
use crate::debounce::{Debouncer, Ticket};
use crate::domain::{build_domain, build_order, fetch_options, Domain, DomainTerm, FetchOptions};
use crate::error::SourceError;
use crate::pipeline::{self, PageResult};
use crate::query::Query;
use crate::record::{Record, RecordId};
use crate::reload::{plan_reload, ReloadPlan};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Danger,
}

#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_records(
        &self,
        resource: &str,
        domain: &[DomainTerm],
        fields: &[String],
        options: &FetchOptions,
    ) -> Result<Vec<Record>, SourceError>;

    async fn count_records(&self, resource: &str, domain: &[DomainTerm])
        -> Result<usize, SourceError>;
}

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

#[async_trait]
pub trait DetailOpener: Send + Sync {
    async fn open_detail(&self, id: &RecordId);
}

/// Where filtering, sorting and paging happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMode {
    /// Load the record set once; run the pipeline in memory.
    #[default]
    Local,
    /// Ask the source for each page using a domain and limit/offset.
    Remote,
}

struct Shared {
    resource: String,
    fields: Vec<String>,
    base_domain: Domain,
    mode: SourceMode,
    source: Arc<dyn RecordSource>,
    notifier: Arc<dyn Notifier>,
    records: RwLock<Vec<Record>>,
    results: watch::Sender<Option<PageResult>>,
    query: Mutex<Query>,
    debouncer: Mutex<Debouncer>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Shared {
    fn query(&self) -> Query {
        lock(&self.query).clone()
    }

    async fn compute(&self, query: &Query) -> Result<PageResult, String> {
        match self.mode {
            SourceMode::Local => {
                let records = self.records.read().await;
                pipeline::run(&records, query).map_err(|e| e.to_string())
            }
            SourceMode::Remote => {
                query.validate().map_err(|e| e.to_string())?;
                let domain = build_domain(query, &self.base_domain);
                let options = fetch_options(query);
                let items = self
                    .source
                    .fetch_records(&self.resource, &domain, &self.fields, &options)
                    .await
                    .map_err(|e| format!("Error loading {}: {}", self.resource, e))?;
                let total = self
                    .source
                    .count_records(&self.resource, &domain)
                    .await
                    .map_err(|e| format!("Error counting {}: {}", self.resource, e))?;
                Ok(PageResult::new(items, total, query.page, query.page_size))
            }
        }
    }

    /// Compute and publish, unless `ticket` has been superseded meanwhile.
    async fn refresh(&self, query: Query, ticket: Ticket) {
        let outcome = self.compute(&query).await;

        if !ticket.is_current() {
            tracing::debug!("Discarding superseded refresh of {}", self.resource);
            return;
        }

        match outcome {
            Ok(page) => {
                tracing::info!(
                    resource = %self.resource,
                    page = page.page,
                    total_pages = page.total_pages,
                    matched = page.total_matched,
                    "Publishing page"
                );
                self.results.send_replace(Some(page));
            }
            Err(message) => {
                tracing::error!("{}", message);
                self.notifier.notify(&message, Severity::Danger);
            }
        }
    }

    /// Refresh with the current query right away. Takes the place of any
    /// pending debounced refresh and is superseded by the next query change.
    async fn refresh_current(&self) {
        let ticket = lock(&self.debouncer).ticket();
        let query = self.query();
        self.refresh(query, ticket).await;
    }

    /// Fetch the record set again (local mode) and refresh.
    async fn reload(&self) -> Result<(), SourceError> {
        if self.mode == SourceMode::Local {
            let options = FetchOptions {
                order: Some(build_order(&self.query())),
                ..FetchOptions::default()
            };
            let fetched = self
                .source
                .fetch_records(&self.resource, &self.base_domain, &self.fields, &options)
                .await;
            match fetched {
                Ok(records) => {
                    tracing::info!("Loaded {} records from {}", records.len(), self.resource);
                    *self.records.write().await = records;
                }
                Err(e) => {
                    let message = format!("Error loading {}: {}", self.resource, e);
                    tracing::error!("{}", message);
                    self.notifier.notify(&message, Severity::Danger);
                    return Err(e);
                }
            }
        }
        self.refresh_current().await;
        Ok(())
    }
}

pub struct ListController {
    shared: Arc<Shared>,
    opener: Arc<dyn DetailOpener>,
    auto_refresh: bool,
    refresh_interval: Duration,
    refresher: Mutex<Option<JoinHandle<()>>>,
}

/// Collects the view's fixed settings before the controller starts.
pub struct ListControllerBuilder {
    resource: String,
    profile: ViewProfile,
    fields: Vec<String>,
    base_domain: Domain,
    mode: SourceMode,
}

impl ListControllerBuilder {
    pub fn mode(mut self, mode: SourceMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn base_domain(mut self, domain: Domain) -> Self {
        self.base_domain = domain;
        self
    }

    pub fn build(
        self,
        source: Arc<dyn RecordSource>,
        notifier: Arc<dyn Notifier>,
        opener: Arc<dyn DetailOpener>,
    ) -> ListController {
        let (results, _) = watch::channel(None);
        ListController {
            shared: Arc::new(Shared {
                resource: self.resource,
                fields: self.fields,
                base_domain: self.base_domain,
                mode: self.mode,
                source,
                notifier,
                records: RwLock::new(Vec::new()),
                results,
                query: Mutex::new(self.profile.base_query()),
                debouncer: Mutex::new(Debouncer::new(self.profile.debounce)),
            }),
            opener,
            auto_refresh: self.profile.auto_refresh,
            refresh_interval: self.profile.refresh_interval,
            refresher: Mutex::new(None),
        }
    }
}

impl ListController {
    pub fn builder(resource: impl Into<String>, profile: &ViewProfile) -> ListControllerBuilder {
        ListControllerBuilder {
            resource: resource.into(),
            profile: profile.clone(),
            fields: Vec::new(),
            base_domain: Vec::new(),
            mode: SourceMode::default(),
        }
    }

    /// Initial load. In local mode this fetches the whole record set once.
    /// Starts periodic reloads when the profile asks for them.
    pub async fn load(&self) -> Result<(), SourceError> {
        self.shared.reload().await?;
        if self.auto_refresh && !self.is_auto_refreshing() {
            self.start_auto_refresh(self.refresh_interval);
        }
        Ok(())
    }

    pub fn query(&self) -> Query {
        self.shared.query()
    }

    /// Apply a query change. Resets the page when the change requires it and
    /// schedules a debounced refresh when anything changed.
    pub fn set_query(&self, next: Query) -> ReloadPlan {
        let mut current = lock(&self.shared.query);
        let plan = plan_reload(&current, &next);
        if !plan.should_refetch {
            return plan;
        }

        let next = if plan.should_reset_page {
            next.at_page(1)
        } else {
            next
        };
        *current = next.clone();
        drop(current);

        let shared = self.shared.clone();
        lock(&self.shared.debouncer).call(move |ticket| async move {
            shared.refresh(next, ticket).await;
        });
        plan
    }

    pub fn update(&self, change: impl FnOnce(Query) -> Query) -> ReloadPlan {
        let next = change(self.query());
        self.set_query(next)
    }

    /// Refresh immediately with the current query, dropping any pending one.
    /// A query change made while this runs wins over its result.
    pub async fn refresh_now(&self) {
        self.shared.refresh_current().await;
    }

    /// Reload every `period` until stopped, replacing any running schedule.
    pub fn start_auto_refresh(&self, period: Duration) {
        if period.is_zero() {
            tracing::warn!("Ignoring zero auto-refresh interval for {}", self.shared.resource);
            return;
        }
        let shared = self.shared.clone();
        let task = tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                tracing::debug!("Auto-refreshing {}", shared.resource);
                // Failures are already reported through the notifier
                let _ = shared.reload().await;
            }
        });
        if let Some(previous) = lock(&self.refresher).replace(task) {
            previous.abort();
        }
        tracing::info!(
            "Auto-refresh of {} every {:?} enabled",
            self.shared.resource,
            period
        );
    }

    /// Returns whether a schedule was running.
    pub fn stop_auto_refresh(&self) -> bool {
        match lock(&self.refresher).take() {
            Some(task) => {
                task.abort();
                tracing::info!("Auto-refresh of {} disabled", self.shared.resource);
                true
            }
            None => false,
        }
    }

    pub fn is_auto_refreshing(&self) -> bool {
        lock(&self.refresher)
            .as_ref()
            .map_or(false, |task| !task.is_finished())
    }

    /// Flip periodic reloads using the profile's interval and tell the user.
    /// Returns the new state.
    pub fn toggle_auto_refresh(&self) -> bool {
        let enabled = if self.stop_auto_refresh() {
            false
        } else {
            self.start_auto_refresh(self.refresh_interval);
            self.is_auto_refreshing()
        };
        let message = if enabled {
            "Auto-refresh enabled"
        } else {
            "Auto-refresh disabled"
        };
        self.shared.notifier.notify(message, Severity::Info);
        enabled
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PageResult>> {
        self.shared.results.subscribe()
    }

    pub fn current_page(&self) -> Option<PageResult> {
        self.shared.results.borrow().clone()
    }

    /// Drill down into the record at `index` on the current page.
    pub async fn open(&self, index: usize) -> Option<RecordId> {
        let id = self
            .current_page()
            .and_then(|page| page.items.get(index).and_then(Record::id));
        match &id {
            Some(id) => self.opener.open_detail(id).await,
            None => self
                .shared
                .notifier
                .notify(&format!("No record at position {}", index + 1), Severity::Warning),
        }
        id
    }

    /// Release the pending debounce timer and the auto-refresh schedule.
    pub fn shutdown(&self) {
        self.stop_auto_refresh();
        lock(&self.shared.debouncer).cancel();
    }
}

impl Drop for ListController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
