use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::config::QueueConfig;
use crate::feeds::FeedChecker;
use crate::store::types::{status_distribution, ItemQuery, ItemStatus, NewSource, RowId};
use crate::store::AdminStore;
use crate::tui::state::AppState;
use crate::workflow::{TriggerRequest, WorkflowClient};

/// Requests from the TUI. Each one maps to a store, feed or workflow call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Quit,
    RefreshAll,
    RefreshDashboard,
    RefreshQueue,
    RefreshSources,
    SetStatusFilter(Vec<ItemStatus>),
    SetSourceFilter(Option<RowId>),
    RetryItem(RowId),
    DeleteItem(RowId),
    AddSource(NewSource),
    SetSourceActive { id: RowId, active: bool },
    DeleteSource(RowId),
    CheckFeed(RowId),
    TriggerWorkflow { source: Option<RowId> },
}

/// Executes commands against the remote services and publishes the resulting state.
/// Failures are reported through the state (banner + log), never returned.
pub struct Controller {
    store: Arc<dyn AdminStore>,
    feeds: FeedChecker,
    workflow: Option<WorkflowClient>,
    page_size: u32,
    activity_limit: u32,
    state_tx: watch::Sender<AppState>,
}

impl Controller {
    pub fn new(
        store: Arc<dyn AdminStore>,
        feeds: FeedChecker,
        workflow: Option<WorkflowClient>,
        queue: &QueueConfig,
        state_tx: watch::Sender<AppState>,
    ) -> Self {
        let configured = workflow.is_some();
        state_tx.send_modify(|s| s.workflow_configured = configured);
        Self {
            store,
            feeds,
            workflow,
            page_size: queue.page_size,
            activity_limit: queue.recent_activity_limit,
            state_tx,
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> AppState {
        self.state_tx.borrow().clone()
    }

    /// Process commands until `Quit` or the TUI drops its sender.
    pub async fn run(self, mut cmd_rx: mpsc::Receiver<AdminCommand>) {
        self.handle(AdminCommand::RefreshAll).await;
        while let Some(cmd) = cmd_rx.recv().await {
            if cmd == AdminCommand::Quit {
                break;
            }
            self.handle(cmd).await;
        }
        tracing::debug!("controller stopped");
    }

    pub async fn handle(&self, cmd: AdminCommand) {
        tracing::debug!(?cmd, "handling command");
        self.state_tx.send_modify(|s| s.busy = true);
        match cmd {
            AdminCommand::Quit => {}
            AdminCommand::RefreshAll => {
                self.refresh_dashboard().await;
                self.refresh_queue().await;
                self.refresh_sources().await;
                let now = chrono::Local::now().format("%H:%M:%S").to_string();
                self.state_tx.send_modify(|s| s.last_refresh = Some(now));
            }
            AdminCommand::RefreshDashboard => self.refresh_dashboard().await,
            AdminCommand::RefreshQueue => self.refresh_queue().await,
            AdminCommand::RefreshSources => self.refresh_sources().await,
            AdminCommand::SetStatusFilter(statuses) => {
                self.state_tx.send_modify(|s| s.status_filter = statuses);
                self.refresh_queue().await;
            }
            AdminCommand::SetSourceFilter(source) => {
                self.state_tx.send_modify(|s| s.source_filter = source);
                self.refresh_queue().await;
            }
            AdminCommand::RetryItem(id) => self.retry_item(&id).await,
            AdminCommand::DeleteItem(id) => self.delete_item(&id).await,
            AdminCommand::AddSource(source) => self.add_source(&source).await,
            AdminCommand::SetSourceActive { id, active } => self.set_source_active(&id, active).await,
            AdminCommand::DeleteSource(id) => self.delete_source(&id).await,
            AdminCommand::CheckFeed(id) => self.check_feed(&id).await,
            AdminCommand::TriggerWorkflow { source } => self.trigger_workflow(source).await,
        }
        self.state_tx.send_modify(|s| s.busy = false);
    }

    fn report_error(&self, message: String) {
        tracing::error!("{}", message);
        self.state_tx.send_modify(|s| s.error(message));
    }

    fn report_success(&self, message: String) {
        tracing::info!("{}", message);
        self.state_tx.send_modify(|s| s.success(message));
    }

    async fn refresh_dashboard(&self) {
        match self.store.dashboard_stats().await {
            Ok(stats) => self.state_tx.send_modify(|s| s.stats = Some(stats)),
            Err(e) => {
                self.state_tx.send_modify(|s| {
                    s.stats = None;
                    s.activity.clear();
                });
                self.report_error(format!("Error fetching stats: {:#}", e));
                return;
            }
        }
        match self.store.recent_activity(self.activity_limit).await {
            Ok(points) => {
                let dist = status_distribution(&points);
                self.state_tx.send_modify(|s| s.activity = dist);
            }
            Err(e) => {
                tracing::warn!(error = %e, "recent activity fetch failed");
                self.state_tx.send_modify(|s| {
                    s.activity.clear();
                    s.push_log("WARN", format!("Recent activity unavailable: {:#}", e));
                });
            }
        }
    }

    async fn refresh_queue(&self) {
        let query = {
            let s = self.state_tx.borrow();
            ItemQuery {
                limit: self.page_size,
                statuses: s.status_filter.clone(),
                source_id: s.source_filter.clone(),
            }
        };
        match self.store.list_items(&query).await {
            Ok(items) => {
                tracing::debug!(count = items.len(), "queue refreshed");
                self.state_tx.send_modify(|s| s.items = items);
            }
            Err(e) => self.report_error(format!("Error fetching queue: {:#}", e)),
        }
    }

    async fn refresh_sources(&self) {
        match self.store.list_sources().await {
            Ok(sources) => self.state_tx.send_modify(|s| s.sources = sources),
            Err(e) => self.report_error(format!("Error fetching sources: {:#}", e)),
        }
    }

    async fn retry_item(&self, id: &RowId) {
        let status = self.state_tx.borrow().item(id).map(|i| i.status);
        match status {
            None => {
                self.report_error(format!("Item {} is not in the current view", id));
                return;
            }
            Some(status) if !status.is_retryable() => {
                tracing::warn!(item = %id, %status, "retry refused");
                self.report_error(format!("Item {} is {}; only failed items can be retried", id, status));
                return;
            }
            Some(_) => {}
        }
        match self.store.retry_item(id).await {
            Ok(()) => {
                self.report_success(format!("Item {} requeued!", id));
                self.refresh_queue().await;
                self.refresh_dashboard().await;
            }
            Err(e) => self.report_error(format!("Retry failed for item {}: {:#}", id, e)),
        }
    }

    async fn delete_item(&self, id: &RowId) {
        match self.store.delete_item(id).await {
            Ok(()) => {
                self.report_success(format!("Item {} deleted", id));
                self.refresh_queue().await;
                self.refresh_dashboard().await;
            }
            Err(e) => self.report_error(format!("Delete failed for item {}: {:#}", id, e)),
        }
    }

    async fn add_source(&self, source: &NewSource) {
        match self.store.add_source(source).await {
            Ok(()) => {
                self.report_success(format!("Added {} successfully!", source.name));
                self.refresh_sources().await;
                self.refresh_dashboard().await;
            }
            Err(e) => self.report_error(format!("Error adding source: {:#}", e)),
        }
    }

    fn source_name(&self, id: &RowId) -> String {
        self.state_tx
            .borrow()
            .source(id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("source {}", id))
    }

    async fn set_source_active(&self, id: &RowId, active: bool) {
        let name = self.source_name(id);
        match self.store.set_source_active(id, active).await {
            Ok(()) => {
                let verb = if active { "activated" } else { "deactivated" };
                self.report_success(format!("{} {}", name, verb));
                self.refresh_sources().await;
                self.refresh_dashboard().await;
            }
            Err(e) => self.report_error(format!("Error updating {}: {:#}", name, e)),
        }
    }

    async fn delete_source(&self, id: &RowId) {
        let name = self.source_name(id);
        match self.store.delete_source(id).await {
            Ok(()) => {
                self.report_success(format!("{} deleted", name));
                self.state_tx.send_modify(|s| {
                    if s.source_filter.as_ref() == Some(id) {
                        s.source_filter = None;
                    }
                });
                self.refresh_sources().await;
                self.refresh_dashboard().await;
            }
            Err(e) => self.report_error(format!("Error deleting {}: {:#}", name, e)),
        }
    }

    async fn check_feed(&self, id: &RowId) {
        let source = self.state_tx.borrow().source(id).cloned();
        let Some(source) = source else {
            self.report_error(format!("Source {} is not loaded", id));
            return;
        };
        let Some(url) = source.rss_url.as_deref().filter(|u| !u.trim().is_empty()) else {
            self.report_error(format!("{} has no RSS URL", source.name));
            return;
        };

        let report = match self.feeds.check(url).await {
            Ok(report) => report,
            Err(e) => {
                self.report_error(format!("Feed check failed for {}: {:#}", source.name, e));
                return;
            }
        };

        if let Err(e) = self.store.mark_source_checked(id, Utc::now()).await {
            tracing::warn!(source = %id, error = %e, "failed to record last_checked_at");
            self.state_tx.send_modify(|s| {
                s.push_log("WARN", format!("Could not record check time for {}: {:#}", source.name, e))
            });
        }

        let latest = report
            .latest_title
            .map(|t| format!(" (latest: {})", t))
            .unwrap_or_default();
        self.report_success(format!("Feed {}: {} entries{}", source.name, report.entries, latest));
        self.refresh_sources().await;
    }

    async fn trigger_workflow(&self, source: Option<RowId>) {
        let Some(workflow) = &self.workflow else {
            self.report_error("Workflow engine not configured ([workflow] url)".to_string());
            return;
        };
        let city_slug = source
            .as_ref()
            .and_then(|id| self.state_tx.borrow().source(id).and_then(|s| s.city_slug.clone()));
        let scope = source
            .as_ref()
            .map(|id| self.source_name(id))
            .unwrap_or_else(|| "all sources".to_string());

        let request = TriggerRequest::manual(source, city_slug);
        tracing::info!(run_id = %request.run_id, url = workflow.url(), %scope, "triggering workflow");
        match workflow.trigger(&request).await {
            Ok(outcome) => {
                let when = chrono::Local::now().format("%H:%M:%S");
                self.state_tx.send_modify(|s| {
                    s.last_run = Some(format!("{} run {} ({})", when, outcome.run_id, outcome.status));
                });
                let detail = if outcome.body_excerpt.is_empty() {
                    String::new()
                } else {
                    format!(": {}", outcome.body_excerpt)
                };
                self.report_success(format!(
                    "Workflow run {} started for {} (HTTP {}){}",
                    outcome.run_id, scope, outcome.status, detail
                ));
            }
            Err(e) => self.report_error(format!("Workflow trigger failed: {:#}", e)),
        }
    }
}
