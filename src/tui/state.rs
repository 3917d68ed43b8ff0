use std::collections::VecDeque;
use std::time::Instant;

use crate::store::types::{DashboardStats, Item, ItemStatus, RowId, Source};

const MAX_LOGS: usize = 200;

/// Snapshot published by the controller; the TUI only reads it.
#[derive(Debug, Clone)]
pub struct AppState {
    pub demo_mode: bool,
    pub workflow_configured: bool,
    pub start_time: Instant,
    pub busy: bool,
    pub last_refresh: Option<String>,
    pub stats: Option<DashboardStats>,
    pub activity: Vec<(ItemStatus, u64)>,
    pub items: Vec<Item>,
    pub status_filter: Vec<ItemStatus>,
    pub source_filter: Option<RowId>,
    pub sources: Vec<Source>,
    pub last_run: Option<String>,
    pub banner: Option<Banner>,
    pub logs: VecDeque<LogEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

/// One-line notice above the footer, replaced by the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub message: String,
}

impl AppState {
    pub fn new(status_filter: Vec<ItemStatus>) -> Self {
        Self {
            demo_mode: false,
            workflow_configured: false,
            start_time: Instant::now(),
            busy: false,
            last_refresh: None,
            stats: None,
            activity: Vec::new(),
            items: Vec::new(),
            status_filter,
            source_filter: None,
            sources: Vec::new(),
            last_run: None,
            banner: None,
            logs: VecDeque::with_capacity(MAX_LOGS),
        }
    }

    pub fn push_log(&mut self, level: &str, message: String) {
        let time = chrono::Local::now().format("%H:%M:%S").to_string();
        if self.logs.len() >= MAX_LOGS {
            self.logs.pop_front();
        }
        self.logs.push_back(LogEntry {
            time,
            level: level.to_string(),
            message,
        });
    }

    pub fn success(&mut self, message: String) {
        self.push_log("OK", message.clone());
        self.banner = Some(Banner { kind: BannerKind::Success, message });
    }

    pub fn error(&mut self, message: String) {
        self.push_log("ERROR", message.clone());
        self.banner = Some(Banner { kind: BannerKind::Error, message });
    }

    pub fn item(&self, id: &RowId) -> Option<&Item> {
        self.items.iter().find(|i| &i.id == id)
    }

    pub fn source(&self, id: &RowId) -> Option<&Source> {
        self.sources.iter().find(|s| &s.id == id)
    }

    pub fn source_filter_name(&self) -> Option<&str> {
        self.source_filter
            .as_ref()
            .map(|id| self.source(id).map(|s| s.name.as_str()).unwrap_or("unknown source"))
    }

    pub fn uptime(&self) -> String {
        let secs = self.start_time.elapsed().as_secs();
        let h = secs / 3600;
        let m = (secs % 3600) / 60;
        format!("{}h {:02}m", h, m)
    }
}
