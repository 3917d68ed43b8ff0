use super::form::SourceForm;
use super::state::AppState;
use crate::controller::AdminCommand;
use crate::store::types::{Item, ItemStatus, RowId, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    Queue,
    Sources,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Dashboard, Page::Queue, Page::Sources];

    pub fn title(&self) -> &'static str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::Queue => "Queue & Operations",
            Page::Sources => "Source Management",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Page::Dashboard => 0,
            Page::Queue => 1,
            Page::Sources => 2,
        }
    }

    pub fn next(&self) -> Page {
        Page::ALL[(self.index() + 1) % Page::ALL.len()]
    }
}

/// Multi-select over the known statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPicker {
    pub cursor: usize,
    pub selected: Vec<ItemStatus>,
}

impl FilterPicker {
    pub fn new(current: &[ItemStatus]) -> Self {
        Self { cursor: 0, selected: current.to_vec() }
    }

    pub fn is_selected(&self, status: ItemStatus) -> bool {
        self.selected.contains(&status)
    }

    pub fn toggle(&mut self) {
        let status = ItemStatus::ALL[self.cursor];
        if let Some(pos) = self.selected.iter().position(|s| *s == status) {
            self.selected.remove(pos);
        } else {
            self.selected.push(status);
        }
    }

    /// Selected statuses in display order.
    pub fn selection(&self) -> Vec<ItemStatus> {
        ItemStatus::ALL
            .into_iter()
            .filter(|s| self.selected.contains(s))
            .collect()
    }
}

/// Actions that wait for a `y` before they are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirm {
    DeleteItem(RowId),
    DeleteSource(RowId),
    Trigger(Option<RowId>),
}

impl Confirm {
    pub fn prompt(&self, app: &AppState) -> String {
        match self {
            Confirm::DeleteItem(id) => format!("Delete item {}? This cannot be undone.", id),
            Confirm::DeleteSource(id) => {
                let name = app.source(id).map(|s| s.name.as_str()).unwrap_or("this source");
                format!("Delete {}? This cannot be undone.", name)
            }
            Confirm::Trigger(None) => "Trigger the workflow engine for all sources?".to_string(),
            Confirm::Trigger(Some(id)) => {
                let name = app.source(id).map(|s| s.name.as_str()).unwrap_or("this source");
                format!("Trigger the workflow engine for {}?", name)
            }
        }
    }

    pub fn into_command(self) -> AdminCommand {
        match self {
            Confirm::DeleteItem(id) => AdminCommand::DeleteItem(id),
            Confirm::DeleteSource(id) => AdminCommand::DeleteSource(id),
            Confirm::Trigger(source) => AdminCommand::TriggerWorkflow { source },
        }
    }
}

/// UI-local state: what the operator is looking at, not what the store holds.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub page: Page,
    pub item_cursor: usize,
    pub source_cursor: usize,
    pub inspecting: bool,
    pub detail_scroll: u16,
    pub log_focus: bool,
    pub log_scroll_offset: usize,
    pub filter_picker: Option<FilterPicker>,
    pub form: Option<SourceForm>,
    pub confirm: Option<Confirm>,
    pub spinner_frame: u8,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            page: Page::Dashboard,
            item_cursor: 0,
            source_cursor: 0,
            inspecting: false,
            detail_scroll: 0,
            log_focus: false,
            log_scroll_offset: 0,
            filter_picker: None,
            form: None,
            confirm: None,
            spinner_frame: 0,
        }
    }

    pub fn selected_item<'a>(&self, app: &'a AppState) -> Option<&'a Item> {
        app.items.get(self.item_cursor)
    }

    pub fn selected_source<'a>(&self, app: &'a AppState) -> Option<&'a Source> {
        app.sources.get(self.source_cursor)
    }

    /// Keep cursors inside the lists after a refresh shrank them.
    pub fn clamp(&mut self, app: &AppState) {
        self.item_cursor = self.item_cursor.min(app.items.len().saturating_sub(1));
        self.source_cursor = self.source_cursor.min(app.sources.len().saturating_sub(1));
        if app.items.is_empty() {
            self.inspecting = false;
        }
    }

    pub fn tick(&mut self) {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
    }
}
