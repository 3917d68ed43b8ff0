use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::form::SourceForm;
use super::state::AppState;
use super::view::{Confirm, FilterPicker, Page, ViewState};
use crate::controller::AdminCommand;
use crate::store::types::{ItemStatus, RowId};

/// Apply one key press to the view. Returns the command to send, if any.
/// Overlays (confirm, form, filter picker, log focus) take the key first.
pub fn handle_key(view: &mut ViewState, app: &AppState, key: KeyEvent) -> Option<AdminCommand> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(AdminCommand::Quit);
    }

    if let Some(confirm) = view.confirm.take() {
        return match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(confirm.into_command()),
            _ => None,
        };
    }

    if view.form.is_some() {
        return form_key(view, key);
    }

    if view.filter_picker.is_some() {
        return picker_key(view, key);
    }

    if view.log_focus {
        log_key(view, app, key);
        return None;
    }

    match key.code {
        KeyCode::Char('q') => return Some(AdminCommand::Quit),
        KeyCode::Tab => {
            view.page = view.page.next();
            view.inspecting = false;
            return None;
        }
        KeyCode::Char('1') => {
            view.page = Page::Dashboard;
            return None;
        }
        KeyCode::Char('2') => {
            view.page = Page::Queue;
            return None;
        }
        KeyCode::Char('3') => {
            view.page = Page::Sources;
            return None;
        }
        KeyCode::Char('r') => return Some(AdminCommand::RefreshAll),
        KeyCode::Char('l') => {
            view.log_focus = true;
            view.log_scroll_offset = 0;
            return None;
        }
        KeyCode::Char('w') => {
            view.confirm = Some(Confirm::Trigger(None));
            return None;
        }
        _ => {}
    }

    match view.page {
        Page::Dashboard => None,
        Page::Queue => queue_key(view, app, key),
        Page::Sources => sources_key(view, app, key),
    }
}

fn queue_key(view: &mut ViewState, app: &AppState, key: KeyEvent) -> Option<AdminCommand> {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if view.item_cursor + 1 < app.items.len() {
                view.item_cursor += 1;
                view.detail_scroll = 0;
            }
            None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view.item_cursor = view.item_cursor.saturating_sub(1);
            view.detail_scroll = 0;
            None
        }
        KeyCode::Enter => {
            view.inspecting = !view.inspecting && !app.items.is_empty();
            view.detail_scroll = 0;
            None
        }
        KeyCode::Esc => {
            view.inspecting = false;
            None
        }
        KeyCode::PageDown => {
            view.detail_scroll = view.detail_scroll.saturating_add(5);
            None
        }
        KeyCode::PageUp => {
            view.detail_scroll = view.detail_scroll.saturating_sub(5);
            None
        }
        KeyCode::Char('f') => {
            view.filter_picker = Some(FilterPicker::new(&app.status_filter));
            None
        }
        KeyCode::Char('s') => Some(AdminCommand::SetSourceFilter(next_source_filter(app))),
        KeyCode::Char('x') => {
            let item = view.selected_item(app)?;
            item.status
                .is_retryable()
                .then(|| AdminCommand::RetryItem(item.id.clone()))
        }
        KeyCode::Char('d') => {
            let item = view.selected_item(app)?;
            view.confirm = Some(Confirm::DeleteItem(item.id.clone()));
            None
        }
        _ => None,
    }
}

/// All sources → each source in name order → all sources.
fn next_source_filter(app: &AppState) -> Option<RowId> {
    let position = app
        .source_filter
        .as_ref()
        .and_then(|id| app.sources.iter().position(|s| &s.id == id));
    let next = match position {
        None => 0,
        Some(i) => i + 1,
    };
    app.sources.get(next).map(|s| s.id.clone())
}

fn sources_key(view: &mut ViewState, app: &AppState, key: KeyEvent) -> Option<AdminCommand> {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if view.source_cursor + 1 < app.sources.len() {
                view.source_cursor += 1;
            }
            None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view.source_cursor = view.source_cursor.saturating_sub(1);
            None
        }
        KeyCode::Char('a') => {
            view.form = Some(SourceForm::new());
            None
        }
        KeyCode::Char(' ') => {
            let source = view.selected_source(app)?;
            Some(AdminCommand::SetSourceActive {
                id: source.id.clone(),
                active: !source.is_active,
            })
        }
        KeyCode::Char('c') => {
            let source = view.selected_source(app)?;
            Some(AdminCommand::CheckFeed(source.id.clone()))
        }
        KeyCode::Char('d') => {
            let source = view.selected_source(app)?;
            view.confirm = Some(Confirm::DeleteSource(source.id.clone()));
            None
        }
        KeyCode::Char('t') => {
            let source = view.selected_source(app)?;
            view.confirm = Some(Confirm::Trigger(Some(source.id.clone())));
            None
        }
        _ => None,
    }
}

fn form_key(view: &mut ViewState, key: KeyEvent) -> Option<AdminCommand> {
    let form = view.form.as_mut()?;
    let submit = (key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL))
        || (key.code == KeyCode::Enter && form.on_last_field());
    if submit {
        return match form.validate() {
            Ok(source) => {
                view.form = None;
                Some(AdminCommand::AddSource(source))
            }
            Err(message) => {
                form.error = Some(message);
                None
            }
        };
    }
    match key.code {
        KeyCode::Esc => view.form = None,
        KeyCode::Tab | KeyCode::Down | KeyCode::Enter => form.focus_next(),
        KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
        KeyCode::Backspace => form.backspace(),
        KeyCode::Char(c) => form.push_char(c),
        _ => {}
    }
    None
}

fn picker_key(view: &mut ViewState, key: KeyEvent) -> Option<AdminCommand> {
    let picker = view.filter_picker.as_mut()?;
    match key.code {
        KeyCode::Esc => view.filter_picker = None,
        KeyCode::Char('j') | KeyCode::Down => {
            picker.cursor = (picker.cursor + 1).min(ItemStatus::ALL.len() - 1);
        }
        KeyCode::Char('k') | KeyCode::Up => picker.cursor = picker.cursor.saturating_sub(1),
        KeyCode::Char(' ') => picker.toggle(),
        KeyCode::Char('a') => picker.selected = ItemStatus::ALL.to_vec(),
        KeyCode::Char('n') => picker.selected.clear(),
        KeyCode::Enter => {
            let selection = picker.selection();
            view.filter_picker = None;
            view.item_cursor = 0;
            return Some(AdminCommand::SetStatusFilter(selection));
        }
        _ => {}
    }
    None
}

fn log_key(view: &mut ViewState, app: &AppState, key: KeyEvent) {
    let max = app.logs.len().saturating_sub(1);
    match key.code {
        KeyCode::Esc | KeyCode::Char('l') | KeyCode::Char('q') => view.log_focus = false,
        KeyCode::Char('j') | KeyCode::Down => {
            view.log_scroll_offset = (view.log_scroll_offset + 1).min(max);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view.log_scroll_offset = view.log_scroll_offset.saturating_sub(1);
        }
        KeyCode::Char('g') => view.log_scroll_offset = 0,
        KeyCode::Char('G') => view.log_scroll_offset = max,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::{Item, Source};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn item(id: &str, status: &str) -> Item {
        serde_json::from_value(serde_json::json!({ "id": id, "status": status })).unwrap()
    }

    fn source(id: &str, name: &str, active: bool) -> Source {
        serde_json::from_value(serde_json::json!({ "id": id, "name": name, "is_active": active }))
            .unwrap()
    }

    fn app() -> AppState {
        let mut app = AppState::new(vec![ItemStatus::Pending]);
        app.items = vec![item("1", "FAILED_WP"), item("2", "PUBLISHED")];
        app.sources = vec![source("10", "Kraków Daily", true), source("11", "Warszawa News", false)];
        app
    }

    #[test]
    fn test_quit_and_refresh() {
        let mut view = ViewState::new();
        assert_eq!(handle_key(&mut view, &app(), key(KeyCode::Char('q'))), Some(AdminCommand::Quit));
        assert_eq!(handle_key(&mut view, &app(), key(KeyCode::Char('r'))), Some(AdminCommand::RefreshAll));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        view.form = Some(SourceForm::new());
        assert_eq!(handle_key(&mut view, &app(), ctrl_c), Some(AdminCommand::Quit));
    }

    #[test]
    fn test_retry_only_offered_for_failed_items() {
        let app = app();
        let mut view = ViewState::new();
        view.page = Page::Queue;
        assert_eq!(
            handle_key(&mut view, &app, key(KeyCode::Char('x'))),
            Some(AdminCommand::RetryItem(RowId::new("1")))
        );
        handle_key(&mut view, &app, key(KeyCode::Char('j')));
        assert_eq!(view.item_cursor, 1);
        assert_eq!(handle_key(&mut view, &app, key(KeyCode::Char('x'))), None);
        // cursor stops at the last row
        handle_key(&mut view, &app, key(KeyCode::Down));
        assert_eq!(view.item_cursor, 1);
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let app = app();
        let mut view = ViewState::new();
        view.page = Page::Queue;
        assert_eq!(handle_key(&mut view, &app, key(KeyCode::Char('d'))), None);
        assert!(view.confirm.is_some());
        assert_eq!(
            handle_key(&mut view, &app, key(KeyCode::Char('y'))),
            Some(AdminCommand::DeleteItem(RowId::new("1")))
        );

        handle_key(&mut view, &app, key(KeyCode::Char('d')));
        assert_eq!(handle_key(&mut view, &app, key(KeyCode::Char('n'))), None);
        assert!(view.confirm.is_none());
    }

    #[test]
    fn test_workflow_trigger_confirmed_from_any_page() {
        let app = app();
        let mut view = ViewState::new();
        handle_key(&mut view, &app, key(KeyCode::Char('w')));
        assert_eq!(
            handle_key(&mut view, &app, key(KeyCode::Char('y'))),
            Some(AdminCommand::TriggerWorkflow { source: None })
        );

        view.page = Page::Sources;
        handle_key(&mut view, &app, key(KeyCode::Char('t')));
        assert_eq!(
            handle_key(&mut view, &app, key(KeyCode::Char('Y'))),
            Some(AdminCommand::TriggerWorkflow { source: Some(RowId::new("10")) })
        );
    }

    #[test]
    fn test_filter_picker_applies_selection() {
        let app = app();
        let mut view = ViewState::new();
        view.page = Page::Queue;
        view.item_cursor = 1;
        handle_key(&mut view, &app, key(KeyCode::Char('f')));
        assert!(view.filter_picker.is_some());
        // cursor to FAILED_WP (index 5) and select it; PENDING stays selected
        for _ in 0..5 {
            handle_key(&mut view, &app, key(KeyCode::Char('j')));
        }
        handle_key(&mut view, &app, key(KeyCode::Char(' ')));
        assert_eq!(
            handle_key(&mut view, &app, key(KeyCode::Enter)),
            Some(AdminCommand::SetStatusFilter(vec![ItemStatus::Pending, ItemStatus::FailedWp]))
        );
        assert!(view.filter_picker.is_none());
        assert_eq!(view.item_cursor, 0);
    }

    #[test]
    fn test_empty_filter_selection_is_allowed() {
        let app = app();
        let mut view = ViewState::new();
        view.page = Page::Queue;
        handle_key(&mut view, &app, key(KeyCode::Char('f')));
        handle_key(&mut view, &app, key(KeyCode::Char('n')));
        assert_eq!(
            handle_key(&mut view, &app, key(KeyCode::Enter)),
            Some(AdminCommand::SetStatusFilter(vec![]))
        );
    }

    #[test]
    fn test_source_filter_cycles_through_sources() {
        let mut app = app();
        let mut view = ViewState::new();
        view.page = Page::Queue;
        assert_eq!(
            handle_key(&mut view, &app, key(KeyCode::Char('s'))),
            Some(AdminCommand::SetSourceFilter(Some(RowId::new("10"))))
        );
        app.source_filter = Some(RowId::new("10"));
        assert_eq!(
            handle_key(&mut view, &app, key(KeyCode::Char('s'))),
            Some(AdminCommand::SetSourceFilter(Some(RowId::new("11"))))
        );
        app.source_filter = Some(RowId::new("11"));
        assert_eq!(
            handle_key(&mut view, &app, key(KeyCode::Char('s'))),
            Some(AdminCommand::SetSourceFilter(None))
        );
    }

    #[test]
    fn test_source_toggle_and_feed_check() {
        let app = app();
        let mut view = ViewState::new();
        view.page = Page::Sources;
        handle_key(&mut view, &app, key(KeyCode::Char('j')));
        assert_eq!(
            handle_key(&mut view, &app, key(KeyCode::Char(' '))),
            Some(AdminCommand::SetSourceActive { id: RowId::new("11"), active: true })
        );
        assert_eq!(
            handle_key(&mut view, &app, key(KeyCode::Char('c'))),
            Some(AdminCommand::CheckFeed(RowId::new("11")))
        );
    }

    #[test]
    fn test_form_submit_and_validation_error() {
        let app = app();
        let mut view = ViewState::new();
        view.page = Page::Sources;
        handle_key(&mut view, &app, key(KeyCode::Char('a')));
        for c in "Gdańsk".chars() {
            handle_key(&mut view, &app, key(KeyCode::Char(c)));
        }
        // 'q' is typed into the form, not treated as quit
        handle_key(&mut view, &app, key(KeyCode::Char('q')));
        handle_key(&mut view, &app, key(KeyCode::Backspace));

        let ctrl_s = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL);
        assert_eq!(handle_key(&mut view, &app, ctrl_s), None);
        assert_eq!(
            view.form.as_ref().unwrap().error.as_deref(),
            Some("Please fill required fields.")
        );

        handle_key(&mut view, &app, key(KeyCode::Tab));
        handle_key(&mut view, &app, key(KeyCode::Tab));
        for c in "https://gdansk.example/rss".chars() {
            handle_key(&mut view, &app, key(KeyCode::Char(c)));
        }
        handle_key(&mut view, &app, key(KeyCode::Enter));
        for c in "https://wp.gdansk.example/wp-json".chars() {
            handle_key(&mut view, &app, key(KeyCode::Char(c)));
        }
        match handle_key(&mut view, &app, ctrl_s) {
            Some(AdminCommand::AddSource(source)) => {
                assert_eq!(source.name, "Gdańsk");
                assert_eq!(source.city_slug, "gdansk");
                assert_eq!(source.rss_url, "https://gdansk.example/rss");
            }
            other => panic!("expected AddSource, got {:?}", other),
        }
        assert!(view.form.is_none());
    }

    #[test]
    fn test_log_focus_scrolls_and_exits() {
        let mut app = app();
        for i in 0..5 {
            app.push_log("INFO", format!("{}", i));
        }
        let mut view = ViewState::new();
        handle_key(&mut view, &app, key(KeyCode::Char('l')));
        assert!(view.log_focus);
        handle_key(&mut view, &app, key(KeyCode::Char('G')));
        assert_eq!(view.log_scroll_offset, 4);
        // 'q' leaves log focus instead of quitting
        assert_eq!(handle_key(&mut view, &app, key(KeyCode::Char('q'))), None);
        assert!(!view.log_focus);
    }
}
