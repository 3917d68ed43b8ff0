use std::borrow::Cow;

use super::form::{SourceForm, FIELD_COUNT, LABELS};
use super::state::{AppState, BannerKind};
use super::view::{FilterPicker, Page, ViewState};
use crate::store::types::{ItemStatus, Source};
use chrono::{DateTime, Local, Utc};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap},
    Frame,
};

const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub fn draw(f: &mut Frame, state: &AppState, view: &ViewState) {
    if view.log_focus {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(f.area());

        draw_header(f, state, view, chunks[0]);
        draw_logs(f, state, view, chunks[1]);
        draw_banner(f, state, chunks[2]);
        draw_footer(f, state, view, chunks[3]);
    } else {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(7),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(f.area());

        draw_header(f, state, view, chunks[0]);
        match view.page {
            Page::Dashboard => draw_dashboard(f, state, chunks[1]),
            Page::Queue => draw_queue(f, state, view, chunks[1]),
            Page::Sources => draw_sources(f, state, view, chunks[1]),
        }
        draw_logs(f, state, view, chunks[2]);
        draw_banner(f, state, chunks[3]);
        draw_footer(f, state, view, chunks[4]);
    }

    if let Some(picker) = &view.filter_picker {
        draw_filter_picker(f, picker);
    }
    if let Some(source_form) = &view.form {
        draw_form(f, source_form);
    }
    if let Some(confirm) = &view.confirm {
        draw_confirm(f, &confirm.prompt(state));
    }
}

fn draw_header(f: &mut Frame, state: &AppState, view: &ViewState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(44)])
        .split(area);

    let title = if state.demo_mode {
        " News Automation [DEMO] "
    } else {
        " News Automation "
    };
    let title_style = if state.demo_mode {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };

    let titles: Vec<Line> = Page::ALL
        .iter()
        .enumerate()
        .map(|(i, p)| Line::from(format!("{} {}", i + 1, p.title())))
        .collect();
    let tabs = Tabs::new(titles)
        .select(view.page.index())
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .title(Span::styled(title, title_style))
                .borders(Borders::ALL),
        );
    f.render_widget(tabs, chunks[0]);

    let activity = if state.busy {
        let ch = SPINNER_FRAMES[(view.spinner_frame as usize) % SPINNER_FRAMES.len()];
        Span::styled(format!("{} working", ch), Style::default().fg(Color::Cyan))
    } else {
        Span::styled("idle", Style::default().fg(Color::DarkGray))
    };
    let refreshed = state.last_refresh.as_deref().unwrap_or("--:--:--");
    let line = Line::from(vec![
        Span::raw(format!(" Up: {} | Sync: {} | ", state.uptime(), refreshed)),
        activity,
    ]);
    let para = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(para, chunks[1]);
}

fn status_color(status: ItemStatus) -> Color {
    match status {
        ItemStatus::Published => Color::Green,
        ItemStatus::Pending => Color::Yellow,
        ItemStatus::Processing => Color::Cyan,
        ItemStatus::SkippedDuplicate | ItemStatus::Unknown => Color::DarkGray,
        _ => Color::Red,
    }
}

fn draw_dashboard(f: &mut Frame, state: &AppState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0)])
        .split(area);

    let Some(stats) = state.stats else {
        let para = Paragraph::new(Line::from(Span::styled(
            "Stats unavailable. Press [r] to retry.",
            Style::default().fg(Color::Red),
        )))
        .alignment(Alignment::Center)
        .block(Block::default().title(" System Dashboard ").borders(Borders::ALL));
        f.render_widget(para, area);
        return;
    };

    let kpis = [
        ("Published Articles", stats.published, Color::Green),
        ("Failed Items", stats.failed, if stats.failed > 0 { Color::Red } else { Color::Green }),
        ("Pending Queue", stats.pending, Color::Yellow),
        ("Active Sources", stats.active_sources, Color::Cyan),
    ];
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(chunks[0]);
    for ((label, value, color), col) in kpis.iter().zip(cols.iter()) {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                value.to_string(),
                Style::default().fg(*color).add_modifier(Modifier::BOLD),
            )),
        ];
        let para = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().title(format!(" {} ", label)).borders(Borders::ALL));
        f.render_widget(para, *col);
    }

    let block = Block::default().title(" Recent Activity ").borders(Borders::ALL);
    if state.activity.is_empty() {
        let para = Paragraph::new(Line::from(Span::styled(
            "No data available for charts.",
            Style::default().fg(Color::DarkGray),
        )))
        .alignment(Alignment::Center)
        .block(block);
        f.render_widget(para, chunks[1]);
        return;
    }

    let data: Vec<(&str, u64)> = state
        .activity
        .iter()
        .map(|(status, n)| (short_status(*status), *n))
        .collect();
    let chart = BarChart::default()
        .block(block)
        .bar_width(9)
        .bar_gap(2)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan))
        .data(data.as_slice());
    f.render_widget(chart, chunks[1]);
}

/// Bar labels have to fit the bar width.
fn short_status(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Pending => "PENDING",
        ItemStatus::Processing => "PROCESS",
        ItemStatus::Published => "PUBLISH",
        ItemStatus::FailedCrawl => "F_CRAWL",
        ItemStatus::FailedAi => "F_AI",
        ItemStatus::FailedWp => "F_WP",
        ItemStatus::FailedSanity => "F_SANITY",
        ItemStatus::SkippedDuplicate => "DUPLIC",
        ItemStatus::Error => "ERROR",
        ItemStatus::Unknown => "UNKNOWN",
    }
}

fn format_time(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.with_timezone(&Local).format("%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// First `visible` rows starting where the cursor stays on screen.
fn scroll_offset(cursor: usize, visible: usize) -> usize {
    if visible == 0 {
        0
    } else {
        cursor.saturating_sub(visible - 1)
    }
}

fn draw_queue(f: &mut Frame, state: &AppState, view: &ViewState, area: Rect) {
    let (table_area, inspector_area) = if view.inspecting {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(area);
        (chunks[0], Some(chunks[1]))
    } else {
        (area, None)
    };

    let filter_text = if state.status_filter.is_empty() {
        "all statuses".to_string()
    } else {
        state
            .status_filter
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",")
    };
    let source_text = state.source_filter_name().unwrap_or("all sources");

    if state.items.is_empty() {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                "No items found matching filters.",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!("{} \u{00b7} {}", filter_text, source_text),
                Style::default().fg(Color::DarkGray),
            )),
        ];
        let para = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().title(" Content Queue ").borders(Borders::ALL));
        f.render_widget(para, area);
        return;
    }

    let inner_width = table_area.width.saturating_sub(2) as usize;
    // ID=8 Source=16 Status=17 Created=11 Retries=3, Title and Error share the rest
    let fixed = 8 + 16 + 17 + 11 + 3 + 6;
    let flexible = inner_width.saturating_sub(fixed).max(10);
    let title_w = flexible * 3 / 5;
    let error_w = flexible - title_w;

    let header = Row::new(vec!["ID", "Source", "Title", "Status", "Created", "Error", "Rt"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let visible_lines = table_area.height.saturating_sub(3) as usize;
    let offset = scroll_offset(view.item_cursor, visible_lines);
    let total = state.items.len();

    let rows: Vec<Row> = state
        .items
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible_lines)
        .map(|(i, item)| {
            let cells = vec![
                Cell::from(truncate_with_ellipsis(item.id.as_str(), 8).into_owned()),
                Cell::from(
                    truncate_with_ellipsis(item.source_name.as_deref().unwrap_or("N/A"), 16).into_owned(),
                ),
                Cell::from(
                    truncate_with_ellipsis(item.title_original.as_deref().unwrap_or(""), title_w).into_owned(),
                ),
                Cell::from(item.status.as_str()).style(Style::default().fg(status_color(item.status))),
                Cell::from(format_time(item.created_at)),
                Cell::from(
                    truncate_with_ellipsis(item.error_message.as_deref().unwrap_or(""), error_w).into_owned(),
                )
                .style(Style::default().fg(Color::DarkGray)),
                Cell::from(item.retry_count.to_string()),
            ];
            let row = Row::new(cells);
            if i == view.item_cursor {
                row.style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            } else {
                row
            }
        })
        .collect();

    let widths = [
        Constraint::Length(8),
        Constraint::Length(16),
        Constraint::Length(title_w as u16),
        Constraint::Length(17),
        Constraint::Length(11),
        Constraint::Length(error_w as u16),
        Constraint::Length(3),
    ];
    let title = format!(
        " Content Queue [{}/{}] {} \u{00b7} {} ",
        (view.item_cursor + 1).min(total),
        total,
        filter_text,
        source_text,
    );
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL));
    f.render_widget(table, table_area);

    if let Some(area) = inspector_area {
        draw_inspector(f, state, view, area);
    }
}

fn draw_inspector(f: &mut Frame, state: &AppState, view: &ViewState, area: Rect) {
    let Some(item) = view.selected_item(state) else {
        return;
    };
    let label = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Source: ", label),
            Span::raw(item.source_name.clone().unwrap_or_else(|| "N/A".to_string())),
        ]),
        Line::from(vec![
            Span::styled("Original URL: ", label),
            Span::styled(
                item.original_url.clone().unwrap_or_default(),
                Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
            ),
        ]),
        Line::from(vec![
            Span::styled("Status: ", label),
            Span::styled(item.status.as_str(), Style::default().fg(status_color(item.status))),
            if item.status.is_retryable() {
                Span::styled("  [x] retry", Style::default().fg(Color::Yellow))
            } else {
                Span::raw("")
            },
        ]),
        Line::from(Span::styled("Error Message:", Style::default().fg(Color::DarkGray))),
        Line::from(Span::styled(
            item.error_message.clone().unwrap_or_else(|| "No errors logged.".to_string()),
            Style::default().fg(if item.error_message.is_some() { Color::Red } else { Color::Green }),
        )),
        Line::from(""),
        Line::from(Span::styled("Technical details:", Style::default().fg(Color::DarkGray))),
    ];
    let details = serde_json::to_string_pretty(&item.details()).unwrap_or_default();
    lines.extend(details.lines().map(|l| Line::from(l.to_string())));

    let para = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((view.detail_scroll, 0))
        .block(
            Block::default()
                .title(format!(" Item Inspector: {} ", item.id))
                .borders(Borders::ALL),
        );
    f.render_widget(para, area);
}

fn draw_sources(f: &mut Frame, state: &AppState, view: &ViewState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(6)])
        .split(area);

    if state.sources.is_empty() {
        let para = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "No sources configured.",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled("Press [a] to add one.", Style::default().fg(Color::DarkGray))),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().title(" Sources ").borders(Borders::ALL));
        f.render_widget(para, area);
        return;
    }

    let inner_width = chunks[0].width.saturating_sub(2) as usize;
    let fixed = 8 + 20 + 14 + 6 + 11 + 5;
    let rss_w = inner_width.saturating_sub(fixed).max(10);

    let header = Row::new(vec!["ID", "Name", "Slug", "RSS", "Active", "Checked"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let visible_lines = chunks[0].height.saturating_sub(3) as usize;
    let offset = scroll_offset(view.source_cursor, visible_lines);

    let rows: Vec<Row> = state
        .sources
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible_lines)
        .map(|(i, s)| {
            let (active_text, active_color) = if s.is_active {
                ("yes", Color::Green)
            } else {
                ("no", Color::DarkGray)
            };
            let row = Row::new(vec![
                Cell::from(truncate_with_ellipsis(s.id.as_str(), 8).into_owned()),
                Cell::from(truncate_with_ellipsis(&s.name, 20).into_owned()),
                Cell::from(truncate_with_ellipsis(s.city_slug.as_deref().unwrap_or(""), 14).into_owned()),
                Cell::from(truncate_with_ellipsis(s.rss_url.as_deref().unwrap_or(""), rss_w).into_owned()),
                Cell::from(active_text).style(Style::default().fg(active_color)),
                Cell::from(format_time(s.last_checked_at)),
            ]);
            if i == view.source_cursor {
                row.style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            } else {
                row
            }
        })
        .collect();

    let widths = [
        Constraint::Length(8),
        Constraint::Length(20),
        Constraint::Length(14),
        Constraint::Length(rss_w as u16),
        Constraint::Length(6),
        Constraint::Length(11),
    ];
    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .title(format!(" Sources [{}] ", state.sources.len()))
            .borders(Borders::ALL),
    );
    f.render_widget(table, chunks[0]);

    if let Some(source) = view.selected_source(state) {
        draw_source_details(f, state, source, chunks[1]);
    }
}

fn draw_source_details(f: &mut Frame, state: &AppState, source: &Source, area: Rect) {
    let label = Style::default().add_modifier(Modifier::BOLD);
    let masked = source
        .wp_app_password
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(|_| "********")
        .unwrap_or("(none)");
    let run = state.last_run.as_deref().unwrap_or("never");
    let lines = vec![
        Line::from(vec![
            Span::styled("WordPress: ", label),
            Span::raw(source.wp_api_endpoint.clone().unwrap_or_default()),
        ]),
        Line::from(vec![
            Span::styled("WP user: ", label),
            Span::raw(source.wp_username.clone().unwrap_or_default()),
            Span::styled("  App password: ", label),
            Span::raw(masked),
        ]),
        Line::from(vec![
            Span::styled("Last workflow run: ", label),
            Span::raw(run.to_string()),
        ]),
        Line::from(Span::styled(
            "To edit connection details use direct database access.",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let para = Paragraph::new(lines).block(
        Block::default()
            .title(format!(" {} ", source.name))
            .borders(Borders::ALL),
    );
    f.render_widget(para, area);
}

fn draw_logs(f: &mut Frame, state: &AppState, view: &ViewState, area: Rect) {
    let max_width = area.width.saturating_sub(2) as usize; // borders
    let visible_lines = area.height.saturating_sub(2) as usize;

    let total = state.logs.len();
    let offset = if view.log_focus {
        view.log_scroll_offset.min(total.saturating_sub(visible_lines))
    } else {
        0
    };

    let lines: Vec<Line> = state
        .logs
        .iter()
        .rev()
        .skip(offset)
        .take(visible_lines)
        .map(|l| {
            let color = match l.level.as_str() {
                "ERROR" => Color::Red,
                "WARN" => Color::Yellow,
                "OK" => Color::Green,
                _ => Color::DarkGray,
            };
            let prefix = format!(" {} [{}] ", l.time, l.level);
            let msg_max = max_width.saturating_sub(prefix.len());
            let msg = truncate_with_ellipsis(&l.message, msg_max);
            Line::from(vec![
                Span::styled(prefix, Style::default().fg(color)),
                Span::raw(msg.into_owned()),
            ])
        })
        .collect();

    let title = if view.log_focus {
        format!(" Activity Log [{}/{} lines] ", offset + visible_lines.min(total), total)
    } else {
        " Activity Log ".to_string()
    };

    let block = Block::default().title(title).borders(Borders::ALL);
    let para = Paragraph::new(lines).block(block);
    f.render_widget(para, area);
}

fn draw_banner(f: &mut Frame, state: &AppState, area: Rect) {
    let Some(banner) = &state.banner else {
        return;
    };
    let (prefix, color) = match banner.kind {
        BannerKind::Success => (" \u{2714} ", Color::Green),
        BannerKind::Error => (" \u{2718} ", Color::Red),
    };
    let width = area.width.saturating_sub(3) as usize;
    let line = Line::from(vec![
        Span::styled(prefix, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::styled(
            truncate_with_ellipsis(&banner.message, width).into_owned(),
            Style::default().fg(color),
        ),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn hint<'a>(key: &'a str, label: &'a str) -> [Span<'a>; 2] {
    [
        Span::styled(key, Style::default().fg(Color::Yellow)),
        Span::raw(label),
    ]
}

fn draw_footer(f: &mut Frame, state: &AppState, view: &ViewState, area: Rect) {
    let mut spans: Vec<Span> = vec![Span::raw("  ")];
    if view.log_focus {
        spans.extend(hint("[Esc]", " back  "));
        spans.extend(hint("[j/k]", " scroll  "));
        spans.extend(hint("[g/G]", " top/bottom  "));
    } else {
        spans.extend(hint("[q]", "uit  "));
        spans.extend(hint("[Tab/1-3]", " page  "));
        spans.extend(hint("[r]", "efresh  "));
        spans.extend(hint("[l]", "ogs  "));
        if state.workflow_configured {
            spans.extend(hint("[w]", "orkflow  "));
        }
        match view.page {
            Page::Dashboard => {}
            Page::Queue => {
                spans.extend(hint("[Enter]", " inspect  "));
                spans.extend(hint("[f]", "ilter  "));
                spans.extend(hint("[s]", "ource  "));
                spans.extend(hint("[x]", " retry  "));
                spans.extend(hint("[d]", "elete  "));
            }
            Page::Sources => {
                spans.extend(hint("[a]", "dd  "));
                spans.extend(hint("[Space]", " active  "));
                spans.extend(hint("[c]", "heck feed  "));
                spans.extend(hint("[t]", "rigger  "));
                spans.extend(hint("[d]", "elete  "));
            }
        }
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Rect of the given size centred in `area`, clipped to it.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_filter_picker(f: &mut Frame, picker: &FilterPicker) {
    let area = centered_rect(36, ItemStatus::ALL.len() as u16 + 4, f.area());
    let mut lines: Vec<Line> = ItemStatus::ALL
        .iter()
        .enumerate()
        .map(|(i, status)| {
            let mark = if picker.is_selected(*status) { "[x]" } else { "[ ]" };
            let style = if i == picker.cursor {
                Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(Span::styled(format!(" {} {}", mark, status), style))
        })
        .collect();
    lines.push(Line::from(Span::styled(
        " Space toggle  a/n all/none  Enter apply",
        Style::default().fg(Color::DarkGray),
    )));
    f.render_widget(Clear, area);
    let para = Paragraph::new(lines).block(
        Block::default()
            .title(" Filter by Status ")
            .borders(Borders::ALL),
    );
    f.render_widget(para, area);
}

fn draw_form(f: &mut Frame, form: &SourceForm) {
    let area = centered_rect(72, (FIELD_COUNT as u16) * 2 + 7, f.area());
    let mut lines = Vec::new();
    for (i, label) in LABELS.iter().enumerate() {
        let focused = i == form.focus;
        let label_style = if focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        lines.push(Line::from(Span::styled(label.to_string(), label_style)));
        let cursor = if focused { "_" } else { "" };
        lines.push(Line::from(format!("  {}{}", form.display_value(i), cursor)));
    }
    lines.push(Line::from(""));
    if let Some(slug) = form.slug_preview() {
        lines.push(Line::from(Span::styled(
            format!("Slug: {}", slug),
            Style::default().fg(Color::Cyan),
        )));
    } else {
        lines.push(Line::from(""));
    }
    if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))));
    } else {
        lines.push(Line::from(Span::styled(
            "Tab next  Shift-Tab prev  Ctrl-S add source  Esc cancel",
            Style::default().fg(Color::DarkGray),
        )));
    }
    f.render_widget(Clear, area);
    let para = Paragraph::new(lines).block(
        Block::default()
            .title(" Configure New City ")
            .borders(Borders::ALL),
    );
    f.render_widget(para, area);
}

fn draw_confirm(f: &mut Frame, prompt: &str) {
    let area = centered_rect(60, 5, f.area());
    f.render_widget(Clear, area);
    let para = Paragraph::new(vec![
        Line::from(prompt.to_string()),
        Line::from(Span::styled(
            "[y] confirm   any other key cancels",
            Style::default().fg(Color::Yellow),
        )),
    ])
    .wrap(Wrap { trim: true })
    .alignment(Alignment::Center)
    .block(Block::default().title(" Confirm ").borders(Borders::ALL));
    f.render_widget(para, area);
}

fn truncate_with_ellipsis(s: &str, max_width: usize) -> Cow<'_, str> {
    let char_count = s.chars().count();
    if char_count <= max_width {
        Cow::Borrowed(s)
    } else if max_width <= 3 {
        Cow::Owned(".".repeat(max_width))
    } else {
        let end = s
            .char_indices()
            .nth(max_width - 3)
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        Cow::Owned(format!("{}...", &s[..end]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn test_truncate_short_string_unchanged() {
        assert_eq!(truncate_with_ellipsis("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        assert_eq!(truncate_with_ellipsis("hello world", 8), "hello...");
    }

    #[test]
    fn test_truncate_very_small_width() {
        assert_eq!(truncate_with_ellipsis("hello", 2), "..");
        assert_eq!(truncate_with_ellipsis("hello", 0), "");
    }

    #[test]
    fn test_truncate_multibyte_chars() {
        // Polish titles: truncation must land on a char boundary
        let s = "Źródło: żółć i gęślą jaźń";
        let result = truncate_with_ellipsis(s, 10);
        assert_eq!(result, "Źródło:...");
        assert_eq!(result.chars().count(), 10);
    }

    #[test]
    fn test_scroll_offset_keeps_cursor_visible() {
        assert_eq!(scroll_offset(0, 10), 0);
        assert_eq!(scroll_offset(9, 10), 0);
        assert_eq!(scroll_offset(10, 10), 1);
        assert_eq!(scroll_offset(5, 0), 0);
    }

    #[test]
    fn test_centered_rect_clips_to_area() {
        let area = Rect { x: 0, y: 0, width: 20, height: 10 };
        let r = centered_rect(40, 4, area);
        assert_eq!(r, Rect { x: 0, y: 3, width: 20, height: 4 });
    }

    fn render_to_string(state: &AppState, view: &ViewState) -> String {
        let backend = TestBackend::new(140, 40);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(f, state, view)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_dashboard_renders_without_data() {
        let mut state = AppState::new(vec![]);
        state.stats = Some(Default::default());
        let screen = render_to_string(&state, &ViewState::new());
        assert!(screen.contains("Published Articles"));
        assert!(screen.contains("No data available for charts."));
    }

    #[test]
    fn test_empty_queue_and_overlays_render() {
        let state = AppState::new(vec![ItemStatus::Pending]);
        let mut view = ViewState::new();
        view.page = Page::Queue;
        view.filter_picker = Some(FilterPicker::new(&state.status_filter));
        let screen = render_to_string(&state, &view);
        assert!(screen.contains("No items found matching filters."));
        assert!(screen.contains("Filter by Status"));

        view.filter_picker = None;
        view.form = Some(SourceForm::new());
        let screen = render_to_string(&state, &view);
        assert!(screen.contains("Configure New City"));
    }
}
