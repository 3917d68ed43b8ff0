pub mod form;
pub mod input;
pub mod render;
pub mod state;
pub mod view;

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use futures_util::StreamExt;
use ratatui::prelude::*;
use state::AppState;
use std::io::stdout;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use view::ViewState;

use crate::controller::AdminCommand;

/// Run the TUI. Reads state from `state_rx`, sends commands on `cmd_tx`.
pub async fn run_tui(
    state_rx: watch::Receiver<AppState>,
    cmd_tx: mpsc::Sender<AdminCommand>,
    tick_ms: u64,
) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = tui_loop(&mut terminal, state_rx, cmd_tx, tick_ms).await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

async fn tui_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    mut state_rx: watch::Receiver<AppState>,
    cmd_tx: mpsc::Sender<AdminCommand>,
    tick_ms: u64,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(tick_ms.max(50)));
    let mut view = ViewState::new();
    let mut state_open = true;

    loop {
        let state = state_rx.borrow().clone();
        view.clamp(&state);
        terminal.draw(|f| render::draw(f, &state, &view))?;

        tokio::select! {
            _ = tick.tick() => view.tick(),
            changed = state_rx.changed(), if state_open => {
                if changed.is_err() {
                    // controller is gone; keep the last snapshot on screen until the user quits
                    state_open = false;
                }
            }
            event = events.next() => {
                let Some(event) = event else {
                    return Ok(());
                };
                let Event::Key(key) = event? else {
                    continue;
                };
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(cmd) = input::handle_key(&mut view, &state, key) {
                    let quit = cmd == AdminCommand::Quit;
                    if cmd_tx.send(cmd).await.is_err() && !quit {
                        tracing::warn!("controller stopped; command dropped");
                    }
                    if quit {
                        return Ok(());
                    }
                }
            }
        }
    }
}
