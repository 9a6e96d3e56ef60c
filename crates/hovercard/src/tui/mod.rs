use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CrosstermEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use hovercard_api::HttpProfileApi;
use hovercard_app::{Hovercard, HovercardConfig};
use hovercard_core::UserId;
use ratatui::{Terminal, backend::CrosstermBackend, layout::Rect};
use tokio::runtime::Handle;
use tracing::subscriber::NoSubscriber;

mod constants;
mod panel;
mod roster;
mod view;
mod widgets;

use self::constants::TUI_TICK_RATE_MS;
use self::panel::TerminalPanel;
use self::roster::Roster;
use self::view::Ui;

/// Launch the interactive roster.
pub fn run(
    config: &HovercardConfig,
    usernames: Vec<String>,
    viewer: Option<UserId>,
    runtime: Handle,
) -> Result<()> {
    if usernames.is_empty() {
        bail!("at least one username is required");
    }
    let panel = TerminalPanel::new(Rect::default());
    let card = Hovercard::from_config(config, panel, viewer, runtime)?;
    let mut ui = Ui::new(card, Roster::new(usernames));

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let result = tracing::subscriber::with_default(NoSubscriber::default(), || {
        run_event_loop(&mut terminal, &mut ui)
    });

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    result
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ui: &mut Ui<HttpProfileApi>,
) -> Result<()> {
    let size = terminal.size()?;
    ui.resize(size.width, size.height);

    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(TUI_TICK_RATE_MS);

    loop {
        terminal.draw(|f| ui.draw(f))?;
        if ui.should_quit {
            break;
        }

        let timeout = tick_rate.checked_sub(last_tick.elapsed()).unwrap_or_default();

        if event::poll(timeout)? {
            match event::read()? {
                CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => ui.handle_key(key),
                CrosstermEvent::Mouse(mouse) => ui.handle_mouse(mouse),
                CrosstermEvent::Resize(width, height) => ui.resize(width, height),
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            ui.tick();
            last_tick = Instant::now();
        }
    }

    Ok(())
}
