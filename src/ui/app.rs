//! Dashboard main loop
//!
//! Enters raw mode and the alternate screen, then alternates between
//! polling the keyboard and drawing the latest session snapshot until the
//! operator quits.

use super::event::{self, Action};
use super::render::{draw, ScrollInfo};
use crate::runtime::{SessionHandle, SessionView};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Operator-side state: the input line, chat scroll, and the last local error
pub struct App {
    handle: SessionHandle,
    input: String,
    /// `usize::MAX` follows the newest message
    scroll: usize,
    seen_messages: usize,
    error: Option<String>,
}

impl App {
    pub fn new(handle: SessionHandle) -> Self {
        Self {
            handle,
            input: String::new(),
            scroll: usize::MAX,
            seen_messages: 0,
            error: None,
        }
    }

    /// Jump to the bottom whenever new messages arrive
    pub fn observe(&mut self, view: &SessionView) {
        let count = view.session.messages.len();
        if count != self.seen_messages {
            self.seen_messages = count;
            self.scroll = usize::MAX;
        }
    }

    pub fn handle_action(&mut self, action: Action, view: &SessionView) -> Flow {
        match action {
            Action::Quit => return Flow::Quit,
            Action::Cancel => {
                if view.busy {
                    if let Err(e) = self.handle.cancel() {
                        self.error = Some(e.to_string());
                    }
                }
            }
            Action::Submit => match self.handle.submit_incoming_message(&self.input) {
                Ok(()) => {
                    tracing::debug!(chars = self.input.chars().count(), "Message submitted");
                    self.input.clear();
                    self.error = None;
                    self.scroll = usize::MAX;
                }
                Err(e) => self.error = Some(e.to_string()),
            },
            // Input is disabled while the agent works
            Action::Backspace if !view.busy => {
                self.input.pop();
            }
            Action::Insert(c) if !view.busy => {
                self.input.push(c);
                self.error = None;
            }
            Action::Backspace | Action::Insert(_) => {}
            Action::ScrollUp(n) => self.scroll = self.scroll.saturating_sub(n),
            Action::ScrollDown(n) => self.scroll = self.scroll.saturating_add(n),
            Action::ScrollTop => self.scroll = 0,
            Action::ScrollBottom => self.scroll = usize::MAX,
        }
        Flow::Continue
    }

    /// Keep the scroll offset inside the last drawn frame
    pub fn clamp_scroll(&mut self, info: ScrollInfo) {
        self.scroll = self.scroll.min(info.max_scroll());
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }
}

/// Run the dashboard until the operator quits. The terminal is restored
/// on every exit path.
pub async fn run_app(handle: SessionHandle) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = event_loop(&mut terminal, App::new(handle)).await;
    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut app: App,
) -> io::Result<()> {
    let view_rx = app.handle.subscribe();

    loop {
        let view = view_rx.borrow().clone();
        app.observe(&view);

        if let Some(action) = event::poll()? {
            if app.handle_action(action, &view) == Flow::Quit {
                tracing::info!("Operator quit");
                return Ok(());
            }
        }

        let mut info = ScrollInfo::default();
        terminal.draw(|f| {
            info = draw(f, &view, app.input(), app.error(), app.scroll());
        })?;
        app.clamp_scroll(info);

        tokio::task::yield_now().await;
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}
