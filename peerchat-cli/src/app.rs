//! Terminal presentation.
//!
//! Owns everything the user sees. Session events arrive as [`UiEvent`]s on a
//! channel and keyboard input arrives from a blocking reader thread; both are
//! handled on this one task, so the screen has a single writer.

use std::io::{self, Write};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{cursor, queue};
use peerchat_core::{OutgoingMessage, SessionState};
use peerchat_transport::{Role, Session, UiEvent};
use tokio::sync::mpsc;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What a key press asks the loop to do.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    /// Nothing beyond redrawing.
    None,
    /// Hand this line to the session.
    Submit(String),
    /// Hang up and leave.
    Quit,
}

/// Chat window state.
pub struct App {
    role: Role,
    log: Vec<String>,
    input: String,
    input_enabled: bool,
}

impl App {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            log: Vec::new(),
            input: String::new(),
            input_enabled: false,
        }
    }

    /// Fold one session event into the window.
    pub fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::Status(text) => self.log.extend(text.lines().map(str::to_string)),
            UiEvent::MessageReceived(text) => self.log.push(format!("Peer: {text}")),
            UiEvent::MessageSent(text) => self.log.push(format!("Me: {text}")),
            UiEvent::Error(text) => self.log.push(format!("Error: {text}")),
            UiEvent::InputEnabled(enabled) => self.input_enabled = enabled,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.kind == KeyEventKind::Release {
            return Action::None;
        }

        match key.code {
            KeyCode::Esc => Action::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
            KeyCode::Enter => {
                // Blank input stays in the field, like a button that did nothing
                if !self.input_enabled || OutgoingMessage::new(&self.input).is_none() {
                    return Action::None;
                }
                Action::Submit(std::mem::take(&mut self.input))
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                Action::None
            }
            KeyCode::Backspace => {
                self.input.pop();
                Action::None
            }
            _ => Action::None,
        }
    }

    #[cfg(test)]
    pub fn log(&self) -> &[String] {
        &self.log
    }

    #[cfg(test)]
    pub fn input(&self) -> &str {
        &self.input
    }

    #[cfg(test)]
    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    /// Run until the user quits.
    pub async fn run(
        mut self,
        session: &Session,
        mut events: mpsc::UnboundedReceiver<UiEvent>,
    ) -> io::Result<()> {
        let mut terminal_events = spawn_terminal_reader();
        let mut stdout = io::stdout();

        loop {
            self.draw(&mut stdout, session.state())?;

            tokio::select! {
                Some(event) = events.recv() => self.apply(event),
                terminal_event = terminal_events.recv() => {
                    let key = match terminal_event {
                        Some(Event::Key(key)) => key,
                        // Resize and friends only need the redraw at the top of the loop
                        Some(_) => continue,
                        None => {
                            // Reader thread died; terminal is unusable
                            session.close().await;
                            return Ok(());
                        }
                    };
                    match self.handle_key(key) {
                        Action::Submit(text) => session.submit(&text).await,
                        Action::Quit => {
                            session.close().await;
                            return Ok(());
                        }
                        Action::None => {}
                    }
                }
            }
        }
    }

    fn draw<W: Write>(&self, out: &mut W, state: SessionState) -> io::Result<()> {
        let (cols, rows) = terminal::size()?;
        let width = usize::from(cols.max(1));
        let history_rows = usize::from(rows.saturating_sub(4));

        queue!(out, cursor::MoveTo(0, 0), Clear(ClearType::All))?;
        queue!(
            out,
            Print(fit(
                &format!("peerchat | Role: {} | State: {}", self.role, state.label()),
                width
            )),
            cursor::MoveTo(0, 1),
            Print("=".repeat(width)),
        )?;

        let wrapped: Vec<String> = self.log.iter().flat_map(|line| wrap(line, width)).collect();
        let start = wrapped.len().saturating_sub(history_rows);
        for (row, line) in wrapped[start..].iter().enumerate() {
            // row < history_rows <= u16::MAX
            #[allow(clippy::cast_possible_truncation)]
            let y = 2 + row as u16;
            queue!(out, cursor::MoveTo(0, y), Print(line))?;
        }

        queue!(
            out,
            cursor::MoveTo(0, rows.saturating_sub(2)),
            Print("-".repeat(width)),
            cursor::MoveTo(0, rows.saturating_sub(1)),
        )?;
        if self.input_enabled {
            queue!(out, Print(fit(&format!("> {}", self.input), width)))?;
        } else {
            queue!(
                out,
                SetForegroundColor(Color::DarkGrey),
                Print(fit(&format!("x {}", self.input), width)),
                ResetColor,
            )?;
        }
        out.flush()
    }
}

/// Forward terminal events from a blocking thread.
fn spawn_terminal_reader() -> mpsc::Receiver<Event> {
    let (tx, rx) = mpsc::channel(32);
    tokio::task::spawn_blocking(move || loop {
        if tx.is_closed() {
            return;
        }
        match event::poll(POLL_INTERVAL) {
            Ok(false) => continue,
            Ok(true) => match event::read() {
                Ok(event @ (Event::Key(_) | Event::Resize(..))) => {
                    if tx.blocking_send(event).is_err() {
                        return;
                    }
                }
                Ok(other) => debug!(?other, "terminal event ignored"),
                Err(e) => {
                    warn!(error = %e, "terminal read failed");
                    return;
                }
            },
            Err(e) => {
                warn!(error = %e, "terminal poll failed");
                return;
            }
        }
    });
    rx
}

/// Keep the tail of `text` that fits in `width` columns.
fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(width)).collect()
}

/// Split `line` into chunks of at most `width` characters.
fn wrap(line: &str, width: usize) -> Vec<String> {
    if line.is_empty() {
        return vec![String::new()];
    }
    let chars: Vec<char> = line.chars().collect();
    chars.chunks(width).map(|chunk| chunk.iter().collect()).collect()
}
