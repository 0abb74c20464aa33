//! Chat application state and event loop.

use std::io;
use std::time::{Duration, Instant};

use color_eyre::eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use trendchat_core::{ConversationController, TurnOutcome, UserInput, classify_input};
use trendchat_shared::{ConversationHistory, SessionId};

use crate::widgets::{Entry, centered_rect, status_bar, transcript_lines, wrapped_height};

type TurnTask = JoinHandle<trendchat_shared::Result<Option<TurnOutcome>>>;

/// A turn running in the background.
struct PendingTurn {
    task: TurnTask,
    started: Instant,
}

/// Application state.
pub(crate) struct App {
    controller: ConversationController,
    session: SessionId,
    /// Only replaced when a turn completes.
    history: ConversationHistory,
    transcript: Vec<Entry>,
    input: String,
    pending: Option<PendingTurn>,
    /// Rows scrolled up from the bottom of the transcript.
    scroll_back: u16,
    pub status: String,
    pub show_help: bool,
    pub should_quit: bool,
}

impl App {
    pub(crate) fn new(controller: ConversationController) -> Self {
        let session = SessionId::new();
        info!(%session, "tui session started");
        Self {
            controller,
            session,
            history: ConversationHistory::new(),
            transcript: vec![Entry::Notice(
                "Ask what creators are talking about. Type 'exit' or press Ctrl-C to leave.".into(),
            )],
            input: String::new(),
            pending: None,
            scroll_back: 0,
            status: "Ready — F1 for help".to_string(),
            show_help: false,
            should_quit: false,
        }
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Send the input line as a new turn.
    fn submit(&mut self) {
        let line = std::mem::take(&mut self.input);
        let query = match classify_input(&line) {
            UserInput::Empty => return,
            UserInput::Exit => {
                self.quit();
                return;
            }
            UserInput::Query(q) => q.to_string(),
        };

        if self.is_busy() {
            self.input = line;
            self.status = "Still thinking — Esc to cancel".to_string();
            return;
        }

        self.transcript.push(Entry::User(query.clone()));
        self.scroll_back = 0;

        let controller = self.controller.clone();
        let history = self.history.clone();
        let task = tokio::spawn(async move { controller.respond(&history, &query).await });

        self.pending = Some(PendingTurn {
            task,
            started: Instant::now(),
        });
        self.status = "Thinking… (Esc to cancel)".to_string();
    }

    /// Abort the in-flight turn; history stays as it was.
    fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
            info!(session = %self.session, "turn cancelled");
            self.transcript.push(Entry::Notice("(cancelled)".into()));
            self.status = "Cancelled".to_string();
        }
    }

    fn quit(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
        }
        info!(
            session = %self.session,
            turns = self.history.len(),
            "tui session finished"
        );
        self.should_quit = true;
    }

    /// Collect a finished turn, if any.
    pub(crate) async fn poll_pending(&mut self) {
        let Some(pending) = self.pending.take_if(|p| p.task.is_finished()) else {
            if let Some(p) = &self.pending {
                self.status = format!("Thinking… {}s (Esc to cancel)", p.started.elapsed().as_secs());
            }
            return;
        };

        match pending.task.await {
            Ok(Ok(Some(outcome))) => {
                self.history = outcome.history;
                self.transcript.push(Entry::Bot(outcome.answer));
                self.status = format!("Ready — {} turns", self.history.len());
            }
            Ok(Ok(None)) => self.status = "Ready".to_string(),
            Ok(Err(e)) => {
                warn!(error = %e, "turn failed");
                self.transcript.push(Entry::Error(e.to_string()));
                self.status = "Turn failed — try again".to_string();
            }
            Err(e) => {
                warn!(error = %e, "turn task did not complete");
                self.transcript.push(Entry::Error(format!("turn aborted: {e}")));
                self.status = "Turn failed — try again".to_string();
            }
        }
        self.scroll_back = 0;
    }

    pub(crate) fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        // Global keybindings (always active)
        match code {
            KeyCode::Char('c') | KeyCode::Char('q')
                if modifiers.contains(KeyModifiers::CONTROL) =>
            {
                self.quit();
                return;
            }
            KeyCode::F(1) => {
                self.show_help = !self.show_help;
                return;
            }
            _ => {}
        }

        // If help is showing, consume any key to dismiss
        if self.show_help {
            self.show_help = false;
            return;
        }

        match code {
            KeyCode::Esc => self.cancel(),
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            KeyCode::Up => self.scroll_back = self.scroll_back.saturating_add(1),
            KeyCode::Down => self.scroll_back = self.scroll_back.saturating_sub(1),
            KeyCode::PageUp => self.scroll_back = self.scroll_back.saturating_add(10),
            KeyCode::PageDown => self.scroll_back = self.scroll_back.saturating_sub(10),
            KeyCode::End => self.scroll_back = 0,
            _ => {}
        }
    }
}

/// Set up the terminal, run the event loop, then restore the terminal.
pub(crate) async fn run(controller: ConversationController) -> Result<()> {
    // Setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, App::new(controller)).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    loop {
        terminal.draw(|f| draw(f, &app))?;

        // Poll for events with 100ms timeout for responsive UI
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code, key.modifiers);
                }
            }
        }

        app.poll_pending().await;

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Transcript
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    // Transcript, pinned to the bottom unless scrolled back
    let lines = transcript_lines(&app.transcript);
    let inner_width = chunks[0].width.saturating_sub(2);
    let inner_height = chunks[0].height.saturating_sub(2);
    let bottom = wrapped_height(&lines, inner_width).saturating_sub(inner_height);
    let offset = bottom.saturating_sub(app.scroll_back);

    let transcript = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" TrendChat "),
        )
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    f.render_widget(transcript, chunks[0]);

    // Input line
    let input_style = if app.is_busy() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Yellow)
    };
    let input = Paragraph::new(app.input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" You ")
            .border_style(input_style),
    );
    f.render_widget(input, chunks[1]);

    let cursor_x = chunks[1].x + 1 + u16::try_from(app.input.chars().count()).unwrap_or(u16::MAX);
    f.set_cursor_position((cursor_x.min(chunks[1].right().saturating_sub(2)), chunks[1].y + 1));

    // Status bar
    f.render_widget(status_bar(&app.status), chunks[2]);

    // Help overlay
    if app.show_help {
        draw_help_overlay(f);
    }
}

fn draw_help_overlay(f: &mut Frame) {
    let area = centered_rect(60, 50, f.area());

    let help_text = vec![
        Line::from("Keybindings").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from(""),
        Line::from("  Enter        Send message"),
        Line::from("  Esc          Cancel the running turn"),
        Line::from("  ↑/↓ PgUp/PgDn Scroll transcript"),
        Line::from("  End          Jump to latest"),
        Line::from("  F1           Toggle this help"),
        Line::from("  Ctrl-C       Quit"),
        Line::from(""),
        Line::from("Type exit, quit or bye to leave."),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help — press any key to close ")
                .style(Style::default().bg(Color::DarkGray)),
        )
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));

    // Clear background
    f.render_widget(Clear, area);
    f.render_widget(help, area);
}
