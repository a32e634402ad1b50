//! Recorder control panel.
//!
//! Draws the live waveform as a mirrored sparkline, a footer with the toggle
//! button, elapsed time, level and the status line, and maps key presses to
//! panel commands. [`PanelState`] is the status display the recording
//! controller writes to; the panel reads a snapshot of it every frame.

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Paragraph, Sparkline},
};
use std::io::{stdout, Stdout};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::session::{SessionState, StatusDisplay, StatusMessage, ToggleLabel};

/// User input during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelCommand {
    /// No relevant key pressed
    Continue,
    /// Start or stop recording (Space or Enter)
    Toggle,
    /// Leave the recorder (Escape, 'q' or Ctrl+C)
    Quit,
}

/// What the panel shows besides the waveform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelView {
    pub status: StatusMessage,
    pub label: ToggleLabel,
}

/// Shared, cloneable handle to the panel's status and toggle label.
#[derive(Debug, Clone, Default)]
pub struct PanelState {
    view: Arc<Mutex<PanelView>>,
}

impl PanelState {
    pub fn snapshot(&self) -> PanelView {
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StatusDisplay for PanelState {
    fn show_status(&self, status: StatusMessage) {
        tracing::debug!("Status: {}", status);
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status = status;
    }

    fn set_toggle_label(&self, label: ToggleLabel) {
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .label = label;
    }
}

/// Maps a key to a panel command.
pub fn command_for_key(code: KeyCode, modifiers: KeyModifiers) -> PanelCommand {
    match code {
        KeyCode::Char(' ') | KeyCode::Enter => PanelCommand::Toggle,
        KeyCode::Char('q') | KeyCode::Esc => PanelCommand::Quit,
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => PanelCommand::Quit,
        _ => PanelCommand::Continue,
    }
}

/// Full-screen terminal panel.
pub struct ControlPanel {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    recording_since: Option<Instant>,
    active: bool,
}

impl ControlPanel {
    /// Enters raw mode and the alternate screen.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        Ok(Self {
            terminal,
            recording_since: None,
            active: true,
        })
    }

    /// Current terminal width in columns.
    pub fn width(&self) -> anyhow::Result<usize> {
        Ok(self.terminal.size()?.width as usize)
    }

    /// Reads pending input without blocking.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn handle_input(&mut self) -> anyhow::Result<PanelCommand> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let command = command_for_key(key.code, key.modifiers);
                if command != PanelCommand::Continue {
                    tracing::debug!("Key {:?}: {:?}", key.code, command);
                    return Ok(command);
                }
            }
        }
        Ok(PanelCommand::Continue)
    }

    /// Draws one frame.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render(&mut self, view: &PanelView, waveform: &[u64], level: u8) -> anyhow::Result<()> {
        let recording = view.label.implied_state() == SessionState::Recording;
        match (recording, self.recording_since) {
            (true, None) => self.recording_since = Some(Instant::now()),
            (false, Some(_)) => self.recording_since = None,
            _ => {}
        }
        let elapsed = self
            .recording_since
            .map(|since| since.elapsed())
            .unwrap_or_default();

        self.terminal.draw(|frame| {
            let area = frame.area();
            let footer_height = 1;

            let content_area = Rect {
                height: area.height.saturating_sub(footer_height),
                ..area
            };
            let top_height = content_area.height / 3 * 2;

            let top_area = Rect {
                height: top_height,
                ..content_area
            };
            let bottom_area = Rect {
                y: content_area.y + top_height,
                height: content_area.height.saturating_sub(top_height),
                ..content_area
            };

            let top = Sparkline::default().data(waveform).max(80).style(
                Style::default()
                    .bg(Color::Rgb(0, 0, 0))
                    .fg(Color::Rgb(206, 224, 220)),
            );
            frame.render_widget(top, top_area);

            let mirrored: Vec<u64> = waveform.iter().map(|&v| 100_u64.saturating_sub(v)).collect();
            let bottom = Sparkline::default().data(&mirrored).max(80).style(
                Style::default()
                    .bg(Color::Rgb(185, 207, 212))
                    .fg(Color::Rgb(0, 0, 0)),
            );
            frame.render_widget(bottom, bottom_area);

            let footer_area = Rect {
                y: area.y + area.height.saturating_sub(footer_height),
                height: footer_height,
                ..area
            };
            let (paragraph, status_column) = footer(view, elapsed, level);
            frame.render_widget(paragraph, footer_area);
            if let Some((offset, url)) = listen_link(&view.status) {
                link_cells(frame.buffer_mut(), footer_area, status_column.saturating_add(offset), url);
            }
        })?;

        Ok(())
    }

    /// Restores the terminal. Safe to call more than once.
    ///
    /// # Errors
    /// - If terminal mode cannot be restored
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for ControlPanel {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Footer paragraph and the column its status text starts at.
fn footer(view: &PanelView, elapsed: Duration, level: u8) -> (Paragraph<'static>, u16) {
    let recording = view.label.implied_state() == SessionState::Recording;

    let indicator = if recording {
        Span::styled("● ", Style::default().fg(Color::Red))
    } else {
        Span::styled("○ ", Style::default().fg(Color::DarkGray))
    };

    let button = Span::styled(
        format!("[ {} ]", view.label),
        Style::default()
            .fg(Color::Rgb(0, 0, 0))
            .bg(Color::Rgb(206, 224, 220)),
    );

    let secs = elapsed.as_secs();
    let status_style = if view.status.is_error() {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };

    let mut spans = vec![
        indicator,
        Span::raw(format!("{}:{:02} / {level}% ", secs / 60, secs % 60)),
        button,
        Span::raw("  "),
    ];
    let status_column = spans.iter().map(Span::width).sum::<usize>();
    spans.push(Span::styled(view.status.text(), status_style));

    let paragraph = Paragraph::new(Line::from(spans)).style(
        Style::default()
            .fg(Color::Rgb(185, 207, 212))
            .bg(Color::Rgb(0, 0, 0)),
    );
    (paragraph, u16::try_from(status_column).unwrap_or(u16::MAX))
}

/// Listen URL of a completed upload and its column within the status text.
fn listen_link(status: &StatusMessage) -> Option<(u16, &str)> {
    match status {
        StatusMessage::UploadComplete { url } => {
            let text = status.text();
            let offset = text.strip_suffix(url.as_str())?.chars().count();
            Some((u16::try_from(offset).ok()?, url.as_str()))
        }
        _ => None,
    }
}

/// Wraps the already drawn URL cells in OSC 8 escapes so terminals that
/// support hyperlinks open `url` on click. Each escape carries two visible
/// characters on one cell; ratatui skips the cell it covers.
fn link_cells(buf: &mut Buffer, area: Rect, column: u16, url: &str) {
    let chars: Vec<char> = url.chars().collect();
    for (i, pair) in chars.chunks(2).enumerate() {
        let Some(x) = u16::try_from(i * 2)
            .ok()
            .and_then(|step| area.x.checked_add(column)?.checked_add(step))
        else {
            break;
        };
        if x.saturating_add(pair.len() as u16) > area.right() {
            break;
        }
        let text: String = pair.iter().collect();
        buf[(x, area.y)].set_symbol(&format!("\x1B]8;;{url}\x07{text}\x1B]8;;\x07"));
    }
}
