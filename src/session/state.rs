//! Session state and the toggle label derived from it.

use std::fmt;

/// Lifecycle of the recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Microphone closed, waiting for a toggle
    #[default]
    Idle,
    /// Encoder is capturing audio
    Recording,
}

impl SessionState {
    /// Label the toggle control shows while in this state.
    pub fn toggle_label(self) -> ToggleLabel {
        match self {
            SessionState::Idle => ToggleLabel::Record,
            SessionState::Recording => ToggleLabel::Stop,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Recording => write!(f, "recording"),
        }
    }
}

/// Text on the toggle control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToggleLabel {
    #[default]
    Record,
    Stop,
}

impl ToggleLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            ToggleLabel::Record => "Record",
            ToggleLabel::Stop => "Stop",
        }
    }

    /// Session state implied by a label.
    pub fn implied_state(self) -> SessionState {
        match self {
            ToggleLabel::Record => SessionState::Idle,
            ToggleLabel::Stop => SessionState::Recording,
        }
    }
}

impl fmt::Display for ToggleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
