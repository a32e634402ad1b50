//! Terminal user interface.

pub mod panel;

pub use panel::{ControlPanel, PanelCommand, PanelState, PanelView};
