// Terminal UI using Ratatui

pub mod components;
pub mod constants;
pub mod dashboard;
pub mod events;
pub mod focus;
pub mod quit_modal;
pub mod state;
pub mod widgets;

pub use dashboard::Dashboard;
pub use events::{run_ui, run_ui_with_options};
pub use quit_modal::QuitModal;
pub use state::AppState;
