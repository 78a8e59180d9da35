// Custom widgets for the TUI

pub mod progress;

pub use progress::{ProgressState, progress_cell, settle_eta};
