// Dashboard screen implementation

use crate::engine::JobStatus;
use crate::ui::components::Footer;
use crate::ui::state::{AppState, DashboardState};
use crate::ui::widgets::ProgressState;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, Widget},
};
use std::collections::VecDeque;
use waveformchart::{WaveformMode, WaveformWidget};

mod sections;

pub struct Dashboard;

impl Dashboard {
    pub fn render(frame: &mut Frame, state: &mut AppState) {
        let area = frame.area();

        // Compact layout for inline mode
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(8), // System metrics waveform
                Constraint::Length(4), // Queue overview
                Constraint::Min(6),    // Jobs table
                Constraint::Length(9), // Settings panel and log tail
                Constraint::Length(1), // Footer
            ])
            .split(area);

        Self::render_system_metrics(frame, chunks[0], &state.dashboard);
        Self::render_queue_overview(frame, chunks[1], state);
        Self::render_jobs(frame, chunks[2], &mut state.dashboard);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(46), Constraint::Min(30)])
            .split(chunks[3]);
        Self::render_settings_panel(frame, bottom[0], state);
        Self::render_log_tail(frame, bottom[1], &state.dashboard);

        let total = state.dashboard.jobs.len();
        let completed = state
            .dashboard
            .jobs
            .iter()
            .filter(|j| j.status == JobStatus::Completed)
            .count();
        let failed = state
            .dashboard
            .jobs
            .iter()
            .filter(|j| j.status == JobStatus::Failed)
            .count();
        let uptime = Self::format_uptime(state.dashboard.start_time.elapsed().as_secs());

        Footer::dashboard_with_stats(
            total,
            completed,
            failed,
            uptime,
            state.is_busy(),
            state.status_line.as_deref(),
        )
        .render(chunks[4], frame.buffer_mut());
    }
}
