// Application state shared by the event loop and the renderer

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Instant;

use ratatui::layout::Rect;
use ratatui::widgets::TableState;
use sysinfo::System;

use crate::config::Config;
use crate::engine::{
    DEFAULT_PRESET, EncodeJob, EncodingSettings, JobStatus, JoinJob, OperationRunner, PRESETS,
    Resolution, UI_CRF_MAX, UI_CRF_MIN,
};
use crate::ui::constants::{FPS_CHOICES, MAX_THREADS, METRICS_HISTORY};
use crate::ui::focus::SettingsFocus;

pub struct QuitConfirmationState {
    pub running_count: usize,
}

/// Jobs table plus the system metrics ring buffers.
pub struct DashboardState {
    pub jobs: Vec<EncodeJob>,
    pub join_job: Option<JoinJob>,

    pub table_state: TableState,
    pub table_area: Option<Rect>,
    pub table_inner_area: Option<Rect>,
    pub hovered_row: Option<usize>,

    pub cpu_data: VecDeque<u64>,
    pub mem_data: VecDeque<u64>,
    pub system: System,

    pub gpu_model: Option<String>,
    pub nvenc_available: Option<bool>,

    pub start_time: Instant,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            jobs: Vec::new(),
            join_job: None,
            table_state: TableState::default(),
            table_area: None,
            table_inner_area: None,
            hovered_row: None,
            cpu_data: VecDeque::with_capacity(METRICS_HISTORY),
            mem_data: VecDeque::with_capacity(METRICS_HISTORY),
            system: System::new_all(),
            gpu_model: None,
            nvenc_available: None,
            start_time: Instant::now(),
        }
    }
}

impl DashboardState {
    pub fn running_count(&self) -> usize {
        let join_running = self
            .join_job
            .as_ref()
            .map_or(false, |j| j.status == JobStatus::Running) as usize;
        self.jobs
            .iter()
            .filter(|j| j.status == JobStatus::Running)
            .count()
            + join_running
    }

    pub fn selected_job(&self) -> Option<&EncodeJob> {
        self.table_state.selected().and_then(|i| self.jobs.get(i))
    }
}

/// The editable encode settings plus which field the arrows act on.
pub struct SettingsPanelState {
    pub focus: SettingsFocus,
    pub settings: EncodingSettings,
    /// Set on every adjustment, cleared when written back to the config file
    pub modified: bool,
}

impl SettingsPanelState {
    pub fn new(settings: EncodingSettings) -> Self {
        Self {
            focus: SettingsFocus::default(),
            settings,
            modified: false,
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::from_dimensions(self.settings.width, self.settings.height)
    }

    pub fn adjust_right(&mut self) {
        match self.focus {
            SettingsFocus::Resolution => {
                let next = self.resolution().next();
                self.settings.set_resolution(next);
            }
            SettingsFocus::Vertical => self.settings.vertical = !self.settings.vertical,
            SettingsFocus::Crf => self.settings.crf = (self.settings.crf + 1).min(UI_CRF_MAX),
            SettingsFocus::Preset => self.step_preset(1),
            SettingsFocus::Gpu => self.settings.use_gpu = !self.settings.use_gpu,
            SettingsFocus::Threads => {
                self.settings.threads = (self.settings.threads + 1).min(MAX_THREADS);
            }
            SettingsFocus::Fps => self.step_fps(1),
        }
        self.modified = true;
    }

    pub fn adjust_left(&mut self) {
        match self.focus {
            SettingsFocus::Resolution => {
                let prev = self.resolution().prev();
                self.settings.set_resolution(prev);
            }
            SettingsFocus::Vertical => self.settings.vertical = !self.settings.vertical,
            SettingsFocus::Crf => {
                self.settings.crf = self.settings.crf.saturating_sub(1).max(UI_CRF_MIN);
            }
            SettingsFocus::Preset => self.step_preset(-1),
            SettingsFocus::Gpu => self.settings.use_gpu = !self.settings.use_gpu,
            SettingsFocus::Threads => {
                self.settings.threads = self.settings.threads.saturating_sub(1);
            }
            SettingsFocus::Fps => self.step_fps(-1),
        }
        self.modified = true;
    }

    /// Walk the x264 preset ladder, clamped at both ends
    fn step_preset(&mut self, delta: isize) {
        let idx = PRESETS
            .iter()
            .position(|p| *p == self.settings.preset)
            .or_else(|| PRESETS.iter().position(|p| *p == DEFAULT_PRESET))
            .unwrap_or(0);
        let idx = idx.saturating_add_signed(delta).min(PRESETS.len() - 1);
        self.settings.preset = PRESETS[idx].to_string();
    }

    /// Cycle the FPS choices, wrapping back through Source
    fn step_fps(&mut self, delta: isize) {
        let current = self.settings.fps.unwrap_or(0);
        let idx = FPS_CHOICES.iter().position(|c| *c == current).unwrap_or(0) as isize;
        let len = FPS_CHOICES.len() as isize;
        let fps = FPS_CHOICES[(idx + delta).rem_euclid(len) as usize];
        self.settings.fps = (fps != 0).then_some(fps);
    }
}

pub struct AppState {
    pub dashboard: DashboardState,
    pub settings: SettingsPanelState,
    pub config: Config,
    pub runner: OperationRunner,
    pub root_path: Option<PathBuf>,
    pub quit_confirmation: Option<QuitConfirmationState>,
    /// Transient message shown in the footer in place of the stats
    pub status_line: Option<String>,
    pub last_metrics_update: Instant,
    pub scan_in_progress: bool,
    pub pending_autostart: bool,
    pub app_version: String,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let runner = OperationRunner::new(
            config.process.grace_period(),
            config.process.progress_window,
        );
        let settings = SettingsPanelState::new(config.encoding_settings());
        Self {
            dashboard: DashboardState::default(),
            settings,
            config,
            runner,
            root_path: None,
            quit_confirmation: None,
            status_line: None,
            last_metrics_update: Instant::now(),
            scan_in_progress: false,
            pending_autostart: false,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.runner.is_busy()
    }
}
