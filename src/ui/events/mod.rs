// Event handling and main UI loop

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
        MouseEvent,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use crate::ui::{
    Dashboard, QuitModal,
    state::{AppState, QuitConfirmationState},
};

mod dashboard;
mod workers;

struct ScanConfig {
    root: PathBuf,
    settings: crate::engine::EncodingSettings,
}

fn spawn_scan_thread(config: ScanConfig, tx: mpsc::Sender<UiEvent>) {
    thread::spawn(move || {
        for path in crate::engine::scan(&config.root) {
            let job = crate::engine::build_job_from_path(path, &config.settings, None);

            if tx.send(UiEvent::ScanJob(job)).is_err() {
                return; // Main thread dropped the receiver
            }
        }

        let _ = tx.send(UiEvent::ScanFinished);
    });
}

// Event types sent from dedicated event thread to main loop
enum UiEvent {
    Input(Event),                      // Keyboard, mouse, or other terminal events
    Tick,                              // Periodic update for rendering and metrics
    ScanJob(crate::engine::EncodeJob), // Discovered job during initial scan
    ScanFinished,                      // Initial scan completed
}

/// Spawn a dedicated thread for event polling.
fn spawn_event_thread(tx: mpsc::Sender<UiEvent>) {
    let tick_rate = Duration::from_millis(16); // ~60 FPS

    thread::spawn(move || {
        let mut last_tick = Instant::now();
        loop {
            // Calculate timeout until next tick
            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or(Duration::from_secs(0));

            // Poll for events with adaptive timeout
            if event::poll(timeout).unwrap_or(false) {
                if let Ok(evt) = event::read() {
                    if tx.send(UiEvent::Input(evt)).is_err() {
                        break; // Main thread dropped the receiver
                    }
                }
            }

            // Send tick if enough time elapsed
            if last_tick.elapsed() >= tick_rate {
                if tx.send(UiEvent::Tick).is_err() {
                    break; // Main thread dropped the receiver
                }
                last_tick = Instant::now();
            }
        }
    });
}

pub fn run_ui() -> io::Result<()> {
    run_ui_with_options(None, None, None, &crate::config::Config::default())
}

pub fn run_ui_with_options(
    directory: Option<PathBuf>,
    autostart: Option<bool>,
    scan_on_launch: Option<bool>,
    config: &crate::config::Config,
) -> io::Result<()> {
    // Setup terminal with alternate screen (full terminal)
    enable_raw_mode()?;
    let mut stdout = io::stdout();

    // Enter alternate screen and enable mouse capture
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state (settings panel seeded from config defaults)
    let mut app_state = AppState::new(config.clone());

    // Run the GPU preflight check if hardware encoding is enabled
    if app_state.settings.settings.use_gpu {
        app_state.dashboard.gpu_model = crate::engine::detect_nvidia_gpu();
        app_state.dashboard.nvenc_available = Some(crate::engine::check_nvenc_available());
    }

    // Determine root directory
    // Priority: CLI arg > current directory
    let root = directory
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    // Determine whether to scan on launch (CLI flag > config > default)
    let should_scan = scan_on_launch.unwrap_or(config.startup.scan_on_launch);
    // Determine whether to autostart (CLI flag > config > default)
    let should_autostart = autostart.unwrap_or(config.startup.autostart);
    app_state.root_path = Some(root.clone());

    // Wire up UI event channel (shared with background scan)
    let (event_tx, event_rx) = mpsc::channel();
    spawn_event_thread(event_tx.clone());

    if should_scan {
        let scan_config = ScanConfig {
            root,
            settings: app_state.settings.settings.clone(),
        };

        app_state.scan_in_progress = true;
        app_state.pending_autostart = should_autostart;

        spawn_scan_thread(scan_config, event_tx.clone());
    }

    // Main loop
    let result = run_app(&mut terminal, &mut app_state, event_rx);

    // Restore terminal: leave alternate screen and disable mouse capture
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    state: &mut AppState,
    event_rx: Receiver<UiEvent>,
) -> io::Result<()> {
    loop {
        // Collect all pending events so we can coalesce tick bursts and keep inputs snappy
        let mut pending_ticks: u64 = 0;
        let mut pending_inputs: Vec<Event> = Vec::new();
        let mut pending_scan_jobs: Vec<crate::engine::EncodeJob> = Vec::new();
        let mut scan_finished = false;

        // Always block for at least one event, then drain the queue
        match event_rx.recv() {
            Ok(evt) => match evt {
                UiEvent::Tick => pending_ticks += 1,
                UiEvent::Input(ev) => pending_inputs.push(ev),
                UiEvent::ScanJob(job) => pending_scan_jobs.push(job),
                UiEvent::ScanFinished => scan_finished = true,
            },
            Err(_) => {
                // Channel closed, exit
                return Ok(());
            }
        }

        while let Ok(evt) = event_rx.try_recv() {
            match evt {
                UiEvent::Tick => pending_ticks += 1,
                UiEvent::Input(ev) => pending_inputs.push(ev),
                UiEvent::ScanJob(job) => pending_scan_jobs.push(job),
                UiEvent::ScanFinished => scan_finished = true,
            }
        }

        for job in pending_scan_jobs {
            add_scanned_job(state, job);
        }

        if scan_finished {
            state.scan_in_progress = false;

            if state.dashboard.jobs.is_empty() {
                state.status_line = Some("No videos found. Press R to rescan.".to_string());
            } else if state.pending_autostart {
                workers::start_batch(state);
            }
            state.pending_autostart = false;
        }

        // Process input events first so user commands are never stuck behind a tick backlog
        for input in pending_inputs {
            match input {
                Event::Key(key) => {
                    if handle_key(key, state) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => {
                    handle_mouse(mouse, state);
                }
                _ => {
                    // Other events (resize, etc.) - ignore for now
                }
            }
        }

        if pending_ticks > 0 {
            // Update metrics on tick (~60 FPS)
            let now = Instant::now();
            if now.duration_since(state.last_metrics_update) >= Duration::from_millis(500) {
                workers::update_metrics(state);
                state.last_metrics_update = now;
            }
        }

        // Poll worker messages (non-blocking, limit to prevent UI blocking)
        // Process at most 10 messages per frame to keep UI responsive
        let mut worker_messages = Vec::new();
        for _ in 0..10 {
            match state.runner.receiver().try_recv() {
                Ok(msg) => worker_messages.push(msg),
                Err(_) => break, // No more messages
            }
        }
        for msg in worker_messages {
            workers::apply_worker_message(msg, state);
        }

        // Render after processing event
        terminal.draw(|frame| {
            Dashboard::render(frame, state);

            // Render quit confirmation on top if active
            if let Some(ref modal) = state.quit_confirmation {
                QuitModal::render(frame, modal);
            }
        })?;
    }
}

fn add_scanned_job(state: &mut AppState, job: crate::engine::EncodeJob) {
    let select_first = state.dashboard.jobs.is_empty();
    state.dashboard.jobs.push(job);

    if select_first {
        state.dashboard.table_state.select(Some(0));
    }
}

fn should_quit(key: &KeyEvent) -> bool {
    // Quit on 'q' or Ctrl+C
    matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q'))
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

fn handle_key(key: KeyEvent, state: &mut AppState) -> bool {
    // The quit confirmation swallows all input while open
    if state.quit_confirmation.is_some() {
        return handle_quit_confirmation_key(key, state);
    }

    if should_quit(&key) {
        return request_quit(state);
    }

    dashboard::handle_dashboard_key(key, state);
    false
}

fn request_quit(state: &mut AppState) -> bool {
    if state.is_busy() {
        state.quit_confirmation = Some(QuitConfirmationState {
            running_count: state.dashboard.running_count().max(1),
        });
        false
    } else {
        true
    }
}

fn handle_quit_confirmation_key(key: KeyEvent, state: &mut AppState) -> bool {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            state.runner.cancel_current();

            // Wait for the worker to kill the child and clean up partial
            // output before the terminal is restored
            let deadline =
                Instant::now() + state.config.process.grace_period() + Duration::from_secs(2);
            while state.runner.is_busy() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(50));
            }

            true
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            state.quit_confirmation = None;
            false
        }
        _ => false,
    }
}

fn handle_mouse(mouse: MouseEvent, state: &mut AppState) {
    dashboard::handle_dashboard_mouse(mouse, state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_state() -> AppState {
        AppState::new(Config::default())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_quit_key_mapping() {
        assert!(should_quit(&key(KeyCode::Char('q'))));
        assert!(should_quit(&KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL
        )));
        // Plain 'c' is cancel, not quit
        assert!(!should_quit(&key(KeyCode::Char('c'))));
        assert!(!should_quit(&key(KeyCode::Esc)));
    }

    #[test]
    fn test_idle_quit_exits_without_confirmation() {
        let mut state = test_state();
        assert!(request_quit(&mut state), "idle app quits immediately");
        assert!(state.quit_confirmation.is_none());
    }

    #[test]
    fn test_open_modal_swallows_unrelated_keys() {
        let mut state = test_state();
        state.quit_confirmation = Some(QuitConfirmationState { running_count: 1 });

        assert!(!handle_key(key(KeyCode::Char('s')), &mut state));
        assert!(state.quit_confirmation.is_some(), "modal must stay open");
    }

    #[test]
    fn test_modal_n_stays_and_y_quits() {
        let mut state = test_state();

        state.quit_confirmation = Some(QuitConfirmationState { running_count: 1 });
        assert!(!handle_quit_confirmation_key(
            key(KeyCode::Char('n')),
            &mut state
        ));
        assert!(state.quit_confirmation.is_none(), "n returns to the app");

        state.quit_confirmation = Some(QuitConfirmationState { running_count: 1 });
        assert!(handle_quit_confirmation_key(
            key(KeyCode::Char('y')),
            &mut state
        ));
    }
}
