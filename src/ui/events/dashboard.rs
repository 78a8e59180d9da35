use super::{workers, *};

use crossterm::event::{MouseButton, MouseEventKind};

pub(super) fn handle_dashboard_key(key: KeyEvent, state: &mut AppState) {
    match key.code {
        // Navigate table
        KeyCode::Up => {
            let selected = state.dashboard.table_state.selected();
            if let Some(i) = selected {
                if i > 0 {
                    state.dashboard.table_state.select(Some(i - 1));
                }
            }
        }
        KeyCode::Down => {
            let selected = state.dashboard.table_state.selected();
            let job_count = state.dashboard.jobs.len();
            if let Some(i) = selected {
                if job_count > 0 && i < job_count - 1 {
                    state.dashboard.table_state.select(Some(i + 1));
                }
            }
        }
        // Move focus through the settings panel
        KeyCode::Tab => {
            state.settings.focus = state.settings.focus.next();
        }
        KeyCode::BackTab => {
            state.settings.focus = state.settings.focus.previous();
        }
        // Adjust the focused settings field
        KeyCode::Left => {
            state.settings.adjust_left();
        }
        KeyCode::Right => {
            state.settings.adjust_right();
        }
        // Start the batch over all idle jobs
        KeyCode::Char('s') | KeyCode::Char('S') => {
            if !state.is_busy() {
                workers::start_batch(state);
            }
        }
        // Join all scanned videos into one file
        KeyCode::Char('j') | KeyCode::Char('J') => {
            if !state.is_busy() {
                workers::start_join(state);
            }
        }
        // Cancel whatever is running (plain 'c'; Ctrl+C quits)
        KeyCode::Char('c') | KeyCode::Char('C') => {
            if state.is_busy() {
                state.runner.cancel_current();
                state.status_line = Some("Cancelling...".to_string());
            }
        }
        // Rescan current directory
        KeyCode::Char('r') | KeyCode::Char('R') => {
            if !state.is_busy() {
                workers::rescan(state);
            }
        }
        // Persist the panel settings as config defaults
        KeyCode::Char('w') | KeyCode::Char('W') => {
            workers::save_settings(state);
        }
        // Drop the selected job from the queue
        KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Delete => {
            if !state.is_busy() {
                remove_selected_job(state);
            }
        }
        _ => {}
    }
}

fn remove_selected_job(state: &mut AppState) {
    let Some(selected) = state.dashboard.table_state.selected() else {
        return;
    };
    if selected >= state.dashboard.jobs.len() {
        return;
    }

    state.dashboard.jobs.remove(selected);

    let job_count = state.dashboard.jobs.len();
    if job_count == 0 {
        state.dashboard.table_state.select(None);
    } else if selected >= job_count {
        state.dashboard.table_state.select(Some(job_count - 1));
    }
}

pub(super) fn handle_dashboard_mouse(mouse: MouseEvent, state: &mut AppState) {
    let dashboard = &mut state.dashboard;

    // Update hover state on mouse movement
    if matches!(mouse.kind, MouseEventKind::Moved) {
        if let Some(inner_area) = dashboard.table_inner_area {
            dashboard.hovered_row =
                calculate_hovered_row(mouse.row, inner_area, dashboard.table_state.offset());
        }
    }

    // Handle scrolling
    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if is_mouse_in_table(mouse.column, mouse.row, dashboard) {
                let current = dashboard.table_state.selected().unwrap_or(0);
                let job_count = dashboard.jobs.len();
                if job_count > 0 && current < job_count - 1 {
                    dashboard.table_state.select(Some(current + 1));
                }
            }
        }
        MouseEventKind::ScrollUp => {
            if is_mouse_in_table(mouse.column, mouse.row, dashboard) {
                let current = dashboard.table_state.selected().unwrap_or(0);
                if current > 0 {
                    dashboard.table_state.select(Some(current - 1));
                }
            }
        }
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some(inner_area) = dashboard.table_inner_area {
                if let Some(row) =
                    calculate_clicked_row(mouse.row, inner_area, dashboard.table_state.offset())
                {
                    if row < dashboard.jobs.len() {
                        dashboard.table_state.select(Some(row));
                    }
                }
            }
        }
        _ => {}
    }
}

fn is_mouse_in_table(x: u16, y: u16, dashboard: &crate::ui::state::DashboardState) -> bool {
    dashboard.table_inner_area.map_or(false, |area| {
        x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
    })
}

// Calculate which row is hovered based on mouse position
fn calculate_hovered_row(
    mouse_row: u16,
    inner_area: ratatui::layout::Rect,
    offset: usize,
) -> Option<usize> {
    // Skip the header row and its bottom margin
    let first_row_y = inner_area.y + 2;
    if mouse_row < first_row_y || mouse_row >= inner_area.y + inner_area.height {
        return None; // Outside table bounds
    }

    Some(offset + (mouse_row - first_row_y) as usize)
}

// Calculate which row was clicked
fn calculate_clicked_row(
    mouse_row: u16,
    inner_area: ratatui::layout::Rect,
    offset: usize,
) -> Option<usize> {
    calculate_hovered_row(mouse_row, inner_area, offset)
}
