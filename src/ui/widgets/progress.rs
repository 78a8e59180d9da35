// Progress bar cell for the jobs table and ETA smoothing

/// Visual treatment of a progress bar depending on the job's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    Running,
    Done,
    Pending,
}

/// Render a textual progress bar for a table cell.
pub fn progress_cell(percent: u16, state: ProgressState, width: usize) -> String {
    let percent = percent.min(100);
    let filled = (width as f64 * (percent as f64 / 100.0)).round() as usize;
    let empty = width.saturating_sub(filled);

    let (filled_char, empty_char) = match state {
        ProgressState::Running => ('█', '░'),
        ProgressState::Done => ('█', ' '),
        ProgressState::Pending => ('░', '░'),
    };

    format!(
        "{}{} {}%",
        filled_char.to_string().repeat(filled),
        empty_char.to_string().repeat(empty),
        percent
    )
}

/// Dampen ETA jitter: the displayed value only moves when the fresh
/// estimate differs by more than two seconds or five percent.
pub fn settle_eta(displayed: Option<u64>, fresh: u64) -> u64 {
    match displayed {
        Some(old) => {
            let diff = fresh.abs_diff(old);
            if diff > 2 || (diff as f64 / old.max(1) as f64) > 0.05 {
                fresh
            } else {
                old
            }
        }
        None => fresh,
    }
}
