use super::*;

use crate::engine::{EncodeJob, JoinJob, Resolution};
use crate::ui::components::{render_checkbox, render_radio_group, render_stepper};
use crate::ui::focus::SettingsFocus;
use crate::ui::widgets::progress_cell;

impl Dashboard {
    pub(super) fn format_uptime(seconds: u64) -> String {
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        let secs = seconds % 60;
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    }

    fn format_duration(seconds: u64) -> String {
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;

        if hours > 0 {
            format!("{}h {:02}m", hours, minutes)
        } else if minutes > 0 {
            format!("{}m", minutes)
        } else {
            format!("{}s", seconds)
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{} B", bytes)
        }
    }

    fn calculate_stats(data: &VecDeque<u64>) -> (u64, u64, u64) {
        if data.is_empty() {
            return (0, 0, 0);
        }

        let current = *data.back().unwrap_or(&0);
        let sum: u64 = data.iter().sum();
        let avg = sum / data.len() as u64;
        let max = *data.iter().max().unwrap_or(&0);

        (current, avg, max)
    }

    pub(super) fn render_system_metrics(frame: &mut Frame, area: Rect, state: &DashboardState) {
        // Borders eat two columns
        let available_width = area.width.saturating_sub(2) as usize;

        let data_len = state.cpu_data.len();
        let points_to_show = available_width.min(data_len);
        let start_index = data_len.saturating_sub(points_to_show);

        // Normalize to 0.0-1.0 with a 5% floor so the braille rendering
        // keeps at least one dot visible at idle
        let cpu_data: Vec<f64> = state
            .cpu_data
            .iter()
            .skip(start_index)
            .map(|&val| (val as f64 / 100.0).max(0.05))
            .collect();

        let mem_data: Vec<f64> = state
            .mem_data
            .iter()
            .skip(start_index)
            .map(|&val| (val as f64 / 100.0).max(0.05))
            .collect();

        let (cpu_current, cpu_avg, cpu_max) = Self::calculate_stats(&state.cpu_data);
        let (mem_current, mem_avg, mem_max) = Self::calculate_stats(&state.mem_data);

        let title = format!(
            "CPU: {}% (Avg: {}%, Max: {}%) | RAM: {}% (Avg: {}%, Max: {}%)",
            cpu_current, cpu_avg, cpu_max, mem_current, mem_avg, mem_max
        );

        let widget = WaveformWidget::new(&cpu_data, &mem_data)
            .mode(WaveformMode::HighResBraille)
            .top_style(Style::default().fg(Color::Cyan))
            .bottom_style(Style::default().fg(Color::Green))
            .fade_effect(true)
            .gradient_effect(true)
            .top_max(1.0)
            .bottom_max(1.0)
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::White)),
            );

        frame.render_widget(widget, area);
    }

    pub(super) fn render_queue_overview(frame: &mut Frame, area: Rect, state: &AppState) {
        let title = format!("Queue Overview — vidscale {}", state.app_version);
        let block = Block::default().borders(Borders::ALL).title(title);

        let inner = block.inner(area);
        frame.render_widget(block, area);

        // An active or finished join owns the overview until the next rescan
        if let Some(join) = &state.dashboard.join_job {
            Self::render_join_overview(frame, inner, join);
            return;
        }

        let jobs = &state.dashboard.jobs;
        let total = jobs.len();
        let completed = jobs
            .iter()
            .filter(|j| j.status == JobStatus::Completed)
            .count();
        let running = jobs
            .iter()
            .filter(|j| j.status == JobStatus::Running)
            .count();
        let queued = jobs.iter().filter(|j| j.status == JobStatus::Idle).count();
        let cancelled = jobs
            .iter()
            .filter(|j| j.status == JobStatus::Cancelled)
            .count();
        let failed = jobs.iter().filter(|j| j.status == JobStatus::Failed).count();

        let mut stats_spans = vec![
            Span::raw("Files: "),
            Span::styled(format!("{}", total), Style::default().bold()),
            Span::raw(" total • Completed: "),
            Span::styled(format!("{}", completed), Style::default().fg(Color::Green)),
            Span::raw(" • Running: "),
            Span::styled(format!("{}", running), Style::default().fg(Color::Yellow)),
            Span::raw(" • Queued: "),
            Span::styled(format!("{}", queued), Style::default().fg(Color::DarkGray)),
        ];

        if cancelled > 0 {
            stats_spans.extend(vec![
                Span::raw(" • Cancelled: "),
                Span::styled(format!("{}", cancelled), Style::default().fg(Color::Blue)),
            ]);
        }

        stats_spans.extend(vec![
            Span::raw(" • Failed: "),
            Span::styled(format!("{}", failed), Style::default().fg(Color::Red)),
        ]);

        frame.render_widget(
            Paragraph::new(Line::from(stats_spans)),
            Rect {
                x: inner.x,
                y: inner.y,
                width: inner.width,
                height: 1,
            },
        );

        // Cancelled jobs never finish, keep them out of the denominator
        let active_total = total - cancelled;
        let progress_percent = if active_total > 0 {
            ((completed as f64 / active_total as f64) * 100.0) as u16
        } else {
            0
        };

        let progress_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(Rect {
                x: inner.x,
                y: inner.y + 1,
                width: inner.width,
                height: 1,
            });

        let queue_progress = Gauge::default()
            .percent(progress_percent)
            .label(format!("{}%", progress_percent))
            .gauge_style(Style::default().fg(Color::Blue).bg(Color::Black))
            .use_unicode(true);

        frame.render_widget(queue_progress, progress_chunks[0]);

        let eta_text = Paragraph::new(Self::queue_eta(jobs))
            .style(Style::default().fg(Color::Cyan))
            .alignment(Alignment::Center);

        frame.render_widget(eta_text, progress_chunks[1]);
    }

    fn render_join_overview(frame: &mut Frame, inner: Rect, join: &JoinJob) {
        let status_line = match join.status {
            JobStatus::Completed => Line::from(vec![
                Span::styled("✓ ", Style::default().fg(Color::Green)),
                Span::raw(format!(
                    "Joined {} files → {}",
                    join.inputs.len(),
                    join.output_path.display()
                )),
            ]),
            JobStatus::Failed => Line::from(vec![
                Span::styled("✗ ", Style::default().fg(Color::Red)),
                Span::raw(
                    join.last_error
                        .clone()
                        .unwrap_or_else(|| "join failed".to_string()),
                ),
            ]),
            JobStatus::Cancelled => Line::from(vec![
                Span::styled("⊘ ", Style::default().fg(Color::Blue)),
                Span::raw("Join cancelled"),
            ]),
            _ => Line::from(format!(
                "Joining {} files → {}",
                join.inputs.len(),
                join.output_path.display()
            )),
        };

        frame.render_widget(
            Paragraph::new(status_line),
            Rect {
                x: inner.x,
                y: inner.y,
                width: inner.width,
                height: 1,
            },
        );

        let percent = if join.status == JobStatus::Completed {
            100
        } else {
            join.progress_pct.unwrap_or(0.0).clamp(0.0, 100.0) as u16
        };

        let gauge = Gauge::default()
            .percent(percent)
            .label(format!("{}%", percent))
            .gauge_style(Style::default().fg(Color::Blue).bg(Color::Black))
            .use_unicode(true);

        frame.render_widget(
            gauge,
            Rect {
                x: inner.x,
                y: inner.y + 1,
                width: inner.width,
                height: 1,
            },
        );
    }

    /// Remaining time summary for the footer cell of the overview.
    ///
    /// Queued jobs carry no duration until their probe runs, so they are
    /// reported as a count instead of folded into the estimate.
    fn queue_eta(jobs: &[EncodeJob]) -> String {
        let running_eta: u64 = jobs
            .iter()
            .filter(|j| j.status == JobStatus::Running)
            .filter_map(|j| j.displayed_eta_seconds)
            .sum();
        let queued = jobs.iter().filter(|j| j.status == JobStatus::Idle).count();

        match (running_eta > 0, queued > 0) {
            (true, true) => format!("{} +{} queued", Self::format_duration(running_eta), queued),
            (true, false) => Self::format_duration(running_eta),
            (false, true) => format!("{} queued", queued),
            (false, false) => "—".to_string(),
        }
    }

    fn status_parts(job: &EncodeJob) -> (&'static str, &'static str, Color, ProgressState) {
        match job.status {
            JobStatus::Idle => ("⏸", "Idle", Color::DarkGray, ProgressState::Pending),
            JobStatus::Running => ("▶", "Running", Color::Yellow, ProgressState::Running),
            JobStatus::Completed if job.used_cpu_fallback => {
                ("✓", "Done (CPU)", Color::Green, ProgressState::Done)
            }
            JobStatus::Completed => ("✓", "Done", Color::Green, ProgressState::Done),
            JobStatus::Cancelled => ("⊘", "Cancelled", Color::Blue, ProgressState::Done),
            JobStatus::Failed => ("✗", "Failed", Color::Red, ProgressState::Done),
        }
    }

    pub(super) fn render_jobs(frame: &mut Frame, area: Rect, state: &mut DashboardState) {
        let block = Block::default().borders(Borders::ALL).title("Jobs");

        let inner = block.inner(area);
        let rows_visible = inner
            .height
            .saturating_sub(2) // header plus margin
            .max(1) as usize;

        // Store areas for mouse handling
        state.table_area = Some(area);
        state.table_inner_area = Some(inner);

        frame.render_widget(block, area);

        let header = Row::new([
            "#", "STATUS", "SOURCE", "OUT SIZE", "FPS", "SPEED", "PROGRESS", "ETA",
        ])
        .style(Style::default().add_modifier(Modifier::BOLD))
        .bottom_margin(1);

        let widths = [
            Constraint::Length(3),  // #
            Constraint::Length(15), // STATUS (with icon)
            Constraint::Min(20),    // SOURCE
            Constraint::Length(10), // OUT SIZE
            Constraint::Length(7),  // FPS
            Constraint::Length(8),  // SPEED
            Constraint::Length(25), // PROGRESS (bar plus percentage)
            Constraint::Length(10), // ETA
        ];

        let job_count = state.jobs.len();
        if job_count == 0 {
            let table = Table::new(Vec::<Row>::new(), widths)
                .header(header)
                .column_spacing(2)
                .row_highlight_style(Style::default().reversed())
                .highlight_symbol(">> ");

            let mut render_state = state.table_state.clone();
            frame.render_stateful_widget(table, inner, &mut render_state);
            return;
        }

        // Keep selection valid and clamp offset so selection stays in view
        let mut selected = state.table_state.selected().unwrap_or(0);
        if selected >= job_count {
            selected = job_count - 1;
            state.table_state.select(Some(selected));
        }

        let mut offset = state.table_state.offset().min(selected);
        if selected < offset {
            offset = selected;
        } else if selected >= offset + rows_visible {
            offset = selected + 1 - rows_visible;
        }
        *state.table_state.offset_mut() = offset;

        let end = (offset + rows_visible).min(job_count);

        let rows: Vec<Row> = (offset..end)
            .map(|idx| {
                let job = &state.jobs[idx];
                let (status_icon, status_text, status_color, progress_state) =
                    Self::status_parts(job);

                let filename = job
                    .input_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown");

                let out_size = job
                    .size_bytes
                    .map(Self::format_size)
                    .unwrap_or_else(|| "—".to_string());

                let fps = job
                    .fps_avg
                    .map(|f| format!("{:.0}", f))
                    .unwrap_or_else(|| "—".to_string());

                let speed = job
                    .speed
                    .map(|s| format!("{:.2}x", s))
                    .unwrap_or_else(|| "—".to_string());

                let percent = if job.status == JobStatus::Completed {
                    100
                } else {
                    job.progress_pct.unwrap_or(0.0).clamp(0.0, 100.0) as u16
                };
                let progress_bar = progress_cell(percent, progress_state, 20);

                // ETA is settled as updates arrive, render reads it as is
                let eta = if job.status == JobStatus::Running {
                    job.displayed_eta_seconds
                        .map(Self::format_duration)
                        .unwrap_or_else(|| "—".to_string())
                } else {
                    "—".to_string()
                };

                let mut row = Row::new(vec![
                    Cell::from(format!("{}", idx + 1)),
                    Cell::from(format!("{} {}", status_icon, status_text))
                        .style(Style::default().fg(status_color)),
                    Cell::from(filename),
                    Cell::from(Line::from(out_size).right_aligned()),
                    Cell::from(Line::from(fps).right_aligned()),
                    Cell::from(Line::from(speed).right_aligned()),
                    Cell::from(progress_bar),
                    Cell::from(eta),
                ]);

                // Add hover effect
                if state.hovered_row == Some(idx) {
                    row = row.style(Style::default().bg(Color::DarkGray));
                }

                row
            })
            .collect();

        // Render using a temporary TableState scoped to the visible slice
        let mut render_state = ratatui::widgets::TableState::default();
        render_state.select(Some(selected - offset));

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(2)
            .row_highlight_style(Style::default().reversed())
            .highlight_symbol(">> ");

        frame.render_stateful_widget(table, inner, &mut render_state);
    }

    pub(super) fn render_settings_panel(frame: &mut Frame, area: Rect, state: &AppState) {
        let panel = &state.settings;
        let title = if panel.modified {
            "Settings (unsaved)"
        } else {
            "Settings"
        };
        let block = Block::default().borders(Borders::ALL).title(title);

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let focus = panel.focus;
        let resolution_labels: Vec<&str> = Resolution::ALL.iter().map(|r| r.label()).collect();
        let resolution_selected = Resolution::ALL
            .iter()
            .position(|r| *r == panel.resolution())
            .unwrap_or(0);

        let field = |row: u16| Rect {
            x: inner.x + 13,
            y: inner.y + row,
            width: inner.width.saturating_sub(13),
            height: 1,
        };
        let full_row = |row: u16| Rect {
            x: inner.x,
            y: inner.y + row,
            width: inner.width,
            height: 1,
        };

        let label_style = Style::default().fg(Color::Gray);
        let buf = frame.buffer_mut();

        if inner.height >= 1 {
            buf.set_string(inner.x, inner.y, "Resolution", label_style);
            render_radio_group(
                &resolution_labels,
                resolution_selected,
                focus == SettingsFocus::Resolution,
                field(0),
                buf,
            );
        }

        if inner.height >= 2 {
            render_checkbox(
                "Vertical (portrait output)",
                panel.settings.vertical,
                focus == SettingsFocus::Vertical,
                full_row(1),
                buf,
            );
        }

        if inner.height >= 3 {
            buf.set_string(inner.x, inner.y + 2, "CRF", label_style);
            render_stepper(
                &panel.settings.crf.to_string(),
                focus == SettingsFocus::Crf,
                field(2),
                buf,
            );
        }

        if inner.height >= 4 {
            buf.set_string(inner.x, inner.y + 3, "Preset", label_style);
            render_stepper(
                &panel.settings.preset,
                focus == SettingsFocus::Preset,
                field(3),
                buf,
            );
        }

        if inner.height >= 5 {
            let gpu_label = match state.dashboard.nvenc_available {
                Some(false) => "GPU (NVENC) — unavailable".to_string(),
                _ => match &state.dashboard.gpu_model {
                    Some(model) => format!("GPU (NVENC, {})", model),
                    None => "GPU (NVENC)".to_string(),
                },
            };
            render_checkbox(
                &gpu_label,
                panel.settings.use_gpu,
                focus == SettingsFocus::Gpu,
                full_row(4),
                buf,
            );
        }

        if inner.height >= 6 {
            let threads = if panel.settings.threads == 0 {
                "auto".to_string()
            } else {
                panel.settings.threads.to_string()
            };
            buf.set_string(inner.x, inner.y + 5, "Threads", label_style);
            render_stepper(&threads, focus == SettingsFocus::Threads, field(5), buf);
        }

        if inner.height >= 7 {
            let fps = match panel.settings.fps {
                Some(n) => format!("{} fps", n),
                None => "Source".to_string(),
            };
            buf.set_string(inner.x, inner.y + 6, "FPS", label_style);
            render_stepper(&fps, focus == SettingsFocus::Fps, field(6), buf);
        }
    }

    pub(super) fn render_log_tail(frame: &mut Frame, area: Rect, state: &DashboardState) {
        let (name, diagnostics, last_error, failed): (String, &[String], Option<String>, bool) =
            if let Some(join) = &state.join_job {
                (
                    "join".to_string(),
                    &join.diagnostics,
                    join.last_error.clone(),
                    join.status == JobStatus::Failed,
                )
            } else if let Some(job) = state.selected_job() {
                let name = job
                    .input_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown")
                    .to_string();
                (
                    name,
                    &job.diagnostics,
                    job.last_error.clone(),
                    job.status == JobStatus::Failed,
                )
            } else {
                ("no selection".to_string(), &[], None, false)
            };

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Log — {}", name));

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let capacity = inner.height as usize;
        let mut lines: Vec<Line> = Vec::with_capacity(capacity);

        if failed {
            if let Some(err) = &last_error {
                lines.push(Line::from(Span::styled(
                    err.clone(),
                    Style::default().fg(Color::Red),
                )));
            }
        }

        let budget = capacity.saturating_sub(lines.len());
        let start = diagnostics.len().saturating_sub(budget);
        for line in &diagnostics[start..] {
            lines.push(Line::from(line.as_str()));
        }

        if lines.is_empty() {
            lines.push(Line::from(Span::styled(
                "no tool output yet",
                Style::default().fg(Color::DarkGray),
            )));
        }

        frame.render_widget(Paragraph::new(lines), inner);
    }
}
