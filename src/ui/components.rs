// Reusable UI components

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

pub struct Footer {
    content: Line<'static>,
}

impl Footer {
    pub fn dashboard_with_stats(
        total: usize,
        completed: usize,
        failed: usize,
        uptime: String,
        busy: bool,
        status: Option<&str>,
    ) -> Self {
        // A transient status message replaces the stats until the next one
        let lead = match status {
            Some(message) => format!("{}  |  ", message),
            None => format!(
                "Jobs: {}, Completed: {}, Failed: {}, Uptime: {}  |  ",
                total, completed, failed, uptime
            ),
        };

        let mut spans = vec![Span::raw(lead)];

        let controls: &[(&str, &str)] = if busy {
            &[("[C]", "ancel"), ("[Q]", "uit")]
        } else {
            &[
                ("[S]", "tart"),
                ("[J]", "oin"),
                ("[R]", "escan"),
                ("[D]", "elete"),
                ("[W]", "rite config"),
                ("[Tab]", " Field"),
                ("[←/→]", " Adjust"),
                ("[Q]", "uit"),
            ]
        };

        for (i, (hotkey, desc)) in controls.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw("  "));
            }
            spans.push(Span::styled(*hotkey, Style::default().fg(Color::Yellow)));
            spans.push(Span::raw(*desc));
        }

        Self {
            content: Line::from(spans),
        }
    }
}

impl Widget for Footer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.content)
            .style(Style::default().bg(Color::DarkGray))
            .render(area, buf);
    }
}

pub fn render_checkbox(label: &str, checked: bool, focused: bool, area: Rect, buf: &mut Buffer) {
    let symbol = if checked { "[x]" } else { "[ ]" };
    let symbol_style = if focused {
        Style::default().fg(Color::Yellow).bold()
    } else {
        Style::default().fg(Color::Cyan)
    };

    let text = Line::from(vec![
        Span::styled(symbol, symbol_style),
        Span::raw(" "),
        Span::raw(label.to_string()),
    ]);

    buf.set_line(area.x, area.y, &text, area.width);
}

pub fn render_radio_group(
    options: &[&str],
    selected_index: usize,
    focused: bool,
    area: Rect,
    buf: &mut Buffer,
) {
    let mut spans = Vec::new();

    for (i, option) in options.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }

        let symbol = if i == selected_index { "(•)" } else { "( )" };
        let symbol_style = if focused && i == selected_index {
            Style::default().fg(Color::Yellow).bold()
        } else if i == selected_index {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        spans.push(Span::styled(symbol, symbol_style));
        spans.push(Span::raw(" "));
        spans.push(Span::raw(option.to_string()));
    }

    let text = Line::from(spans);
    buf.set_line(area.x, area.y, &text, area.width);
}

/// A stepper value shown as `‹ value ›`, highlighted when focused.
pub fn render_stepper(value: &str, focused: bool, area: Rect, buf: &mut Buffer) {
    let style = if focused {
        Style::default().fg(Color::Yellow).bold()
    } else {
        Style::default().fg(Color::White)
    };

    let text = Line::from(vec![
        Span::styled("‹ ", Style::default().fg(Color::DarkGray)),
        Span::styled(value.to_string(), style),
        Span::styled(" ›", Style::default().fg(Color::DarkGray)),
    ]);

    buf.set_line(area.x, area.y, &text, area.width);
}
