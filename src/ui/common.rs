use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::App;

/// 表示幅を超える文字列を `…` で切り詰める（全角文字の幅を考慮）
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    let budget = max_width.saturating_sub(1);
    let mut width = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > budget {
            break;
        }
        width += w;
        out.push(c);
    }
    out.push('…');
    out
}

/// Error banner (the engine's single error slot). Renders nothing without one.
pub fn render_error_banner(frame: &mut Frame, area: Rect, app: &App) {
    let Some(message) = app.engine.error() else {
        return;
    };
    let banner = Paragraph::new(format!("Error: {}", message))
        .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Error"));
    frame.render_widget(banner, area);
}

/// Footer with a transient result message, or the given key hints.
pub fn render_footer(frame: &mut Frame, area: Rect, app: &App, hints: &str) {
    let line = match &app.submission_result {
        Some((true, message)) => Line::from(Span::styled(
            format!("✓ {}", message),
            Style::default().fg(Color::Green),
        )),
        Some((false, message)) => Line::from(Span::styled(
            format!("✗ {}", message),
            Style::default().fg(Color::Red),
        )),
        None if app.is_busy() => Line::from(vec![
            Span::styled(
                format!("{} {}  ", app.spinner_char(), busy_label(app)),
                Style::default().fg(Color::Yellow),
            ),
            Span::raw(hints.to_string()),
        ]),
        None => Line::from(hints.to_string()),
    };
    let footer = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}

fn busy_label(app: &App) -> &'static str {
    if app.is_starting() {
        "Starting session..."
    } else if app.is_fetching() {
        "Loading pairs..."
    } else if app.is_resetting() {
        "Resetting..."
    } else if app.is_exporting() {
        "Downloading results..."
    } else {
        "Saving..."
    }
}

/// Centered popup rect of the given percentage width and fixed height
pub fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

/// 1行入力のポップアップ
pub fn render_text_input(frame: &mut Frame, app: &App) {
    let Some(target) = app.input_target else {
        return;
    };
    let area = centered_rect(60, 3, frame.area());
    let (before, after) = app.input.split_at_cursor();
    let line = Line::from(vec![
        Span::raw(before.to_string()),
        Span::styled("▏", Style::default().fg(Color::Yellow)),
        Span::raw(after.to_string()),
    ]);
    let popup = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(format!("{} (Enter: ok, Esc: cancel)", target.title())),
    );
    frame.render_widget(Clear, area);
    frame.render_widget(popup, area);
}
