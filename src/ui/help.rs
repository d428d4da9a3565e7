use ratatui::{
    layout::{Constraint, Direction, Layout, Margin},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame,
};

use crate::app::App;
use simjudge::config::KeybindingsConfig;

/// Format a key display with padding for alignment
fn fmt_key(key: &str, width: usize) -> String {
    format!("  {:<width$}", key, width = width)
}

fn section(title: &'static str) -> Line<'static> {
    Line::from(vec![Span::styled(
        title,
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )])
}

pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Help content
        ])
        .split(frame.area());

    let title = Paragraph::new("simjudge - pairwise similarity annotation")
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(title, chunks[0]);

    let help_lines = build_help_lines(&app.config.keybindings);
    let total_lines = help_lines.len();
    // Content area height (subtract 2 for borders)
    let content_height = chunks[1].height.saturating_sub(2) as usize;

    let max_scroll = total_lines.saturating_sub(content_height);
    if app.help_scroll_offset > max_scroll {
        app.help_scroll_offset = max_scroll;
    }

    let help = Paragraph::new(help_lines)
        .block(Block::default().borders(Borders::ALL).title("Keybindings"))
        .scroll((app.help_scroll_offset as u16, 0));
    frame.render_widget(help, chunks[1]);

    if total_lines > content_height {
        let mut scrollbar_state =
            ScrollbarState::new(max_scroll + 1).position(app.help_scroll_offset);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(None)
            .end_symbol(None);
        frame.render_stateful_widget(
            scrollbar,
            chunks[1].inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

fn build_help_lines(kb: &KeybindingsConfig) -> Vec<Line<'static>> {
    let key_width = 14;
    let key = |k: String| fmt_key(&k, key_width);

    vec![
        Line::from(""),
        section("Setup"),
        Line::from(format!("{}  Switch between text lists and CSV", key("Tab".into()))),
        Line::from(format!("{}  Edit list 1 / list 2 in $EDITOR", key("1 / 2".into()))),
        Line::from(format!("{}  Open a CSV file", key("f".into()))),
        Line::from(format!(
            "{}  Choose the column to change",
            key("j/k, Down/Up".into())
        )),
        Line::from(format!(
            "{}  Cycle the column",
            key(format!("{}/{}, Left/Right", kb.prev, kb.next))
        )),
        Line::from(format!("{}  Edit all labels", key(kb.edit_labels.to_string()))),
        Line::from(format!("{}  Resume the stored session", key(kb.refresh.to_string()))),
        Line::from(format!("{}  Start comparing", key("Enter".into()))),
        Line::from(""),
        section("Annotation"),
        Line::from(format!("{}  Judge with the Nth label", key("1-9".into()))),
        Line::from(format!(
            "{}  Select a label",
            key("Tab/S-Tab, Down/Up".into())
        )),
        Line::from(format!(
            "{}  Judge with the selected label",
            key("Enter / Space".into())
        )),
        Line::from(format!(
            "{}  Previous / next pair",
            key(format!("{}/{}, Left/Right", kb.prev, kb.next))
        )),
        Line::from(format!("{}  Reload pairs and results", key(kb.refresh.to_string()))),
        Line::from(format!(
            "{}  Download results table",
            key(kb.download.to_string())
        )),
        Line::from(format!(
            "{}  Reset session (asks first)",
            key(kb.reset.to_string())
        )),
        Line::from(format!("{}  Dismiss error", key("Esc".into()))),
        Line::from(""),
        section("Everywhere"),
        Line::from(format!("{}  Add a label", key(kb.add_label.to_string()))),
        Line::from(format!("{}  Toggle help", key(kb.help.to_string()))),
        Line::from(format!("{}  Quit", key(kb.quit.to_string()))),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Judgments are saved as you go; a failed save is undone and shown as an error.",
            Style::default().fg(Color::DarkGray),
        )]),
    ]
}
