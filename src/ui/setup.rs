use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::common::{render_error_banner, render_footer, truncate_to_width};
use crate::app::App;
use simjudge::source::{ColumnField, InputMode};

pub fn render(frame: &mut Frame, app: &mut App) {
    let has_error = app.engine.error().is_some();

    let mut constraints = vec![
        Constraint::Length(3), // Header
        Constraint::Length(3), // Labels
        Constraint::Min(0),    // Source
    ];
    if has_error {
        constraints.push(Constraint::Length(4));
    }
    constraints.push(Constraint::Length(3)); // Footer

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());

    // Header: input mode tabs
    let tabs: Vec<Span> = [InputMode::Text, InputMode::Csv]
        .into_iter()
        .flat_map(|mode| {
            let style = if mode == app.source.mode {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            [
                Span::styled(format!(" {} ", mode.display_name()), style),
                Span::raw(" "),
            ]
        })
        .collect();
    let header = Paragraph::new(Line::from(tabs))
        .block(Block::default().borders(Borders::ALL).title("simjudge - setup"));
    frame.render_widget(header, chunks[0]);

    // Labels
    let labels = app.labels.labels();
    let label_line = if labels.is_empty() {
        Line::from(Span::styled(
            "(no labels)",
            Style::default().fg(Color::Red),
        ))
    } else {
        Line::from(
            labels
                .iter()
                .enumerate()
                .flat_map(|(i, label)| {
                    [
                        Span::styled(format!("{}", i + 1), Style::default().fg(Color::Yellow)),
                        Span::raw(format!(":{}  ", label)),
                    ]
                })
                .collect::<Vec<_>>(),
        )
    };
    let labels_widget =
        Paragraph::new(label_line).block(Block::default().borders(Borders::ALL).title("Labels"));
    frame.render_widget(labels_widget, chunks[1]);

    match app.source.mode {
        InputMode::Text => render_text_source(frame, chunks[2], app),
        InputMode::Csv => render_csv_source(frame, chunks[2], app),
    }

    if has_error {
        render_error_banner(frame, chunks[3], app);
    }

    let kb = &app.config.keybindings;
    let mode_hints = match app.source.mode {
        InputMode::Text => "1/2: edit list".to_string(),
        InputMode::Csv => format!("f: open CSV | j/k: field | {}/{}: column", kb.prev, kb.next),
    };
    let start_hint = if app.can_start() { "Enter: start" } else { "" };
    let hints = format!(
        "{} | Tab: mode | {}: labels | {}: add label | {}: resume | {}: help | {}: quit  {}",
        mode_hints, kb.edit_labels, kb.add_label, kb.refresh, kb.help, kb.quit, start_hint
    );
    render_footer(frame, chunks[chunks.len() - 1], app, &hints);
}

fn render_text_source(frame: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let (count1, count2) = app.source.text.line_counts();

    for (i, (text, count)) in [
        (&app.source.text.list1, count1),
        (&app.source.text.list2, count2),
    ]
    .into_iter()
    .enumerate()
    {
        let width = columns[i].width.saturating_sub(2) as usize;
        let body: Vec<Line> = if text.trim().is_empty() {
            vec![Line::from(Span::styled(
                format!("Press {} to edit in your editor", i + 1),
                Style::default().fg(Color::DarkGray),
            ))]
        } else {
            text.lines()
                .map(|l| Line::from(truncate_to_width(l, width)))
                .collect()
        };
        let widget = Paragraph::new(body).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("List {} ({} items)", i + 1, count)),
        );
        frame.render_widget(widget, columns[i]);
    }
}

fn render_csv_source(frame: &mut Frame, area: Rect, app: &App) {
    let Some(csv) = app.source.csv.as_ref() else {
        let empty = Paragraph::new("No CSV loaded. Press f to open a file.")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title("CSV"));
        frame.render_widget(empty, area);
        return;
    };

    let fields = [
        (ColumnField::Column1, "List 1 column"),
        (ColumnField::Column2, "List 2 column"),
        (ColumnField::Annotation, "Annotation column"),
    ];
    let mut lines = vec![
        Line::from(format!(
            "{} ({} rows, {} columns)",
            csv.file_name,
            csv.row_count(),
            csv.headers().len()
        )),
        Line::from(""),
    ];
    for (field, name) in fields {
        let focused = field == app.source.focused_column;
        let marker = if focused { "▶ " } else { "  " };
        let value = csv.value(field).unwrap_or("(none)");
        let style = if focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::raw(marker),
            Span::raw(format!("{:<18}", name)),
            Span::styled(format!("◀ {} ▶", value), style),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Headers: {}", csv.headers().join(", ")),
        Style::default().fg(Color::DarkGray),
    )));

    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("CSV"));
    frame.render_widget(widget, area);
}
