use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use super::common::{render_error_banner, render_footer, truncate_to_width};
use crate::app::App;
use simjudge::session::Session;
use simjudge::store::UNJUDGED_MARKER;

pub fn render(frame: &mut Frame, app: &mut App) {
    let has_error = app.engine.error().is_some();

    let mut constraints = vec![
        Constraint::Length(3), // Progress
        Constraint::Length(7), // Pair
        Constraint::Length(3), // Labels
        Constraint::Min(3),    // Results table
    ];
    if has_error {
        constraints.push(Constraint::Length(4));
    }
    constraints.push(Constraint::Length(3)); // Footer

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());

    let kb = &app.config.keybindings;
    let hints = if app.is_pending_reset_confirmation() {
        format!("Discard the session? y/{}: reset | n/Esc: cancel", kb.reset)
    } else {
        format!(
            "1-9/Enter: judge | Tab: select label | {}/{}: prev/next | {}: add label | {}: refresh | {}: download | {}: reset | {}: help | {}: quit",
            kb.prev, kb.next, kb.add_label, kb.refresh, kb.download, kb.reset, kb.help, kb.quit
        )
    };

    let Some(session) = app.engine.session() else {
        // --resume / start の取得待ち
        let loading = Paragraph::new(format!("{} Loading session...", app.spinner_char()))
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("simjudge"));
        frame.render_widget(loading, chunks[0]);
        render_footer(frame, chunks[chunks.len() - 1], app, &hints);
        return;
    };

    render_progress(frame, chunks[0], session);
    render_pair(frame, chunks[1], session);
    render_label_buttons(frame, chunks[2], app, session.current_judgment());
    let offset = render_results(frame, chunks[3], session, app.results_scroll_offset);
    app.results_scroll_offset = offset;

    if has_error {
        render_error_banner(frame, chunks[4], app);
    }
    render_footer(frame, chunks[chunks.len() - 1], app, &hints);
}

fn render_progress(frame: &mut Frame, area: Rect, session: &Session) {
    let progress = session.progress();
    let label = format!(
        "{}/{} judged ({:.0}%)",
        session.judged_count(),
        session.len(),
        progress
    );
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio((progress / 100.0).clamp(0.0, 1.0))
        .label(label);
    frame.render_widget(gauge, area);
}

fn render_pair(frame: &mut Frame, area: Rect, session: &Session) {
    let Some((item1, item2)) = session.current_pair() else {
        let empty = Paragraph::new("No pairs in this session")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Pair"));
        frame.render_widget(empty, area);
        return;
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    // 端では矢印を出さない
    let position = format!(
        "{}Pair {}/{}{}",
        if session.is_at_start() { "" } else { "< " },
        session.cursor() + 1,
        session.len(),
        if session.is_at_end() { "" } else { " >" },
    );

    for (i, item) in [item1, item2].into_iter().enumerate() {
        let title = if i == 0 {
            format!("List 1 - {}", position)
        } else {
            "List 2".to_string()
        };
        let card = Paragraph::new(item.as_str())
            .style(Style::default().add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(card, columns[i]);
    }
}

fn render_label_buttons(frame: &mut Frame, area: Rect, app: &App, active: Option<&str>) {
    let mut spans = Vec::new();
    let selected = app.selected_label();
    for (i, label) in app.labels.labels().iter().enumerate() {
        // 現在の判定と完全一致するラベルを強調
        let mut style = if active == Some(label.as_str()) {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        };
        if i == selected {
            style = style.add_modifier(Modifier::UNDERLINED | Modifier::REVERSED);
        }
        let key = if i < 9 {
            format!("{}", i + 1)
        } else {
            "-".to_string()
        };
        spans.push(Span::styled(format!(" {} {} ", key, label), style));
        spans.push(Span::raw(" "));
    }
    let title = if app.engine.is_judgment_pending() {
        format!("Labels {}", app.spinner_char())
    } else {
        "Labels".to_string()
    };
    let buttons =
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(buttons, area);
}

/// 結果テーブル。現在行を選択状態にし、描画後のオフセットを返す
fn render_results(frame: &mut Frame, area: Rect, session: &Session, offset: usize) -> usize {
    let item_width = (area.width.saturating_sub(20) / 2) as usize;
    let rows: Vec<Row> = session
        .pairs()
        .iter()
        .enumerate()
        .map(|(i, (item1, item2))| {
            let judgment = match session.judgment(i) {
                Some(label) => Cell::from(label.to_string()),
                None => Cell::from(UNJUDGED_MARKER).style(Style::default().fg(Color::DarkGray)),
            };
            Row::new(vec![
                Cell::from(format!("{}", i + 1)),
                Cell::from(truncate_to_width(item1, item_width)),
                Cell::from(truncate_to_width(item2, item_width)),
                judgment,
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(5),
            Constraint::Percentage(40),
            Constraint::Percentage(40),
            Constraint::Min(8),
        ],
    )
    .header(
        Row::new(vec!["#", "List 1", "List 2", "Judgment"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .row_highlight_style(Style::default().bg(Color::DarkGray))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Results ({})", session.len())),
    );

    let mut state = TableState::default()
        .with_offset(offset)
        .with_selected(if session.is_empty() {
            None
        } else {
            Some(session.cursor())
        });
    frame.render_stateful_widget(table, area, &mut state);
    state.offset()
}
