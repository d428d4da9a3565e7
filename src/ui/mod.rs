mod annotate;
mod common;
mod help;
mod setup;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use std::io::{self, Stdout};

use crate::app::{App, AppState};

pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

pub fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

pub fn render(frame: &mut Frame, app: &mut App) {
    let screen = match app.state {
        AppState::TextInput => app.previous_state,
        other => other,
    };
    match screen {
        AppState::Setup => setup::render(frame, app),
        AppState::Annotating => annotate::render(frame, app),
        AppState::Help => help::render(frame, app),
        AppState::TextInput => {}
    }
    if app.state == AppState::TextInput {
        common::render_text_input(frame, app);
    }
}
