use std::{io::stdout, path::PathBuf, time::Duration};

use crate::gui::error::TactGuiError;

use crossterm::{
    event::{self, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{
        block::{Position, Title},
        *,
    },
    Terminal,
};

/// Full-screen picker over the candidate serial ports. Returns the chosen
/// path, or `None` when the user bails out (or there is nothing to pick).
pub fn device_selector(
    mut available_ports: Vec<PathBuf>,
) -> Result<Option<PathBuf>, TactGuiError> {
    let n_ports = available_ports.len();
    if n_ports == 0 {
        return Ok(None);
    }

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let mut cursor = 0;
    let mut list_state = ListState::default().with_selected(Some(cursor));
    let mut selected_port = None;
    loop {
        let title = Title::from(" Tact Device Selector ".cyan().bold());
        let instructions = Title::from(Line::from(vec![
            " Move ".into(),
            "<Up>/<Down>".cyan().bold(),
            " Connect ".into(),
            "<Enter>".cyan().bold(),
            " Abort ".into(),
            "<Q> ".cyan().bold(),
        ]));
        let block = Block::default()
            .title(title.alignment(Alignment::Center))
            .title(
                instructions
                    .alignment(Alignment::Center)
                    .position(Position::Bottom),
            )
            .borders(Borders::ALL);
        let port_names = available_ports.iter().map(|p| p.to_string_lossy());
        let list = List::new(port_names)
            .style(Style::default().fg(Color::White))
            .highlight_symbol(">>")
            .highlight_style(Style::default().fg(Color::Cyan))
            .block(block);
        list_state.select(Some(cursor));
        terminal.draw(|frame| {
            let area = frame.size();
            frame.render_stateful_widget(list, area, &mut list_state);
        })?;

        if !event::poll(Duration::from_millis(16))? {
            continue;
        }
        if let event::Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Down => cursor = (cursor + 1) % n_ports,
                KeyCode::Up => cursor = (cursor + n_ports - 1) % n_ports,
                KeyCode::Enter => {
                    selected_port = Some(cursor);
                    break;
                }
                KeyCode::Char('q') => break,
                _ => {}
            }
        }
    }

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(selected_port.map(|i| available_ports.swap_remove(i)))
}
