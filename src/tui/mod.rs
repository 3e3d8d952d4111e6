pub mod render;
pub mod state;

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use futures_util::StreamExt;
use ratatui::prelude::*;
use state::{AppState, View};
use std::io::stdout;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Commands the TUI sends to the presenter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TuiCommand {
    Quit,
    /// Drop the task on screen and fetch a fresh one.
    Reload,
    /// Submit the answer at `index` of the configured answers for the task
    /// that was on screen when the key was pressed.
    Answer { task_id: u64, index: usize },
}

/// Map a key press to a command. Digits 1-9 pick an answer, and only while a
/// task (`task_id`) is on screen.
pub fn command_for_key(
    key: &KeyEvent,
    answer_count: usize,
    task_id: Option<u64>,
) -> Option<TuiCommand> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(TuiCommand::Quit),
        KeyCode::Char('r') => Some(TuiCommand::Reload),
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            let task_id = task_id?;
            (index < answer_count).then_some(TuiCommand::Answer { task_id, index })
        }
        _ => None,
    }
}

/// Run the TUI. Reads state from `state_rx`, sends commands on `cmd_tx`.
pub async fn run_tui(
    state_rx: watch::Receiver<AppState>,
    cmd_tx: mpsc::Sender<TuiCommand>,
) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = tui_loop(&mut terminal, state_rx, cmd_tx).await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

async fn tui_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    mut state_rx: watch::Receiver<AppState>,
    cmd_tx: mpsc::Sender<TuiCommand>,
) -> Result<()> {
    let mut events = EventStream::new();
    // Redraw tick keeps the success banner and uptime moving between updates.
    let mut tick = tokio::time::interval(Duration::from_millis(250));

    loop {
        let state = state_rx.borrow().clone();
        terminal.draw(|f| render::draw(f, &state))?;

        tokio::select! {
            _ = tick.tick() => {}
            changed = state_rx.changed() => {
                if changed.is_err() {
                    // Presenter is gone.
                    return Ok(());
                }
            }
            event = events.next() => {
                let Some(event) = event else { return Ok(()) };
                if let Event::Key(key) = event? {
                    let on_screen = state.task.as_ref().filter(|_| state.view == View::Task).map(|t| t.id);
                    if let Some(cmd) = command_for_key(&key, state.answers.len(), on_screen) {
                        let quit = cmd == TuiCommand::Quit;
                        let _ = cmd_tx.send(cmd).await;
                        if quit {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_digit_keys_map_to_answers() {
        assert_eq!(
            command_for_key(&press(KeyCode::Char('1')), 3, Some(7)),
            Some(TuiCommand::Answer { task_id: 7, index: 0 })
        );
        assert_eq!(
            command_for_key(&press(KeyCode::Char('3')), 3, Some(7)),
            Some(TuiCommand::Answer { task_id: 7, index: 2 })
        );
        assert_eq!(command_for_key(&press(KeyCode::Char('4')), 3, Some(7)), None);
    }

    #[test]
    fn test_digit_keys_ignored_without_task() {
        assert_eq!(command_for_key(&press(KeyCode::Char('1')), 3, None), None);
    }

    #[test]
    fn test_control_keys() {
        for task_id in [None, Some(7)] {
            assert_eq!(command_for_key(&press(KeyCode::Char('q')), 3, task_id), Some(TuiCommand::Quit));
            assert_eq!(command_for_key(&press(KeyCode::Esc), 3, task_id), Some(TuiCommand::Quit));
            assert_eq!(command_for_key(&press(KeyCode::Char('r')), 3, task_id), Some(TuiCommand::Reload));
            assert_eq!(command_for_key(&press(KeyCode::Char('x')), 3, task_id), None);
        }
    }
}
