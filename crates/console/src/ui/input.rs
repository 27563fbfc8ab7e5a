use admin_api::DisputeAction;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::warn;

use crate::app::{AppState, InputMode};

/// Returns true when the operator asked to quit.
pub(crate) fn handle_key_event(key: KeyEvent, app: &mut AppState, row_count: usize) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if app.input_mode == InputMode::FilterEdit {
        handle_filter_edit_key(key, app);
        return false;
    }

    if app.confirm_quit {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => return true,
            KeyCode::Esc => {
                app.confirm_quit = false;
                return false;
            }
            _ => {
                app.confirm_quit = false;
            }
        }
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => app.confirm_quit = true,
        KeyCode::Esc => {
            app.dismiss_notification();
        }
        KeyCode::Tab => {
            if let Err(err) = app.next_tab() {
                let error = format!("{err:#}");
                warn!(event = "tab.mount_failed", error = %error, "failed to switch tab");
            }
        }
        KeyCode::Down | KeyCode::Char('j') => app.select_next(row_count),
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(row_count),
        KeyCode::Right | KeyCode::Char('n') => app.next_page(),
        KeyCode::Left | KeyCode::Char('p') => app.prev_page(),
        KeyCode::Char('/') => app.begin_filter_edit(),
        KeyCode::Char('c') => app.clear_filters(),
        KeyCode::Char('r') => app.refresh(),
        KeyCode::Char('P') => app.toggle_polling(),
        KeyCode::Char('a') => app.dispute_action(DisputeAction::Accept),
        KeyCode::Char('x') => app.dispute_action(DisputeAction::Reject),
        KeyCode::Char('f') => app.dispute_action(DisputeAction::Freeze),
        KeyCode::Char('t') => app.toggle_traffic(),
        _ => {}
    }
    false
}

fn handle_filter_edit_key(key: KeyEvent, app: &mut AppState) {
    match key.code {
        KeyCode::Enter => app.submit_filter_edit(),
        KeyCode::Esc => app.cancel_filter_edit(),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Char(ch) => app.input.push(ch),
        _ => {}
    }
}
