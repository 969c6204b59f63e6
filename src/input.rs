use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;
use crate::session::SessionEvent;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) {
    match key.code {
      KeyCode::Char('c') => app.quit(),
      KeyCode::Char('t') => app.next_theme(),
      _ => {}
    }
    return;
  }

  match key.code {
    KeyCode::Up => app.session.handle(SessionEvent::MoveUp),
    KeyCode::Down => app.session.handle(SessionEvent::MoveDown),
    KeyCode::Enter => app.session.handle(SessionEvent::Activate),
    KeyCode::Tab => app.session.handle(SessionEvent::NextCategory),
    KeyCode::Esc => {
      if app.input.is_empty() {
        app.quit();
      } else {
        app.clear_input();
      }
    }
    _ => handle_edit_key(app, key.code),
  }
}

fn handle_edit_key(app: &mut App, code: KeyCode) {
  match code {
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
      app.input.insert(byte_idx, c);
      app.cursor_position += 1;
      app.text_changed();
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
        app.text_changed();
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.input.chars().count() {
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
        app.text_changed();
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.input.chars().count();
    }
    _ => {}
  }
}
