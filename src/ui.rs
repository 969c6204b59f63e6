use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style},
  text::{Line, Span},
  widgets::{Block, BorderType, List, ListItem, ListState, Padding, Paragraph},
};

use crate::app::App;
use crate::session::{Phase, ViewModel};
use crate::theme::Theme;

const HEADER_LINES: usize = 2;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

/// Keep the cursor column inside a window of `width` columns starting at `scroll`.
fn adjust_scroll(scroll: usize, cursor_col: usize, width: usize) -> usize {
  if cursor_col < scroll {
    cursor_col
  } else if cursor_col >= scroll + width {
    cursor_col.saturating_sub(width) + 1
  } else {
    scroll
  }
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();
  let view = app.view();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  if app.session.phase() == Phase::Populated {
    render_results(frame, theme, &view, main_area);
  } else {
    render_welcome(frame, app, main_area);
  }
  render_status(frame, app, &view, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, theme, &view, footer_area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let left = Line::from(vec![
    Span::styled(" ▶ zap ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
    Span::styled(format!("[{}] ", app.session.category()), Style::default().fg(theme.fg)),
    Span::styled(format!("{} channels", app.indexed_count()), Style::default().fg(theme.muted)),
  ]);
  frame.render_widget(left, area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn render_welcome(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let subtitle = if app.input.trim().is_empty() {
    format!("Type to search {} {} channels.", app.indexed_count(), app.session.category())
  } else if app.session.has_pending() {
    "Searching…".to_string()
  } else {
    "No matching channels.".to_string()
  };
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("▶  zap", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled(subtitle, Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(Span::styled("Tab switches category. Enter plays the selection.", Style::default().fg(theme.muted))),
  ];
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
    Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border)),
  );
  frame.render_widget(paragraph, area);
}

fn render_results(frame: &mut Frame, theme: &Theme, view: &ViewModel, area: Rect) {
  // Inner width: area minus 2 borders
  let inner_w = area.width.saturating_sub(2) as usize;

  let items: Vec<ListItem> = view
    .rendered_lines
    .iter()
    .enumerate()
    .map(|(i, line)| {
      let style = if i < HEADER_LINES {
        Style::default().fg(theme.muted)
      } else if Some(i) == view.selected_line {
        Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD)
      } else if i % 2 == 1 {
        Style::default().fg(theme.fg).bg(theme.stripe_bg)
      } else {
        Style::default().fg(theme.fg)
      };
      ListItem::new(Line::from(Span::styled(truncate_str(line, inner_w), style)))
    })
    .collect();

  let list = List::new(items).block(
    Block::bordered()
      .title(" Channels ")
      .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
      .border_type(BorderType::Rounded)
      .border_style(Style::default().fg(theme.border)),
  );

  let mut state = ListState::default().with_selected(view.selected_line);
  frame.render_stateful_widget(list, area, &mut state);
}

fn render_status(frame: &mut Frame, app: &App, view: &ViewModel, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(err) = view.error.as_ref().or(app.last_error.as_ref()) {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if app.session.sink().is_playing() {
    let url = app.session.sink().current_url().unwrap_or_default();
    (format!(" ♪ {}", url), Style::default().fg(theme.status))
  } else if let Some(msg) = &app.status_message {
    let icon = if app.is_ingesting() { "⏳" } else { "✓" };
    (format!(" {} {}", icon, msg), Style::default().fg(theme.status))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let input_block = Block::bordered()
    .title(format!(" Search {} ", app.session.category()))
    .title_style(Style::default().fg(theme.accent))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(theme.accent))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.input, app.cursor_position);
  app.input_scroll = adjust_scroll(app.input_scroll, cursor_col, inner_w.max(1));

  let visible: String = app
    .input
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.input_scroll)
    .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  let cursor_x = area.x + 2 + (cursor_col - app.input_scroll) as u16;
  frame.set_cursor_position((cursor_x, area.y + 1));
}

fn render_footer(frame: &mut Frame, theme: &Theme, view: &ViewModel, area: Rect) {
  let mut spans = vec![Span::styled(format!(" {}", view.help_text), Style::default().fg(theme.muted))];
  spans.push(Span::raw("  "));
  spans.push(Span::styled(" ^t ", Style::default().fg(theme.key_fg).bg(theme.key_bg)));
  spans.push(Span::styled(" Theme ", Style::default().fg(theme.muted)));
  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_width_counts_wide_chars() {
    assert_eq!(display_width("abc", 2), 2);
    assert_eq!(display_width("日本", 2), 4);
    assert_eq!(display_width("a日", 5), 3);
  }

  #[test]
  fn truncate_keeps_short_strings() {
    assert_eq!(truncate_str("Chan 001", 20), "Chan 001");
    assert_eq!(truncate_str("Lorem Ipsum", 6), "Lorem…");
  }

  #[test]
  fn scroll_follows_cursor() {
    assert_eq!(adjust_scroll(0, 3, 10), 0);
    assert_eq!(adjust_scroll(0, 10, 10), 1);
    assert_eq!(adjust_scroll(5, 2, 10), 2);
    assert_eq!(adjust_scroll(4, 8, 10), 4);
  }
}
