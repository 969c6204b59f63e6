//! Interactive search session.
//!
//! The host forwards decoded key events through [`Session::handle`] in arrival order.
//! Text changes only record the latest pending query; the host calls [`Session::tick`]
//! once it has drained its input queue, so a burst of keystrokes costs a single search
//! against the newest text.

use tracing::{info, warn};

use crate::models::{Category, ChannelRecord};
use crate::player::PlaybackSink;
use crate::query::QueryEngine;

pub const HELP_TEXT: &str = "Up/Down to navigate  |  ENTER to play  |  Tab to switch category  |  Ctrl+C to quit";

const SELECTED_MARKER: &str = ">>";
const UNSELECTED_MARKER: &str = "  ";
const HEADER_LINES: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
  TextChanged(String),
  MoveUp,
  MoveDown,
  Activate,
  NextCategory,
  Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
  pub matches: Vec<ChannelRecord>,
  pub selected_index: usize,
  pub view_start_index: usize,
  pub max_visible_rows: usize,
  pub last_query: String,
}

impl SessionState {
  fn new(max_visible_rows: usize) -> Self {
    Self {
      matches: Vec::new(),
      selected_index: 0,
      view_start_index: 0,
      max_visible_rows: max_visible_rows.max(1),
      last_query: String::new(),
    }
  }

  fn reset_selection(&mut self) {
    self.selected_index = 0;
    self.view_start_index = 0;
  }

  /// Clamp the selection into the result list, then move the window just enough to contain it.
  fn scroll_into_view(&mut self) {
    if self.matches.is_empty() {
      self.reset_selection();
      return;
    }
    self.selected_index = self.selected_index.min(self.matches.len() - 1);
    if self.selected_index < self.view_start_index {
      self.view_start_index = self.selected_index;
    } else if self.selected_index >= self.view_start_index + self.max_visible_rows {
      self.view_start_index = self.selected_index + 1 - self.max_visible_rows;
    }
  }

  /// Rows currently inside the viewport.
  pub fn visible(&self) -> &[ChannelRecord] {
    let start = self.view_start_index.min(self.matches.len());
    let end = (start + self.max_visible_rows).min(self.matches.len());
    &self.matches[start..end]
  }
}

/// Coarse session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Empty,
  Populated,
  Closed,
}

/// Everything the host needs to draw one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewModel {
  pub rendered_lines: Vec<String>,
  pub help_text: String,
  /// Index into `rendered_lines` of the highlighted row.
  pub selected_line: Option<usize>,
  /// Last search failure, for diagnostics only.
  pub error: Option<String>,
}

pub struct Session<P: PlaybackSink> {
  engine: QueryEngine,
  sink: P,
  category: Category,
  state: SessionState,
  pending_query: Option<String>,
  last_error: Option<String>,
  closed: bool,
}

impl<P: PlaybackSink> Session<P> {
  pub fn new(engine: QueryEngine, sink: P, category: Category, max_visible_rows: usize) -> Self {
    Self {
      engine,
      sink,
      category,
      state: SessionState::new(max_visible_rows),
      pending_query: None,
      last_error: None,
      closed: false,
    }
  }

  pub fn state(&self) -> &SessionState {
    &self.state
  }

  pub fn category(&self) -> Category {
    self.category
  }

  pub fn engine(&self) -> &QueryEngine {
    &self.engine
  }

  pub fn sink(&self) -> &P {
    &self.sink
  }

  pub fn sink_mut(&mut self) -> &mut P {
    &mut self.sink
  }

  pub fn has_pending(&self) -> bool {
    self.pending_query.is_some()
  }

  pub fn phase(&self) -> Phase {
    if self.closed {
      Phase::Closed
    } else if self.state.matches.is_empty() {
      Phase::Empty
    } else {
      Phase::Populated
    }
  }

  pub fn is_closed(&self) -> bool {
    self.closed
  }

  /// Apply one input event. Events after [`SessionEvent::Exit`] are ignored.
  pub fn handle(&mut self, event: SessionEvent) {
    if self.closed {
      return;
    }
    match event {
      SessionEvent::TextChanged(text) => self.pending_query = Some(text),
      SessionEvent::MoveUp => self.move_selection(-1),
      SessionEvent::MoveDown => self.move_selection(1),
      SessionEvent::Activate => self.activate(),
      SessionEvent::NextCategory => self.next_category(),
      SessionEvent::Exit => self.exit(),
    }
  }

  /// Idle tick: evaluate the most recent pending query, if any. Returns whether a search ran.
  pub fn tick(&mut self) -> bool {
    let Some(text) = self.pending_query.take() else { return false };
    self.query_changed(&text);
    true
  }

  /// Re-run the current query against fresh index contents, keeping the selection.
  /// A newer pending text always takes precedence.
  pub fn refresh(&mut self) {
    if self.closed || self.pending_query.is_some() || self.state.last_query.is_empty() {
      return;
    }
    self.pending_query = Some(self.state.last_query.clone());
  }

  pub fn query_changed(&mut self, text: &str) {
    let query = text.trim();
    if query.is_empty() {
      self.state.matches.clear();
      self.state.reset_selection();
      self.state.last_query.clear();
      self.last_error = None;
      return;
    }

    self.state.matches = match self.engine.search(query, self.category) {
      Ok(matches) => {
        self.last_error = None;
        matches
      }
      Err(e) => {
        warn!(query = %query, category = %self.category, err = %e, "session: search failed");
        self.last_error = Some(format!("Search failed: {}", e));
        Vec::new()
      }
    };

    if query != self.state.last_query {
      self.state.reset_selection();
      self.state.last_query = query.to_string();
    }
    self.state.scroll_into_view();
  }

  pub fn move_selection(&mut self, delta: isize) {
    if self.state.matches.is_empty() {
      return;
    }
    self.state.selected_index = self.state.selected_index.saturating_add_signed(delta);
    self.state.scroll_into_view();
  }

  pub fn activate(&mut self) {
    let Some(channel) = self.state.matches.get(self.state.selected_index) else { return };
    info!(id = %channel.id, name = %channel.name, "session: play requested");
    self.sink.request_play(&channel.playable_url);
  }

  /// Switch to the next category. Results of the old category are dropped at once and
  /// the current (or still pending) text is scheduled against the new one.
  pub fn next_category(&mut self) {
    self.category = self.category.next();
    self.state.matches.clear();
    self.state.reset_selection();
    let text = self.pending_query.take().unwrap_or_else(|| self.state.last_query.clone());
    self.pending_query = Some(text);
    info!(category = %self.category, "session: category switched");
  }

  /// Terminal transition. Stops playback and discards pending work.
  pub fn exit(&mut self) {
    if self.closed {
      return;
    }
    self.closed = true;
    self.pending_query = None;
    self.sink.stop();
    info!("session: closed");
  }

  pub fn view(&self) -> ViewModel {
    let mut view = ViewModel { help_text: HELP_TEXT.to_string(), error: self.last_error.clone(), ..Default::default() };
    if self.state.last_query.is_empty() {
      return view;
    }

    view.rendered_lines.push(format!("{:<3}{:<8} | Name", "", "ID"));
    view.rendered_lines.push(format!("{:<3}{}", "", "-".repeat(30)));
    for (i, channel) in self.state.visible().iter().enumerate() {
      let actual = self.state.view_start_index + i;
      let marker = if actual == self.state.selected_index {
        view.selected_line = Some(HEADER_LINES + i);
        SELECTED_MARKER
      } else {
        UNSELECTED_MARKER
      };
      view.rendered_lines.push(format!("{} {:<8} | {}", marker, channel.id, channel.name));
    }
    view
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::index::{ChannelIndex, IndexStore, ScoredHit, StoreError};
  use std::sync::Arc;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[derive(Default)]
  struct RecordingSink {
    played: Vec<String>,
    stops: usize,
  }

  impl PlaybackSink for RecordingSink {
    fn request_play(&mut self, url: &str) {
      self.played.push(url.to_string());
    }

    fn stop(&mut self) {
      self.stops += 1;
    }
  }

  /// Delegates to a real index and counts queries.
  #[derive(Default)]
  struct CountingStore {
    inner: ChannelIndex,
    queries: AtomicUsize,
    fail: bool,
  }

  impl IndexStore for CountingStore {
    fn upsert_one(&self, record: ChannelRecord) -> Result<(), StoreError> {
      self.inner.upsert_one(record)
    }
    fn upsert_many(&self, records: Vec<ChannelRecord>) -> Result<usize, StoreError> {
      self.inner.upsert_many(records)
    }
    fn get_by_id(&self, id: &str) -> Option<ChannelRecord> {
      self.inner.get_by_id(id)
    }
    fn query(&self, category: Category, tokens: &[String]) -> Result<Vec<ScoredHit>, StoreError> {
      self.queries.fetch_add(1, Ordering::SeqCst);
      if self.fail {
        return Err(StoreError::Unavailable("disk on fire".into()));
      }
      self.inner.query(category, tokens)
    }
    fn generation(&self, category: Category) -> u64 {
      self.inner.generation(category)
    }
    fn record_count(&self, category: Category) -> usize {
      self.inner.record_count(category)
    }
  }

  fn numbered(count: usize) -> Vec<ChannelRecord> {
    (0..count)
      .map(|i| ChannelRecord::new(format!("{i:03}"), format!("Chan {i:03}"), format!("http://c/{i}"), Category::Live))
      .collect()
  }

  fn session_over(store: Arc<CountingStore>, rows: usize) -> Session<RecordingSink> {
    Session::new(QueryEngine::new(store, 0), RecordingSink::default(), Category::Live, rows)
  }

  fn session_with(records: Vec<ChannelRecord>, rows: usize) -> (Session<RecordingSink>, Arc<CountingStore>) {
    let store = Arc::new(CountingStore::default());
    store.upsert_many(records).unwrap();
    (session_over(store.clone(), rows), store)
  }

  fn assert_window(session: &Session<RecordingSink>) {
    let s = session.state();
    if s.matches.is_empty() {
      assert_eq!((s.selected_index, s.view_start_index), (0, 0));
      return;
    }
    assert!(s.selected_index < s.matches.len());
    assert!(s.view_start_index <= s.selected_index);
    assert!(s.selected_index < s.view_start_index + s.max_visible_rows);
  }

  // --- query-changed ---

  #[test]
  fn text_changes_are_debounced_to_latest() {
    let (mut session, store) = session_with(numbered(5), 3);
    session.handle(SessionEvent::TextChanged("c".into()));
    session.handle(SessionEvent::TextChanged("ch".into()));
    session.handle(SessionEvent::TextChanged("cha".into()));
    assert_eq!(store.queries.load(Ordering::SeqCst), 0);

    assert!(session.tick());
    assert_eq!(store.queries.load(Ordering::SeqCst), 1);
    assert_eq!(session.state().last_query, "cha");
    assert_eq!(session.state().matches.len(), 5);
    assert!(!session.tick());
  }

  #[test]
  fn empty_text_clears_everything() {
    let (mut session, store) = session_with(numbered(5), 3);
    session.query_changed("chan");
    session.move_selection(1);
    session.query_changed("   ");
    let s = session.state();
    assert!(s.matches.is_empty());
    assert_eq!((s.selected_index, s.view_start_index), (0, 0));
    assert!(s.last_query.is_empty());
    assert!(session.view().rendered_lines.is_empty());
    assert_eq!(store.queries.load(Ordering::SeqCst), 1);
    assert_eq!(session.phase(), Phase::Empty);
  }

  #[test]
  fn new_text_resets_selection() {
    let (mut session, _) = session_with(numbered(10), 3);
    session.query_changed("chan");
    for _ in 0..6 {
      session.move_selection(1);
    }
    assert_eq!(session.state().selected_index, 6);
    session.query_changed("cha");
    assert_eq!((session.state().selected_index, session.state().view_start_index), (0, 0));
  }

  #[test]
  fn same_text_keeps_selection() {
    let (mut session, _) = session_with(numbered(10), 3);
    session.query_changed("chan");
    session.move_selection(1);
    session.move_selection(1);
    session.query_changed("chan ");
    assert_eq!(session.state().selected_index, 2);
  }

  #[test]
  fn refresh_picks_up_new_records_and_clamps() {
    let (mut session, store) = session_with(numbered(3), 2);
    session.query_changed("chan");
    session.move_selection(1);
    session.move_selection(1);

    store.upsert_one(ChannelRecord::new("100", "Chan Extra", "http://c/x", Category::Live)).unwrap();
    session.refresh();
    assert!(session.tick());
    assert_eq!(session.state().matches.len(), 4);
    assert_eq!(session.state().selected_index, 2);
    assert_window(&session);
  }

  #[test]
  fn refresh_never_overrides_newer_text() {
    let (mut session, _) = session_with(numbered(3), 2);
    session.query_changed("chan");
    session.handle(SessionEvent::TextChanged("zzz".into()));
    session.refresh();
    session.tick();
    assert_eq!(session.state().last_query, "zzz");
  }

  #[test]
  fn search_failure_degrades_to_no_results() {
    let store = Arc::new(CountingStore { fail: true, ..Default::default() });
    let mut session = session_over(store, 5);
    session.handle(SessionEvent::TextChanged("anything".into()));
    session.tick();
    assert!(session.state().matches.is_empty());
    assert_eq!(session.state().last_query, "anything");
    let view = session.view();
    assert!(view.error.as_deref().is_some_and(|e| e.contains("disk on fire")));
    assert_eq!(view.rendered_lines.len(), 2);
  }

  // --- move ---

  #[test]
  fn move_clamps_at_both_ends() {
    let (mut session, _) = session_with(numbered(3), 5);
    session.query_changed("chan");
    session.move_selection(-1);
    assert_eq!(session.state().selected_index, 0);
    for _ in 0..10 {
      session.move_selection(1);
    }
    assert_eq!(session.state().selected_index, 2);
  }

  #[test]
  fn move_on_empty_is_noop() {
    let (mut session, _) = session_with(Vec::new(), 5);
    session.handle(SessionEvent::MoveDown);
    session.handle(SessionEvent::MoveUp);
    assert_eq!(session.state().selected_index, 0);
  }

  #[test]
  fn viewport_scrolls_down_and_up() {
    let (mut session, _) = session_with(numbered(10), 3);
    session.query_changed("chan");
    for _ in 0..4 {
      session.move_selection(1);
    }
    assert_eq!(session.state().selected_index, 4);
    assert_eq!(session.state().view_start_index, 2);

    for _ in 0..3 {
      session.move_selection(-1);
    }
    assert_eq!(session.state().selected_index, 1);
    assert_eq!(session.state().view_start_index, 1);
  }

  #[test]
  fn viewport_invariant_holds_for_event_sequences() {
    let (mut session, _) = session_with(numbered(40), 7);
    let queries = ["chan", "chan 00", "chan 01", "", "c", "01", "zzz", "chan 0"];
    let mut seed: u64 = 0x2545_f491;
    for _ in 0..2000 {
      seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
      let event = match (seed >> 33) % 6 {
        0 => SessionEvent::TextChanged(queries[((seed >> 40) % queries.len() as u64) as usize].to_string()),
        1 | 2 => SessionEvent::MoveDown,
        3 | 4 => SessionEvent::MoveUp,
        _ => SessionEvent::Activate,
      };
      session.handle(event);
      session.tick();
      assert_window(&session);
    }
  }

  // --- activate / exit ---

  #[test]
  fn activate_plays_selected_url() {
    let (mut session, _) = session_with(numbered(3), 5);
    session.query_changed("chan");
    session.handle(SessionEvent::MoveDown);
    session.handle(SessionEvent::Activate);
    assert_eq!(session.sink().played, vec!["http://c/1".to_string()]);
  }

  #[test]
  fn activate_without_matches_is_noop() {
    let (mut session, _) = session_with(numbered(3), 5);
    session.handle(SessionEvent::Activate);
    session.query_changed("nothing here");
    session.handle(SessionEvent::Activate);
    assert!(session.sink().played.is_empty());
  }

  #[test]
  fn exit_stops_playback_and_ignores_later_events() {
    let (mut session, store) = session_with(numbered(3), 5);
    session.handle(SessionEvent::TextChanged("chan".into()));
    session.handle(SessionEvent::Exit);
    assert!(session.is_closed());
    assert_eq!(session.phase(), Phase::Closed);
    assert_eq!(session.sink().stops, 1);
    assert!(!session.tick());

    session.handle(SessionEvent::Exit);
    session.handle(SessionEvent::TextChanged("chan".into()));
    assert_eq!(session.sink().stops, 1);
    assert!(!session.has_pending());
    assert_eq!(store.queries.load(Ordering::SeqCst), 0);
  }

  // --- category ---

  #[test]
  fn next_category_reruns_query_in_new_partition() {
    let (mut session, store) = session_with(numbered(3), 5);
    store.upsert_one(ChannelRecord::new("v1", "Chan Vod", "http://v/1", Category::Vod)).unwrap();
    session.query_changed("chan");
    session.move_selection(1);

    session.handle(SessionEvent::NextCategory);
    assert_eq!(session.category(), Category::Vod);
    assert!(session.state().matches.is_empty());
    session.tick();
    assert_eq!(session.state().matches.len(), 1);
    assert_eq!(session.state().matches[0].id, "v1");
    assert_eq!(session.state().selected_index, 0);
  }

  #[test]
  fn next_category_keeps_pending_text() {
    let (mut session, _) = session_with(numbered(3), 5);
    session.handle(SessionEvent::TextChanged("typed".into()));
    session.handle(SessionEvent::NextCategory);
    session.tick();
    assert_eq!(session.state().last_query, "typed");
  }

  // --- view ---

  #[test]
  fn view_marks_selected_row() {
    let (mut session, _) = session_with(numbered(5), 3);
    session.query_changed("chan");
    session.move_selection(1);
    let view = session.view();
    assert_eq!(view.rendered_lines[0], "   ID       | Name");
    assert_eq!(view.rendered_lines[1], format!("   {}", "-".repeat(30)));
    assert_eq!(view.rendered_lines[2], "   000      | Chan 000");
    assert_eq!(view.rendered_lines[3], ">> 001      | Chan 001");
    assert_eq!(view.rendered_lines.len(), 2 + 3);
    assert_eq!(view.selected_line, Some(3));
    assert_eq!(view.help_text, HELP_TEXT);
  }

  #[test]
  fn view_shows_only_window_rows() {
    let (mut session, _) = session_with(numbered(10), 3);
    session.query_changed("chan");
    for _ in 0..5 {
      session.move_selection(1);
    }
    let view = session.view();
    assert_eq!(view.rendered_lines.len(), 5);
    assert!(view.rendered_lines[2].contains("003"));
    assert!(view.rendered_lines[4].starts_with(">> 005"));
    assert_eq!(view.selected_line, Some(4));
  }

  #[test]
  fn zero_rows_is_treated_as_one() {
    let (mut session, _) = session_with(numbered(3), 0);
    session.query_changed("chan");
    session.move_selection(1);
    assert_eq!(session.state().max_visible_rows, 1);
    assert_eq!(session.state().view_start_index, 1);
  }
}
