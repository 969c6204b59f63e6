use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::Category;
use crate::player::ExternalPlayer;
use crate::session::{Session, SessionEvent, ViewModel};
use crate::source::IngestEvent;
use crate::theme::{self, THEMES};

/// Terminal host state: the query line being edited, ingestion progress and the session it drives.
pub struct App {
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub theme_index: usize,
  pub session: Session<ExternalPlayer>,
  pub status_message: Option<String>,
  pub last_error: Option<String>,
  pub should_quit: bool,
  ingest_rx: Option<mpsc::UnboundedReceiver<IngestEvent>>,
}

impl App {
  pub fn new(
    session: Session<ExternalPlayer>,
    ingest_rx: mpsc::UnboundedReceiver<IngestEvent>,
    theme_name: Option<&str>,
  ) -> Self {
    Self {
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      theme_index: theme_name.map_or(0, theme::index_of),
      session,
      status_message: Some("Loading channels…".to_string()),
      last_error: None,
      should_quit: false,
      ingest_rx: Some(ingest_rx),
    }
  }

  pub fn theme(&self) -> &'static theme::Theme {
    &THEMES[self.theme_index]
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.save_theme();
  }

  fn save_theme(&self) {
    let mut config = Config::load();
    config.theme_name = Some(self.theme().name.to_string());
    if let Err(e) = config.save() {
      warn!("config: failed to save theme: {:#}", e);
    }
  }

  pub fn is_ingesting(&self) -> bool {
    self.ingest_rx.is_some()
  }

  /// Records currently searchable in the active category.
  pub fn indexed_count(&self) -> usize {
    self.session.engine().store().record_count(self.session.category())
  }

  /// Forward the edited query line to the session.
  pub fn text_changed(&mut self) {
    self.session.handle(SessionEvent::TextChanged(self.input.clone()));
  }

  pub fn clear_input(&mut self) {
    self.input.clear();
    self.cursor_position = 0;
    self.input_scroll = 0;
    self.text_changed();
  }

  pub fn quit(&mut self) {
    self.session.handle(SessionEvent::Exit);
    self.should_quit = true;
  }

  /// Idle work once the input queue is drained. Returns whether a search ran.
  pub fn tick(&mut self) -> bool {
    self.session.sink_mut().check_status();
    self.session.tick()
  }

  pub fn view(&self) -> ViewModel {
    self.session.view()
  }

  /// Drain ingestion progress without blocking.
  pub fn check_pending(&mut self) {
    let Some(mut rx) = self.ingest_rx.take() else { return };
    loop {
      match rx.try_recv() {
        Ok(event) => self.apply_ingest_event(event),
        Err(TryRecvError::Empty) => {
          self.ingest_rx = Some(rx);
          return;
        }
        Err(TryRecvError::Disconnected) => {
          debug!("ingest: progress channel closed");
          return;
        }
      }
    }
  }

  fn apply_ingest_event(&mut self, event: IngestEvent) {
    match event {
      IngestEvent::BatchCommitted { category, total, .. } => {
        self.status_message = Some(format!("Indexing {}… {} channels", category, total));
        self.refresh_if_active(category);
      }
      IngestEvent::BatchRejected { category, reason } => {
        self.last_error = Some(format!("{} batch rejected: {}", category, reason));
      }
      IngestEvent::Finished { category, total } => {
        self.status_message = Some(format!("Indexed {} {} channels", total, category));
        self.refresh_if_active(category);
      }
      IngestEvent::Failed { category, message } => {
        self.last_error = Some(format!("Loading {} failed: {}", category, message));
      }
    }
  }

  fn refresh_if_active(&mut self, category: Category) {
    if category == self.session.category() {
      self.session.refresh();
    }
  }
}
