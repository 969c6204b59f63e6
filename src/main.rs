mod app;
mod config;
mod constants;
mod index;
mod input;
mod models;
mod player;
mod query;
mod ranking;
mod session;
mod source;
mod theme;
mod tokenizer;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use app::App;
use config::{Config, Overrides, Settings};
use index::ChannelIndex;
use models::Category;
use player::ExternalPlayer;
use query::QueryEngine;
use session::Session;
use source::{XtreamSource, ingest_all};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Provider base URL, e.g. http://provider.example:8080
  #[arg(long, env = "XTREME_URL")]
  url: Option<String>,

  #[arg(long, env = "XTREME_USERNAME")]
  username: Option<String>,

  #[arg(long, env = "XTREME_PASSWORD", hide_env_values = true)]
  password: Option<String>,

  /// Category to search first
  #[arg(short, long, value_enum)]
  category: Option<Category>,

  /// Player command that receives the stream URL as its last argument
  #[arg(short, long)]
  player: Option<String>,

  /// Result rows visible at once
  #[arg(short, long)]
  rows: Option<usize>,

  /// Records per ingestion batch
  #[arg(long)]
  batch_size: Option<usize>,
}

impl From<Args> for Overrides {
  fn from(args: Args) -> Self {
    Self {
      url: args.url,
      username: args.username,
      password: args.password,
      category: args.category,
      player: args.player,
      rows: args.rows,
      batch_size: args.batch_size,
    }
  }
}

// --- Logging ---

/// Log to a file: the terminal belongs to the UI. The guard must outlive the program.
fn init_logging() -> Result<WorkerGuard> {
  let log_dir = ProjectDirs::from("", "", "zap").map_or_else(std::env::temp_dir, |dirs| dirs.data_dir().to_path_buf());
  std::fs::create_dir_all(&log_dir).with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(&log_dir, "zap.log"));
  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "zap=info".into()))
    .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
    .init();
  Ok(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let _log_guard = init_logging()?;

  let file_config = Config::load();
  let settings = Settings::resolve(args.into(), &file_config)?;
  info!(
    category = %settings.category,
    rows = settings.max_visible_rows,
    batch_size = settings.batch_size,
    player = %settings.player_command,
    "zap: starting"
  );

  let store = Arc::new(ChannelIndex::new(settings.max_gram_size));
  let (ingest_tx, ingest_rx) = mpsc::unbounded_channel();
  let source = XtreamSource::new(&settings.url, &settings.username, &settings.password);
  let ingest_store = store.clone();
  let categories = settings.ingest_categories.clone();
  let batch_size = settings.batch_size;
  let ingest_task = tokio::spawn(async move {
    let total = ingest_all(&source, ingest_store.as_ref(), &categories, batch_size, &ingest_tx).await;
    info!(total, "ingest: all categories done");
  });

  let engine = QueryEngine::new(store, settings.query_cache_capacity);
  let player = ExternalPlayer::new(settings.player_command.clone(), settings.player_args.clone());
  let session = Session::new(engine, player, settings.category, settings.max_visible_rows);
  let mut app = App::new(session, ingest_rx, file_config.theme_name.as_deref());

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, &mut app);
  ratatui::restore();

  ingest_task.abort();
  app.session.exit();
  app.session.sink_mut().shutdown().await?;
  info!("zap: exited");
  result
}

fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
  loop {
    app.check_pending();
    app.tick();

    terminal.draw(|frame| ui::ui(frame, app)).context("Failed to draw frame")?;

    // Drain every queued key before the next tick so only the newest text is searched.
    let mut timeout = POLL_INTERVAL;
    while event::poll(timeout)? {
      if let Event::Key(key) = event::read()?
        && key.kind == KeyEventKind::Press
      {
        input::handle_key_event(app, key);
      }
      if app.should_quit {
        break;
      }
      timeout = Duration::ZERO;
    }

    if app.should_quit {
      return Ok(());
    }
  }
}
