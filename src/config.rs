use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::constants::constants;
use crate::models::Category;

const CONFIG_FILE: &str = "config.toml";

/// Persisted preferences from `config.toml`. Every field is optional.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  pub xtream_url: Option<String>,
  pub username: Option<String>,
  pub password: Option<String>,
  pub category: Option<String>,
  pub categories: Option<Vec<String>>,
  pub player_command: Option<String>,
  pub player_args: Option<Vec<String>>,
  pub max_visible_rows: Option<usize>,
  pub batch_size: Option<usize>,
  pub theme_name: Option<String>,
}

fn config_path() -> Option<PathBuf> {
  ProjectDirs::from("", "", "zap").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

impl Config {
  /// Read `config.toml`. A missing file yields defaults; a malformed one is logged and ignored.
  pub fn load() -> Self {
    let Some(path) = config_path() else { return Self::default() };
    let Ok(content) = std::fs::read_to_string(&path) else { return Self::default() };
    match toml::from_str(&content) {
      Ok(config) => config,
      Err(e) => {
        warn!(path = %path.display(), err = %e, "config: ignoring malformed file");
        Self::default()
      }
    }
  }

  pub fn save(&self) -> Result<()> {
    let path = config_path().context("Could not determine config directory")?;
    if let Some(dir) = path.parent() {
      std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let content = toml::to_string(self).context("Failed to serialize config")?;
    std::fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))
  }
}

/// Values supplied on the command line (or through their environment variables).
#[derive(Debug, Default, Clone)]
pub struct Overrides {
  pub url: Option<String>,
  pub username: Option<String>,
  pub password: Option<String>,
  pub category: Option<Category>,
  pub player: Option<String>,
  pub rows: Option<usize>,
  pub batch_size: Option<usize>,
}

/// Fully resolved runtime settings: CLI over `config.toml` over embedded defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
  pub url: String,
  pub username: String,
  pub password: String,
  pub category: Category,
  pub ingest_categories: Vec<Category>,
  pub player_command: String,
  pub player_args: Vec<String>,
  pub max_visible_rows: usize,
  pub batch_size: usize,
  pub max_gram_size: usize,
  pub query_cache_capacity: usize,
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Settings {
  pub fn resolve(cli: Overrides, file: &Config) -> Result<Self> {
    let defaults = constants();

    let url = non_empty(cli.url.or_else(|| file.xtream_url.clone()));
    let username = non_empty(cli.username.or_else(|| file.username.clone()));
    let password = non_empty(cli.password.or_else(|| file.password.clone()));
    let (Some(url), Some(username), Some(password)) = (url, username, password) else {
      bail!(
        "Missing provider credentials. Set XTREME_URL, XTREME_USERNAME and XTREME_PASSWORD \
         (or pass --url/--username/--password, or add them to {})",
        CONFIG_FILE
      );
    };

    let category =
      cli.category.or_else(|| file.category.as_deref().map(Category::from_config)).unwrap_or(Category::Live);

    let mut ingest_categories = match &file.categories {
      Some(names) => names
        .iter()
        .filter_map(|name| {
          let parsed = Category::parse(name);
          if parsed.is_none() {
            warn!(value = %name, "config: skipping unknown category in categories");
          }
          parsed
        })
        .collect(),
      None => vec![Category::Live, Category::Vod],
    };
    if !ingest_categories.contains(&category) {
      ingest_categories.push(category);
    }
    ingest_categories.sort();
    ingest_categories.dedup();

    Ok(Self {
      url: url.trim_end_matches('/').to_string(),
      username,
      password,
      category,
      ingest_categories,
      player_command: non_empty(cli.player.or_else(|| file.player_command.clone()))
        .unwrap_or_else(|| defaults.player_command.clone()),
      player_args: file.player_args.clone().unwrap_or_else(|| defaults.player_args.clone()),
      max_visible_rows: cli.rows.or(file.max_visible_rows).unwrap_or(defaults.max_visible_rows).max(1),
      batch_size: cli.batch_size.or(file.batch_size).unwrap_or(defaults.batch_size).max(1),
      max_gram_size: defaults.max_gram_size,
      query_cache_capacity: defaults.query_cache_capacity,
    })
  }
}
