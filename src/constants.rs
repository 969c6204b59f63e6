//! Application defaults loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!`, so there is no runtime file I/O.
//! Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// Tuneable defaults. `config.toml` and CLI flags override the user-facing ones.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // Results pane
  pub max_visible_rows: usize,

  // Ingestion
  pub batch_size: usize,

  // Indexing
  pub max_gram_size: usize,
  pub query_cache_capacity: usize,

  // Playback
  pub player_command: String,
  pub player_args: Vec<String>,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn embedded_constants_parse() {
    let c = constants();
    assert_eq!(c.max_visible_rows, 30);
    assert_eq!(c.batch_size, 10_000);
    assert_eq!(c.max_gram_size, 3);
    assert_eq!(c.player_command, "cvlc");
    assert!(c.query_cache_capacity > 0);
  }
}
