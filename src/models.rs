use std::collections::BTreeSet;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Channel category. Each category is an independent partition of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Category {
  Live,
  Vod,
  Series,
  Movie,
}

impl Category {
  /// Fixed partition order. Lookups that scan partitions follow this order.
  pub const ALL: [Category; 4] = [Category::Live, Category::Vod, Category::Series, Category::Movie];

  pub fn label(self) -> &'static str {
    match self {
      Category::Live => "live",
      Category::Vod => "vod",
      Category::Series => "series",
      Category::Movie => "movie",
    }
  }

  /// Case-insensitive name lookup.
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_lowercase().as_str() {
      "live" => Some(Category::Live),
      "vod" => Some(Category::Vod),
      "series" => Some(Category::Series),
      "movie" => Some(Category::Movie),
      _ => None,
    }
  }

  /// Like [`Category::parse`], but unknown names fall back to `Live` with a warning.
  pub fn from_config(s: &str) -> Self {
    Self::parse(s).unwrap_or_else(|| {
      warn!(value = %s, "config: unknown category, using live");
      Category::Live
    })
  }

  /// The category after this one, wrapping around.
  pub fn next(self) -> Self {
    let idx = Category::ALL.iter().position(|c| *c == self).unwrap_or(0);
    Category::ALL[(idx + 1) % Category::ALL.len()]
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// A playable channel. Identity is `(category, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
  pub id: String,
  pub name: String,
  pub playable_url: String,
  pub category: Category,
}

impl ChannelRecord {
  pub fn new(id: impl Into<String>, name: impl Into<String>, playable_url: impl Into<String>, category: Category) -> Self {
    Self { id: id.into(), name: name.into(), playable_url: playable_url.into(), category }
  }
}

/// Search-side view of a record: its display fields plus the n-gram tokens derived from the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
  pub id: String,
  pub name: String,
  pub playable_url: String,
  pub ngram_tokens: BTreeSet<String>,
}
