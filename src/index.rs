//! Category-partitioned channel store with an inverted n-gram index.
//!
//! Each category owns one partition behind its own lock: the primary record
//! table, the index-entry table and the token postings are always mutated together
//! under that lock, so a reader can never observe a record without its index entry
//! (or the reverse). Writes to one category never block readers of another.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::models::{Category, ChannelRecord, IndexEntry};
use crate::ranking::{CorpusStats, bm25_score, compare_hits};
use crate::tokenizer::{DEFAULT_MAX_GRAM_SIZE, generate_tokens, serialize_tokens};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
  #[error("invalid {category} record '{id}': {reason}")]
  InvalidRecord { category: Category, id: String, reason: &'static str },
  /// Reported by stores backed by something that can go away. The in-memory index never is.
  #[cfg_attr(not(test), allow(dead_code))]
  #[error("store unavailable: {0}")]
  Unavailable(String),
}

/// A matching record with its relevance score (higher is better).
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredHit {
  pub record: ChannelRecord,
  pub score: f64,
}

/// Storage capability consumed by the query engine and the ingestion driver.
pub trait IndexStore: Send + Sync {
  /// Insert or replace the record sharing `(category, id)`, recomputing its tokens.
  fn upsert_one(&self, record: ChannelRecord) -> Result<(), StoreError>;

  /// Insert or replace a batch. Records are grouped by category and each group
  /// commits all-or-nothing. A rejected group does not stop the other groups;
  /// the first rejection is returned after every group has been attempted.
  fn upsert_many(&self, records: Vec<ChannelRecord>) -> Result<usize, StoreError>;

  /// First record with this id, scanning partitions in [`Category::ALL`] order.
  fn get_by_id(&self, id: &str) -> Option<ChannelRecord>;

  /// Records of `category` whose token set contains every one of `required_tokens`,
  /// best-first.
  fn query(&self, category: Category, required_tokens: &[String]) -> Result<Vec<ScoredHit>, StoreError>;

  /// Write counter for `category`; bumps on every committed change.
  fn generation(&self, category: Category) -> u64;

  fn record_count(&self, category: Category) -> usize;
}

#[derive(Debug, Default)]
struct Partition {
  records: HashMap<String, ChannelRecord>,
  entries: HashMap<String, IndexEntry>,
  /// token -> ids of entries containing it
  postings: HashMap<String, BTreeSet<String>>,
  total_tokens: usize,
  generation: u64,
}

impl Partition {
  /// Returns false when the stored record is already identical.
  fn insert(&mut self, record: ChannelRecord, entry: IndexEntry) -> bool {
    if self.records.get(&record.id) == Some(&record) {
      return false;
    }
    self.remove(&record.id);

    for token in &entry.ngram_tokens {
      self.postings.entry(token.clone()).or_default().insert(entry.id.clone());
    }
    self.total_tokens += entry.ngram_tokens.len();
    self.entries.insert(entry.id.clone(), entry);
    self.records.insert(record.id.clone(), record);
    true
  }

  fn remove(&mut self, id: &str) {
    self.records.remove(id);
    let Some(old) = self.entries.remove(id) else { return };
    self.total_tokens -= old.ngram_tokens.len();
    for token in &old.ngram_tokens {
      if let Some(ids) = self.postings.get_mut(token) {
        ids.remove(id);
        if ids.is_empty() {
          self.postings.remove(token);
        }
      }
    }
  }

  fn stats(&self) -> CorpusStats {
    let total_docs = self.entries.len();
    let avg_doc_len = if total_docs == 0 { 0.0 } else { self.total_tokens as f64 / total_docs as f64 };
    CorpusStats { total_docs, avg_doc_len }
  }

  fn search(&self, required_tokens: &[String]) -> Vec<ScoredHit> {
    let unique: BTreeSet<&str> = required_tokens.iter().map(String::as_str).filter(|t| !t.is_empty()).collect();
    if unique.is_empty() {
      return Vec::new();
    }

    let mut lists = Vec::with_capacity(unique.len());
    for token in &unique {
      match self.postings.get(*token) {
        Some(ids) => lists.push(ids),
        None => return Vec::new(),
      }
    }
    lists.sort_by_key(|ids| ids.len());
    let doc_freqs: Vec<usize> = lists.iter().map(|ids| ids.len()).collect();
    let corpus = self.stats();

    let Some((smallest, rest)) = lists.split_first() else { return Vec::new() };

    let mut hits: Vec<ScoredHit> = smallest
      .iter()
      .filter(|id| rest.iter().all(|ids| ids.contains(*id)))
      .filter_map(|id| {
        let entry = self.entries.get(id)?;
        let record = self.records.get(id)?;
        let score = bm25_score(&doc_freqs, entry.ngram_tokens.len(), corpus);
        Some(ScoredHit { record: record.clone(), score })
      })
      .collect();

    hits.sort_by(|a, b| compare_hits(a.score, &a.record.id, b.score, &b.record.id));
    hits
  }

  #[cfg(test)]
  fn is_consistent(&self) -> bool {
    if self.records.len() != self.entries.len() {
      return false;
    }
    let token_total: usize = self.entries.values().map(|e| e.ngram_tokens.len()).sum();
    let posting_total: usize = self.postings.values().map(BTreeSet::len).sum();
    self.records.keys().all(|id| self.entries.contains_key(id))
      && token_total == self.total_tokens
      && posting_total == self.total_tokens
  }
}

/// In-memory [`IndexStore`] with one lock per category partition.
#[derive(Debug)]
pub struct ChannelIndex {
  live: RwLock<Partition>,
  vod: RwLock<Partition>,
  series: RwLock<Partition>,
  movie: RwLock<Partition>,
  max_gram_size: usize,
}

impl Default for ChannelIndex {
  fn default() -> Self {
    Self::new(DEFAULT_MAX_GRAM_SIZE)
  }
}

impl ChannelIndex {
  pub fn new(max_gram_size: usize) -> Self {
    Self {
      live: RwLock::default(),
      vod: RwLock::default(),
      series: RwLock::default(),
      movie: RwLock::default(),
      max_gram_size: max_gram_size.max(2),
    }
  }

  fn partition(&self, category: Category) -> &RwLock<Partition> {
    match category {
      Category::Live => &self.live,
      Category::Vod => &self.vod,
      Category::Series => &self.series,
      Category::Movie => &self.movie,
    }
  }

  /// Validate a record and derive its index entry. Runs before any lock is taken.
  fn prepare(&self, record: ChannelRecord) -> Result<(ChannelRecord, IndexEntry), StoreError> {
    if record.id.trim().is_empty() {
      return Err(StoreError::InvalidRecord { category: record.category, id: record.id, reason: "empty id" });
    }
    if record.playable_url.trim().is_empty() {
      return Err(StoreError::InvalidRecord { category: record.category, id: record.id, reason: "empty playable url" });
    }
    let entry = IndexEntry {
      id: record.id.clone(),
      name: record.name.clone(),
      playable_url: record.playable_url.clone(),
      ngram_tokens: generate_tokens(&record.name, self.max_gram_size),
    };
    trace!(id = %entry.id, tokens = %serialize_tokens(&entry.ngram_tokens), "store: tokens derived");
    Ok((record, entry))
  }

  /// Commit one category group. Either every record lands or none does.
  fn commit_group(&self, category: Category, group: Vec<ChannelRecord>) -> Result<usize, StoreError> {
    let prepared = group.into_iter().map(|r| self.prepare(r)).collect::<Result<Vec<_>, _>>()?;
    let count = prepared.len();

    let mut partition = self.partition(category).write();
    let mut changed = false;
    for (record, entry) in prepared {
      changed |= partition.insert(record, entry);
    }
    if changed {
      partition.generation += 1;
    }
    debug!(category = %category, count, generation = partition.generation, "store: group committed");
    Ok(count)
  }
}

impl IndexStore for ChannelIndex {
  fn upsert_one(&self, record: ChannelRecord) -> Result<(), StoreError> {
    let category = record.category;
    self.commit_group(category, vec![record]).map(|_| ())
  }

  fn upsert_many(&self, records: Vec<ChannelRecord>) -> Result<usize, StoreError> {
    let mut grouped: BTreeMap<Category, Vec<ChannelRecord>> = BTreeMap::new();
    for record in records {
      grouped.entry(record.category).or_default().push(record);
    }

    let mut committed = 0;
    let mut first_error = None;
    for (category, group) in grouped {
      match self.commit_group(category, group) {
        Ok(count) => committed += count,
        Err(e) => {
          warn!(category = %category, err = %e, "store: rejected batch group");
          first_error.get_or_insert(e);
        }
      }
    }

    match first_error {
      Some(e) => Err(e),
      None => Ok(committed),
    }
  }

  fn get_by_id(&self, id: &str) -> Option<ChannelRecord> {
    Category::ALL.iter().find_map(|c| self.partition(*c).read().records.get(id).cloned())
  }

  fn query(&self, category: Category, required_tokens: &[String]) -> Result<Vec<ScoredHit>, StoreError> {
    if required_tokens.is_empty() {
      return Ok(Vec::new());
    }
    Ok(self.partition(category).read().search(required_tokens))
  }

  fn generation(&self, category: Category) -> u64 {
    self.partition(category).read().generation
  }

  fn record_count(&self, category: Category) -> usize {
    self.partition(category).read().records.len()
  }
}
