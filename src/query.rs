use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use crate::index::{IndexStore, StoreError};
use crate::models::{Category, ChannelRecord};
use crate::tokenizer::normalize;

/// Matching records, best-first.
pub type SearchResult = Vec<ChannelRecord>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
  category: Category,
  tokens: Vec<String>,
  generation: u64,
}

/// Turns raw query text into ranked records.
///
/// Results are memoized per `(category, tokens, generation)`. Any committed write to
/// a category bumps its generation, so cached results for that category are never
/// served after an upsert.
pub struct QueryEngine {
  store: Arc<dyn IndexStore>,
  cache: Option<Mutex<LruCache<CacheKey, Arc<SearchResult>>>>,
}

impl QueryEngine {
  /// `cache_capacity == 0` disables memoization.
  pub fn new(store: Arc<dyn IndexStore>, cache_capacity: usize) -> Self {
    let cache = NonZeroUsize::new(cache_capacity).map(|cap| Mutex::new(LruCache::new(cap)));
    Self { store, cache }
  }

  pub fn store(&self) -> &Arc<dyn IndexStore> {
    &self.store
  }

  pub fn search(&self, query_text: &str, category: Category) -> Result<SearchResult, StoreError> {
    let tokens = normalize(query_text);
    if tokens.is_empty() {
      return Ok(Vec::new());
    }

    let Some(cache) = &self.cache else {
      return self.run(category, &tokens);
    };

    // Generation is read before querying so a concurrent write can only make the
    // cached value fresher than its key, never staler.
    let key = CacheKey { category, tokens, generation: self.store.generation(category) };
    if let Some(hit) = cache.lock().get(&key) {
      debug!(category = %category, tokens = ?key.tokens, "search: cache hit");
      return Ok(hit.as_ref().clone());
    }

    let result = self.run(category, &key.tokens)?;
    cache.lock().put(key, Arc::new(result.clone()));
    Ok(result)
  }

  fn run(&self, category: Category, tokens: &[String]) -> Result<SearchResult, StoreError> {
    let hits = self.store.query(category, tokens)?;
    debug!(category = %category, tokens = ?tokens, matches = hits.len(), "search: evaluated");
    Ok(hits.into_iter().map(|h| h.record).collect())
  }
}
