//! BM25 relevance over n-gram token sets.
//!
//! Every indexed token appears at most once per record, so term frequency is
//! always 1 and the score reduces to idf weighted by a length penalty: among
//! records matching the same tokens, the one with fewer extra tokens wins.

use std::cmp::Ordering;

const BM25_K1: f64 = 1.2;
const BM25_B: f64 = 0.75;

/// Partition-wide statistics needed to score a single record.
#[derive(Debug, Clone, Copy)]
pub struct CorpusStats {
  pub total_docs: usize,
  pub avg_doc_len: f64,
}

/// Score one record. `doc_freqs` holds, per matched query token, how many records contain it.
pub fn bm25_score(doc_freqs: &[usize], doc_len: usize, corpus: CorpusStats) -> f64 {
  if doc_freqs.is_empty() || doc_len == 0 || corpus.total_docs == 0 {
    return 0.0;
  }

  let n = corpus.total_docs as f64;
  let length_norm = BM25_B.mul_add(doc_len as f64 / corpus.avg_doc_len.max(1.0), 1.0 - BM25_B);
  let tf = 1.0;
  let tf_part = tf * (BM25_K1 + 1.0) / BM25_K1.mul_add(length_norm, tf);

  doc_freqs
    .iter()
    .map(|&df| {
      let df = df as f64;
      let idf = ((n - df + 0.5) / (df + 0.5)).ln_1p().max(0.0);
      idf * tf_part
    })
    .sum()
}

/// Best-first ordering: higher score first, ties by ascending id.
pub fn compare_hits(a_score: f64, a_id: &str, b_score: f64, b_id: &str) -> Ordering {
  b_score.total_cmp(&a_score).then_with(|| a_id.cmp(b_id))
}
