//! Text normalization and n-gram generation.
//!
//! The same [`normalize`] runs over channel names at index time and over the
//! user's query at search time. If the two ever diverge, queries stop matching.

use std::collections::BTreeSet;

/// Largest substring length emitted per word.
pub const DEFAULT_MAX_GRAM_SIZE: usize = 3;

fn is_word_char(c: char) -> bool {
  c.is_alphanumeric() || c == '_'
}

/// Lowercase `text` and drop every character that is neither a word character nor whitespace.
pub fn clean(text: &str) -> String {
  text.to_lowercase().chars().filter(|c| is_word_char(*c) || c.is_whitespace()).collect()
}

/// Lowercase, punctuation-free words of `text`. Empty words never appear.
pub fn normalize(text: &str) -> Vec<String> {
  clean(text).split_whitespace().map(str::to_string).collect()
}

/// Build the searchable token set for a channel name.
///
/// The set holds the whole normalized name (words joined by one space), each word,
/// and every contiguous substring of 2..=`max_gram_size` chars inside each word.
/// A name with no word characters yields an empty set.
pub fn generate_tokens(name: &str, max_gram_size: usize) -> BTreeSet<String> {
  let words = normalize(name);
  let mut grams = BTreeSet::new();
  if words.is_empty() {
    return grams;
  }

  grams.insert(words.join(" "));
  for word in &words {
    grams.insert(word.clone());
    let chars: Vec<char> = word.chars().collect();
    for size in 2..=max_gram_size {
      for window in chars.windows(size) {
        grams.insert(window.iter().collect());
      }
    }
  }
  grams
}

/// Space-joined, sorted form of a token set. Stable across runs.
pub fn serialize_tokens(tokens: &BTreeSet<String>) -> String {
  tokens.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
  use super::*;

  // --- normalize ---

  #[test]
  fn normalize_lowercases_and_splits() {
    assert_eq!(normalize("Hello World"), vec!["hello", "world"]);
  }

  #[test]
  fn normalize_strips_punctuation() {
    assert_eq!(normalize("News - Sports (HD)"), vec!["news", "sports", "hd"]);
    assert_eq!(normalize("C.S.I."), vec!["csi"]);
  }

  #[test]
  fn normalize_keeps_underscores_and_digits() {
    assert_eq!(normalize("FOX_2 HD+"), vec!["fox_2", "hd"]);
  }

  #[test]
  fn normalize_only_punctuation_is_empty() {
    assert!(normalize(" - !! ").is_empty());
    assert!(normalize("").is_empty());
  }

  #[test]
  fn normalize_unicode_letters_survive() {
    assert_eq!(normalize("Télé Ñoño"), vec!["télé", "ñoño"]);
  }

  // --- generate_tokens ---

  #[test]
  fn tokens_single_word() {
    let tokens = generate_tokens("Abcd", 3);
    let expected: BTreeSet<String> =
      ["abcd", "ab", "bc", "cd", "abc", "bcd"].into_iter().map(String::from).collect();
    assert_eq!(tokens, expected);
  }

  #[test]
  fn tokens_include_whole_name_and_words() {
    let tokens = generate_tokens("Amet Sport Alpha", 3);
    assert!(tokens.contains("amet sport alpha"));
    assert!(tokens.contains("amet"));
    assert!(tokens.contains("sport"));
    assert!(tokens.contains("alpha"));
    assert!(tokens.contains("alp"));
    assert!(tokens.contains("ha"));
  }

  #[test]
  fn tokens_do_not_cross_word_boundaries() {
    let tokens = generate_tokens("ab cd", 3);
    assert!(!tokens.contains("b c"));
    assert!(!tokens.contains("bc"));
  }

  #[test]
  fn tokens_single_char_word_has_no_grams() {
    let tokens = generate_tokens("X", 3);
    let expected: BTreeSet<String> = ["x"].into_iter().map(String::from).collect();
    assert_eq!(tokens, expected);
  }

  #[test]
  fn tokens_empty_name() {
    assert!(generate_tokens("", 3).is_empty());
    assert!(generate_tokens("()", 3).is_empty());
  }

  #[test]
  fn tokens_collapse_duplicates() {
    let tokens = generate_tokens("aaa aaa", 3);
    let expected: BTreeSet<String> = ["aaa aaa", "aaa", "aa"].into_iter().map(String::from).collect();
    assert_eq!(tokens, expected);
  }

  #[test]
  fn tokens_respect_max_gram_size() {
    let tokens = generate_tokens("abcdef", 2);
    assert!(tokens.contains("ab"));
    assert!(!tokens.contains("abc"));
  }

  #[test]
  fn tokens_multibyte_windows_by_char() {
    let tokens = generate_tokens("日本語", 2);
    assert!(tokens.contains("日本"));
    assert!(tokens.contains("本語"));
  }

  #[test]
  fn serialize_is_sorted() {
    let tokens = generate_tokens("bca", 2);
    assert_eq!(serialize_tokens(&tokens), "bc bca ca");
  }
}
