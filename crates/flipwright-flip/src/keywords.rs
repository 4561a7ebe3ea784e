use serde::{Deserialize, Serialize};

/// Identifier of a word pair as reported by the pair source.
pub type PairId = u64;

/// A single dictionary word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRef {
  pub id: u64,
  pub name: String,
  #[serde(default)]
  pub desc: String,
}

/// The two-word prompt a flip must illustrate.
///
/// `used` flips permanently once a flip referencing the pair has been
/// published and confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPair {
  pub id: PairId,
  pub words: [WordRef; 2],
  #[serde(default)]
  pub used: bool,
}

/// A community translation of a word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
  pub id: String,
  pub word_id: u64,
  pub name: String,
  #[serde(default)]
  pub desc: String,
  #[serde(default)]
  pub score: i64,
}

/// Display form of the current pair: original words plus the translations
/// known for each of them, index-aligned with `words`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keywords {
  pub words: Vec<WordRef>,
  #[serde(default)]
  pub translations: Vec<Vec<Translation>>,
}

impl Keywords {
  pub fn from_pair(pair: &WordPair) -> Self {
    Self {
      words: pair.words.to_vec(),
      translations: vec![Vec::new(); pair.words.len()],
    }
  }

  /// Best-scored translation of every word, if all words have one.
  pub fn top_translations(&self) -> Option<Vec<&Translation>> {
    if self.translations.len() != self.words.len() {
      return None;
    }
    self
      .translations
      .iter()
      .map(|candidates| candidates.iter().max_by_key(|t| t.score))
      .collect()
  }

  /// Word names joined by `separator`, used as the decoy search query.
  pub fn query(&self, separator: &str) -> String {
    self
      .words
      .iter()
      .map(|w| w.name.as_str())
      .filter(|name| !name.is_empty())
      .collect::<Vec<_>>()
      .join(separator)
  }
}
