use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Term counts for a single article, iterated in first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermFrequencyTable {
    order: Vec<String>,
    counts: HashMap<String, u64>,
}

impl TermFrequencyTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, term: &str) {
        if let Some(count) = self.counts.get_mut(term) {
            *count += 1;
        } else {
            self.order.push(term.to_string());
            self.counts.insert(term.to_string(), 1);
        }
    }

    pub fn get(&self, term: &str) -> u64 {
        self.counts.get(term).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.order
            .iter()
            .map(move |term| (term.as_str(), self.counts[term]))
    }
}

/// Counts whitespace-delimited tokens verbatim.
///
/// Every whitespace character is a delimiter, so runs of whitespace produce
/// empty tokens. Those are counted here and dropped when the outbound record
/// is built.
#[must_use]
pub fn count(article_text: &str) -> TermFrequencyTable {
    let mut table = TermFrequencyTable::new();
    for token in article_text.split(char::is_whitespace) {
        table.add(token);
    }
    table
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    #[serde(rename = "amount")]
    pub count: u64,
}

/// Word-frequency payload for one article, in the shape the word-count
/// endpoint consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordFrequencyRecord {
    pub article_title: String,
    #[serde(rename = "filepath")]
    pub source_paths: String,
    pub words: Vec<WordCount>,
    #[serde(rename = "total_words_in_article")]
    pub total_distinct_words: usize,
}

/// Builds the outbound record, or `None` when the title is empty.
#[must_use]
pub fn build_record(
    title: &str,
    paths: &[String],
    table: &TermFrequencyTable,
) -> Option<WordFrequencyRecord> {
    if title.is_empty() {
        tracing::debug!("Found empty title, skipping word count record");
        return None;
    }

    let mut words = Vec::with_capacity(table.len());
    for (word, count) in table.iter() {
        if word.is_empty() {
            tracing::debug!(article = title, "Found empty word, skipping");
            continue;
        }
        words.push(WordCount {
            word: word.to_string(),
            count,
        });
    }

    Some(WordFrequencyRecord {
        article_title: title.to_string(),
        source_paths: paths.join(","),
        total_distinct_words: words.len(),
        words,
    })
}
