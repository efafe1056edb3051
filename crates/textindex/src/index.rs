use std::collections::HashMap;
use std::time::Instant;

use textindex_dict::Dictionary;
use textindex_types::{NumberedLine, WordRecord};
use tracing::info;

use crate::tokenizer::tokens;

/// Lemma-keyed occurrence index over one document.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WordIndex {
    words: HashMap<String, WordRecord>,
}

impl WordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan every token of every line in document order.
    pub fn build(lines: &[NumberedLine], dictionary: &Dictionary) -> Self {
        let start = Instant::now();
        let mut index = Self::new();
        let mut dropped = 0usize;
        for line in lines {
            for token in tokens(&line.text).filter(|t| !t.is_empty()) {
                if !index.add_token(token, dictionary, line) {
                    dropped += 1;
                }
            }
        }
        info!(
            "indexed {} lines into {} lemmas in {} ms ({dropped} tokens out of vocabulary)",
            lines.len(),
            index.len(),
            start.elapsed().as_millis()
        );
        index
    }

    /// Record one token found on `line`. Returns `false` when the token has
    /// no dictionary entry and was dropped.
    pub fn add_token(&mut self, token: &str, dictionary: &Dictionary, line: &NumberedLine) -> bool {
        let Some(lemma) = dictionary.lemma_for(token) else {
            return false;
        };
        if let Some(record) = self.words.get_mut(lemma) {
            record.push_occurrence(token, line.page_number, line.line_number);
            return true;
        }
        self.words
            .entry(lemma.to_string())
            .or_default()
            .push_occurrence(token, line.page_number, line.line_number);
        true
    }

    pub(crate) fn insert(&mut self, lemma: String, record: WordRecord) -> Option<WordRecord> {
        self.words.insert(lemma, record)
    }

    pub fn get(&self, lemma: &str) -> Option<&WordRecord> {
        self.words.get(lemma)
    }

    pub fn contains(&self, lemma: &str) -> bool {
        self.words.contains_key(lemma)
    }

    /// Number of distinct lemmas.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Iterate `(lemma, record)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &WordRecord)> + '_ {
        self.words.iter().map(|(l, r)| (l.as_str(), r))
    }

    /// The `n` most frequent lemmas, most frequent first.
    ///
    /// Ties are broken by lemma order so the result is stable across runs.
    /// Asking for more lemmas than the index holds returns all of them.
    pub fn most_frequent(&self, n: usize) -> Vec<(&str, &WordRecord)> {
        let mut ranked: Vec<(&str, &WordRecord)> = self.iter().collect();
        ranked.sort_by(|(la, ra), (lb, rb)| {
            rb.occurrence_count
                .cmp(&ra.occurrence_count)
                .then_with(|| la.cmp(lb))
        });
        ranked.truncate(n);
        ranked
    }
}
