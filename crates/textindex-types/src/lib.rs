//! Shared types for building and querying a word-occurrence index.
//!
//! A document is turned into [`NumberedLine`]s, every recognised word is
//! reduced to its lemma, and each lemma accumulates a [`WordRecord`] holding
//! one entry per occurrence. The dictionary side tags every lemma with a
//! [`PartOfSpeech`] so closed-class words can be kept out of the index.
//!
//! ```rust
//! use textindex_types::{NumberedLine, PartOfSpeech, WordRecord, page_for_line};
//!
//! let line = NumberedLine::new(46, "Он бежал.");
//! assert_eq!(line.page_number, 1);
//! assert_eq!(page_for_line(45), 0);
//!
//! let mut record = WordRecord::default();
//! record.push_occurrence("бежал", line.page_number, line.line_number);
//! assert_eq!(record.occurrence_count, 1);
//!
//! assert!(PartOfSpeech::from_tag("союз").is_closed_class("и"));
//! ```

use std::fmt;

/// Number of numbered lines on one page.
pub const LINES_PER_PAGE: u32 = 45;

/// Page holding a 1-based line number; pages start at 0.
pub fn page_for_line(line_number: u32) -> u32 {
    line_number.saturating_sub(1) / LINES_PER_PAGE
}

/// A non-empty document line tagged with its position.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NumberedLine {
    pub line_number: u32,
    pub page_number: u32,
    pub text: String,
}

impl NumberedLine {
    /// Build a line and derive its page from the line number.
    pub fn new(line_number: u32, text: impl Into<String>) -> Self {
        Self {
            line_number,
            page_number: page_for_line(line_number),
            text: text.into(),
        }
    }
}

/// Renders as `(line,page) text`, the marker format of a numbered text file.
impl fmt::Display for NumberedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{}) {}", self.line_number, self.page_number, self.text)
    }
}

/// Every occurrence of one lemma, in document order.
///
/// The i-th entry of `surface_forms`, `pages` and `lines` jointly describe the
/// i-th occurrence, and all three have `occurrence_count` entries.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WordRecord {
    pub occurrence_count: u32,
    pub surface_forms: Vec<String>,
    pub pages: Vec<u32>,
    pub lines: Vec<u32>,
}

impl WordRecord {
    /// Append one occurrence.
    pub fn push_occurrence(&mut self, surface: &str, page: u32, line: u32) {
        self.occurrence_count += 1;
        self.surface_forms.push(surface.to_string());
        self.pages.push(page);
        self.lines.push(line);
    }

    /// Whether the parallel lists agree with the occurrence count.
    pub fn is_consistent(&self) -> bool {
        let count = self.occurrence_count as usize;
        count > 0
            && self.surface_forms.len() == count
            && self.pages.len() == count
            && self.lines.len() == count
    }
}

/// Part-of-speech tag from the dictionary's second column.
///
/// Only the closed classes are distinguished; every other tag is kept verbatim.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum PartOfSpeech {
    Preposition,
    Conjunction,
    Particle,
    Interjection,
    Other(String),
}

impl PartOfSpeech {
    /// Parse a tag such as `предл.`, `союз`, `част.`, `межд.` or `с`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "предл." => PartOfSpeech::Preposition,
            "союз" => PartOfSpeech::Conjunction,
            "част." => PartOfSpeech::Particle,
            "межд." => PartOfSpeech::Interjection,
            other => PartOfSpeech::Other(other.to_string()),
        }
    }

    /// Emit the tag as written in the dictionary.
    pub fn as_tag(&self) -> &str {
        match self {
            PartOfSpeech::Preposition => "предл.",
            PartOfSpeech::Conjunction => "союз",
            PartOfSpeech::Particle => "част.",
            PartOfSpeech::Interjection => "межд.",
            PartOfSpeech::Other(tag) => tag.as_str(),
        }
    }

    /// Whether rows with this tag and `lemma` stay out of the dictionary.
    ///
    /// Besides the four closed classes, the tag `с` marks a closed-class word
    /// when the lemma is a single letter.
    pub fn is_closed_class(&self, lemma: &str) -> bool {
        match self {
            PartOfSpeech::Preposition
            | PartOfSpeech::Conjunction
            | PartOfSpeech::Particle
            | PartOfSpeech::Interjection => true,
            PartOfSpeech::Other(tag) => tag == "с" && lemma.chars().count() == 1,
        }
    }
}

impl fmt::Display for PartOfSpeech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}
