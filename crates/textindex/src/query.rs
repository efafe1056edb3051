use crate::index::WordIndex;
use crate::numbering::NumberedText;

/// Returned for a build-only request once the index exists.
pub const BUILD_CONFIRMATION: &str = "The index is built.";

const GROUP_SEPARATOR: &str = "\n\n\n";
const LINE_SEPARATOR: &str = "\n\n";

/// What to look up in a built index.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Query {
    BuildOnly,
    Detail(Payload),
    Lines(String),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Payload {
    /// The n most frequent lemmas; n is at least 1.
    Number(usize),
    Word(String),
    Group(Vec<String>),
}

impl Query {
    /// Answer the query. Unknown lemmas yield a not-found message, never an error.
    pub fn answer(&self, index: &WordIndex, text: &NumberedText) -> String {
        match self {
            Query::BuildOnly => BUILD_CONFIRMATION.to_string(),
            Query::Detail(Payload::Number(n)) => most_frequent(index, *n),
            Query::Detail(Payload::Word(lemma)) => word_detail(index, lemma),
            Query::Detail(Payload::Group(lemmas)) => group_detail(index, lemmas),
            Query::Lines(lemma) => lines_with(index, lemma, text),
        }
    }
}

pub fn not_found(lemma: &str) -> String {
    format!("Word {lemma} was not found.")
}

/// Comma-separated lemmas of the `n` most frequent entries.
pub fn most_frequent(index: &WordIndex, n: usize) -> String {
    index
        .most_frequent(n)
        .into_iter()
        .map(|(lemma, _)| lemma)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn word_detail(index: &WordIndex, lemma: &str) -> String {
    let Some(record) = index.get(lemma) else {
        return not_found(lemma);
    };
    let pages = record
        .pages
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "Word: {lemma}\nNumber of occurrences: {}\nUsed word forms: {}\nPage numbers: {pages}",
        record.occurrence_count,
        record.surface_forms.join(" "),
    )
}

pub fn group_detail(index: &WordIndex, lemmas: &[String]) -> String {
    lemmas
        .iter()
        .map(|lemma| word_detail(index, lemma))
        .collect::<Vec<_>>()
        .join(GROUP_SEPARATOR)
}

/// Text of every line the lemma occurs on, one entry per occurrence.
pub fn lines_with(index: &WordIndex, lemma: &str, text: &NumberedText) -> String {
    let Some(record) = index.get(lemma) else {
        return not_found(lemma);
    };
    record
        .lines
        .iter()
        .map(|number| text.line(*number).map_or("", |line| line.text.as_str()))
        .collect::<Vec<_>>()
        .join(LINE_SEPARATOR)
}
