use std::fs;
use std::io;
use std::path::Path;

use textindex_types::NumberedLine;

/// First line number handed out.
pub const FIRST_LINE: u32 = 1;

/// Number the non-empty lines of a document.
///
/// Only exactly-empty lines are dropped; whitespace-only lines are kept and
/// numbered like any other.
pub fn number_lines<I, S>(lines: I) -> Vec<NumberedLine>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    lines
        .into_iter()
        .map(Into::<String>::into)
        .filter(|line| !line.is_empty())
        .zip(FIRST_LINE..)
        .map(|(text, number)| NumberedLine::new(number, text))
        .collect()
}

/// A numbered document, retained for line retrieval after indexing.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NumberedText {
    lines: Vec<NumberedLine>,
}

impl NumberedText {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: number_lines(lines),
        }
    }

    /// Split raw text on line endings (`\n` or `\r\n`) and number it.
    pub fn parse(raw: &str) -> Self {
        Self::from_lines(raw.lines())
    }

    pub fn read(path: impl AsRef<Path>) -> io::Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(Self::parse(&raw))
    }

    /// Line with the given number, if the document has one.
    pub fn line(&self, number: u32) -> Option<&NumberedLine> {
        // Numbers are strictly increasing, so the slice is sorted by them.
        self.lines
            .binary_search_by_key(&number, |l| l.line_number)
            .ok()
            .map(|idx| &self.lines[idx])
    }

    pub fn lines(&self) -> &[NumberedLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_has_no_lines() {
        assert!(number_lines(Vec::<String>::new()).is_empty());
        assert!(NumberedText::parse("").is_empty());
    }

    #[test]
    fn drops_only_exactly_empty_lines() {
        let numbered = number_lines(["О, о", "", "Моя оборона!", " "]);
        let rendered: Vec<String> = numbered.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["(1,0) О, о", "(2,0) Моя оборона!", "(3,0)  "]);
    }

    #[test]
    fn paginates_every_45_lines() {
        let lines: Vec<String> = (0..100).map(|i| format!("строка {i}")).collect();
        let numbered = number_lines(lines);
        assert_eq!(numbered.len(), 100);
        for pair in numbered.windows(2) {
            assert_eq!(pair[1].line_number, pair[0].line_number + 1);
            assert!(pair[1].page_number >= pair[0].page_number);
        }
        assert_eq!(numbered[44].page_number, 0);
        assert_eq!(numbered[45].page_number, 1);
        assert_eq!(numbered[90].page_number, 2);
    }

    #[test]
    fn numbering_is_deterministic() {
        let raw = "Я надеялась поспать.\n\nХочется плакать.\r\nИ спать.";
        assert_eq!(NumberedText::parse(raw), NumberedText::parse(raw));
        assert_eq!(NumberedText::parse(raw).len(), 3);
    }

    #[test]
    fn finds_lines_by_number() {
        let text = NumberedText::parse("первая\n\nвторая\nтретья");
        assert_eq!(text.line(2).map(|l| l.text.as_str()), Some("вторая"));
        assert!(text.line(0).is_none());
        assert!(text.line(4).is_none());
    }
}
