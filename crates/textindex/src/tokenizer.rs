/// Letters of the Russian alphabet, the only characters a token keeps at its edges.
pub fn is_letter(c: char) -> bool {
    matches!(c, 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё')
}

/// Strip leading and trailing non-letters; empty if the token has no letters.
pub fn strip_punctuation(raw: &str) -> &str {
    raw.trim_matches(|c: char| !is_letter(c))
}

/// Tokens of one line's text, split on single spaces.
///
/// Runs of spaces and punctuation-only pieces yield empty tokens, which the
/// caller is expected to skip.
pub fn tokens(text: &str) -> impl Iterator<Item = &str> + '_ {
    text.split(' ').map(strip_punctuation)
}
