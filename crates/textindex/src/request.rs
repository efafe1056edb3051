use std::path::PathBuf;

use thiserror::Error;

use crate::query::{Payload, Query};
use crate::tokenizer::is_letter;

/// A validated request: which document, and what to ask of its index.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Request {
    pub document: PathBuf,
    pub query: Query,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum RequestError {
    #[error("too few arguments: expected a file name and a request type")]
    Arguments,
    #[error("incorrect file name {0:?}: expected a .txt file")]
    Format(String),
    #[error("incorrect request type {0:?}: expected a number from 1 to 3")]
    QueryType(String),
    #[error("incorrect data for request type {kind}: {reason}")]
    QueryData { kind: u8, reason: &'static str },
}

impl RequestError {
    fn data(kind: u8, reason: &'static str) -> Self {
        RequestError::QueryData { kind, reason }
    }
}

impl Request {
    /// Validate `[file, type, data...]`.
    ///
    /// Type 1 builds the index, type 2 asks for a number of frequent words, one
    /// word or a group of words, type 3 asks for the lines holding one word.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, RequestError> {
        let [file, kind, data @ ..] = args else {
            return Err(RequestError::Arguments);
        };
        let file = file.as_ref();
        if !file.ends_with(".txt") {
            return Err(RequestError::Format(file.to_string()));
        }
        let data: Vec<&str> = data.iter().map(AsRef::as_ref).collect();
        let query = match kind.as_ref() {
            "1" => build_only(&data)?,
            "2" => detail(&data)?,
            "3" => lines(&data)?,
            other => return Err(RequestError::QueryType(other.to_string())),
        };
        Ok(Self {
            document: PathBuf::from(file),
            query,
        })
    }
}

fn build_only(data: &[&str]) -> Result<Query, RequestError> {
    if !data.is_empty() {
        return Err(RequestError::data(1, "no data expected"));
    }
    Ok(Query::BuildOnly)
}

fn detail(data: &[&str]) -> Result<Query, RequestError> {
    match data {
        [] => Err(RequestError::data(2, "expected a number, a word or a group of words")),
        [single] => match single.parse::<i64>() {
            Ok(n) if n > 0 => Ok(Query::Detail(Payload::Number(
                usize::try_from(n).unwrap_or(usize::MAX),
            ))),
            Ok(_) => Err(RequestError::data(2, "expected a natural number")),
            Err(_) if is_russian_word(single) => Ok(Query::Detail(Payload::Word(single.to_string()))),
            Err(_) => Err(RequestError::data(2, "expected a word in Russian")),
        },
        words => {
            if !words.iter().all(|w| is_russian_word(w)) {
                return Err(RequestError::data(2, "expected a group of words in Russian"));
            }
            Ok(Query::Detail(Payload::Group(
                words.iter().map(|w| w.to_string()).collect(),
            )))
        }
    }
}

fn lines(data: &[&str]) -> Result<Query, RequestError> {
    match data {
        [word] if is_russian_word(word) => Ok(Query::Lines(word.to_string())),
        [_] => Err(RequestError::data(3, "expected a word in Russian")),
        _ => Err(RequestError::data(3, "expected exactly one word")),
    }
}

/// A Russian letter, then letters or hyphens, ending in a letter.
pub fn is_russian_word(word: &str) -> bool {
    let mut chars = word.chars();
    let (Some(first), Some(last)) = (chars.next(), word.chars().next_back()) else {
        return false;
    };
    is_letter(first) && is_letter(last) && chars.all(|c| is_letter(c) || c == '-')
}
