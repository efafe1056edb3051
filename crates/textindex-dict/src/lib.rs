//! Load word-form to lemma dictionaries from CSV tables.
//!
//! Each row of the source is `lemma, part_of_speech, form_1, form_2, ...`.
//! Every form of the row (the lemma included) maps to the lemma unless the
//! part of speech is a closed class (prepositions, conjunctions, particles,
//! interjections and single-letter `с` rows), in which case the row
//! contributes nothing.
//!
//! The source bytes are either memory-mapped or read into an owned buffer
//! ([`LoadMode`]) and decoded from a fixed [`SourceEncoding`] before parsing.
//!
//! # Example
//! ```no_run
//! use textindex_dict::{Dictionary, DictionaryOptions, SourceEncoding};
//!
//! # fn main() -> Result<(), textindex_dict::DictionaryError> {
//! let options = DictionaryOptions {
//!     encoding: SourceEncoding::Windows1251,
//!     ..DictionaryOptions::default()
//! };
//! let dict = Dictionary::load_with_options("odict.csv", &options)?;
//! println!("бежал -> {:?}", dict.lemma_for("бежал"));
//! # Ok(()) }
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

use encoding_rs::{DecoderResult, WINDOWS_1251};
use memmap2::Mmap;
use textindex_types::PartOfSpeech;
use thiserror::Error;
use tracing::{debug, info, trace};

/// Strategy for reading the source file.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LoadMode {
    /// Memory-map the file (fast, zero-copy until decoding).
    #[default]
    Mmap,
    /// Read the file into an owned buffer (portable fallback).
    Owned,
}

/// Character encoding of the source file.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SourceEncoding {
    #[default]
    Utf8,
    /// Single-byte Cyrillic code page, the encoding the OpenCorpora-style
    /// `odict.csv` tables are distributed in.
    Windows1251,
}

#[derive(Clone, Debug, Default)]
pub struct DictionaryOptions {
    pub mode: LoadMode,
    pub encoding: SourceEncoding,
    /// Treat the first row as a header and skip it.
    pub has_header: bool,
}

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("dictionary source not found: {0}")]
    Missing(PathBuf),
    #[error("failed to read dictionary source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("dictionary source is not valid {encoding:?} at byte {offset}")]
    Encoding {
        encoding: SourceEncoding,
        offset: usize,
    },
    #[error("malformed dictionary source: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed dictionary row {row}: expected at least 2 fields, got {fields}")]
    ShortRow { row: u64, fields: usize },
}

enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Buffer {
    fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Mmap(m) => m.as_ref(),
            Buffer::Owned(v) => v.as_slice(),
        }
    }
}

/// Read-only mapping from surface word-form to lemma.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Dictionary {
    forms: HashMap<String, String>,
}

impl Dictionary {
    /// Load a UTF-8 source without a header row, memory-mapping the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        Self::load_with_options(path, &DictionaryOptions::default())
    }

    pub fn load_with_options(
        path: impl AsRef<Path>,
        options: &DictionaryOptions,
    ) -> Result<Self, DictionaryError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DictionaryError::Missing(path.to_path_buf()));
        }

        let start = Instant::now();
        let buffer = load_file(path, options.mode)?;
        let text = decode(buffer.as_slice(), options.encoding)?;
        let dict = Self::from_csv(&text, options.has_header)?;
        info!(
            "dictionary loaded from {}: {} forms in {} ms",
            path.display(),
            dict.len(),
            start.elapsed().as_millis()
        );
        Ok(dict)
    }

    /// Parse already-decoded CSV text.
    pub fn from_csv(text: &str, has_header: bool) -> Result<Self, DictionaryError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(has_header)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut forms = HashMap::new();
        let mut skipped = 0usize;
        for record in reader.records() {
            let record = record?;
            if record.len() < 2 {
                let row = record.position().map_or(0, |p| p.line());
                return Err(DictionaryError::ShortRow {
                    row,
                    fields: record.len(),
                });
            }
            let lemma = &record[0];
            let pos = PartOfSpeech::from_tag(&record[1]);
            if pos.is_closed_class(lemma) {
                trace!("skipping closed-class row {lemma} ({pos})");
                skipped += 1;
                continue;
            }
            forms.insert(lemma.to_string(), lemma.to_string());
            for form in record.iter().skip(2).filter(|f| !f.is_empty()) {
                forms.insert(form.to_string(), lemma.to_string());
            }
        }
        debug!("skipped {skipped} closed-class rows");
        Ok(Self { forms })
    }

    /// Canonical form for a surface word-form, matched exactly.
    pub fn lemma_for(&self, form: &str) -> Option<&str> {
        self.forms.get(form).map(String::as_str)
    }

    pub fn contains(&self, form: &str) -> bool {
        self.forms.contains_key(form)
    }

    /// Number of distinct surface forms.
    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

impl<F: Into<String>, L: Into<String>> FromIterator<(F, L)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (F, L)>>(iter: I) -> Self {
        Self {
            forms: iter
                .into_iter()
                .map(|(form, lemma)| (form.into(), lemma.into()))
                .collect(),
        }
    }
}

fn load_file(path: &Path, mode: LoadMode) -> Result<Buffer, DictionaryError> {
    let io_err = |source: io::Error| DictionaryError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(io_err)?;
    let len = file.metadata().map_err(io_err)?.len();
    match mode {
        // Zero-length files cannot be mapped on every platform.
        LoadMode::Mmap if len > 0 => unsafe { Mmap::map(&file) }
            .map(Buffer::Mmap)
            .map_err(io_err),
        _ => {
            let mut buf = Vec::new();
            file.read_to_end(&mut buf).map_err(io_err)?;
            Ok(Buffer::Owned(buf))
        }
    }
}

fn decode(bytes: &[u8], encoding: SourceEncoding) -> Result<Cow<'_, str>, DictionaryError> {
    match encoding {
        SourceEncoding::Utf8 => std::str::from_utf8(bytes).map(Cow::Borrowed).map_err(|e| {
            DictionaryError::Encoding {
                encoding,
                offset: e.valid_up_to(),
            }
        }),
        SourceEncoding::Windows1251 => {
            let mut decoder = WINDOWS_1251.new_decoder_without_bom_handling();
            let capacity = decoder
                .max_utf8_buffer_length_without_replacement(bytes.len())
                .unwrap_or(bytes.len() * 3);
            let mut out = String::with_capacity(capacity);
            let (result, read) = decoder.decode_to_string_without_replacement(bytes, &mut out, true);
            match result {
                DecoderResult::InputEmpty => Ok(Cow::Owned(out)),
                DecoderResult::Malformed(bad, _) => Err(DictionaryError::Encoding {
                    encoding,
                    offset: read.saturating_sub(usize::from(bad)),
                }),
                DecoderResult::OutputFull => Err(DictionaryError::Encoding {
                    encoding,
                    offset: read,
                }),
            }
        }
    }
}
