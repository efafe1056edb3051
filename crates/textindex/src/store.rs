//! Flat, line-oriented index artifacts.
//!
//! One record per line: `lemma, count, forms, pages, lines`, fields separated
//! by `", "` and list entries by single spaces. Nothing is escaped, so a
//! lemma or form containing `", "` cannot be stored faithfully.
//!
//! Artifacts live at `<dir>/<document file name>(index)`. An existing
//! artifact is trusted as is; it is never checked against the document it
//! was built from.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use dashmap::DashMap;
use tempfile::NamedTempFile;
use textindex_types::WordRecord;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::index::WordIndex;

/// Default directory for index artifacts.
pub const DEFAULT_INDEX_DIR: &str = "indices";
/// Appended to the document file name to form the artifact name.
pub const ARTIFACT_SUFFIX: &str = "(index)";

const FIELD_SEP: &str = ", ";
const FIELDS: usize = 5;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("index artifact I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("index artifact is corrupt at line {line} ({reason}); rebuild required")]
    Corrupt { line: usize, reason: String },
}

impl StoreError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn corrupt(line: usize, reason: impl Into<String>) -> Self {
        StoreError::Corrupt {
            line,
            reason: reason.into(),
        }
    }
}

/// Render one record without the trailing newline.
pub fn format_record(lemma: &str, record: &WordRecord) -> String {
    let mut out = String::new();
    let _ = write!(out, "{lemma}{FIELD_SEP}{}{FIELD_SEP}", record.occurrence_count);
    out.push_str(&record.surface_forms.join(" "));
    out.push_str(FIELD_SEP);
    out.push_str(&join_numbers(&record.pages));
    out.push_str(FIELD_SEP);
    out.push_str(&join_numbers(&record.lines));
    out
}

fn join_numbers(values: &[u32]) -> String {
    values
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse one record; `line` is its 1-based position, used in errors.
pub fn parse_record(raw: &str, line: usize) -> Result<(String, WordRecord), StoreError> {
    let fields: Vec<&str> = raw.split(FIELD_SEP).collect();
    if fields.len() != FIELDS {
        return Err(StoreError::corrupt(
            line,
            format!("expected {FIELDS} fields, found {}", fields.len()),
        ));
    }
    let occurrence_count = fields[1]
        .parse::<u32>()
        .map_err(|e| StoreError::corrupt(line, format!("occurrence count: {e}")))?;
    let record = WordRecord {
        occurrence_count,
        surface_forms: fields[2].split(' ').map(str::to_string).collect(),
        pages: parse_numbers(fields[3], line, "page")?,
        lines: parse_numbers(fields[4], line, "line")?,
    };
    if !record.is_consistent() {
        return Err(StoreError::corrupt(
            line,
            "occurrence count does not match the recorded occurrences",
        ));
    }
    Ok((fields[0].to_string(), record))
}

fn parse_numbers(field: &str, line: usize, what: &str) -> Result<Vec<u32>, StoreError> {
    field
        .split(' ')
        .map(|v| {
            v.parse::<u32>()
                .map_err(|e| StoreError::corrupt(line, format!("{what} number {v:?}: {e}")))
        })
        .collect()
}

/// Serialize the whole index, one newline-terminated record per lemma.
pub fn serialize(index: &WordIndex) -> String {
    let mut out = String::new();
    for (lemma, record) in index.iter() {
        out.push_str(&format_record(lemma, record));
        out.push('\n');
    }
    out
}

/// Parse a serialized index. Blank lines are ignored; anything else that is
/// not a well-formed record fails the whole load.
pub fn deserialize(raw: &str) -> Result<WordIndex, StoreError> {
    let mut index = WordIndex::new();
    for (idx, line) in raw.lines().enumerate() {
        push_line(&mut index, line, idx + 1)?;
    }
    Ok(index)
}

fn push_line(index: &mut WordIndex, line: &str, lineno: usize) -> Result<(), StoreError> {
    if line.is_empty() {
        return Ok(());
    }
    let (lemma, record) = parse_record(line, lineno)?;
    if index.contains(&lemma) {
        return Err(StoreError::corrupt(lineno, format!("duplicate lemma {lemma:?}")));
    }
    index.insert(lemma, record);
    Ok(())
}

/// Directory of index artifacts plus the locks guarding them.
#[derive(Clone, Debug)]
pub struct IndexStore {
    dir: PathBuf,
    locks: ArtifactLocks,
}

impl IndexStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: ArtifactLocks::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifact path for a document; only the document's file name is used.
    pub fn artifact_path(&self, document: &Path) -> PathBuf {
        let name = document
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.dir.join(format!("{name}{ARTIFACT_SUFFIX}"))
    }

    pub fn exists(&self, document: &Path) -> bool {
        self.artifact_path(document).is_file()
    }

    pub fn load(&self, document: &Path) -> Result<WordIndex, StoreError> {
        let path = self.artifact_path(document);
        let file = File::open(&path).map_err(StoreError::io(&path))?;
        let mut index = WordIndex::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(StoreError::io(&path))?;
            if let Err(err) = push_line(&mut index, &line, idx + 1) {
                warn!("{}: {err}", path.display());
                return Err(err);
            }
        }
        info!("loaded {} lemmas from {}", index.len(), path.display());
        Ok(index)
    }

    /// Write the artifact through a temporary file in the same directory and
    /// rename it into place, so a failed write never leaves a partial artifact.
    pub fn save(&self, document: &Path, index: &WordIndex) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.dir).map_err(StoreError::io(&self.dir))?;
        let path = self.artifact_path(document);
        let temp = NamedTempFile::new_in(&self.dir).map_err(StoreError::io(&self.dir))?;
        let mut writer = BufWriter::new(temp);
        for (lemma, record) in index.iter() {
            writeln!(writer, "{}", format_record(lemma, record)).map_err(StoreError::io(&path))?;
        }
        let temp = writer
            .into_inner()
            .map_err(|e| StoreError::io(&path)(e.into_error()))?;
        temp.as_file().sync_all().map_err(StoreError::io(&path))?;
        temp.persist(&path)
            .map_err(|e| StoreError::io(&path)(e.error))?;
        info!("wrote {} lemmas to {}", index.len(), path.display());
        Ok(path)
    }

    /// Exclusive access to a document's artifact until the guard is dropped.
    pub fn lock(&self, document: &Path) -> ArtifactGuard {
        self.locks.acquire(self.artifact_path(document))
    }
}

impl Default for IndexStore {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_DIR)
    }
}

#[derive(Debug, Default)]
struct Gate {
    held: Mutex<bool>,
    released: Condvar,
}

/// Per-artifact exclusive locks shared by every clone of a store.
///
/// A gate lives in the map only while some guard holds or awaits it; the
/// last guard to release removes it.
#[derive(Clone, Debug, Default)]
pub struct ArtifactLocks {
    gates: Arc<DashMap<PathBuf, Arc<Gate>>>,
}

impl ArtifactLocks {
    pub fn acquire(&self, path: PathBuf) -> ArtifactGuard {
        let gate = Arc::clone(self.gates.entry(path.clone()).or_default().value());
        {
            let mut held = gate.held.lock().unwrap_or_else(PoisonError::into_inner);
            while *held {
                debug!("waiting for artifact lock on {}", path.display());
                held = gate
                    .released
                    .wait(held)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            *held = true;
        }
        ArtifactGuard {
            gate,
            gates: Arc::clone(&self.gates),
            path,
        }
    }

    /// Number of artifacts currently locked or awaited.
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

/// Releases its artifact lock on drop, including during unwinding.
#[derive(Debug)]
pub struct ArtifactGuard {
    gate: Arc<Gate>,
    gates: Arc<DashMap<PathBuf, Arc<Gate>>>,
    path: PathBuf,
}

impl ArtifactGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        {
            let mut held = self.gate.held.lock().unwrap_or_else(PoisonError::into_inner);
            *held = false;
            self.gate.released.notify_one();
        }
        // Waiters clone the gate under the shard lock, so two references
        // (the map's and ours) mean nobody else wants it.
        self.gates
            .remove_if(&self.path, |_, gate| Arc::strong_count(gate) == 2);
    }
}
