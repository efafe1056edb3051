use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use textindex_dict::{Dictionary, DictionaryError, DictionaryOptions};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::index::WordIndex;
use crate::numbering::NumberedText;
use crate::request::Request;
use crate::store::{IndexStore, StoreError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to read document {path}: {source}")]
    Document {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Whether an existing artifact may be reused.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Rebuild {
    #[default]
    IfMissing,
    Always,
}

/// Where a prepared index came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IndexSource {
    Artifact,
    Built,
}

/// A document ready to be queried.
#[derive(Debug)]
pub struct Prepared {
    pub text: NumberedText,
    pub index: WordIndex,
    pub source: IndexSource,
}

enum DictionarySource {
    Loaded(Arc<Dictionary>),
    File {
        path: PathBuf,
        options: DictionaryOptions,
        cached: Mutex<Option<Arc<Dictionary>>>,
    },
}

/// Runs requests end to end: number the document, reuse or build its index,
/// answer the query.
pub struct Engine {
    dictionary: DictionarySource,
    store: IndexStore,
}

impl Engine {
    pub fn new(dictionary: Arc<Dictionary>, store: IndexStore) -> Self {
        Self {
            dictionary: DictionarySource::Loaded(dictionary),
            store,
        }
    }

    /// Load the dictionary from `path` the first time an index must be built.
    ///
    /// Requests served from existing artifacts never touch the dictionary.
    pub fn with_dictionary_file(
        path: impl Into<PathBuf>,
        options: DictionaryOptions,
        store: IndexStore,
    ) -> Self {
        Self {
            dictionary: DictionarySource::File {
                path: path.into(),
                options,
                cached: Mutex::new(None),
            },
            store,
        }
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn process(&self, request: &Request) -> Result<String, EngineError> {
        self.process_with(request, Rebuild::IfMissing)
    }

    pub fn process_with(&self, request: &Request, rebuild: Rebuild) -> Result<String, EngineError> {
        let prepared = self.prepare(&request.document, rebuild)?;
        debug!(
            "answering {:?} for {} ({:?})",
            request.query,
            request.document.display(),
            prepared.source
        );
        Ok(request.query.answer(&prepared.index, &prepared.text))
    }

    /// Number the document and obtain its index, holding the artifact lock
    /// for the whole load-or-build step.
    pub fn prepare(&self, document: &Path, rebuild: Rebuild) -> Result<Prepared, EngineError> {
        let text = NumberedText::read(document).map_err(|source| EngineError::Document {
            path: document.to_path_buf(),
            source,
        })?;

        let guard = self.store.lock(document);
        debug!("holding artifact lock on {}", guard.path().display());
        if rebuild == Rebuild::IfMissing && self.store.exists(document) {
            let index = self.store.load(document)?;
            return Ok(Prepared {
                text,
                index,
                source: IndexSource::Artifact,
            });
        }
        if rebuild == Rebuild::Always {
            info!("rebuilding index for {}", document.display());
        }

        let dictionary = self.dictionary()?;
        let index = WordIndex::build(text.lines(), &dictionary);
        self.store.save(document, &index)?;
        Ok(Prepared {
            text,
            index,
            source: IndexSource::Built,
        })
    }

    fn dictionary(&self) -> Result<Arc<Dictionary>, EngineError> {
        match &self.dictionary {
            DictionarySource::Loaded(dict) => Ok(Arc::clone(dict)),
            DictionarySource::File {
                path,
                options,
                cached,
            } => {
                let mut slot = cached.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(dict) = slot.as_ref() {
                    return Ok(Arc::clone(dict));
                }
                let start = Instant::now();
                let dict = Dictionary::load_with_options(path, options).inspect_err(|err| {
                    warn!("dictionary unavailable: {err}");
                })?;
                let dict = Arc::new(dict);
                *slot = Some(Arc::clone(&dict));
                info!("dictionary ready in {} ms", start.elapsed().as_millis());
                Ok(dict)
            }
        }
    }
}
