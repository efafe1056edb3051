pub mod engine;
pub mod handlers;
pub mod index;
pub mod numbering;
pub mod query;
pub mod request;
pub mod store;
pub mod tokenizer;

pub use engine::{Engine, EngineError, IndexSource, Prepared, Rebuild};
pub use handlers::{AppState, router};
pub use index::WordIndex;
pub use numbering::{NumberedText, number_lines};
pub use query::{BUILD_CONFIRMATION, Payload, Query};
pub use request::{Request, RequestError};
pub use store::{IndexStore, StoreError};
