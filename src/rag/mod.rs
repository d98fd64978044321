//! Retrieval over troubleshooting manuals.
//!
//! - `chunker`: splits a manual at heading boundaries and injects header context
//! - `keyword`: deterministic error-code boost over similarity candidates
//! - `index`: embedding-backed vector index on top of a `RagStore`
//! - `prompt`: context block and prompt assembly

pub mod chunker;
pub mod document;
pub mod index;
pub mod keyword;
pub mod prompt;
pub mod sqlite;
pub mod store;

pub use chunker::{ChunkerConfig, HeaderChunker};
pub use document::{DocumentChunk, HeaderMap};
pub use index::{EmbeddingIndex, VectorIndex};
pub use sqlite::SqliteRagStore;
pub use store::{ChunkSearchResult, RagStore, StoredChunk};
