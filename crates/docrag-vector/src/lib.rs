//! LanceDB-backed Vector Index.
//!
//! One table (`chunks`) holds `id`, `source`, an insertion sequence number
//! and the embedding. Chunk text lives only in the Content Store.

pub mod index;
pub mod schema;
pub mod table;

pub use index::LanceVectorIndex;
pub use schema::{build_chunk_schema, CHUNKS_TABLE};
