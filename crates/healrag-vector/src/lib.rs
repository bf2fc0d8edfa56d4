//! Vector side of the retrieval core: the flat inner-product index, the
//! retriever, the per-request heal index and the persisted base index.

pub mod heal_index;
pub mod index;
pub mod retriever;
pub mod schema;
pub mod store;

pub use heal_index::build_heal_index;
pub use index::{l2_normalize, ChunkIndex, FlatIpIndex};
pub use retriever::retrieve;
pub use store::{build_base_index, load_or_build, BaseIndexStore, LanceBaseStore};
