//! Persistent vector stores for chunk embeddings.
//!
//! Two backends sit behind [`docsearch_core::traits::VectorIndex`]: a flat
//! JSON file scanned by brute force and a LanceDB table. Both rank with the
//! same exact scoring. [`PersistentVectorStoreFactory`] decides whether the
//! store on disk can be reused or has to be rebuilt.
pub mod factory;
pub mod flat;
pub mod lance;
pub mod manifest;
pub mod similarity;

pub use factory::{build_vector_factory, PersistentVectorStoreFactory};
pub use flat::FlatVectorStore;
pub use lance::LanceVectorStore;
pub use manifest::StoreManifest;
