//! Embedding generation.
//!
//! Supports:
//! - Feature-hashing embeddings (always available, no model download)
//! - Local sentence-transformer models via embed_anything (`local-models` feature)
//!
//! The provider is selected with `P8_DEFAULT_EMBEDDING` (see [`ProviderFactory`]).

pub mod hashing;
#[cfg(feature = "local-models")]
pub mod local;
pub mod provider;

pub use hashing::HashingEmbedder;
#[cfg(feature = "local-models")]
pub use local::LocalEmbedder;
pub use provider::{EmbeddingProvider, ProviderFactory, DEFAULT_LOCAL_MODEL};
