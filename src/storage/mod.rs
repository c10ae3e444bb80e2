//! Index persistence.
//!
//! - `format`: binary vector file (header + little-endian f32 rows)
//! - `store`: generation directories published through an atomic `CURRENT` manifest

pub mod format;
pub mod store;

pub use store::{IndexStore, Manifest, StoredIndex, CURRENT_FILE};
