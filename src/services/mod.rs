//! Service layer: path generation, blob storage, the metadata cache, share
//! resolution, and the lifecycle manager tying them together.

pub mod blob_store;
pub mod lifecycle;
pub mod metadata_cache;
pub mod path_gen;
pub mod share;
