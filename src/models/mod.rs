//! Core data model for the file sharing service.
//!
//! A single entity, `FileRecord`, describes one uploaded file. Records are
//! serialized as JSON both in the persisted metadata cache and on the API
//! surface, so the serde field names are the wire contract.

pub mod file_record;
