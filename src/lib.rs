//! filedrop — a file sharing service.
//!
//! Authenticated users upload files, receive a public share link per file,
//! and can list or delete their own uploads. Share links resolve without
//! authentication, falling back to store-derived metadata when the local
//! cache has no entry for the requested id.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
