//! School Directory
//!
//! Registers schools submitted as multipart forms (with an optional image)
//! and lists them newest first. Images are stored on local disk, records in
//! PostgreSQL.

pub mod api;
pub mod config;
pub mod error;
pub mod pool;
pub mod registry;
pub mod school;
