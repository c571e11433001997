//! S3-compatible object storage for the Laddr pipeline.
//!
//! This crate provides:
//! - Upload/download against MinIO or any S3 endpoint
//! - The published object key layout for sources, chunks, and outputs
//! - Chunk manifest persistence

pub mod client;
pub mod error;
pub mod operations;
pub mod paths;

pub use client::{ObjectStore, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use operations::{load_manifest, store_manifest};
pub use paths::StoragePaths;
