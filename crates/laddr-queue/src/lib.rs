//! Redis Streams job queue for the Laddr pipeline.
//!
//! This crate provides:
//! - Job enqueueing with idempotency-key deduplication
//! - Worker consumption with retry counters and DLQ
//! - The transcode result ledger (settled work units)
//! - The pipeline status store

pub mod client;
pub mod error;
pub mod job;
pub mod ledger;
pub mod queue;
pub mod status;

pub use client::PipelineClient;
pub use error::{QueueError, QueueResult};
pub use job::{ProcessVideoJob, QueueJob, TranscodeChunkJob};
pub use ledger::ResultLedger;
pub use queue::{JobQueue, QueueConfig, Stream};
pub use status::{StatusSnapshot, StatusStore};
