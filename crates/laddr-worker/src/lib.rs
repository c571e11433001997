//! Pipeline and transcode worker.
//!
//! This crate provides:
//! - The job executor with semaphore-bounded concurrency and DLQ handling
//! - The pipeline coordinator state machine (download through finalize)
//! - The transcode work-unit handler with local retries
//! - Fan-out planning and ledger-based settlement
//! - Rendition assembly and the optional thumbnail/chapter branches

pub mod assembler;
pub mod branches;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod fanout;
pub mod retry;
pub mod transcode_job;

pub use config::{WorkerConfig, WorkerRole};
pub use context::WorkerContext;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
