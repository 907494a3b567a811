//! # Capture
//!
//! The per-cycle capture loop: read one segment, assemble, range, render,
//! publish. Blocking; callers run it on a dedicated thread.
//!
//! ## Usage
//!
//! ```ignore
//! use capture::CaptureWorker;
//!
//! let worker = CaptureWorker::new(reader, &config, Arc::clone(&peak));
//! let report = tokio::task::spawn_blocking(move || worker.run(&stop, publisher, None)).await?;
//! ```

mod worker;

pub use worker::{CaptureWorker, CycleOutcome, WorkerReport};
