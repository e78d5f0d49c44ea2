//! This module contains the log capture infrastructure.
//!
//! It includes a `tracing` layer that records events as `LogEntry` values and
//! a bounded buffer that keeps them for analysis and batches them for storage.
pub mod buffer;
pub mod collector;

pub use buffer::LogBuffer;
pub use collector::{is_external_event, LogCaptureLayer};
