//! Log review for the Dayboard dashboard.
//!
//! Captured log entries land in an in-memory ring buffer and a sled-backed
//! store. `analysis::LogAnalyzer` turns a time window of those entries into
//! a `LogAnalysis` report: level counts, top components, authentication
//! findings, repeated errors, volume and burst flags, a health score and
//! recommendations. `review` re-runs the analysis on a timer, and `web`
//! exposes the same operations over HTTP.
pub mod analysis;
pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod review;
pub mod storage;
pub mod types;
pub mod web;
