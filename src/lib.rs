//! Relay between a sampling profiler's line-oriented stack output and a
//! Pyroscope-compatible ingestion endpoint.
//!
//! The pipeline reads blank-line-delimited sample blocks, normalizes and
//! parses them into tagged traces, runs them through a plugin chain, folds
//! each trace into a flame-graph grouping key, aggregates per time window,
//! and dispatches finished windows over HTTP with bounded concurrency.

pub mod aggregate;
pub mod clock;
pub mod config;
pub mod pipeline;
pub mod plugins;
pub mod sample;
pub mod sender;
pub mod trace;
