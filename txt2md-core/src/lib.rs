#![doc = "txt2md-core: change detection and conversion orchestration for txt2md."]

//! This crate holds the business logic of txt2md: settings, path mirroring,
//! staleness decisions, discovery, output writing and the pipeline that ties
//! them together. Network and process-level concerns live in the CLI crate.
//!
//! # Usage
//! Build a [`config::RunSettings`], implement [`contract::Converter`] (or use
//! the generated `MockConverter` in tests) and call [`pipeline::run`].

pub mod config;
pub mod contract;
pub mod discover;
pub mod mirror;
pub mod model;
pub mod pipeline;
pub mod staleness;
pub mod summary;
pub mod writer;

pub use config::RunSettings;
pub use contract::{ConversionError, Converter};
pub use pipeline::{run, PipelineError};
pub use summary::{Outcome, RunSummary};
