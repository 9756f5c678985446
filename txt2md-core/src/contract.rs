//! # contract: the conversion boundary
//!
//! The pipeline never talks to a model directly. It hands each stale file's
//! text to a [`Converter`] and gets Markdown or a [`ConversionError`] back.
//! The CLI crate implements the trait with an HTTP chat-completions client;
//! tests use the `mockall`-generated `MockConverter`.
//!
//! A converter is called at most once per stale file per run. Any retry or
//! timeout policy is the implementor's business.

use crate::config::RunSettings;
use async_trait::async_trait;
use thiserror::Error;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Why a single conversion call failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// The endpoint could not be reached at all.
    #[error("cannot connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("request timed out after {secs} seconds")]
    Timeout { secs: u64 },

    /// The endpoint answered with a non-success status.
    #[error("endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not JSON, or lacked `choices[0].message.content`.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl ConversionError {
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, ConversionError::Connect { .. })
    }
}

/// Turns raw text into Markdown.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(&self, text: &str, settings: &RunSettings) -> Result<String, ConversionError>;
}
