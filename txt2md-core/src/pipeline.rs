//! High-level pipeline: walks the input tree and converts every stale file.
//!
//! For each eligible input file the pipeline:
//!   - computes the mirrored output path ([`crate::mirror`])
//!   - decides whether the output is stale ([`crate::staleness`])
//!   - for stale files, reads the text and calls the [`Converter`] once
//!   - writes the Markdown in place ([`crate::writer`])
//!   - records exactly one [`Outcome`] in the [`RunSummary`]
//!
//! # Error Handling
//! Per-file errors become `Outcome::Failed` and never stop sibling files.
//! Only a missing input root or an uncreatable output root abort the run,
//! and both happen before any file is touched.
//!
//! # Concurrency
//! At most `max_concurrent_requests` files are in flight at once (default 1,
//! strictly sequential). Outcomes are recorded in discovery order whatever
//! the completion order.

use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::RunSettings;
use crate::contract::Converter;
use crate::discover::discover;
use crate::mirror::mirror;
use crate::model::{InputFile, OutputTarget};
use crate::staleness::classify;
use crate::summary::{FileError, Outcome, RunSummary};
use crate::writer::write_output;

/// Rough characters-per-token ratio used for the context-length warning.
const CHARS_PER_TOKEN: usize = 4;

/// Run-level failures. These abort before any file is processed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input directory not found or is not a directory: {0}")]
    InputRootMissing(PathBuf),
    #[error("cannot create output directory {path}: {source}")]
    OutputRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Entrypoint: convert every stale file under `settings.input_dir`.
pub async fn run<C>(settings: &RunSettings, converter: &C) -> Result<RunSummary, PipelineError>
where
    C: Converter + ?Sized,
{
    let input_root = &settings.input_dir;
    let output_root = &settings.output_dir;

    if !input_root.is_dir() {
        error!(path = %input_root.display(), "[RUN] Input directory not found or is not a directory");
        return Err(PipelineError::InputRootMissing(input_root.clone()));
    }
    std::fs::create_dir_all(output_root).map_err(|e| {
        error!(error = ?e, path = %output_root.display(), "[RUN] Failed to create output directory");
        PipelineError::OutputRoot {
            path: output_root.clone(),
            source: e,
        }
    })?;
    info!(path = %output_root.display(), "[RUN] Output directory ensured");

    info!(
        path = %input_root.display(),
        extension = %settings.input_extension,
        "[RUN] Scanning for input files"
    );
    let files = discover(input_root, &settings.input_extension);
    let mut summary = RunSummary::default();
    if files.is_empty() {
        info!(path = %input_root.display(), "[RUN] No input files found");
        return Ok(summary);
    }

    let total = files.len();
    info!(
        total,
        caching_enabled = settings.cache.enabled,
        force_reprocess_all = settings.cache.force_reprocess_all,
        max_concurrent_requests = settings.max_concurrent_requests,
        "[RUN] Starting processing"
    );

    let mut outcomes: Vec<(usize, Outcome)> = stream::iter(files.iter().enumerate())
        .map(|(idx, file)| async move {
            debug!(path = %file.path.display(), index = idx + 1, total, "[RUN] Checking file");
            (idx, process_file(settings, converter, file).await)
        })
        .buffer_unordered(settings.max_concurrent_requests.max(1))
        .collect()
        .await;
    outcomes.sort_by_key(|(idx, _)| *idx);

    for (idx, outcome) in outcomes {
        summary.record(files[idx].path.clone(), outcome);
    }

    info!(
        converted = summary.converted,
        skipped = summary.skipped,
        failed = summary.failed(),
        "[RUN] Processing complete"
    );
    Ok(summary)
}

/// Drives one file through mirror → staleness → convert → write.
pub async fn process_file<C>(settings: &RunSettings, converter: &C, file: &InputFile) -> Outcome
where
    C: Converter + ?Sized,
{
    let output_path = match mirror(&settings.input_dir, &settings.output_dir, &file.path) {
        Ok(p) => p,
        Err(e) => {
            error!(path = %file.path.display(), error = %e, "[RUN] Cannot map input to an output path");
            return Outcome::Failed(e.into());
        }
    };
    let target = OutputTarget::probe(output_path);

    let verdict = classify(
        file,
        &target,
        settings.cache.enabled,
        settings.cache.force_reprocess_all,
    );
    if !verdict.is_stale() {
        info!(
            path = %file.path.display(),
            output = %target.path.display(),
            input_mtime = ?file.modified,
            output_mtime = ?target.modified,
            "[RUN] Skipping (up-to-date)"
        );
        return Outcome::Skipped;
    }
    info!(
        path = %file.path.display(),
        output = %target.path.display(),
        reason = %verdict,
        "[RUN] Processing"
    );

    let text = match file.read_text() {
        Ok(t) => t,
        Err(e) => {
            error!(path = %file.path.display(), error = ?e, "[RUN] Error reading input file");
            return Outcome::Failed(FileError::Read {
                path: file.path.clone(),
                source: e,
            });
        }
    };
    warn_if_over_context(settings, file, &text);

    let markdown = match converter.convert(&text, settings).await {
        Ok(md) => md,
        Err(e) => {
            warn!(path = %file.path.display(), error = %e, "[RUN] Failed to get Markdown for file");
            return Outcome::Failed(e.into());
        }
    };

    match write_output(&target.path, &markdown) {
        Ok(()) => {
            info!(
                path = %file.path.display(),
                output = %target.path.display(),
                "[RUN] Successfully wrote Markdown"
            );
            Outcome::Converted
        }
        Err(e) => {
            error!(path = %file.path.display(), error = %e, "[RUN] Error writing Markdown file");
            Outcome::Failed(e.into())
        }
    }
}

fn warn_if_over_context(settings: &RunSettings, file: &InputFile, text: &str) {
    let endpoint = &settings.endpoint;
    let chars = endpoint.system_prompt.chars().count() + endpoint.user_content(text).chars().count();
    let estimated_tokens = chars / CHARS_PER_TOKEN;
    if estimated_tokens > endpoint.context_length as usize {
        warn!(
            path = %file.path.display(),
            estimated_tokens,
            context_length = endpoint.context_length,
            "[RUN] Input likely exceeds the model's context length"
        );
    }
}
