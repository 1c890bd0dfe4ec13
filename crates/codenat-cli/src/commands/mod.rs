//! Command implementations for the codenat CLI

pub mod evaluate;
pub mod infill;
pub mod transform;

pub use evaluate::EvaluateCommand;
pub use infill::InfillCommand;
pub use transform::TransformCommand;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

/// Bar over `len` work items, drawn on stderr when it is a terminal.
pub(crate) fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}
