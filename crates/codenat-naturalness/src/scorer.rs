//! Entropy and relative naturalness shift.

use codenat_common::{PipelineError, Result};
use codenat_oracle::{CausalLmOracle, TokenEncoder};
use tracing::debug;

/// Relative entropy shift of `transformed` against `original`.
///
/// Fails with [`PipelineError::InvalidBaseline`] unless `original` is
/// positive and finite, so the result is never `NaN` or infinite.
pub fn relative_shift(original: f64, transformed: f64) -> Result<f64> {
    check_baseline(original)?;
    let shift = (transformed - original) / original;
    if shift.is_finite() {
        Ok(shift)
    } else {
        Err(PipelineError::Oracle(format!("non-finite transformed entropy {transformed}")))
    }
}

fn check_baseline(entropy: f64) -> Result<()> {
    if entropy.is_finite() && entropy > 0.0 {
        Ok(())
    } else {
        Err(PipelineError::InvalidBaseline { entropy })
    }
}

/// Scores programs with one causal model and its tokenizer.
///
/// Both handles are built once by the caller and live for the whole run.
pub struct Scorer {
    encoder: Box<dyn TokenEncoder>,
    model: Box<dyn CausalLmOracle>,
}

impl Scorer {
    pub fn new(encoder: Box<dyn TokenEncoder>, model: Box<dyn CausalLmOracle>) -> Self {
        Self { encoder, model }
    }

    /// Mean next-token loss of `program`, truncated to the model context.
    ///
    /// Programs shorter than two tokens have nothing to predict and score
    /// `0.0`.
    pub fn entropy(&self, program: &str) -> Result<f64> {
        let mut ids = self.encoder.encode(program)?;
        let max_context = self.model.max_context();
        if ids.len() > max_context {
            debug!("truncating {} tokens to {max_context}", ids.len());
            ids.truncate(max_context);
        }
        if ids.len() < 2 {
            return Ok(0.0);
        }
        self.model.mean_loss(&ids)
    }

    /// Entropy of `original`, checked to be a usable baseline.
    pub fn baseline(&self, original: &str) -> Result<f64> {
        let base = self.entropy(original)?;
        check_baseline(base)?;
        Ok(base)
    }

    /// Shift of `program` against a baseline from [`Scorer::baseline`].
    pub fn shift_from(&self, base: f64, program: &str) -> Result<f64> {
        relative_shift(base, self.entropy(program)?)
    }

    pub fn score(&self, original: &str, transformed: &str) -> Result<f64> {
        self.shift_from(self.baseline(original)?, transformed)
    }

    /// Scores for many variants of one original, whose entropy is computed once.
    ///
    /// The first failing variant fails the batch; [`Scorer::shift_from`]
    /// scores variants one at a time.
    pub fn batch_score<S: AsRef<str>>(&self, original: &str, transformed: &[S]) -> Result<Vec<f64>> {
        let base = self.baseline(original)?;
        transformed.iter().map(|program| self.shift_from(base, program.as_ref())).collect()
    }
}
