//! Logits-level adapters for in-process models.
//!
//! A model that exposes raw logits per position can serve as either oracle:
//!
//! ```
//! use codenat_oracle::{log_softmax, mean_next_token_loss, softmax_in_place};
//!
//! let mut probs = vec![1.0f32, 2.0, 3.0];
//! softmax_in_place(&mut probs);
//! assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
//!
//! // Row t predicts token t + 1.
//! let rows = vec![vec![0.0f32, 0.0], vec![0.0, 0.0]];
//! let loss = mean_next_token_loss(&rows, &[0, 1]).unwrap();
//! assert!((loss - std::f64::consts::LN_2).abs() < 1e-6);
//! # let _ = log_softmax(&[0.0]);
//! ```

use crate::{CausalLmOracle, MaskPredictions, MaskedLmOracle, Prediction};
use codenat_common::{PipelineError, Result};
use std::cmp::Ordering;

/// Number of predictions kept per masked position.
pub const DEFAULT_FILL_MASK_TOP_K: usize = 50;

/// Convert raw logits to probabilities in place (subtract-max softmax).
///
/// `f32::NEG_INFINITY` entries become `0.0`. If every value underflows the
/// slice becomes uniform.
pub fn softmax_in_place(logits: &mut [f32]) {
    if logits.is_empty() {
        return;
    }
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for l in logits.iter_mut() {
        *l = if *l == f32::NEG_INFINITY { 0.0 } else { (*l - max).exp() };
        sum += *l;
    }
    if sum > 0.0 && sum.is_finite() {
        let inv = 1.0 / sum;
        logits.iter_mut().for_each(|l| *l *= inv);
    } else {
        #[allow(clippy::cast_precision_loss)]
        let uniform = 1.0 / logits.len() as f32;
        logits.iter_mut().for_each(|l| *l = uniform);
    }
}

/// Numerically stable log-softmax of one logits row.
pub fn log_softmax(row: &[f32]) -> Vec<f32> {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let sum: f32 = row.iter().map(|&v| (v - max).exp()).sum();
    let lse = max + sum.ln();
    row.iter().map(|&v| v - lse).collect()
}

/// Indices and values of the `k` largest entries, highest first.
///
/// Ties keep the lower index first; NaN sorts last.
pub fn top_k_indices(values: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut indexed: Vec<(usize, f32)> = values.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| descending(a.1, b.1).then(a.0.cmp(&b.0)));
    indexed.truncate(k);
    indexed
}

fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Teacher-forced mean negative log-likelihood.
///
/// `rows[t]` holds the logits that predict `token_ids[t + 1]`; the final row,
/// if present, is ignored. Needs at least two ids.
pub fn mean_next_token_loss(rows: &[Vec<f32>], token_ids: &[u32]) -> Result<f64> {
    if token_ids.len() < 2 {
        return Err(PipelineError::Oracle(format!(
            "next-token loss needs at least two tokens, got {}",
            token_ids.len()
        )));
    }
    let predicted = token_ids.len() - 1;
    if rows.len() < predicted {
        return Err(PipelineError::Oracle(format!(
            "model returned {} logit rows for {} tokens",
            rows.len(),
            token_ids.len()
        )));
    }

    let mut nll_sum = 0.0f64;
    for (row, &target) in rows.iter().zip(&token_ids[1..]) {
        let logp = log_softmax(row);
        let lp = logp.get(target as usize).copied().ok_or_else(|| {
            PipelineError::Oracle(format!("token id {target} outside vocabulary of {}", row.len()))
        })?;
        nll_sum -= f64::from(lp);
    }
    #[allow(clippy::cast_precision_loss)]
    Ok(nll_sum / predicted as f64)
}

/// An in-process masked language model.
pub trait MaskedLogitsModel: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<u32>>;
    fn mask_token_id(&self) -> u32;
    /// One logits row per input position.
    fn logits(&self, token_ids: &[u32]) -> Result<Vec<Vec<f32>>>;
    fn token_to_piece(&self, token_id: u32) -> Option<String>;
}

/// An in-process causal language model.
pub trait CausalLogitsModel: Send + Sync {
    fn max_context(&self) -> usize;
    /// One logits row per input position; row `t` predicts position `t + 1`.
    fn logits(&self, token_ids: &[u32]) -> Result<Vec<Vec<f32>>>;
}

/// Serves [`MaskedLmOracle`] from a [`MaskedLogitsModel`].
pub struct LogitsMaskedOracle<M> {
    model: M,
    top_k: usize,
}

impl<M: MaskedLogitsModel> LogitsMaskedOracle<M> {
    pub fn new(model: M) -> Self {
        Self { model, top_k: DEFAULT_FILL_MASK_TOP_K }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    fn position_predictions(&self, row: &[f32]) -> Vec<Prediction> {
        let mut probs = row.to_vec();
        softmax_in_place(&mut probs);
        top_k_indices(&probs, self.top_k)
            .into_iter()
            .filter_map(|(id, p)| {
                let id = u32::try_from(id).ok()?;
                Some(Prediction::new(self.model.token_to_piece(id)?, f64::from(p)))
            })
            .collect()
    }
}

impl<M: MaskedLogitsModel> MaskedLmOracle for LogitsMaskedOracle<M> {
    fn fill_mask(&self, context: &str) -> Result<MaskPredictions> {
        let ids = self.model.encode(context)?;
        let mask_id = self.model.mask_token_id();
        let positions: Vec<usize> =
            ids.iter().enumerate().filter(|(_, id)| **id == mask_id).map(|(i, _)| i).collect();
        if positions.is_empty() {
            return Err(PipelineError::Oracle("context has no mask token".to_string()));
        }

        let rows = self.model.logits(&ids)?;
        let mut per_position = Vec::with_capacity(positions.len());
        for pos in positions {
            let row = rows.get(pos).ok_or_else(|| {
                PipelineError::Oracle(format!("no logits for mask position {pos}"))
            })?;
            per_position.push(self.position_predictions(row));
        }

        if per_position.len() == 1 {
            Ok(MaskPredictions::Flat(per_position.remove(0)))
        } else {
            Ok(MaskPredictions::Nested(per_position))
        }
    }
}

/// Serves [`CausalLmOracle`] from a [`CausalLogitsModel`].
pub struct LogitsCausalOracle<M> {
    model: M,
}

impl<M: CausalLogitsModel> LogitsCausalOracle<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

impl<M: CausalLogitsModel> CausalLmOracle for LogitsCausalOracle<M> {
    fn max_context(&self) -> usize {
        self.model.max_context()
    }

    fn mean_loss(&self, token_ids: &[u32]) -> Result<f64> {
        let rows = self.model.logits(token_ids)?;
        mean_next_token_loss(&rows, token_ids)
    }
}
