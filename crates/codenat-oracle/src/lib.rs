//! Scoring oracles for the infilling and evaluation stages.
//!
//! Two black-box models drive the pipeline:
//!
//! - a masked language model that proposes names for a `<mask>` placeholder
//!   ([`MaskedLmOracle`]), and
//! - a causal language model that reports the mean next-token loss of a
//!   token-id sequence ([`CausalLmOracle`]).
//!
//! Both can be served by an external [`WorkerProcess`] speaking JSON lines,
//! or by an in-process model exposing raw logits through the adapters in
//! [`logits`].
//!
//! # In-process models
//!
//! The CLI always talks to a worker. A library user with a model in the same
//! process implements [`CausalLogitsModel`] or [`MaskedLogitsModel`] and
//! wraps it in [`LogitsCausalOracle`] or [`LogitsMaskedOracle`]; the result
//! plugs in wherever a boxed oracle is taken, such as the naturalness
//! scorer.
//!
//! ```
//! use codenat_common::Result;
//! use codenat_oracle::{CausalLmOracle, CausalLogitsModel, LogitsCausalOracle};
//!
//! /// Every token equally likely over a four-token vocabulary.
//! struct Uniform;
//!
//! impl CausalLogitsModel for Uniform {
//!     fn max_context(&self) -> usize {
//!         512
//!     }
//!
//!     fn logits(&self, token_ids: &[u32]) -> Result<Vec<Vec<f32>>> {
//!         Ok(vec![vec![0.0; 4]; token_ids.len()])
//!     }
//! }
//!
//! let oracle: Box<dyn CausalLmOracle> = Box::new(LogitsCausalOracle::new(Uniform));
//! let loss = oracle.mean_loss(&[0, 1, 2, 3])?;
//! assert!((loss - 4f64.ln()).abs() < 1e-6);
//! # Ok::<(), codenat_common::PipelineError>(())
//! ```

pub mod hf;
pub mod logits;
pub mod prediction;
pub mod worker;

pub use hf::HfEncoder;
pub use logits::{
    CausalLogitsModel, LogitsCausalOracle, LogitsMaskedOracle, MaskedLogitsModel,
    log_softmax, mean_next_token_loss, softmax_in_place, top_k_indices,
};
pub use prediction::{MaskPredictions, Prediction};
pub use worker::{WorkerOracle, WorkerProcess};

use codenat_common::Result;

/// Fill-mask scoring oracle.
pub trait MaskedLmOracle: Send + Sync {
    /// Rank replacements for the mask placeholder(s) in `context`.
    fn fill_mask(&self, context: &str) -> Result<MaskPredictions>;
}

/// Next-token loss oracle.
pub trait CausalLmOracle: Send + Sync {
    /// Longest token-id sequence the model accepts.
    fn max_context(&self) -> usize;

    /// Mean next-token negative log-likelihood of `token_ids` against itself.
    ///
    /// Callers pass at least two ids and at most [`Self::max_context`].
    fn mean_loss(&self, token_ids: &[u32]) -> Result<f64>;
}

/// Text-to-token-id encoder matching a causal model.
pub trait TokenEncoder: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<u32>>;
}

impl<T: MaskedLmOracle + ?Sized> MaskedLmOracle for Box<T> {
    fn fill_mask(&self, context: &str) -> Result<MaskPredictions> {
        (**self).fill_mask(context)
    }
}

impl<T: CausalLmOracle + ?Sized> CausalLmOracle for Box<T> {
    fn max_context(&self) -> usize {
        (**self).max_context()
    }

    fn mean_loss(&self, token_ids: &[u32]) -> Result<f64> {
        (**self).mean_loss(token_ids)
    }
}
