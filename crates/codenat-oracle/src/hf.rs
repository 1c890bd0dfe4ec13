//! Hugging Face `tokenizer.json` support

use crate::TokenEncoder;
use codenat_common::{PipelineError, Result};
use std::path::Path;

/// Encodes program text exactly as the causal model's own tokenizer does.
pub struct HfEncoder {
    inner: tokenizers::Tokenizer,
    add_special_tokens: bool,
}

impl HfEncoder {
    pub fn from_file(path: &Path) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| {
            PipelineError::Config(format!("load tokenizer {}: {e}", path.display()))
        })?;
        tracing::debug!(
            path = %path.display(),
            vocab = inner.get_vocab_size(true),
            "loaded causal tokenizer"
        );
        Ok(Self { inner, add_special_tokens: true })
    }

    /// Skip BOS/EOS and other template tokens when encoding.
    pub fn without_special_tokens(mut self) -> Self {
        self.add_special_tokens = false;
        self
    }

    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}

impl TokenEncoder for HfEncoder {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, self.add_special_tokens)
            .map_err(|e| PipelineError::Oracle(format!("tokenizer encode error: {e}")))?;
        Ok(encoding.get_ids().to_vec())
    }
}
