//! Single-slot query contexts for the masked-model oracle.
//!
//! For slot `s` the query shows every occurrence of `s` as the mask token and
//! every other slot under its original name. Newlines become spaces and the
//! text is cut to a window around the first placeholder:
//!
//! ```
//! use codenat_infill::truncate_at;
//!
//! let text = "a".repeat(100) + "<mask>" + &"b".repeat(100);
//! let cut = truncate_at(&text, 100, 6, 50);
//! assert_eq!(cut, "a".repeat(10) + "<mask>" + &"b".repeat(10));
//! ```

use crate::source::MaskedSource;
use codenat_common::{InfillConfig, PipelineError, Result};
use tracing::debug;

/// Query text for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotContext {
    pub slot: String,
    pub text: String,
}

/// Replace line breaks with spaces, keeping char offsets stable.
pub fn flatten_newlines(text: &str) -> String {
    text.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c }).collect()
}

/// Cut `text` to the chars around a placeholder at char offset `mask_pos`
/// spanning `mask_len` chars.
///
/// The cut keeps `window / 5` chars on either side of the placeholder. If
/// that exceeds `window` chars (a very long placeholder) the cut is anchored
/// so the placeholder is the last thing included. The placeholder is always
/// retained in full.
pub fn truncate_at(text: &str, mask_pos: usize, mask_len: usize, window: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mask_end = (mask_pos + mask_len).min(chars.len());
    let mask_pos = mask_pos.min(mask_end);
    let margin = window / 5;

    let start = mask_pos.saturating_sub(margin);
    let end = (mask_end + margin).min(chars.len());
    if end - start <= window.max(mask_end - mask_pos) {
        return chars[start..end].iter().collect();
    }

    let start = mask_end.saturating_sub(window.max(mask_end - mask_pos));
    chars[start..mask_end].iter().collect()
}

/// [`truncate_at`] around the first `mask_token` in `text`.
///
/// Text without the token is cut to its first `window` chars.
pub fn truncate_around(text: &str, mask_token: &str, window: usize) -> String {
    match text.find(mask_token) {
        Some(byte_pos) => {
            let mask_pos = text[..byte_pos].chars().count();
            truncate_at(text, mask_pos, mask_token.chars().count(), window)
        }
        None => text.chars().take(window).collect(),
    }
}

/// Renders windowed query contexts, one per slot.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    mask_token: String,
    window: usize,
}

impl ContextBuilder {
    pub fn new(mask_token: impl Into<String>, window: usize) -> Self {
        Self { mask_token: mask_token.into(), window }
    }

    /// Context for slot `index` of `source`.
    pub fn build_for(&self, source: &MaskedSource, index: usize) -> Result<SlotContext> {
        let slot = source.slots()[index].clone();
        let (query, first_mask) = source.query_text(index, &self.mask_token);
        let Some(mask_pos) = first_mask else {
            return Err(PipelineError::MaskLost { slot });
        };

        let flat = flatten_newlines(&query);
        let text = truncate_at(&flat, mask_pos, self.mask_token.chars().count(), self.window);
        if !text.contains(&self.mask_token) {
            return Err(PipelineError::MaskLost { slot });
        }

        debug!(slot = %slot, chars = text.chars().count(), "built slot context");
        Ok(SlotContext { slot, text })
    }

    /// Contexts for every slot, in slot order.
    pub fn build(&self, source: &MaskedSource) -> Result<Vec<SlotContext>> {
        (0..source.slots().len()).map(|i| self.build_for(source, i)).collect()
    }
}

impl From<&InfillConfig> for ContextBuilder {
    fn from(config: &InfillConfig) -> Self {
        Self::new(config.mask_token.clone(), config.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codenat_lexer::JavaLexer;

    fn source(text: &str) -> MaskedSource {
        MaskedSource::parse(text, &JavaLexer).unwrap()
    }

    #[test]
    fn mask_at_start_of_long_text_survives() {
        let text = "<mask>".to_string() + &"x".repeat(994);
        let cut = truncate_around(&text, "<mask>", 512);
        assert!(cut.starts_with("<mask>"));
        assert_eq!(cut.chars().count(), 6 + 102);
    }

    #[test]
    fn mask_at_end_keeps_left_margin() {
        let text = "y".repeat(300) + "<mask>";
        let cut = truncate_around(&text, "<mask>", 100);
        assert_eq!(cut, "y".repeat(20) + "<mask>");
    }

    #[test]
    fn short_text_is_kept_whole() {
        assert_eq!(truncate_around("int <mask> = 0;", "<mask>", 512), "int <mask> = 0;");
    }

    #[test]
    fn oversized_placeholder_is_anchored_at_the_end() {
        let text = "a".repeat(20) + "MMMMMMMMMM" + &"b".repeat(20);
        let cut = truncate_at(&text, 20, 10, 10);
        assert_eq!(cut, "MMMMMMMMMM");
        let cut = truncate_at(&text, 20, 10, 12);
        assert_eq!(cut, "aaMMMMMMMMMM");
    }

    #[test]
    fn missing_token_cuts_from_the_front() {
        assert_eq!(truncate_around("abcdef", "<mask>", 3), "abc");
    }

    #[test]
    fn window_counts_chars_not_bytes() {
        let text = "é".repeat(50) + "<mask>" + &"ü".repeat(50);
        let cut = truncate_around(&text, "<mask>", 25);
        assert_eq!(cut, "é".repeat(5) + "<mask>" + &"ü".repeat(5));
    }

    #[test]
    fn flattening_preserves_length() {
        assert_eq!(flatten_newlines("a\r\nb\nc"), "a  b c");
    }

    #[test]
    fn each_slot_gets_its_own_context() {
        let src = source("int ___MASKED_a___ = 1;\nint ___MASKED_b___ = ___MASKED_a___ + 1;");
        let contexts = ContextBuilder::new("<mask>", 512).build(&src).unwrap();
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0].slot, "a");
        assert_eq!(contexts[0].text, "int <mask> = 1; int b = <mask> + 1;");
        assert_eq!(contexts[1].text, "int a = 1; int <mask> = a + 1;");
        assert!(contexts.iter().all(|c| !c.text.contains("___MASKED_")));
    }

    #[test]
    fn builder_reads_config() {
        let config = InfillConfig { mask_token: "[MASK]".into(), window: 64, ..Default::default() };
        let builder = ContextBuilder::from(&config);
        let ctx = builder.build_for(&source("___MASKED_v___ += 2;"), 0).unwrap();
        assert_eq!(ctx.text, "[MASK] += 2;");
    }
}
