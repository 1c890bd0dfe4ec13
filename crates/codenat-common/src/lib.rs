//! Common types and utilities for the codenat pipeline
//!
//! This crate provides the foundational pieces used across the workspace:
//! the pipeline error type, the TOML-backed configuration, and the masking
//! marker convention shared by the lexer and the infilling stage.

pub mod config;
pub mod error;

pub use config::*;
pub use error::*;

/// Prefix of a masked-slot marker, e.g. `___MASKED_count___`.
pub const MARKER_PREFIX: &str = "___MASKED_";

/// Suffix of a masked-slot marker.
pub const MARKER_SUFFIX: &str = "___";

/// Wrap `name` in the slot marker the transformation tool emits.
pub fn marker_for(name: &str) -> String {
    format!("{MARKER_PREFIX}{name}{MARKER_SUFFIX}")
}

/// Recover the slot name from a full marker lexeme.
///
/// Returns `None` when `lexeme` is not a well-formed marker or the name
/// would be empty.
pub fn slot_name_of(lexeme: &str) -> Option<&str> {
    let name = lexeme.strip_prefix(MARKER_PREFIX)?.strip_suffix(MARKER_SUFFIX)?;
    if name.is_empty() { None } else { Some(name) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_round_trips_through_slot_name() {
        let marker = marker_for("count");
        assert_eq!(marker, "___MASKED_count___");
        assert_eq!(slot_name_of(&marker), Some("count"));
    }

    #[test]
    fn trailing_underscores_stay_in_the_name() {
        assert_eq!(slot_name_of("___MASKED_x____"), Some("x_"));
    }

    #[test]
    fn malformed_markers_are_rejected() {
        assert_eq!(slot_name_of("___MASKED____"), None);
        assert_eq!(slot_name_of("___MASKED_x"), None);
        assert_eq!(slot_name_of("count"), None);
    }
}
