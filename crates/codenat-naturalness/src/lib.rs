//! Naturalness of transformed programs.
//!
//! The entropy of a program is the mean next-token loss a causal language
//! model assigns to it. A transformation's naturalness score is the relative
//! entropy shift against the original program:
//!
//! ```text
//! score = (entropy(transformed) - entropy(original)) / entropy(original)
//! ```
//!
//! Positive scores mean the transformed program reads as less natural.

pub mod evaluate;
pub mod metadata;
pub mod scorer;

pub use evaluate::{
    EvaluationReport, Evaluator, GroupScores, ProgramGroup, base_stem, collect_groups, result_line,
    transform_id,
};
pub use metadata::{CodeInstance, MetadataIndex, load_instances};
pub use scorer::{Scorer, relative_shift};
