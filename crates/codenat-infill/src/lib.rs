//! Filling masked identifier slots.
//!
//! The transformation tool marks renamed identifiers as `___MASKED_<name>___`.
//! This crate turns such a program into concrete variants:
//!
//! 1. [`MaskedSource`] splits the text into literal spans and slot references.
//! 2. [`ContextBuilder`] renders one single-slot query per slot, flattened and
//!    windowed around the placeholder.
//! 3. [`CandidateRanker`] asks a masked-model oracle for names and keeps the
//!    suitable ones ([`is_suitable`]).
//! 4. [`enumerate_assignments`] lists collision-free joint assignments by
//!    total rank.
//! 5. [`LlmInfiller`] and [`RandomInfiller`] drive the whole thing per file.

pub mod context;
pub mod enumerate;
pub mod filter;
pub mod pipeline;
pub mod ranker;
pub mod source;

pub use context::{ContextBuilder, SlotContext, flatten_newlines, truncate_around, truncate_at};
pub use enumerate::{JointAssignment, RankedAssignment, SlotCandidates, enumerate_assignments};
pub use filter::{RandomNameGenerator, check_identifier, is_suitable};
pub use pipeline::{
    FileOutcome, InfillReport, LlmInfiller, RandomInfiller, SkipReason, collect_java_files,
    llm_output_path, random_output_path,
};
pub use ranker::{CandidateRanker, select_candidates};
pub use source::{MaskedSource, Segment};
