//! Driving the external Java transformation tool.
//!
//! The tool is a black box invoked once per rule:
//!
//! ```text
//! <tool> -o <output_dir>/ -r <rule_id> -f <info_path>
//! ```
//!
//! Exit code 0 is success. Anything else is a failure whose message is the
//! tool's stderr, falling back to stdout. A run that exceeds its timeout is
//! killed together with every process it started.

pub mod driver;
pub mod runner;

pub use driver::{
    RuleOutcome, Transformer, parse_rules, rule_command, rule_output_dir, shell_quote,
};
pub use runner::{CommandOutcome, TIMEOUT_SENTINEL, descendants, kill_process_tree, run_command};
