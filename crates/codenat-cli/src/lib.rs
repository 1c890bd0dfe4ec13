//! codenat CLI library
//!
//! This library exposes internal modules for testing purposes.

pub mod exit;
