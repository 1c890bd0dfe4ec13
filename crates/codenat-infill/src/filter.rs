//! Identifier suitability and random name generation.

use codenat_common::{IdentifierRejection, PipelineError, Result};
use codenat_lexer::is_java_keyword;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::HashSet;
use tracing::trace;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Check `candidate` against the identifier grammar and the names in use.
pub fn check_identifier(candidate: &str, existing: &HashSet<String>) -> Result<()> {
    let reject = |reason| {
        Err(PipelineError::InvalidIdentifier { candidate: candidate.to_string(), reason })
    };

    let mut chars = candidate.chars();
    let Some(first) = chars.next() else {
        return reject(IdentifierRejection::Empty);
    };
    if !(first.is_ascii_alphabetic() || first == '_')
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return reject(IdentifierRejection::Grammar);
    }
    // `_` alone is reserved from Java 9 on.
    if candidate == "_" || is_java_keyword(candidate) {
        return reject(IdentifierRejection::Keyword);
    }
    if existing.contains(candidate) {
        return reject(IdentifierRejection::Collision);
    }
    Ok(())
}

/// `true` if `candidate` is a usable, non-colliding Java identifier.
pub fn is_suitable(candidate: &str, existing: &HashSet<String>) -> bool {
    check_identifier(candidate, existing).is_ok()
}

/// Draws random alphanumeric names until one is suitable.
pub struct RandomNameGenerator {
    rng: ChaCha20Rng,
    len: usize,
    max_retries: usize,
}

impl RandomNameGenerator {
    /// A generator producing `len`-character names, giving up after
    /// `max_retries` unsuitable draws. A `seed` makes the sequence repeatable.
    pub fn new(len: usize, max_retries: usize, seed: Option<u64>) -> Self {
        let rng = if let Some(seed) = seed {
            ChaCha20Rng::seed_from_u64(seed)
        } else {
            ChaCha20Rng::from_entropy()
        };
        Self { rng, len, max_retries }
    }

    fn draw(&mut self) -> String {
        let mut name = String::with_capacity(self.len);
        for i in 0..self.len {
            let pool = if i == 0 { LETTERS } else { ALPHANUMERIC };
            name.push(char::from(pool[self.rng.gen_range(0..pool.len())]));
        }
        name
    }

    /// A fresh name not present in `existing`.
    pub fn generate(&mut self, existing: &HashSet<String>) -> Result<String> {
        for attempt in 1..=self.max_retries {
            let name = self.draw();
            if is_suitable(&name, existing) {
                return Ok(name);
            }
            trace!(attempt, candidate = %name, "random name rejected");
        }
        Err(PipelineError::GenerationExhausted { attempts: self.max_retries })
    }
}
