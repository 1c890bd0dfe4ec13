//! Per-file infilling drivers.
//!
//! Both drivers read `<Class>.java` files from an input directory and write
//! variants next to each other in an output directory:
//!
//! - random mode writes `<Class>_random.java`,
//! - llm mode writes `<Class>_llm_<rank>.java` for the cheapest joint
//!   assignments, rank `0` first.
//!
//! A file that cannot be filled is skipped with a warning; only errors that
//! would fail every remaining file (configuration, a dead oracle) stop a run.

use crate::context::ContextBuilder;
use crate::enumerate::{JointAssignment, SlotCandidates, enumerate_assignments};
use crate::filter::RandomNameGenerator;
use crate::ranker::CandidateRanker;
use crate::source::MaskedSource;
use codenat_common::{InfillConfig, PipelineError, Result};
use codenat_lexer::{JavaLexer, SourceTokenizer};
use codenat_oracle::MaskedLmOracle;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// `*.java` files directly inside `dir`, sorted by name.
pub fn collect_java_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "java") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_stem(input: &Path) -> String {
    input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

/// `<output_dir>/<stem>_random.java`
pub fn random_output_path(output_dir: &Path, input: &Path) -> PathBuf {
    output_dir.join(format!("{}_random.java", file_stem(input)))
}

/// `<output_dir>/<stem>_llm_<rank>.java`
pub fn llm_output_path(output_dir: &Path, input: &Path, rank: usize) -> PathBuf {
    output_dir.join(format!("{}_llm_{rank}.java", file_stem(input)))
}

/// Why a file produced no output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoSlots,
    NoCandidates { slot: String },
    NoAssignments,
    Lex(String),
    Failed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSlots => write!(f, "no masked identifiers"),
            Self::NoCandidates { slot } => write!(f, "no suitable candidates for `{slot}`"),
            Self::NoAssignments => write!(f, "every joint assignment collides"),
            Self::Lex(msg) => write!(f, "lexical error: {msg}"),
            Self::Failed(msg) => write!(f, "{msg}"),
        }
    }
}

/// Result of infilling one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Written(Vec<PathBuf>),
    Skipped(SkipReason),
}

/// Summary of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfillReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<(PathBuf, SkipReason)>,
    pub files_seen: usize,
}

impl InfillReport {
    fn record(&mut self, input: &Path, outcome: FileOutcome) {
        self.files_seen += 1;
        match outcome {
            FileOutcome::Written(paths) => self.written.extend(paths),
            FileOutcome::Skipped(reason) => self.skipped.push((input.to_path_buf(), reason)),
        }
    }
}

/// Turn a per-file error into a skip unless it would fail every file.
fn settle(input: &Path, result: Result<FileOutcome>) -> Result<FileOutcome> {
    match result {
        Ok(outcome) => Ok(outcome),
        Err(e) if e.is_recoverable() => {
            warn!("Skipping {}: {e}", input.display());
            let reason = if matches!(e, PipelineError::Lex { .. }) {
                SkipReason::Lex(e.to_string())
            } else {
                SkipReason::Failed(e.to_string())
            };
            Ok(FileOutcome::Skipped(reason))
        }
        Err(e) => Err(e),
    }
}

fn run_files(
    input_dir: &Path,
    output_dir: &Path,
    mut infill: impl FnMut(&Path) -> Result<FileOutcome>,
    mut on_file: impl FnMut(&Path, &FileOutcome),
) -> Result<InfillReport> {
    let files = collect_java_files(input_dir)?;
    fs::create_dir_all(output_dir)?;
    info!("Found {} Java files in {}", files.len(), input_dir.display());

    let mut report = InfillReport::default();
    for input in &files {
        let outcome = settle(input, infill(input))?;
        if let FileOutcome::Skipped(reason) = &outcome {
            debug!("{} skipped: {reason}", input.display());
        }
        on_file(input, &outcome);
        report.record(input, outcome);
    }
    info!(
        written = report.written.len(),
        skipped = report.skipped.len(),
        "infilling finished"
    );
    Ok(report)
}

/// Fills every slot with a fresh random name.
pub struct RandomInfiller {
    tokenizer: Box<dyn SourceTokenizer>,
    generator: RandomNameGenerator,
}

impl RandomInfiller {
    pub fn new(tokenizer: Box<dyn SourceTokenizer>, generator: RandomNameGenerator) -> Self {
        Self { tokenizer, generator }
    }

    pub fn from_config(config: &InfillConfig) -> Self {
        let generator =
            RandomNameGenerator::new(config.random_name_len, config.max_retries, config.seed);
        Self::new(Box::new(JavaLexer), generator)
    }

    /// One random name per slot, distinct from each other and from every
    /// name already in the program.
    pub fn assign(&mut self, source: &MaskedSource) -> Result<JointAssignment> {
        let mut existing = source.existing_names().clone();
        let mut names = Vec::with_capacity(source.slots().len());
        for slot in source.slots() {
            let name = self.generator.generate(&existing)?;
            existing.insert(name.clone());
            names.push((slot.clone(), name));
        }
        Ok(JointAssignment::new(names))
    }

    pub fn infill_file(&mut self, input: &Path, output_dir: &Path) -> Result<FileOutcome> {
        let text = fs::read_to_string(input)?;
        let source = MaskedSource::parse(&text, self.tokenizer.as_ref())?;
        if !source.has_slots() {
            return Ok(FileOutcome::Skipped(SkipReason::NoSlots));
        }

        let assignment = self.assign(&source)?;
        let output = random_output_path(output_dir, input);
        fs::write(&output, source.materialize(&assignment))?;
        info!("Wrote {} ({} slots)", output.display(), assignment.len());
        Ok(FileOutcome::Written(vec![output]))
    }

    /// Infill every `*.java` file in `input_dir`.
    pub fn run(
        &mut self,
        input_dir: &Path,
        output_dir: &Path,
        on_file: impl FnMut(&Path, &FileOutcome),
    ) -> Result<InfillReport> {
        run_files(input_dir, output_dir, |input| self.infill_file(input, output_dir), on_file)
    }
}

/// Fills slots with the cheapest collision-free masked-model candidates.
pub struct LlmInfiller<O> {
    tokenizer: Box<dyn SourceTokenizer>,
    contexts: ContextBuilder,
    ranker: CandidateRanker<O>,
    top_k: usize,
}

impl<O: MaskedLmOracle> LlmInfiller<O> {
    /// `top_k` variants per file, `candidates_per_slot` names per slot.
    pub fn new(oracle: O, config: &InfillConfig) -> Self {
        Self {
            tokenizer: Box::new(JavaLexer),
            contexts: ContextBuilder::from(config),
            ranker: CandidateRanker::new(oracle, config.candidates_per_slot),
            top_k: config.top_k,
        }
    }

    pub fn with_tokenizer(mut self, tokenizer: Box<dyn SourceTokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Ranked candidates for every slot, in slot order.
    pub fn candidate_table(&self, source: &MaskedSource) -> Result<Vec<SlotCandidates>> {
        let existing = source.existing_names();
        let mut table = Vec::with_capacity(source.slots().len());
        for context in self.contexts.build(source)? {
            let candidates = self.ranker.rank(&context.text, existing)?;
            table.push(SlotCandidates::new(context.slot, candidates));
        }
        Ok(table)
    }

    pub fn infill_file(&self, input: &Path, output_dir: &Path) -> Result<FileOutcome> {
        let text = fs::read_to_string(input)?;
        let source = MaskedSource::parse(&text, self.tokenizer.as_ref())?;
        if !source.has_slots() {
            return Ok(FileOutcome::Skipped(SkipReason::NoSlots));
        }

        let table = self.candidate_table(&source)?;
        if let Some(empty) = table.iter().find(|row| row.candidates.is_empty()) {
            return Ok(FileOutcome::Skipped(SkipReason::NoCandidates { slot: empty.slot.clone() }));
        }

        let ranked = enumerate_assignments(&table);
        if ranked.is_empty() {
            return Ok(FileOutcome::Skipped(SkipReason::NoAssignments));
        }
        if ranked.len() < self.top_k {
            debug!(
                "{}: only {} of {} variants available",
                input.display(),
                ranked.len(),
                self.top_k
            );
        }

        let mut written = Vec::new();
        for (rank, variant) in ranked.iter().take(self.top_k).enumerate() {
            let output = llm_output_path(output_dir, input, rank);
            fs::write(&output, source.materialize(&variant.assignment))?;
            let names: Vec<String> =
                variant.assignment.iter().map(|(slot, name)| format!("{slot}={name}")).collect();
            debug!("{} cost={} [{}]", output.display(), variant.cost, names.join(", "));
            written.push(output);
        }
        info!("Wrote {} variants of {}", written.len(), input.display());
        Ok(FileOutcome::Written(written))
    }

    /// Infill every `*.java` file in `input_dir`.
    pub fn run(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        on_file: impl FnMut(&Path, &FileOutcome),
    ) -> Result<InfillReport> {
        run_files(input_dir, output_dir, |input| self.infill_file(input, output_dir), on_file)
    }
}
