use anyhow::{Context, Result};
use clap::Args;
use codenat_common::{ConfigBuilder, PipelineConfig, PipelineError};
use codenat_naturalness::{Evaluator, MetadataIndex, Scorer, collect_groups};
use codenat_oracle::{HfEncoder, WorkerOracle};
use console::style;
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;

use super::progress_bar;

/// Score transformed programs against their originals
#[derive(Debug, Args)]
pub struct EvaluateCommand {
    /// Directory holding `rule_<n>/` subdirectories of programs
    #[arg(short, long, value_name = "DIR")]
    pub input_dir: PathBuf,

    /// Info file the programs were transformed from
    #[arg(short, long, value_name = "PATH")]
    pub metadata: PathBuf,

    /// Results file; score lines are appended
    #[arg(short, long, value_name = "PATH", default_value = "results.txt")]
    pub output: PathBuf,

    /// Causal-model worker command line
    #[arg(long, value_name = "CMD")]
    pub causal_command: Option<String>,

    /// Path to the causal model's tokenizer.json
    #[arg(long, value_name = "PATH")]
    pub tokenizer: Option<PathBuf>,

    /// Encode programs without BOS/EOS tokens
    #[arg(long)]
    pub no_special_tokens: bool,
}

impl EvaluateCommand {
    pub fn apply_overrides(&self, builder: ConfigBuilder) -> ConfigBuilder {
        builder.causal_command(self.causal_command.clone()).causal_tokenizer(self.tokenizer.clone())
    }

    pub fn execute(&self, config: &PipelineConfig) -> Result<()> {
        let oracle = &config.oracle;
        let tokenizer = oracle.causal_tokenizer.as_deref().ok_or_else(|| {
            PipelineError::Config(
                "evaluation needs the causal model's tokenizer: pass --tokenizer \
                 or set oracle.causal_tokenizer"
                    .to_string(),
            )
        })?;
        let command = oracle.causal_command.as_deref().ok_or_else(|| {
            PipelineError::Config(
                "evaluation needs a causal-model worker: pass --causal-command \
                 or set oracle.causal_command"
                    .to_string(),
            )
        })?;

        let metadata = MetadataIndex::from_file(&self.metadata)
            .with_context(|| format!("Failed to load metadata from {}", self.metadata.display()))?;
        info!("Loaded {} code instances", metadata.len());

        let mut encoder = HfEncoder::from_file(tokenizer).context("Failed to load tokenizer")?;
        if self.no_special_tokens {
            encoder = encoder.without_special_tokens();
        }
        info!("Tokenizer vocabulary size: {}", encoder.vocab_size());
        let model = WorkerOracle::spawn(command, oracle.max_context)
            .context("Failed to start the causal-model worker")?;
        let evaluator = Evaluator::new(Scorer::new(Box::new(encoder), Box::new(model)), metadata);

        let groups = collect_groups(&self.input_dir)
            .with_context(|| format!("Failed to scan {}", self.input_dir.display()))?;
        info!("Found {} program groups under {}", groups.len(), self.input_dir.display());
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output)
            .with_context(|| format!("Failed to open {}", self.output.display()))?;
        let mut sink = BufWriter::new(file);

        let pb = progress_bar(groups.len())?;
        let report = evaluator
            .run(&groups, &mut sink, |group| {
                pb.set_message(group.label());
                pb.inc(1);
            })
            .context("Evaluation failed")?;
        pb.finish_and_clear();

        println!(
            "{} {} scores from {} groups to {}, {} skipped",
            style("Appended").green().bold(),
            report.scored,
            report.groups,
            self.output.display(),
            report.skipped.len()
        );
        for (label, reason) in &report.skipped {
            println!("  {} {label}: {reason}", style("skip").yellow());
        }
        Ok(())
    }
}
