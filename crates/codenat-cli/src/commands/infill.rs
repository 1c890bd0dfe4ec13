use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use codenat_common::{ConfigBuilder, PipelineConfig, PipelineError};
use codenat_infill::{
    FileOutcome, InfillReport, LlmInfiller, RandomInfiller, collect_java_files,
};
use codenat_oracle::WorkerOracle;
use console::style;
use std::path::{Path, PathBuf};
use tracing::info;

use super::progress_bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FillType {
    /// Fresh random identifiers
    Random,
    /// Best joint assignments proposed by a masked language model
    Llm,
}

/// Replace masked identifiers with concrete names
#[derive(Debug, Args)]
pub struct InfillCommand {
    /// Directory of transformed programs
    #[arg(short, long, value_name = "DIR")]
    pub input_dir: PathBuf,

    /// Directory receiving the infilled programs
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Infilling strategy
    #[arg(short = 'f', long, value_enum, default_value_t = FillType::Random)]
    pub fill_type: FillType,

    /// Program variants to write per file in llm mode
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Seed for reproducible random names
    #[arg(long)]
    pub seed: Option<u64>,

    /// Masked-model worker command line
    #[arg(long, value_name = "CMD")]
    pub masked_command: Option<String>,
}

impl InfillCommand {
    pub fn apply_overrides(&self, builder: ConfigBuilder) -> ConfigBuilder {
        builder.top_k(self.top_k).seed(self.seed).masked_command(self.masked_command.clone())
    }

    pub fn execute(&self, config: &PipelineConfig) -> Result<()> {
        let files = collect_java_files(&self.input_dir)
            .with_context(|| format!("Failed to list {}", self.input_dir.display()))?;
        let pb = progress_bar(files.len())?;
        let on_file = |input: &Path, _: &FileOutcome| {
            pb.set_message(input.display().to_string());
            pb.inc(1);
        };

        let report = match self.fill_type {
            FillType::Random => {
                info!("Random infilling of {}", self.input_dir.display());
                RandomInfiller::from_config(&config.infill).run(
                    &self.input_dir,
                    &self.output_dir,
                    on_file,
                )
            }
            FillType::Llm => {
                let command = config.oracle.masked_command.as_deref().ok_or_else(|| {
                    PipelineError::Config(
                        "llm infilling needs a masked-model worker: pass --masked-command \
                         or set oracle.masked_command"
                            .to_string(),
                    )
                })?;
                let oracle = WorkerOracle::spawn(command, config.oracle.max_context)
                    .context("Failed to start the masked-model worker")?;
                let infiller = LlmInfiller::new(oracle, &config.infill);
                info!(
                    "LLM infilling of {} with top {} assignments",
                    self.input_dir.display(),
                    infiller.top_k()
                );
                infiller.run(&self.input_dir, &self.output_dir, on_file)
            }
        }
        .context("Infilling failed")?;
        pb.finish_and_clear();

        print_summary(&report);
        Ok(())
    }
}

fn print_summary(report: &InfillReport) {
    println!(
        "{} {} programs from {} files, {} skipped",
        style("Wrote").green().bold(),
        report.written.len(),
        report.files_seen,
        report.skipped.len()
    );
    for (path, reason) in &report.skipped {
        println!("  {} {}: {reason}", style("skip").yellow(), path.display());
    }
}
