use anyhow::{Context, Result, bail};
use clap::Args;
use codenat_common::{ConfigBuilder, PipelineConfig};
use codenat_transform::{CommandOutcome, Transformer, parse_rules};
use console::style;
use std::path::PathBuf;
use tracing::info;

use super::progress_bar;

/// Apply transformation rules to the methods listed in an info file
#[derive(Debug, Args)]
pub struct TransformCommand {
    /// Info file describing the methods to transform
    #[arg(short, long, value_name = "PATH")]
    pub info_path: PathBuf,

    /// Directory receiving one `rule_<n>/` subdirectory per rule
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// `all` or a comma-separated list of rule ids
    #[arg(short = 'r', long, default_value = "all")]
    pub transform_rules: String,

    /// Per-rule timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Transformation tool command prefix
    #[arg(long, value_name = "CMD")]
    pub tool: Option<String>,
}

impl TransformCommand {
    pub fn apply_overrides(&self, builder: ConfigBuilder) -> ConfigBuilder {
        builder.transform_tool(self.tool.clone()).transform_timeout(self.timeout)
    }

    pub async fn execute(&self, config: &PipelineConfig) -> Result<()> {
        let rules = parse_rules(&self.transform_rules, config.transform.rule_count)
            .context("Failed to select transformation rules")?;
        info!("Applying transform rules: {rules:?}");

        let transformer = Transformer::from_config(&config.transform);
        let pb = progress_bar(rules.len())?;
        let outcomes = transformer
            .run(&self.info_path, &self.output_dir, &rules, |outcome| {
                pb.set_message(format!("rule {}", outcome.rule));
                pb.inc(1);
            })
            .await
            .context("Transform run failed")?;
        pb.finish_and_clear();

        let mut failed = 0;
        for outcome in &outcomes {
            let status = match &outcome.outcome {
                CommandOutcome::Success(_) => style("ok").green(),
                CommandOutcome::Failure(_) => style("failed").red(),
                CommandOutcome::Timeout => style("timeout").yellow(),
            };
            if !outcome.outcome.is_success() {
                failed += 1;
            }
            println!("rule {:>2}  {status}  {}", outcome.rule, outcome.output_dir.display());
        }

        if failed > 0 {
            bail!("{failed} of {} rules did not complete", outcomes.len());
        }
        info!("Transform module completed");
        Ok(())
    }
}
