//! Applying transformation rules through the external tool.

use crate::runner::{CommandOutcome, run_command};
use codenat_common::{PipelineError, Result, TransformConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Parse a rule selection: `all`, or a comma-separated list such as `1,4,7`.
///
/// Rule ids run from 1 to `rule_count`. Duplicates are dropped, order kept.
pub fn parse_rules(selection: &str, rule_count: u32) -> Result<Vec<u32>> {
    let selection = selection.trim();
    if selection.eq_ignore_ascii_case("all") {
        return Ok((1..=rule_count).collect());
    }

    let mut rules = Vec::new();
    for part in selection.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let rule: u32 = part
            .parse()
            .map_err(|_| PipelineError::Config(format!("invalid rule id `{part}`")))?;
        if !(1..=rule_count).contains(&rule) {
            return Err(PipelineError::Config(format!(
                "rule {rule} is out of range 1..={rule_count}"
            )));
        }
        if !rules.contains(&rule) {
            rules.push(rule);
        }
    }
    if rules.is_empty() {
        return Err(PipelineError::Config("no transformation rules selected".to_string()));
    }
    Ok(rules)
}

fn needs_quoting(arg: &str) -> bool {
    arg.is_empty()
        || !arg.chars().all(|c| c.is_ascii_alphanumeric() || "/._-+:=@%,_".contains(c))
}

/// Quote `arg` for `sh` when it holds anything beyond plain path characters.
pub fn shell_quote(arg: &str) -> String {
    if needs_quoting(arg) {
        format!("'{}'", arg.replace('\'', r"'\''"))
    } else {
        arg.to_string()
    }
}

/// `<tool> -o <output_dir>/ -r <rule> -f <info>`
pub fn rule_command(tool: &str, output_dir: &Path, rule: u32, info: &Path) -> String {
    let output = format!("{}/", output_dir.display());
    format!(
        "{tool} -o {} -r {rule} -f {}",
        shell_quote(&output),
        shell_quote(&info.display().to_string())
    )
}

/// `<output_root>/rule_<rule>`
pub fn rule_output_dir(output_root: &Path, rule: u32) -> PathBuf {
    output_root.join(format!("rule_{rule}"))
}

/// What one rule produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub rule: u32,
    pub output_dir: PathBuf,
    pub outcome: CommandOutcome,
}

/// Runs the transformation tool once per rule.
#[derive(Debug, Clone)]
pub struct Transformer {
    tool: String,
    timeout: Option<Duration>,
}

impl Transformer {
    pub fn new(tool: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self { tool: tool.into(), timeout }
    }

    pub fn from_config(config: &TransformConfig) -> Self {
        Self::new(config.tool.clone(), config.timeout_secs.map(Duration::from_secs))
    }

    /// Apply `rule` to the programs listed in `info`, writing under
    /// `<output_root>/rule_<rule>/`.
    pub async fn run_rule(&self, info: &Path, output_root: &Path, rule: u32) -> Result<RuleOutcome> {
        let output_dir = std::path::absolute(rule_output_dir(output_root, rule))?;
        fs::create_dir_all(&output_dir)?;

        let command = rule_command(&self.tool, &output_dir, rule, info);
        info!("Running command: {command}");
        let outcome = run_command(&command, self.timeout).await?;
        match &outcome {
            CommandOutcome::Success(_) => info!("Rule {rule} finished"),
            CommandOutcome::Failure(message) => warn!("Rule {rule} failed: {}", message.trim()),
            CommandOutcome::Timeout => warn!("Rule {rule} timed out"),
        }
        Ok(RuleOutcome { rule, output_dir, outcome })
    }

    /// Apply every rule in turn. A failing or timed-out rule is reported and
    /// the next rule still runs.
    pub async fn run(
        &self,
        info: &Path,
        output_root: &Path,
        rules: &[u32],
        mut on_rule: impl FnMut(&RuleOutcome),
    ) -> Result<Vec<RuleOutcome>> {
        let info = fs::canonicalize(info).map_err(|e| {
            PipelineError::Config(format!("info file {}: {e}", info.display()))
        })?;
        info!("Applying {} rules to {}", rules.len(), info.display());

        let mut outcomes = Vec::with_capacity(rules.len());
        for &rule in rules {
            let outcome = self.run_rule(&info, output_root, rule).await?;
            on_rule(&outcome);
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_selects_every_rule() {
        assert_eq!(parse_rules("all", 23).unwrap(), (1..=23).collect::<Vec<_>>());
        assert_eq!(parse_rules("ALL", 3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn lists_are_parsed_in_order() {
        assert_eq!(parse_rules("3, 1,3,,7", 23).unwrap(), vec![3, 1, 7]);
    }

    #[test]
    fn bad_selections_are_config_errors() {
        for bad in ["0", "24", "x", "", "1,two"] {
            assert!(matches!(parse_rules(bad, 23), Err(PipelineError::Config(_))), "{bad}");
        }
    }

    #[test]
    fn command_matches_tool_convention() {
        let cmd = rule_command("java -jar T.jar", Path::new("/out/rule_4"), 4, Path::new("/d/info.json"));
        assert_eq!(cmd, "java -jar T.jar -o /out/rule_4/ -r 4 -f /d/info.json");
    }

    #[test]
    fn paths_with_spaces_are_quoted() {
        let cmd = rule_command("tool", Path::new("/my out/rule_1"), 1, Path::new("/it's.json"));
        assert_eq!(cmd, r"tool -o '/my out/rule_1/' -r 1 -f '/it'\''s.json'");
    }

    #[test]
    fn timeout_comes_from_config() {
        let config = TransformConfig { timeout_secs: Some(9), ..Default::default() };
        assert_eq!(Transformer::from_config(&config).timeout, Some(Duration::from_secs(9)));
    }
}
