//! Configuration types and utilities

use crate::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "codenat.toml";

/// Main pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub transform: TransformConfig,
    pub infill: InfillConfig,
    pub oracle: OracleConfig,
    pub logging: LoggingConfig,
}

/// External transformation tool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Command prefix; `-o <dir> -r <rule> -f <info>` is appended.
    pub tool: String,
    /// Per-rule timeout. `None` waits forever.
    pub timeout_secs: Option<u64>,
    /// Number of rules selected by `all`.
    pub rule_count: u32,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            tool: "java -jar CodeTransform/target/JavaTransformation-1.0-SNAPSHOT.jar".to_string(),
            timeout_secs: None,
            rule_count: 23,
        }
    }
}

/// Infilling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfillConfig {
    /// Placeholder understood by the masked-model oracle.
    pub mask_token: String,
    /// Context window in characters.
    pub window: usize,
    /// Ranked candidates kept per slot.
    pub candidates_per_slot: usize,
    /// Program variants written per file in llm mode.
    pub top_k: usize,
    pub random_name_len: usize,
    pub max_retries: usize,
    pub seed: Option<u64>,
}

impl Default for InfillConfig {
    fn default() -> Self {
        Self {
            mask_token: "<mask>".to_string(),
            window: 512,
            candidates_per_slot: 5,
            top_k: 3,
            random_name_len: 8,
            max_retries: 100,
            seed: None,
        }
    }
}

/// Model worker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Command line of the masked-model worker.
    pub masked_command: Option<String>,
    /// Command line of the causal-model worker.
    pub causal_command: Option<String>,
    /// HF `tokenizer.json` matching the causal model.
    pub causal_tokenizer: Option<PathBuf>,
    /// Maximum token ids fed to the causal model.
    pub max_context: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self { masked_command: None, causal_command: None, causal_tokenizer: None, max_context: 1024 }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// One of `pretty`, `compact`, `json`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

impl PipelineConfig {
    /// Load from a TOML file. Missing sections fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        debug!("Parsed configuration file {}", path.display());
        Ok(config)
    }

    /// Serialize back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let infill = &self.infill;
        if infill.mask_token.is_empty() {
            return Err(PipelineError::Config("infill.mask_token must not be empty".into()));
        }
        for (name, value) in [
            ("infill.window", infill.window),
            ("infill.candidates_per_slot", infill.candidates_per_slot),
            ("infill.top_k", infill.top_k),
            ("infill.random_name_len", infill.random_name_len),
            ("infill.max_retries", infill.max_retries),
            ("oracle.max_context", self.oracle.max_context),
        ] {
            if value == 0 {
                return Err(PipelineError::Config(format!("{name} must be greater than zero")));
            }
        }
        if infill.window <= infill.mask_token.chars().count() {
            return Err(PipelineError::Config(format!(
                "infill.window ({}) must be larger than the mask token",
                infill.window
            )));
        }
        if self.transform.tool.trim().is_empty() {
            return Err(PipelineError::Config("transform.tool must not be empty".into()));
        }
        match self.logging.format.as_str() {
            "pretty" | "compact" | "json" => Ok(()),
            other => Err(PipelineError::Config(format!(
                "logging.format `{other}` is not one of pretty, compact, json"
            ))),
        }
    }
}

/// Layers command-line overrides on top of a file or default configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: PipelineConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self { config: PipelineConfig::from_file(path)? })
    }

    pub fn log_level(mut self, level: Option<String>) -> Self {
        if let Some(level) = level {
            self.config.logging.level = level;
        }
        self
    }

    pub fn transform_tool(mut self, tool: Option<String>) -> Self {
        if let Some(tool) = tool {
            self.config.transform.tool = tool;
        }
        self
    }

    pub fn transform_timeout(mut self, secs: Option<u64>) -> Self {
        if secs.is_some() {
            self.config.transform.timeout_secs = secs;
        }
        self
    }

    pub fn top_k(mut self, top_k: Option<usize>) -> Self {
        if let Some(top_k) = top_k {
            self.config.infill.top_k = top_k;
        }
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        if seed.is_some() {
            self.config.infill.seed = seed;
        }
        self
    }

    pub fn masked_command(mut self, command: Option<String>) -> Self {
        if command.is_some() {
            self.config.oracle.masked_command = command;
        }
        self
    }

    pub fn causal_command(mut self, command: Option<String>) -> Self {
        if command.is_some() {
            self.config.oracle.causal_command = command;
        }
        self
    }

    pub fn causal_tokenizer(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.config.oracle.causal_tokenizer = path;
        }
        self
    }

    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.infill.window, 512);
        assert_eq!(config.infill.candidates_per_slot, 5);
        assert_eq!(config.transform.rule_count, 23);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[infill]\ntop_k = 7\n\n[logging]\nformat = \"json\"").unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.infill.top_k, 7);
        assert_eq!(config.infill.mask_token, "<mask>");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.oracle.max_context, 1024);
    }

    #[test]
    fn toml_round_trip_preserves_config() {
        let mut config = PipelineConfig::default();
        config.transform.timeout_secs = Some(30);
        config.oracle.masked_command = Some("python mlm_worker.py".into());
        let text = config.to_toml().unwrap();
        let parsed: PipelineConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn builder_overrides_win() {
        let config = ConfigBuilder::new()
            .top_k(Some(2))
            .seed(Some(9))
            .transform_timeout(Some(5))
            .log_level(Some("debug".into()))
            .build()
            .unwrap();
        assert_eq!(config.infill.top_k, 2);
        assert_eq!(config.infill.seed, Some(9));
        assert_eq!(config.transform.timeout_secs, Some(5));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let err = ConfigBuilder::new().top_k(Some(0)).build().unwrap_err();
        assert!(matches!(err, PipelineError::Config(msg) if msg.contains("infill.top_k")));
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let mut config = PipelineConfig::default();
        config.logging.format = "xml".into();
        assert!(config.validate().is_err());
    }
}
