//! Evaluation metadata written for the transformation tool.
//!
//! The info file is a JSON list of instances:
//!
//! ```json
//! [{"instanceId": "Data2", "sourceFile": "sample/code/Data2.java",
//!   "targetLines": [9], "methodStartLine": 8, "methodEndLine": 18}]
//! ```

use codenat_common::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One program handed to the transformation tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeInstance {
    pub instance_id: String,
    pub source_file: PathBuf,
    #[serde(default)]
    pub target_lines: Vec<u32>,
    #[serde(default)]
    pub method_start_line: u32,
    #[serde(default)]
    pub method_end_line: u32,
}

impl CodeInstance {
    /// File stem of the source file, e.g. `Data2` for `code/Data2.java`.
    pub fn source_stem(&self) -> Option<&str> {
        self.source_file.file_stem().and_then(|s| s.to_str())
    }
}

/// Read the whole info file.
pub fn load_instances(path: &Path) -> Result<Vec<CodeInstance>> {
    let text = fs::read_to_string(path)?;
    let instances: Vec<CodeInstance> = serde_json::from_str(&text)?;
    debug!("loaded {} instances from {}", instances.len(), path.display());
    Ok(instances)
}

/// Instances addressable by instance id or by source file stem.
#[derive(Debug, Clone, Default)]
pub struct MetadataIndex {
    instances: Vec<CodeInstance>,
    keys: HashMap<String, usize>,
}

impl MetadataIndex {
    /// Index `instances`. Instance ids win over source stems, and the
    /// first instance claiming a key keeps it.
    pub fn new(instances: Vec<CodeInstance>) -> Self {
        let mut keys = HashMap::new();
        for (i, instance) in instances.iter().enumerate() {
            if let Some(previous) = keys.insert(instance.instance_id.clone(), i) {
                warn!("duplicate instance id `{}`", instance.instance_id);
                keys.insert(instance.instance_id.clone(), previous);
            }
        }
        for (i, instance) in instances.iter().enumerate() {
            if let Some(stem) = instance.source_stem() {
                keys.entry(stem.to_string()).or_insert(i);
            }
        }
        Self { instances, keys }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(load_instances(path)?))
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn lookup(&self, key: &str) -> Result<&CodeInstance> {
        self.keys
            .get(key)
            .map(|&i| &self.instances[i])
            .ok_or_else(|| PipelineError::MissingMetadata { key: key.to_string() })
    }
}
