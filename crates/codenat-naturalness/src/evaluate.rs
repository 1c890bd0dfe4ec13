//! Scoring transformed programs against their originals.
//!
//! Programs live under `<root>/rule_<n>/`. Within a rule directory, the
//! variants of one original share a base stem: `Foo_random.java` and
//! `Foo_llm_0.java` both belong to `Foo`. The base stem is looked up in the
//! metadata to find the original source, whose entropy is computed once per
//! group.

use crate::metadata::MetadataIndex;
use crate::scorer::Scorer;
use codenat_common::{MARKER_PREFIX, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Variants of one original under one transformation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramGroup {
    pub transform_id: String,
    pub base_stem: String,
    pub programs: Vec<PathBuf>,
}

impl ProgramGroup {
    /// `rule_<id>/<stem>` for log messages.
    pub fn label(&self) -> String {
        format!("rule_{}/{}", self.transform_id, self.base_stem)
    }
}

/// Strip an infilling suffix (`_random`, `_llm_<k>`) from a file stem.
pub fn base_stem(stem: &str) -> &str {
    if let Some(base) = stem.strip_suffix("_random") {
        return base;
    }
    if let Some((base, rank)) = stem.rsplit_once("_llm_")
        && !rank.is_empty()
        && rank.bytes().all(|b| b.is_ascii_digit())
    {
        return base;
    }
    stem
}

/// `3` for `rule_3`; other names are kept whole.
pub fn transform_id(dir_name: &str) -> &str {
    dir_name.strip_prefix("rule_").unwrap_or(dir_name)
}

/// One results line: `<transform_id>_<file_stem> <score>`.
pub fn result_line(transform_id: &str, file_stem: &str, score: f64) -> String {
    format!("{transform_id}_{file_stem} {score}")
}

fn stem_of(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Group every `rule_*/*.java` file under `root`.
///
/// Rules are ordered numerically, groups and programs by name.
pub fn collect_groups(root: &Path) -> Result<Vec<ProgramGroup>> {
    let mut rule_dirs = Vec::new();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if path.is_dir() && name.starts_with("rule_") {
            rule_dirs.push((name, path));
        }
    }
    rule_dirs.sort_by_key(|(name, _)| (transform_id(name).parse::<u64>().ok(), name.clone()));

    let mut groups = Vec::new();
    for (name, dir) in rule_dirs {
        let mut by_stem: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "java") {
                by_stem.entry(base_stem(&stem_of(&path)).to_string()).or_default().push(path);
            }
        }
        for (base, mut programs) in by_stem {
            programs.sort();
            groups.push(ProgramGroup {
                transform_id: transform_id(&name).to_string(),
                base_stem: base,
                programs,
            });
        }
    }
    Ok(groups)
}

/// Counts for one evaluation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationReport {
    pub groups: usize,
    pub scored: usize,
    /// Group or program label and the reason it was skipped.
    pub skipped: Vec<(String, String)>,
}

/// What one group produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupScores {
    pub lines: Vec<String>,
    /// `rule_<id>/<file stem>` of each program that could not be scored.
    pub skipped: Vec<(String, String)>,
}

/// Scores program groups against metadata-resolved originals.
pub struct Evaluator {
    scorer: Scorer,
    metadata: MetadataIndex,
}

impl Evaluator {
    pub fn new(scorer: Scorer, metadata: MetadataIndex) -> Self {
        Self { scorer, metadata }
    }

    /// Result lines for one group.
    ///
    /// Programs that still carry slot markers were never filled and are left
    /// out. A program whose score cannot be computed is skipped on its own;
    /// the group fails only when its original cannot serve as a baseline.
    pub fn evaluate_group(&self, group: &ProgramGroup) -> Result<GroupScores> {
        let instance = self.metadata.lookup(&group.base_stem)?;
        let original = fs::read_to_string(&instance.source_file)?;

        let mut texts = Vec::with_capacity(group.programs.len());
        for path in &group.programs {
            let text = fs::read_to_string(path)?;
            if text.contains(MARKER_PREFIX) {
                debug!("{} still has masked slots, not scored", path.display());
                continue;
            }
            texts.push((stem_of(path), text));
        }
        let mut scores = GroupScores::default();
        if texts.is_empty() {
            return Ok(scores);
        }

        let base = self.scorer.baseline(&original)?;
        for (stem, text) in &texts {
            match self.scorer.shift_from(base, text) {
                Ok(score) => scores.lines.push(result_line(&group.transform_id, stem, score)),
                Err(e) if e.is_recoverable() => {
                    let label = format!("rule_{}/{stem}", group.transform_id);
                    warn!("Skipping program {label}: {e}");
                    scores.skipped.push((label, e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(scores)
    }

    /// Score `groups` (from [`collect_groups`]), writing result lines to `sink`.
    ///
    /// A group or program that fails is logged and skipped; only
    /// configuration errors, an unavailable model, or a failing sink end the
    /// run.
    pub fn run(
        &self,
        groups: &[ProgramGroup],
        sink: &mut dyn Write,
        mut on_group: impl FnMut(&ProgramGroup),
    ) -> Result<EvaluationReport> {
        info!("Evaluating {} program groups", groups.len());

        let mut report = EvaluationReport { groups: groups.len(), ..Default::default() };
        for group in groups {
            match self.evaluate_group(group) {
                Ok(scores) => {
                    for line in &scores.lines {
                        writeln!(sink, "{line}")?;
                    }
                    sink.flush()?;
                    report.scored += scores.lines.len();
                    report.skipped.extend(scores.skipped);
                }
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping group {}: {e}", group.label());
                    report.skipped.push((group.label(), e.to_string()));
                }
                Err(e) => return Err(e),
            }
            on_group(group);
        }
        info!(scored = report.scored, skipped = report.skipped.len(), "evaluation finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn base_stem_strips_infill_suffixes() {
        assert_eq!(base_stem("Foo_random"), "Foo");
        assert_eq!(base_stem("Foo_llm_0"), "Foo");
        assert_eq!(base_stem("Foo_llm_12"), "Foo");
        assert_eq!(base_stem("Foo_llm_x"), "Foo_llm_x");
        assert_eq!(base_stem("Foo_llm_"), "Foo_llm_");
        assert_eq!(base_stem("Foo"), "Foo");
    }

    #[test]
    fn result_lines_join_rule_and_stem() {
        assert_eq!(transform_id("rule_7"), "7");
        assert_eq!(result_line("7", "Foo_llm_0", 0.25), "7_Foo_llm_0 0.25");
    }

    #[test]
    fn groups_are_ordered_numerically() {
        let root = TempDir::new().unwrap();
        for (rule, file) in [
            ("rule_10", "A_random.java"),
            ("rule_2", "B_llm_1.java"),
            ("rule_2", "B_llm_0.java"),
            ("rule_2", "A_random.java"),
        ] {
            let dir = root.path().join(rule);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(file), "").unwrap();
        }
        fs::write(root.path().join("rule_2").join("notes.txt"), "").unwrap();
        fs::create_dir(root.path().join("other")).unwrap();

        let groups = collect_groups(root.path()).unwrap();
        let labels: Vec<_> = groups.iter().map(ProgramGroup::label).collect();
        assert_eq!(labels, vec!["rule_2/A", "rule_2/B", "rule_10/A"]);
        assert_eq!(groups[1].programs.len(), 2);
        assert!(groups[1].programs[0].ends_with("B_llm_0.java"));
    }
}
