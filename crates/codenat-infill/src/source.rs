//! Masked programs as literal spans and slot references.

use crate::enumerate::JointAssignment;
use codenat_common::{MARKER_PREFIX, MARKER_SUFFIX, Result, marker_for, slot_name_of};
use codenat_lexer::SourceTokenizer;
use std::collections::HashSet;

/// A piece of a masked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    /// Index into [`MaskedSource::slots`].
    Slot(usize),
}

/// A program whose masked identifiers are explicit slot references.
///
/// Every occurrence of a slot shares one substitution. Slots are numbered in
/// order of first appearance, which fixes the order used by context building
/// and enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedSource {
    segments: Vec<Segment>,
    slots: Vec<String>,
    existing: HashSet<String>,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

impl MaskedSource {
    /// Lex `text`, discover its slots, and split it on their markers.
    ///
    /// A marker is recognised wherever it stands as a whole identifier, in
    /// code, comments, or string literals alike, as long as the lexer saw
    /// that slot name in code. Lexical errors are returned to the caller.
    pub fn parse(text: &str, tokenizer: &dyn SourceTokenizer) -> Result<Self> {
        let lexemes = tokenizer.tokenize(text)?;

        let mut slots: Vec<String> = Vec::new();
        for name in lexemes.iter().filter_map(|l| slot_name_of(l)) {
            if !slots.iter().any(|s| s == name) {
                slots.push(name.to_string());
            }
        }

        let mut existing: HashSet<String> = lexemes.into_iter().collect();
        existing.extend(slots.iter().cloned());

        let segments = split_markers(text, &slots);
        Ok(Self { segments, slots, existing })
    }

    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    pub fn has_slots(&self) -> bool {
        !self.slots.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Lexemes and slot names a replacement must not collide with.
    pub fn existing_names(&self) -> &HashSet<String> {
        &self.existing
    }

    /// How many times slot `index` appears.
    pub fn occurrences(&self, index: usize) -> usize {
        self.segments.iter().filter(|s| **s == Segment::Slot(index)).count()
    }

    fn render(&self, mut fill: impl FnMut(&mut String, usize)) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(index) => fill(&mut out, *index),
            }
        }
        out
    }

    /// Original text with every marker in place.
    pub fn to_marked(&self) -> String {
        self.render(|out, i| out.push_str(&marker_for(&self.slots[i])))
    }

    /// Query text for slot `target`: its occurrences become `mask_token`,
    /// every other slot shows its bare original name.
    ///
    /// Also returns the char offset of the first placeholder.
    pub fn query_text(&self, target: usize, mask_token: &str) -> (String, Option<usize>) {
        let mut first_mask = None;
        let text = self.render(|out, i| {
            if i == target {
                if first_mask.is_none() {
                    first_mask = Some(out.chars().count());
                }
                out.push_str(mask_token);
            } else {
                out.push_str(&self.slots[i]);
            }
        });
        (text, first_mask)
    }

    /// Variant text with every slot replaced by its assigned name.
    ///
    /// Slots missing from `assignment` keep their marker.
    pub fn materialize(&self, assignment: &JointAssignment) -> String {
        self.render(|out, i| {
            let slot = &self.slots[i];
            match assignment.get(slot) {
                Some(name) => out.push_str(name),
                None => out.push_str(&marker_for(slot)),
            }
        })
    }
}

fn split_markers(text: &str, slots: &[String]) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(found) = text[cursor..].find(MARKER_PREFIX) {
        let start = cursor + found;
        let name_start = start + MARKER_PREFIX.len();
        let run_len = text[name_start..]
            .char_indices()
            .find(|(_, c)| !is_ident_char(*c))
            .map_or(text.len() - name_start, |(i, _)| i);
        let end = name_start + run_len;

        let at_boundary = !text[..start].chars().next_back().is_some_and(is_ident_char);
        let slot = text[name_start..end]
            .strip_suffix(MARKER_SUFFIX)
            .filter(|_| at_boundary)
            .and_then(|name| slots.iter().position(|s| s == name));

        if let Some(index) = slot {
            if literal_start < start {
                segments.push(Segment::Text(text[literal_start..start].to_string()));
            }
            segments.push(Segment::Slot(index));
            literal_start = end;
        }
        cursor = end.max(name_start);
    }

    if literal_start < text.len() {
        segments.push(Segment::Text(text[literal_start..].to_string()));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use codenat_lexer::JavaLexer;

    fn parse(text: &str) -> MaskedSource {
        MaskedSource::parse(text, &JavaLexer).unwrap()
    }

    #[test]
    fn slots_are_numbered_by_first_appearance() {
        let source = parse("___MASKED_x___ = ___MASKED_y___ + ___MASKED_x___;");
        assert_eq!(source.slots(), &["x".to_string(), "y".to_string()]);
        assert_eq!(source.occurrences(0), 2);
        assert_eq!(source.occurrences(1), 1);
        assert_eq!(
            source.segments()[..4],
            [
                Segment::Slot(0),
                Segment::Text(" = ".into()),
                Segment::Slot(1),
                Segment::Text(" + ".into())
            ]
        );
    }

    #[test]
    fn marked_text_round_trips() {
        let text = "int ___MASKED_n___ = 0;\n// uses ___MASKED_n___\nfoo___MASKED_n___();";
        assert_eq!(parse(text).to_marked(), text);
    }

    #[test]
    fn markers_inside_larger_identifiers_stay_literal() {
        let source = parse("int ___MASKED_n___ = a___MASKED_n___;");
        assert_eq!(source.occurrences(0), 1);
    }

    #[test]
    fn comment_occurrences_of_known_slots_are_substituted() {
        let source = parse("int ___MASKED_n___ = 0; // ___MASKED_n___ counts");
        assert_eq!(source.occurrences(0), 2);
    }

    #[test]
    fn unknown_comment_markers_stay_literal() {
        let source = parse("int a = 0; // ___MASKED_ghost___");
        assert!(!source.has_slots());
        assert_eq!(source.to_marked(), "int a = 0; // ___MASKED_ghost___");
    }

    #[test]
    fn slot_whose_wrapper_contains_another_name_is_not_confused() {
        // `i` is a prefix of `idx`; span splitting cannot cross-replace them.
        let source = parse("___MASKED_i___ = ___MASKED_idx___;");
        let assignment = JointAssignment::new(vec![("i".into(), "a".into()), ("idx".into(), "b".into())]);
        assert_eq!(source.materialize(&assignment), "a = b;");
    }

    #[test]
    fn query_text_masks_target_and_resolves_others() {
        let source = parse("___MASKED_x___ = ___MASKED_y___ + ___MASKED_x___;");
        let (text, first) = source.query_text(1, "<mask>");
        assert_eq!(text, "x = <mask> + x;");
        assert_eq!(first, Some(4));
    }

    #[test]
    fn existing_names_cover_lexemes_and_slots() {
        let source = parse("int ___MASKED_total___ = count + 1;");
        let existing = source.existing_names();
        assert!(existing.contains("total"));
        assert!(existing.contains("count"));
        assert!(existing.contains("int"));
    }

    #[test]
    fn missing_assignment_keeps_marker() {
        let source = parse("___MASKED_a___ + ___MASKED_b___");
        let partial = JointAssignment::new(vec![("a".into(), "left".into())]);
        assert_eq!(source.materialize(&partial), "left + ___MASKED_b___");
    }

    #[test]
    fn lex_errors_are_surfaced() {
        assert!(MaskedSource::parse("int ___MASKED_a___ = #;", &JavaLexer).is_err());
    }
}
