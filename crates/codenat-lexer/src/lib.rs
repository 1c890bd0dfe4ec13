//! Java lexing for the infilling stage.
//!
//! The lexer splits Java 8 source into lexemes the same way the grammar used
//! by the transformation tool does: whitespace and comments are dropped, `>>`
//! stays two `>` tokens, and a slot marker such as `___MASKED_count___` is a
//! plain identifier and therefore a single lexeme.
//!
//! ```
//! use codenat_lexer::{JavaLexer, SourceTokenizer};
//!
//! let lexemes = JavaLexer.tokenize("int ___MASKED_n___ = 1; // init").unwrap();
//! assert_eq!(lexemes, vec!["int", "___MASKED_n___", "=", "1", ";"]);
//! ```

use codenat_common::{PipelineError, Result, slot_name_of};
use logos::Logos;
use std::collections::HashSet;
use std::ops::Range;

/// Reserved words and literal keywords of Java 8.
pub const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try",
    "void", "volatile", "while", "true", "false", "null",
];

/// `true` if `word` can never be used as a Java identifier.
pub fn is_java_keyword(word: &str) -> bool {
    JAVA_KEYWORDS.contains(&word)
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\x0C]+")]
#[logos(skip r"//[^\r\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
enum RawToken {
    #[regex(r"[\p{L}_$][\p{L}\p{N}_$]*")]
    Word,

    #[regex(r"0[xX][0-9a-fA-F_]+[lL]?")]
    #[regex(r"0[bB][01_]+[lL]?")]
    #[regex(r"[0-9][0-9_]*[lL]?")]
    Integer,

    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?[fFdD]?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?[fFdD]?")]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+[fFdD]?")]
    #[regex(r"[0-9][0-9_]*[fFdD]")]
    Floating,

    #[regex(r"'([^'\\\r\n]|\\.)+'")]
    Char,

    #[regex(r#""([^"\\\r\n]|\\.)*""#)]
    Str,

    #[token("(")]
    #[token(")")]
    #[token("{")]
    #[token("}")]
    #[token("[")]
    #[token("]")]
    #[token(";")]
    #[token(",")]
    #[token(".")]
    #[token("...")]
    #[token("@")]
    #[token("::")]
    Separator,

    #[token("=")]
    #[token(">")]
    #[token("<")]
    #[token("!")]
    #[token("~")]
    #[token("?")]
    #[token(":")]
    #[token("->")]
    #[token("==")]
    #[token("<=")]
    #[token(">=")]
    #[token("!=")]
    #[token("&&")]
    #[token("||")]
    #[token("++")]
    #[token("--")]
    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("/")]
    #[token("&")]
    #[token("|")]
    #[token("^")]
    #[token("%")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("&=")]
    #[token("|=")]
    #[token("^=")]
    #[token("%=")]
    #[token("<<=")]
    #[token(">>=")]
    #[token(">>>=")]
    Operator,
}

/// Lexical category of a [`Lexeme`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Keyword,
    BooleanLiteral,
    NullLiteral,
    IntegerLiteral,
    FloatingLiteral,
    CharLiteral,
    StringLiteral,
    Separator,
    Operator,
}

/// One lexeme with its byte span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    pub kind: TokenKind,
    pub text: String,
    pub span: Range<usize>,
}

impl Lexeme {
    /// Slot name if this lexeme is a masked-slot marker.
    pub fn slot_name(&self) -> Option<&str> {
        if self.kind == TokenKind::Identifier { slot_name_of(&self.text) } else { None }
    }
}

fn classify(raw: RawToken, text: &str) -> TokenKind {
    match raw {
        RawToken::Word => match text {
            "true" | "false" => TokenKind::BooleanLiteral,
            "null" => TokenKind::NullLiteral,
            _ if is_java_keyword(text) => TokenKind::Keyword,
            _ => TokenKind::Identifier,
        },
        RawToken::Integer => TokenKind::IntegerLiteral,
        RawToken::Floating => TokenKind::FloatingLiteral,
        RawToken::Char => TokenKind::CharLiteral,
        RawToken::Str => TokenKind::StringLiteral,
        RawToken::Separator => TokenKind::Separator,
        RawToken::Operator => TokenKind::Operator,
    }
}

/// Lex `source` into lexemes, failing on the first character no rule accepts.
pub fn lex(source: &str) -> Result<Vec<Lexeme>> {
    let mut lexemes = Vec::new();
    let mut lexer = RawToken::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let text = lexer.slice();
        match result {
            Ok(raw) => lexemes.push(Lexeme {
                kind: classify(raw, text),
                text: text.to_string(),
                span,
            }),
            Err(()) => {
                return Err(PipelineError::Lex { offset: span.start, text: text.to_string() });
            }
        }
    }

    Ok(lexemes)
}

/// Distinct slot names in first-occurrence order.
pub fn masked_names(lexemes: &[Lexeme]) -> Vec<String> {
    let mut seen = HashSet::new();
    lexemes
        .iter()
        .filter_map(Lexeme::slot_name)
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

/// Every lexeme text plus every slot name: the names a replacement must avoid.
pub fn existing_names(lexemes: &[Lexeme]) -> HashSet<String> {
    let mut names: HashSet<String> = lexemes.iter().map(|l| l.text.clone()).collect();
    names.extend(masked_names(lexemes));
    names
}

/// Source-to-lexeme adapter.
pub trait SourceTokenizer: Send + Sync {
    fn tokenize(&self, source: &str) -> Result<Vec<String>>;
}

/// The Java 8 lexer.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaLexer;

impl SourceTokenizer for JavaLexer {
    fn tokenize(&self, source: &str) -> Result<Vec<String>> {
        Ok(lex(source)?.into_iter().map(|l| l.text).collect())
    }
}
