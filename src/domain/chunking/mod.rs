//! Code splitting
//!
//! Two splitter variants produce [`CodeChunk`]s from file content:
//!
//! 1. **Syntax-aware** ([`AstSplitter`]): parses with tree-sitter and splits
//!    at declaration/statement boundaries for the supported language set.
//!    Parser failure or an unsupported language degrades per file to the
//!    fallback, so splitting never fails an indexing run.
//! 2. **Size-bounded** ([`SizeSplitter`]): sliding character window with a
//!    configurable size and overlap.
//!
//! Chunk line numbers are 1-based and inclusive, and every non-empty region
//! of a file is covered by at least one chunk.

pub mod ast;
pub mod fallback;

pub use ast::{AstSplitter, SUPPORTED_LANGUAGES};
pub use fallback::SizeSplitter;

use crate::domain::types::{CodeChunk, Language};

/// Splitter variant selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitterKind {
    /// Syntax-aware splitting with per-file fallback
    #[default]
    Ast,
    /// Size-bounded splitting only
    Size,
}

impl SplitterKind {
    /// Parse a splitter name from the tool surface.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "ast" => Some(Self::Ast),
            "size" | "fallback" => Some(Self::Size),
            _ => None,
        }
    }
}

/// Facade over the two splitter variants
#[derive(Debug, Clone)]
pub struct CodeSplitter {
    kind: SplitterKind,
    ast: AstSplitter,
    size: SizeSplitter,
}

impl CodeSplitter {
    /// Create a splitter of the given kind and window parameters.
    pub fn new(kind: SplitterKind, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            kind,
            ast: AstSplitter::new(chunk_size, chunk_overlap),
            size: SizeSplitter::new(chunk_size, chunk_overlap),
        }
    }

    /// Split file content into ordered chunks.
    ///
    /// Returns an empty sequence for empty input and never fails; per-file
    /// parser issues degrade to the size-bounded variant internally.
    pub fn split(&self, code: &str, language: Language, file_path: &str) -> Vec<CodeChunk> {
        match self.kind {
            SplitterKind::Ast => self.ast.split(code, language, file_path),
            SplitterKind::Size => self.size.split(code, language, file_path),
        }
    }

    /// Languages the syntax-aware variant can parse.
    pub fn supported_languages() -> &'static [Language] {
        SUPPORTED_LANGUAGES
    }
}

impl Default for CodeSplitter {
    fn default() -> Self {
        let cfg = crate::domain::types::IndexerConfig::default();
        Self::new(SplitterKind::Ast, cfg.chunk_size, cfg.chunk_overlap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_reports_syntax_languages() {
        let langs = CodeSplitter::supported_languages();
        assert!(langs.contains(&Language::Rust));
        assert!(langs.contains(&Language::TypeScript));
        assert!(!langs.contains(&Language::Markdown));
    }

    #[test]
    fn kind_parses_from_tool_surface_names() {
        assert_eq!(SplitterKind::from_name("AST"), Some(SplitterKind::Ast));
        assert_eq!(SplitterKind::from_name("size"), Some(SplitterKind::Size));
        assert_eq!(SplitterKind::from_name("other"), None);
    }

    #[test]
    fn size_kind_bypasses_the_parser() {
        let splitter = CodeSplitter::new(SplitterKind::Size, 10, 2);
        let chunks = splitter.split("fn a() {}\nfn b() {}\n", Language::Rust, "lib.rs");
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.content.chars().count() <= 10));
    }
}
