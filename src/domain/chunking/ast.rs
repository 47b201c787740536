//! Syntax-aware splitter over tree-sitter grammars
//!
//! Splits source at declaration and statement boundaries: sibling nodes are
//! merged until the target chunk size, oversized nodes are split through
//! their children, and leaves larger than a chunk degrade to the
//! size-bounded splitter. Unsupported languages and parser failures degrade
//! to the fallback for the whole file.

use tree_sitter::{Language as Grammar, Node, Parser};

use super::fallback::SizeSplitter;
use crate::domain::types::{CodeChunk, Language};

/// Languages with a registered tree-sitter grammar.
pub const SUPPORTED_LANGUAGES: &[Language] = &[
    Language::Rust,
    Language::Python,
    Language::JavaScript,
    Language::TypeScript,
    Language::Go,
    Language::Java,
    Language::C,
    Language::Cpp,
    Language::CSharp,
    Language::Ruby,
    Language::Php,
    Language::Swift,
    Language::Kotlin,
];

fn grammar_for(language: Language) -> Option<Grammar> {
    match language {
        Language::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
        Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
        Language::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
        Language::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        Language::Go => Some(tree_sitter_go::LANGUAGE.into()),
        Language::Java => Some(tree_sitter_java::LANGUAGE.into()),
        Language::C => Some(tree_sitter_c::LANGUAGE.into()),
        Language::Cpp => Some(tree_sitter_cpp::LANGUAGE.into()),
        Language::CSharp => Some(tree_sitter_c_sharp::LANGUAGE.into()),
        Language::Ruby => Some(tree_sitter_ruby::LANGUAGE.into()),
        Language::Php => Some(tree_sitter_php::LANGUAGE_PHP.into()),
        Language::Swift => Some(tree_sitter_swift::LANGUAGE.into()),
        Language::Kotlin => Some(tree_sitter_kotlin_ng::LANGUAGE.into()),
        _ => None,
    }
}

/// Declaration-boundary splitter with per-file fallback degradation
#[derive(Debug, Clone)]
pub struct AstSplitter {
    chunk_size: usize,
    fallback: SizeSplitter,
}

impl AstSplitter {
    /// Create a splitter; `chunk_size` and `chunk_overlap` also parameterize
    /// the embedded fallback.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            fallback: SizeSplitter::new(chunk_size, chunk_overlap),
        }
    }

    /// True when `language` has a registered grammar.
    pub fn supports(language: Language) -> bool {
        SUPPORTED_LANGUAGES.contains(&language)
    }

    /// Split `code` at declaration boundaries, degrading to the fallback
    /// splitter when the language is unsupported or parsing fails.
    pub fn split(&self, code: &str, language: Language, file_path: &str) -> Vec<CodeChunk> {
        if code.is_empty() {
            return Vec::new();
        }

        let Some(grammar) = grammar_for(language) else {
            return self.fallback.split(code, language, file_path);
        };

        let mut parser = Parser::new();
        if parser.set_language(&grammar).is_err() {
            tracing::warn!(file = file_path, ?language, "grammar rejected, using fallback");
            return self.fallback.split(code, language, file_path);
        }

        let Some(tree) = parser.parse(code, None) else {
            tracing::warn!(file = file_path, "parse failed, using fallback");
            return self.fallback.split(code, language, file_path);
        };

        let root = tree.root_node();
        if root.has_error() {
            tracing::debug!(file = file_path, "syntax errors, using fallback");
            return self.fallback.split(code, language, file_path);
        }

        let lines = LineIndex::new(code);
        let mut chunks = Vec::new();
        let covered = self.split_node(code, &lines, root, 0, language, file_path, &mut chunks);

        // Trailing bytes after the last named node (comments, blank lines).
        if covered < code.len() && !code[covered..].trim().is_empty() {
            self.push_span(code, &lines, covered, code.len(), language, file_path, &mut chunks);
        }
        chunks
    }

    /// Walk `node`'s named children, merging siblings up to the chunk size.
    /// `from` is the byte offset where uncovered text begins; returns the new
    /// covered offset.
    #[allow(clippy::too_many_arguments)]
    fn split_node(
        &self,
        code: &str,
        lines: &LineIndex,
        node: Node<'_>,
        from: usize,
        language: Language,
        file_path: &str,
        chunks: &mut Vec<CodeChunk>,
    ) -> usize {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        drop(cursor);

        if children.is_empty() {
            return self.split_leaf(code, lines, from, node.end_byte(), language, file_path, chunks);
        }

        let mut covered = from;
        let mut pending_end = from;
        for child in children {
            let child_end = child.end_byte().max(pending_end);
            if char_len(&code[covered..child_end]) > self.chunk_size {
                if pending_end > covered {
                    self.push_span(code, lines, covered, pending_end, language, file_path, chunks);
                    covered = pending_end;
                }
                if char_len(&code[covered..child_end]) > self.chunk_size {
                    covered =
                        self.split_node(code, lines, child, covered, language, file_path, chunks);
                    pending_end = covered;
                    continue;
                }
            }
            pending_end = child_end;
        }
        if pending_end > covered {
            self.push_span(code, lines, covered, pending_end, language, file_path, chunks);
            covered = pending_end;
        }
        covered
    }

    /// Split an oversized childless span with the size-bounded splitter,
    /// remapping its relative line numbers into file coordinates.
    #[allow(clippy::too_many_arguments)]
    fn split_leaf(
        &self,
        code: &str,
        lines: &LineIndex,
        from: usize,
        to: usize,
        language: Language,
        file_path: &str,
        chunks: &mut Vec<CodeChunk>,
    ) -> usize {
        if to <= from {
            return from;
        }
        let span = &code[from..to];
        if char_len(span) <= self.chunk_size {
            self.push_span(code, lines, from, to, language, file_path, chunks);
            return to;
        }
        let base_line = lines.line_at(from);
        for piece in self.fallback.split_text(span) {
            if piece.content.trim().is_empty() {
                continue;
            }
            chunks.push(CodeChunk {
                content: piece.content,
                start_line: base_line + piece.start_line - 1,
                end_line: base_line + piece.end_line - 1,
                language,
                file_path: file_path.to_string(),
            });
        }
        to
    }

    #[allow(clippy::too_many_arguments)]
    fn push_span(
        &self,
        code: &str,
        lines: &LineIndex,
        from: usize,
        to: usize,
        language: Language,
        file_path: &str,
        chunks: &mut Vec<CodeChunk>,
    ) {
        let content = &code[from..to];
        if content.trim().is_empty() {
            return;
        }
        chunks.push(CodeChunk {
            content: content.to_string(),
            start_line: lines.line_at(from),
            end_line: lines.line_at(to - 1),
            language,
            file_path: file_path.to_string(),
        });
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset to 1-based line number lookup.
struct LineIndex {
    /// Byte offsets at which each line starts; `starts[0] == 0`.
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(code: &str) -> Self {
        let mut starts = vec![0];
        for (i, b) in code.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        Self { starts }
    }

    fn line_at(&self, byte: usize) -> u32 {
        match self.starts.binary_search(&byte) {
            Ok(line) => line as u32 + 1,
            Err(line) => line as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_index_maps_offsets() {
        let idx = LineIndex::new("ab\ncd\nef");
        assert_eq!(idx.line_at(0), 1);
        assert_eq!(idx.line_at(2), 1); // the newline belongs to line 1
        assert_eq!(idx.line_at(3), 2);
        assert_eq!(idx.line_at(7), 3);
    }

    #[test]
    fn rust_functions_split_at_boundaries() {
        let splitter = AstSplitter::new(30, 0);
        let code = "fn alpha() -> u32 {\n    1\n}\n\nfn beta() -> u32 {\n    2\n}\n";
        let chunks = splitter.split(code, Language::Rust, "lib.rs");
        assert!(chunks.len() >= 2, "expected one chunk per function");
        assert_eq!(chunks[0].start_line, 1);
        assert!(chunks[0].content.contains("alpha"));
        assert!(chunks[1].content.contains("beta"));
    }

    #[test]
    fn small_file_merges_into_one_chunk() {
        let splitter = AstSplitter::new(500, 0);
        let code = "fn a() {}\nfn b() {}\n";
        let chunks = splitter.split(code, Language::Rust, "lib.rs");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 2);
    }

    #[test]
    fn unsupported_language_uses_fallback() {
        let splitter = AstSplitter::new(100, 10);
        let chunks = splitter.split("select 1;\n", Language::Sql, "q.sql");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].language, Language::Sql);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let splitter = AstSplitter::new(100, 10);
        assert!(splitter.split("", Language::Rust, "lib.rs").is_empty());
    }
}
