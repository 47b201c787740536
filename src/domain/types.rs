//! Code Intelligence Domain Model
//!
//! Defines the business entities flowing through the indexing and retrieval
//! pipeline, from chunks produced by the splitters to the documents persisted
//! in a vector store and the ranked results returned to callers.
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CodeChunk`] | Contiguous span of a source file produced by a splitter |
//! | [`VectorDocument`] | Persisted unit: vector plus content and location fields |
//! | [`ScoredDocument`] | Document paired with a store similarity score |
//! | [`SemanticSearchResult`] | Ranked result surfaced to the tool layer |
//! | [`Language`] | Supported programming languages |
//!
//! ## Configuration Records
//!
//! | Type | Description |
//! |------|-------------|
//! | [`EmbeddingConfig`] | Embedding provider selection and credentials |
//! | [`VectorStoreConfig`] | Vector store location and limits |
//! | [`IndexerConfig`] | Splitting, batching and retry knobs |
//! | [`RankingConfig`] | Multi-factor score blending weights |
//!
//! All configuration records enumerate their options and reject unknown
//! fields at deserialization time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Metadata key carrying the absolute codebase path a document belongs to.
pub const META_CODEBASE_PATH: &str = "codebase_path";
/// Metadata key carrying how many files in the codebase import this file.
pub const META_IMPORT_COUNT: &str = "import_count";
/// Metadata key carrying the collection-wide maximum import count.
pub const META_MAX_IMPORT_COUNT: &str = "max_import_count";
/// Metadata key carrying the chunk language tag.
pub const META_LANGUAGE: &str = "language";

/// Contiguous span of a source file with 1-based inclusive line bounds
///
/// Chunks are constructed by the splitters and consumed by the indexer;
/// they are never persisted as such.
///
/// # Example
///
/// ```rust
/// use code_context::domain::types::{CodeChunk, Language};
///
/// let chunk = CodeChunk {
///     content: "fn hello() { println!(\"Hello!\"); }".to_string(),
///     start_line: 1,
///     end_line: 3,
///     language: Language::Rust,
///     file_path: "src/lib.rs".to_string(),
/// };
/// assert!(chunk.start_line <= chunk.end_line);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeChunk {
    /// The chunk text
    pub content: String,
    /// First line covered, 1-based
    pub start_line: u32,
    /// Last line covered, inclusive
    pub end_line: u32,
    /// Language the chunk was split as
    pub language: Language,
    /// Path of the originating file, relative to the codebase root
    pub file_path: String,
}

/// Persisted unit of the vector store
///
/// `id` is a deterministic hash of `(relative_path, start_line, end_line)`
/// so re-indexing the same chunk replaces rather than duplicates. The vector
/// length always equals the dimension fixed at collection creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorDocument {
    /// Deterministic chunk identifier
    pub id: String,
    /// Embedding vector; length equals the collection dimension
    pub vector: Vec<f32>,
    /// Chunk text
    pub content: String,
    /// File path relative to the codebase root
    pub relative_path: String,
    /// First line covered, 1-based
    pub start_line: u32,
    /// Last line covered, inclusive
    pub end_line: u32,
    /// File extension without the leading dot
    pub file_extension: String,
    /// File modification time, milliseconds since the Unix epoch
    pub mtime_ms: i64,
    /// Typed metadata mapping; serialized as a blob at the store boundary
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl VectorDocument {
    /// Read an integer metadata entry, tolerating absent or non-numeric values.
    pub fn metadata_u64(&self, key: &str) -> Option<u64> {
        self.metadata.get(key).and_then(|v| v.as_u64())
    }
}

/// Document paired with the store's similarity score
///
/// Scores are similarity, not distance: higher is better, and stores keep
/// them in `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    /// The matched document
    pub document: VectorDocument,
    /// Similarity in `[0, 1]`, higher is better
    pub score: f32,
}

/// Ranked result surfaced to the tool layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SemanticSearchResult {
    /// File path relative to the codebase root
    pub relative_path: String,
    /// First line of the matched chunk, 1-based
    pub start_line: u32,
    /// Last line of the matched chunk, inclusive
    pub end_line: u32,
    /// Matched chunk text
    pub content: String,
    /// Language tag of the chunk
    pub language: String,
    /// Final score in `[0, 1]`; equals the store similarity when ranking is off
    pub score: f32,
}

/// Response of a semantic search
///
/// Searches issued while the codebase is being re-indexed still succeed; the
/// `indexing` flag is the advisory that results may predate in-flight writes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    /// Ranked results, best first
    pub results: Vec<SemanticSearchResult>,
    /// True when an indexing task for this codebase is currently running
    pub indexing: bool,
}

/// Supported programming languages for AST-aware splitting
///
/// Each variant of the syntax-aware set corresponds to a tree-sitter grammar.
/// Languages outside that set flow through the size-bounded fallback splitter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Php,
    Ruby,
    Swift,
    Kotlin,
    Scala,
    Shell,
    Sql,
    Html,
    Json,
    Yaml,
    Toml,
    Markdown,
    PlainText,
    Unknown,
}

impl Language {
    /// Map a file extension (without dot) to a language tag.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => Language::Rust,
            "py" | "pyi" => Language::Python,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "go" => Language::Go,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" => Language::Cpp,
            "cs" => Language::CSharp,
            "php" => Language::Php,
            "rb" => Language::Ruby,
            "swift" => Language::Swift,
            "kt" | "kts" => Language::Kotlin,
            "scala" => Language::Scala,
            "sh" | "bash" | "zsh" | "fish" => Language::Shell,
            "sql" => Language::Sql,
            "html" | "htm" => Language::Html,
            "json" => Language::Json,
            "yaml" | "yml" => Language::Yaml,
            "toml" => Language::Toml,
            "md" | "markdown" => Language::Markdown,
            "txt" | "text" => Language::PlainText,
            _ => Language::Unknown,
        }
    }

    /// Stable display name for metadata and result rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Php => "php",
            Language::Ruby => "ruby",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Scala => "scala",
            Language::Shell => "shell",
            Language::Sql => "sql",
            Language::Html => "html",
            Language::Json => "json",
            Language::Yaml => "yaml",
            Language::Toml => "toml",
            Language::Markdown => "markdown",
            Language::PlainText => "plaintext",
            Language::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// File deltas computed by a synchronizer cycle
///
/// The three sets are disjoint by construction: a path is classified exactly
/// once against the previous manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncChanges {
    /// Present now, absent in the previous manifest
    pub added: Vec<String>,
    /// Present in both, content hash differs
    pub modified: Vec<String>,
    /// Absent now, present in the previous manifest
    pub removed: Vec<String>,
}

impl SyncChanges {
    /// True when any file was added, modified or removed.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.modified.is_empty() || !self.removed.is_empty()
    }

    /// Total number of changed paths.
    pub fn total_changes(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }
}

/// Terminal status of an indexing run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexOutcome {
    /// Every affected file was processed
    Completed,
    /// The run stopped early at the collection chunk cap
    LimitReached,
}

/// Summary of a codebase indexing run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexStats {
    /// Terminal status of the run
    pub outcome: IndexOutcome,
    /// Files the synchronizer reported as added or modified
    pub files_changed: usize,
    /// Files actually split and written this run
    pub files_indexed: usize,
    /// Documents written to the store this run
    pub chunks_indexed: usize,
    /// Documents deleted for modified or removed files
    pub chunks_deleted: usize,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Observable state of a codebase index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum IndexState {
    /// No collection exists for this codebase
    NotIndexed,
    /// An indexing task is running
    Indexing {
        /// Reported completion percentage, `0..=100`
        percentage: u8,
    },
    /// The collection exists and holds documents
    Indexed,
}

/// Phase of an indexing run, reported through the progress callback
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexPhase {
    /// Walking the tree and computing file deltas
    Scanning,
    /// Splitting files into chunks
    Chunking,
    /// Embedding chunk batches
    Embedding,
    /// Writing batches to the vector store
    Writing,
}

/// Progress report for a long-running indexing task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexProgress {
    /// Current pipeline phase
    pub phase: IndexPhase,
    /// Units completed within the phase
    pub current: usize,
    /// Total units in the phase
    pub total: usize,
    /// Overall completion percentage, `0..=100`
    pub percentage: u8,
}

/// Configuration for embedding providers
///
/// # Example
///
/// ```rust
/// use code_context::domain::types::EmbeddingConfig;
///
/// let openai = EmbeddingConfig {
///     provider: "openai".to_string(),
///     model: "text-embedding-3-small".to_string(),
///     api_key: Some("sk-...".to_string()),
///     base_url: None,
///     dimensions: None,
///     max_tokens: None,
/// };
/// assert_eq!(openai.provider, "openai");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Provider identifier (e.g. `openai`)
    #[validate(length(min = 1))]
    pub provider: String,
    /// Model identifier specific to the provider
    #[validate(length(min = 1))]
    pub model: String,
    /// API key for cloud providers
    pub api_key: Option<String>,
    /// Custom API endpoint URL
    pub base_url: Option<String>,
    /// Declared output dimension; discovered from the provider when absent
    pub dimensions: Option<usize>,
    /// Maximum input token limit override
    pub max_tokens: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            base_url: None,
            dimensions: None,
            max_tokens: None,
        }
    }
}

/// Configuration for vector store providers
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct VectorStoreConfig {
    /// Provider identifier (`filesystem`, `memory`)
    #[validate(length(min = 1))]
    pub provider: String,
    /// Store root URI for on-disk providers; `~` expansion is applied
    pub uri: Option<String>,
    /// Credential token for remote providers
    pub token: Option<String>,
    /// Maximum number of collections the store may hold
    #[validate(range(min = 1))]
    pub max_collections: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            provider: "filesystem".to_string(),
            uri: None,
            token: None,
            max_collections: 64,
        }
    }
}

/// Configuration for the indexing pipeline
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct IndexerConfig {
    /// Target chunk size in characters for the fallback splitter
    #[validate(range(min = 1))]
    pub chunk_size: usize,
    /// Trailing characters repeated into the next fallback chunk
    pub chunk_overlap: usize,
    /// Texts per embedding batch; `None` uses the provider default
    pub embedding_batch_size: Option<usize>,
    /// Hard cap on documents written per collection
    #[validate(range(min = 1))]
    pub max_chunks: usize,
    /// Attempts per embed/insert batch before the run fails
    #[validate(range(min = 1))]
    pub max_batch_retries: u32,
    /// Extra file extensions (without dot) to index besides the defaults
    pub custom_extensions: Vec<String>,
    /// Extra gitignore-style patterns excluded from walking
    pub ignore_patterns: Vec<String>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2500,
            chunk_overlap: 300,
            embedding_batch_size: None,
            max_chunks: 450_000,
            max_batch_retries: 3,
            custom_extensions: Vec::new(),
            ignore_patterns: Vec::new(),
        }
    }
}

/// Configuration for multi-factor result ranking
///
/// Weights are positive reals and need not sum to one; the blend divides by
/// their sum. `recency_half_life_days` is the age at which the recency
/// factor equals 0.5.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RankingConfig {
    /// Master switch; disabled ranking returns raw store similarity
    pub enabled: bool,
    /// Weight of the min-max normalized vector similarity
    #[validate(range(min = 0.0))]
    pub vector_weight: f64,
    /// Weight of the modification-time recency factor
    #[validate(range(min = 0.0))]
    pub recency_weight: f64,
    /// Weight of the import-frequency factor
    #[validate(range(min = 0.0))]
    pub import_weight: f64,
    /// Weight of the term-frequency factor
    #[validate(range(min = 0.0))]
    pub term_freq_weight: f64,
    /// Age in days at which the recency factor halves
    pub recency_half_life_days: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            vector_weight: 0.70,
            recency_weight: 0.10,
            import_weight: 0.10,
            term_freq_weight: 0.10,
            recency_half_life_days: 90.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_round_trips_common_extensions() {
        assert_eq!(Language::from_extension("rs"), Language::Rust);
        assert_eq!(Language::from_extension("TSX"), Language::TypeScript);
        assert_eq!(Language::from_extension("weird"), Language::Unknown);
        assert_eq!(Language::Rust.to_string(), "rust");
    }

    #[test]
    fn sync_changes_counts() {
        let changes = SyncChanges {
            added: vec!["a.rs".into()],
            modified: vec!["b.rs".into()],
            removed: vec![],
        };
        assert!(changes.has_changes());
        assert_eq!(changes.total_changes(), 2);
        assert!(!SyncChanges::default().has_changes());
    }

    #[test]
    fn config_records_reject_unknown_fields() {
        let err = serde_json::from_str::<RankingConfig>(
            r#"{"enabled":true,"vector_weight":1.0,"recency_weight":0.0,
                "import_weight":0.0,"term_freq_weight":0.0,
                "recency_half_life_days":90.0,"mystery":1}"#,
        );
        assert!(err.is_err());
    }
}
