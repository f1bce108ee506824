//! Page results returned by the metadata gateway
//!
//! [`PageResult`] is a closed set of page kinds. Every consumer matches on it
//! exhaustively, so a new kind fails to compile until each consumer handles it.

use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Module-level metadata shared by most page kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub latest_version: Option<String>,
    /// Published versions, newest first
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default)]
    pub repository: Option<String>,
}

impl ModuleSummary {
    pub fn new(name: impl Into<String>) -> Self {
        ModuleSummary {
            name: name.into(),
            description: None,
            latest_version: None,
            versions: Vec::new(),
            repository: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// One row of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
    #[serde(default)]
    pub size: Option<u64>,
    /// First line of the entry's module doc, if any
    #[serde(default)]
    pub doc: Option<String>,
}

/// Content attached to a source-view file page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FileContent {
    Text(String),
    Bytes(Vec<u8>),
    /// Content could not be fetched; rendered as a per-file message
    Error(String),
}

impl FileContent {
    /// Text when the bytes are valid UTF-8, raw bytes otherwise
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => FileContent::Text(text.to_string()),
            Err(_) => FileContent::Bytes(bytes.to_vec()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FileContent::Error(_))
    }
}

/// Pointer to a module's readme file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadmeRef {
    /// Path of the readme inside the module, starting with `/`
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoVersionsPage {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidVersionPage {
    pub module: ModuleSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NotFoundPage {
    #[serde(default)]
    pub module: Option<ModuleSummary>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirPage {
    pub module: ModuleSummary,
    pub path: String,
    pub entries: Vec<DirEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePage {
    pub module: ModuleSummary,
    /// Canonical path of the file inside the module
    pub path: String,
    /// Where the raw file can be fetched
    pub source_url: String,
    #[serde(default)]
    pub size: Option<u64>,
    /// Whether the render layer should syntax-highlight the content
    #[serde(default)]
    pub highlight: bool,
    /// Filled in by the enricher for the source view
    #[serde(default, skip_deserializing)]
    pub content: Option<FileContent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexItem {
    pub path: String,
    pub kind: EntryKind,
    #[serde(default)]
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPage {
    pub module: ModuleSummary,
    pub path: String,
    pub items: Vec<IndexItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfoPage {
    pub module: ModuleSummary,
    #[serde(default)]
    pub readme: Option<ReadmeRef>,
    /// Filled in by the enricher for the info view
    #[serde(default, skip_deserializing)]
    pub readme_content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolPage {
    pub module: ModuleSummary,
    pub path: String,
    pub symbol: String,
    /// Documentation nodes, opaque to the router
    #[serde(default)]
    pub doc_nodes: Vec<serde_json::Value>,
}

/// Page kinds produced for a rendered request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PageResult {
    NoVersions(NoVersionsPage),
    InvalidVersion(InvalidVersionPage),
    NotFound(NotFoundPage),
    Dir(DirPage),
    File(FilePage),
    Index(IndexPage),
    ModuleInfo(ModuleInfoPage),
    Symbol(SymbolPage),
}

impl PageResult {
    /// Stable name of the page kind, used for logs and metric labels
    pub fn kind_name(&self) -> &'static str {
        match self {
            PageResult::NoVersions(_) => "no-versions",
            PageResult::InvalidVersion(_) => "invalid-version",
            PageResult::NotFound(_) => "not-found",
            PageResult::Dir(_) => "dir",
            PageResult::File(_) => "file",
            PageResult::Index(_) => "index",
            PageResult::ModuleInfo(_) => "module-info",
            PageResult::Symbol(_) => "symbol",
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, PageResult::File(_))
    }

    /// Status the rendered page is served with
    ///
    /// A module without versions is an informational page, not an error.
    pub fn http_status(&self) -> StatusCode {
        match self {
            PageResult::NotFound(_) | PageResult::InvalidVersion(_) => StatusCode::NOT_FOUND,
            PageResult::NoVersions(_)
            | PageResult::Dir(_)
            | PageResult::File(_)
            | PageResult::Index(_)
            | PageResult::ModuleInfo(_)
            | PageResult::Symbol(_) => StatusCode::OK,
        }
    }
}
