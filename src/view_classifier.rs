//! View classification for rendered requests

use crate::models::{QueryParams, View};

/// Query flag selecting the source view
pub const SOURCE_FLAG: &str = "source";
/// Query flag selecting the documentation view
pub const DOC_FLAG: &str = "doc";
/// Query parameter naming a symbol in the documentation view
pub const SYMBOL_PARAM: &str = "s";

/// The view a request resolved to, plus the symbol filter it carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSelection {
    pub view: View,
    /// Only ever set for [`View::Doc`]
    pub symbol: Option<String>,
}

/// Resolve the view from the query and whether a sub-path is present
///
/// `source` beats `doc`; without either flag the module root is the info view
/// and anything below it is documentation.
pub fn classify(query: &QueryParams, has_sub_path: bool) -> ViewSelection {
    let view = if query.has(SOURCE_FLAG) {
        View::Source
    } else if query.has(DOC_FLAG) {
        View::Doc
    } else if !has_sub_path {
        View::Info
    } else {
        View::Doc
    };

    let symbol = match view {
        View::Doc => query
            .get(SYMBOL_PARAM)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        View::Source | View::Info => None,
    };

    ViewSelection { view, symbol }
}
