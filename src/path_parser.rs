//! Decomposition of request paths into module references

use crate::models::{ModuleRef, STD_MODULE};
use percent_encoding::percent_decode_str;
use tracing::debug;

/// A line reference embedded in the last path segment (`mod.ts:12:4`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAnchor {
    pub line: u32,
    pub column: Option<u32>,
}

impl LineAnchor {
    /// Normalized URL fragment, e.g. `L12`
    pub fn fragment(&self) -> String {
        format!("L{}", self.line)
    }
}

/// Result of parsing a module route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRoute {
    /// The module exactly as requested
    pub module: ModuleRef,
    /// `true` for `/x/std...`, which must be reissued without `/x`
    pub legacy_std_prefix: bool,
    /// Well-formed legacy line reference in the last segment, if any
    pub line_anchor: Option<LineAnchor>,
}

impl ParsedRoute {
    /// Module used for upstream lookups: the line token is not part of the file name
    pub fn lookup_module(&self) -> ModuleRef {
        match self.line_anchor {
            Some(_) => strip_line_anchor(&self.module),
            None => self.module.clone(),
        }
    }
}

/// Parse `/x/<name>[@<version>]/<path...>` or `/std[@<version>]/<path...>`
///
/// Returns `None` for paths that do not address a module. Module names are
/// split out but not validated; the upstream decides whether they exist.
pub fn parse_route(path: &str) -> Option<ParsedRoute> {
    let trimmed = path.strip_prefix('/')?;
    let segments: Vec<&str> = trimmed.split('/').collect();

    let (name_token, rest, legacy_std_prefix) = match segments.as_slice() {
        ["x", name_token, rest @ ..] => {
            let is_std = split_name_token(name_token).0 == STD_MODULE;
            (*name_token, rest, is_std)
        }
        [first, rest @ ..] if split_name_token(first).0 == STD_MODULE => (*first, rest, false),
        _ => {
            debug!("Path does not address a module: path={}", path);
            return None;
        }
    };

    let (name, version) = split_name_token(name_token);
    let version = version.map(decode_version);

    let module = ModuleRef::new(name, version, rest.iter().copied()).ok()?;
    let line_anchor = module
        .path
        .last()
        .and_then(|segment| parse_line_anchor(segment))
        .map(|(_, anchor)| anchor);

    debug!(
        "Parsed route: module={}, legacy_std_prefix={}, line_anchor={:?}",
        module, legacy_std_prefix, line_anchor
    );

    Some(ParsedRoute {
        module,
        legacy_std_prefix,
        line_anchor,
    })
}

/// Split `name@version` into its parts
fn split_name_token(token: &str) -> (&str, Option<&str>) {
    match token.split_once('@') {
        Some((name, version)) => (name, Some(version)),
        None => (token, None),
    }
}

fn decode_version(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

fn parse_positive(token: &str) -> Option<u32> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse::<u32>().ok().filter(|n| *n > 0)
}

/// Split a trailing `:line` or `:line:column` token off a path segment
///
/// Returns the segment without the token plus the parsed anchor. Tokens that
/// are not positive integers yield `None`.
pub fn parse_line_anchor(segment: &str) -> Option<(&str, LineAnchor)> {
    let (head, last) = segment.rsplit_once(':')?;
    let last = parse_positive(last)?;

    // `name:line:column`
    if let Some((base, line)) = head.rsplit_once(':') {
        if let Some(line) = parse_positive(line) {
            if !base.is_empty() {
                return Some((
                    base,
                    LineAnchor {
                        line,
                        column: Some(last),
                    },
                ));
            }
        }
    }

    if head.is_empty() {
        return None;
    }

    Some((
        head,
        LineAnchor {
            line: last,
            column: None,
        },
    ))
}

/// Copy of `module` with any line token removed from its last segment
pub fn strip_line_anchor(module: &ModuleRef) -> ModuleRef {
    let mut stripped = module.clone();
    if let Some(last) = stripped.path.last_mut() {
        let base = parse_line_anchor(last).map(|(base, _)| base.to_string());
        if let Some(base) = base {
            *last = base;
        }
    }
    stripped
}
