//! Core request-scoped data models for the registry router

use crate::error::{Result, RouterError};
use bytes::Bytes;
use http::{HeaderName, HeaderValue, Response, StatusCode};
use http_body_util::Full;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the standard library module, served without the `/x` prefix
pub const STD_MODULE: &str = "std";

/// Characters escaped when a single path segment is written into a URL
pub(crate) const SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// URL prefix under which a module is published
pub fn module_base(name: &str) -> String {
    if name == STD_MODULE {
        format!("/{}", STD_MODULE)
    } else {
        format!("/x/{}", name)
    }
}

/// Reference to a module, an optional version and a sub-path inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRef {
    /// Module name, never empty
    pub name: String,
    /// Requested version; `None` means "latest"
    pub version: Option<String>,
    /// Sub-path segments, never empty strings
    pub path: Vec<String>,
}

impl ModuleRef {
    /// Create a new ModuleRef
    ///
    /// Empty path segments are dropped and an empty version is treated as
    /// absent.
    ///
    /// # Returns
    /// * `Ok(ModuleRef)` if `name` is non-empty
    /// * `Err(RouterError)` otherwise
    pub fn new<I, S>(name: impl Into<String>, version: Option<String>, path: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(RouterError::InvalidRequest(
                "module name must not be empty".to_string(),
            ));
        }

        let path = path
            .into_iter()
            .map(Into::into)
            .filter(|segment: &String| !segment.is_empty())
            .collect();

        Ok(ModuleRef {
            name,
            version: version.filter(|v| !v.is_empty()),
            path,
        })
    }

    /// Whether the request names anything below the module root
    pub fn has_sub_path(&self) -> bool {
        !self.path.is_empty()
    }

    /// Sub-path as written in URLs: `""` for the root, `/a/b` otherwise
    pub fn path_string(&self) -> String {
        self.path.iter().fold(String::new(), |mut acc, segment| {
            acc.push('/');
            acc.push_str(segment);
            acc
        })
    }

    /// Sub-path as sent upstream: `/` for the root
    pub fn upstream_path(&self) -> String {
        if self.path.is_empty() {
            "/".to_string()
        } else {
            self.path_string()
        }
    }

    /// Copy of this reference pinned to `version`
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        ModuleRef {
            version: Some(version.into()),
            ..self.clone()
        }
    }

    /// Copy of this reference with the sub-path replaced by `path`
    pub fn with_path(&self, path: &str) -> Self {
        ModuleRef {
            path: split_path(path),
            ..self.clone()
        }
    }

    /// Canonical URL path for this reference, without query or fragment
    pub fn url_path(&self) -> String {
        let mut url = module_base(&self.name);
        if let Some(version) = &self.version {
            url.push('@');
            url.extend(utf8_percent_encode(version, SEGMENT_ENCODE_SET));
        }
        url.push_str(&self.path_string());
        url
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}{}", self.name, version, self.path_string()),
            None => write!(f, "{}{}", self.name, self.path_string()),
        }
    }
}

/// Split a `/`-separated path into its non-empty segments
pub fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Which page view a rendered request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Doc,
    Source,
    Info,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Doc => "doc",
            View::Source => "source",
            View::Info => "info",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Versions published for a module, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionList {
    #[serde(default)]
    pub latest: Option<String>,
    #[serde(rename = "versions", default)]
    pub all: Vec<String>,
}

impl VersionList {
    pub fn new(latest: Option<String>, all: Vec<String>) -> Self {
        VersionList { latest, all }
    }
}

/// A single query parameter, decoded for lookup and kept raw for output
#[derive(Debug, Clone, PartialEq, Eq)]
struct QueryParam {
    key: String,
    value: Option<String>,
    raw: String,
}

/// Ordered query parameters of a request
///
/// Bare flags such as `?source` serialize back as bare flags, so a redirect
/// reproduces the caller's query exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: Vec<QueryParam>,
}

fn decode_component(input: &str) -> String {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

impl QueryParams {
    /// Parse a raw query string (without the leading `?`)
    pub fn parse(query: Option<&str>) -> Self {
        let params = query
            .unwrap_or_default()
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => QueryParam {
                    key: decode_component(key),
                    value: Some(decode_component(value)),
                    raw: pair.to_string(),
                },
                None => QueryParam {
                    key: decode_component(pair),
                    value: None,
                    raw: pair.to_string(),
                },
            })
            .collect();

        QueryParams { params }
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Whether `key` is present, with or without a value
    pub fn has(&self, key: &str) -> bool {
        self.params.iter().any(|p| p.key == key)
    }

    /// Decoded value of the first occurrence of `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.key == key)
            .and_then(|p| p.value.as_deref())
    }

    /// Copy with a bare `key` flag appended, unless already present
    pub fn with_flag(&self, key: &str) -> Self {
        let mut next = self.clone();
        if !next.has(key) {
            next.params.push(QueryParam {
                key: key.to_string(),
                value: None,
                raw: key.to_string(),
            });
        }
        next
    }

    /// Copy with every occurrence of `key` removed
    pub fn without(&self, key: &str) -> Self {
        QueryParams {
            params: self
                .params
                .iter()
                .filter(|p| p.key != key)
                .cloned()
                .collect(),
        }
    }

    /// Serialized form including the leading `?`, or `""` when empty
    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            return String::new();
        }
        let joined: Vec<&str> = self.params.iter().map(|p| p.raw.as_str()).collect();
        format!("?{}", joined.join("&"))
    }
}

/// Extra header attached to a redirect for diagnostics only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticHeader {
    pub name: String,
    pub value: String,
}

/// A single outgoing redirect
///
/// At most one is produced per request; producing one ends processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectDecision {
    /// Target URL (path, query and optional fragment)
    pub location: String,
    /// 301 or 302
    pub status: StatusCode,
    /// Optional diagnostic header
    pub diagnostic: Option<DiagnosticHeader>,
}

impl RedirectDecision {
    /// Identity-level canonicalization
    pub fn permanent(location: impl Into<String>) -> Self {
        RedirectDecision {
            location: location.into(),
            status: StatusCode::MOVED_PERMANENTLY,
            diagnostic: None,
        }
    }

    /// Convenience redirect that clients must not cache as canonical
    pub fn temporary(location: impl Into<String>) -> Self {
        RedirectDecision {
            location: location.into(),
            status: StatusCode::FOUND,
            diagnostic: None,
        }
    }

    pub fn with_diagnostic(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.diagnostic = Some(DiagnosticHeader {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn is_permanent(&self) -> bool {
        self.status == StatusCode::MOVED_PERMANENTLY
    }

    /// Build the HTTP response for this redirect
    pub fn to_response(&self) -> Result<Response<Full<Bytes>>> {
        let location = HeaderValue::from_str(&self.location).map_err(|e| {
            RouterError::InternalError(format!("Invalid redirect location: {}", e))
        })?;

        let mut builder = Response::builder()
            .status(self.status)
            .header(http::header::LOCATION, location);

        if let Some(diagnostic) = &self.diagnostic {
            let name = HeaderName::from_bytes(diagnostic.name.as_bytes()).map_err(|e| {
                RouterError::InternalError(format!("Invalid diagnostic header name: {}", e))
            })?;
            let value = HeaderValue::from_str(&diagnostic.value).map_err(|e| {
                RouterError::InternalError(format!("Invalid diagnostic header value: {}", e))
            })?;
            builder = builder.header(name, value);
        }

        Ok(builder.body(Full::new(Bytes::new()))?)
    }
}
