//! Rendering of resolved pages
//!
//! Markup is out of scope for the router; the default renderer serializes the
//! page as JSON so a front end can take it from there.

use crate::error::{Result, RouterError};
use crate::models::{ModuleRef, View};
use crate::page::PageResult;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Response, StatusCode};
use http_body_util::Full;
use serde::Serialize;

/// Everything the renderer gets for one page
#[derive(Debug, Clone, Serialize)]
pub struct RenderedPage {
    pub name: String,
    pub version: Option<String>,
    /// Requested sub-path, `/` for the module root
    pub path: String,
    pub view: View,
    pub page: PageResult,
}

impl RenderedPage {
    pub fn new(module: &ModuleRef, view: View, page: PageResult) -> Self {
        RenderedPage {
            name: module.name.clone(),
            version: module.version.clone(),
            path: module.upstream_path(),
            view,
            page,
        }
    }
}

/// Turns a resolved page into an HTTP response
pub trait PageRenderer: Send + Sync {
    fn render(&self, page: &RenderedPage) -> Result<Response<Full<Bytes>>>;
}

/// Renders pages as JSON documents
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

impl PageRenderer for JsonRenderer {
    fn render(&self, page: &RenderedPage) -> Result<Response<Full<Bytes>>> {
        let body = serde_json::to_vec(page)
            .map_err(|e| RouterError::InternalError(format!("Failed to serialize page: {}", e)))?;

        Ok(Response::builder()
            .status(page.page.http_status())
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Full::new(Bytes::from(body)))?)
    }
}

/// Plain-text response, used for raw-path errors and failures
pub fn plain_text(status: StatusCode, body: impl Into<String>) -> Result<Response<Full<Bytes>>> {
    Ok(Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(body.into())))?)
}
