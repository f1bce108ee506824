//! Raw content fast path
//!
//! Serves literal file bytes to tools (the highest-volume traffic class). It
//! never looks up page metadata and never renders, and every request costs
//! exactly one upstream call: a version list when no version was given, a
//! content fetch otherwise.

use crate::config::RouterConfig;
use crate::content_source::ContentSource;
use crate::error::Result;
use crate::models::{ModuleRef, QueryParams, RedirectDecision};
use crate::render::plain_text;
use bytes::Bytes;
use http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use http::{HeaderValue, Response, StatusCode};
use http_body_util::Full;
use std::sync::Arc;
use tracing::debug;

/// How the fast path answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawOutcome {
    /// 302 to the latest version
    ImplicitLatestRedirect,
    /// 200 with the file bytes
    Content,
    /// Module has no version list
    ModuleNotFound,
    /// Module exists but has no latest version
    NoLatestVersion,
    /// Version exists but the file does not
    FileNotFound,
}

impl RawOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RawOutcome::ImplicitLatestRedirect => "implicit_latest_redirect",
            RawOutcome::Content => "content",
            RawOutcome::ModuleNotFound => "module_not_found",
            RawOutcome::NoLatestVersion => "no_latest_version",
            RawOutcome::FileNotFound => "file_not_found",
        }
    }
}

/// Response produced by the fast path, labelled with how it was produced
#[derive(Debug)]
pub struct RawReply {
    pub outcome: RawOutcome,
    pub response: Response<Full<Bytes>>,
}

/// Handler for raw byte requests
pub struct RawContentHandler {
    content: Arc<dyn ContentSource>,
    warning_header: String,
    public_origin: String,
}

fn allow_any_origin(mut response: Response<Full<Bytes>>) -> Response<Full<Bytes>> {
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

impl RawContentHandler {
    pub fn new(
        content: Arc<dyn ContentSource>,
        warning_header: impl Into<String>,
        public_origin: impl Into<String>,
    ) -> Self {
        RawContentHandler {
            content,
            warning_header: warning_header.into(),
            public_origin: public_origin.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(content: Arc<dyn ContentSource>, config: &RouterConfig) -> Self {
        Self::new(content, &config.warning_header, &config.public_origin)
    }

    /// Serve `module` as raw bytes, or redirect a versionless request
    ///
    /// A redirect keeps `query`; content is served regardless of it.
    pub async fn serve_raw(&self, module: &ModuleRef, query: &QueryParams) -> Result<RawReply> {
        let reply = match module.version.as_deref() {
            None => self.redirect_to_latest(module, query).await?,
            Some(version) => self.serve_content(module, version).await?,
        };

        Ok(RawReply {
            outcome: reply.outcome,
            response: allow_any_origin(reply.response),
        })
    }

    async fn redirect_to_latest(
        &self,
        module: &ModuleRef,
        query: &QueryParams,
    ) -> Result<RawReply> {
        let Some(versions) = self.content.fetch_version_list(&module.name).await? else {
            return Ok(RawReply {
                outcome: RawOutcome::ModuleNotFound,
                response: plain_text(StatusCode::NOT_FOUND, "404 module not found")?,
            });
        };

        let Some(latest) = versions.latest.filter(|v| !v.is_empty()) else {
            return Ok(RawReply {
                outcome: RawOutcome::NoLatestVersion,
                response: plain_text(StatusCode::NOT_FOUND, "404 no versions found")?,
            });
        };

        let target = module.with_version(latest.as_str()).url_path();
        let warning = format!(
            "Implicitly using latest version ({}) for {}{}",
            latest, self.public_origin, target
        );
        debug!(
            "Raw request without version: module={}, latest={}",
            module.name, latest
        );

        let location = format!("{}{}", target, query.to_query_string());
        let decision =
            RedirectDecision::temporary(location).with_diagnostic(&self.warning_header, warning);
        Ok(RawReply {
            outcome: RawOutcome::ImplicitLatestRedirect,
            response: decision.to_response()?,
        })
    }

    async fn serve_content(&self, module: &ModuleRef, version: &str) -> Result<RawReply> {
        let path = module.upstream_path();
        let Some(raw) = self
            .content
            .fetch_raw_content(&module.name, version, &path)
            .await?
        else {
            return Ok(RawReply {
                outcome: RawOutcome::FileNotFound,
                response: plain_text(StatusCode::NOT_FOUND, "404 file not found")?,
            });
        };

        let mut builder = Response::builder().status(StatusCode::OK);
        if let Some(content_type) = raw
            .content_type
            .as_deref()
            .and_then(|ct| HeaderValue::from_str(ct).ok())
        {
            builder = builder.header(CONTENT_TYPE, content_type);
        }

        Ok(RawReply {
            outcome: RawOutcome::Content,
            response: builder.body(Full::new(raw.bytes))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_source::RawContent;
    use crate::models::VersionList;
    use crate::error::RouterError;
    use crate::page::ReadmeRef;
    use async_trait::async_trait;

    struct StaticSource {
        versions: Option<VersionList>,
        file: Option<RawContent>,
    }

    #[async_trait]
    impl ContentSource for StaticSource {
        async fn fetch_version_list(&self, _name: &str) -> Result<Option<VersionList>> {
            Ok(self.versions.clone())
        }

        async fn fetch_raw_content(
            &self,
            _name: &str,
            _version: &str,
            _path: &str,
        ) -> Result<Option<RawContent>> {
            Ok(self.file.clone())
        }

        async fn fetch_readme(&self, _: &str, _: &str, readme: &ReadmeRef) -> Result<String> {
            Err(RouterError::NotFound(readme.path.clone()))
        }
    }

    fn handler(versions: Option<VersionList>, file: Option<RawContent>) -> RawContentHandler {
        RawContentHandler::new(
            Arc::new(StaticSource { versions, file }),
            "x-deno-warning",
            "https://deno.land/",
        )
    }

    fn module(version: Option<&str>) -> ModuleRef {
        ModuleRef::new("oak", version.map(str::to_string), ["mod.ts"]).unwrap()
    }

    #[tokio::test]
    async fn test_versionless_redirects_with_warning() {
        let handler = handler(
            Some(VersionList::new(Some("v12.6.0".into()), vec!["v12.6.0".into()])),
            None,
        );
        let reply = handler.serve_raw(&module(None), &QueryParams::default()).await.unwrap();
        assert_eq!(reply.outcome, RawOutcome::ImplicitLatestRedirect);
        assert_eq!(reply.response.status(), StatusCode::FOUND);
        assert_eq!(
            reply.response.headers().get("location").unwrap(),
            "/x/oak@v12.6.0/mod.ts"
        );
        assert_eq!(
            reply.response.headers().get("x-deno-warning").unwrap(),
            "Implicitly using latest version (v12.6.0) for https://deno.land/x/oak@v12.6.0/mod.ts"
        );
        assert_eq!(
            reply.response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_versionless_redirect_keeps_query() {
        let handler = handler(
            Some(VersionList::new(Some("v12.6.0".into()), vec!["v12.6.0".into()])),
            None,
        );
        let query = QueryParams::parse(Some("target=deno"));
        let reply = handler.serve_raw(&module(None), &query).await.unwrap();
        assert_eq!(
            reply.response.headers().get("location").unwrap(),
            "/x/oak@v12.6.0/mod.ts?target=deno"
        );
        // the warning names the version-qualified file, not the query
        assert_eq!(
            reply.response.headers().get("x-deno-warning").unwrap(),
            "Implicitly using latest version (v12.6.0) for https://deno.land/x/oak@v12.6.0/mod.ts"
        );
    }

    #[tokio::test]
    async fn test_unknown_module_is_404() {
        let handler = handler(None, None);
        let reply = handler.serve_raw(&module(None), &QueryParams::default()).await.unwrap();
        assert_eq!(reply.outcome, RawOutcome::ModuleNotFound);
        assert_eq!(reply.response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_module_without_latest_is_404() {
        let handler = handler(Some(VersionList::new(None, vec![])), None);
        let reply = handler.serve_raw(&module(None), &QueryParams::default()).await.unwrap();
        assert_eq!(reply.outcome, RawOutcome::NoLatestVersion);
        assert_eq!(reply.response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_content_passes_through_with_type() {
        let handler = handler(
            None,
            Some(RawContent {
                bytes: Bytes::from_static(b"export const x = 1;"),
                content_type: Some("application/typescript; charset=utf-8".into()),
            }),
        );
        let reply = handler
            .serve_raw(&module(Some("v12.6.0")), &QueryParams::default())
            .await
            .unwrap();
        assert_eq!(reply.outcome, RawOutcome::Content);
        assert_eq!(reply.response.status(), StatusCode::OK);
        assert_eq!(
            reply.response.headers().get("content-type").unwrap(),
            "application/typescript; charset=utf-8"
        );
        assert!(reply.response.headers().get("x-deno-warning").is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let handler = handler(None, None);
        let reply = handler
            .serve_raw(&module(Some("v12.6.0")), &QueryParams::default())
            .await
            .unwrap();
        assert_eq!(reply.outcome, RawOutcome::FileNotFound);
        assert_eq!(reply.response.status(), StatusCode::NOT_FOUND);
    }
}
