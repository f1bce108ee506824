//! In-memory registry used by the integration tests
//!
//! Implements both upstream seams with call counters so tests can assert how
//! many upstream calls a request made.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, Request, Response};
use http_body_util::{BodyExt, Full};
use registry_router::content_source::RawContent;
use registry_router::page::{
    DirEntry, DirPage, EntryKind, FilePage, IndexItem, IndexPage, InvalidVersionPage,
    ModuleInfoPage, ModuleSummary, NoVersionsPage, NotFoundPage, ReadmeRef,
};
use registry_router::{
    ContentSource, MetadataGateway, ModuleHandler, PageOutcome, PageQuery, PageResult,
    Result, RouterConfig, RouterError, VersionList, View,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

#[derive(Debug, Clone, Default)]
pub struct FakeModule {
    /// Newest first
    pub versions: Vec<String>,
    /// version -> path -> content
    pub files: BTreeMap<String, BTreeMap<String, String>>,
    /// requested path -> canonical path
    pub canonical: BTreeMap<String, String>,
}

impl FakeModule {
    pub fn new(versions: &[&str]) -> Self {
        FakeModule {
            versions: versions.iter().map(|v| v.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn file(mut self, version: &str, path: &str, content: &str) -> Self {
        self.files
            .entry(version.to_string())
            .or_default()
            .insert(path.to_string(), content.to_string());
        self
    }

    pub fn canonical(mut self, from: &str, to: &str) -> Self {
        self.canonical.insert(from.to_string(), to.to_string());
        self
    }

    fn latest(&self) -> Option<&String> {
        self.versions.first()
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    modules: BTreeMap<String, FakeModule>,
    pub page_calls: AtomicUsize,
    pub version_list_calls: AtomicUsize,
    pub raw_calls: AtomicUsize,
    pub readme_calls: AtomicUsize,
    /// Fail every gateway call with an upstream error
    pub gateway_down: bool,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, name: &str, module: FakeModule) -> Self {
        self.modules.insert(name.to_string(), module);
        self
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn content_calls(&self) -> usize {
        self.version_list_calls.load(Ordering::SeqCst)
            + self.raw_calls.load(Ordering::SeqCst)
            + self.readme_calls.load(Ordering::SeqCst)
    }

    fn summary(name: &str, module: &FakeModule) -> ModuleSummary {
        ModuleSummary {
            latest_version: module.latest().cloned(),
            versions: module.versions.clone(),
            ..ModuleSummary::new(name)
        }
    }

    fn page_for(
        &self,
        query: &PageQuery,
        name: &str,
        module: &FakeModule,
        version: &str,
    ) -> PageResult {
        let path = query.module.upstream_path();
        let summary = Self::summary(name, module);
        let files = module.files.get(version).cloned().unwrap_or_default();

        if path == "/" && query.view == View::Info {
            return PageResult::ModuleInfo(ModuleInfoPage {
                module: summary,
                readme: files.contains_key("/README.md").then(|| ReadmeRef {
                    path: "/README.md".to_string(),
                }),
                readme_content: None,
            });
        }

        if files.contains_key(&path) {
            let documentable = path.ends_with(".ts") || path.ends_with(".js");
            if query.view == View::Doc && documentable {
                return PageResult::Index(IndexPage {
                    module: summary,
                    path: path.clone(),
                    items: vec![IndexItem {
                        path,
                        kind: EntryKind::File,
                        doc: None,
                    }],
                });
            }
            return PageResult::File(FilePage {
                module: summary,
                source_url: format!("https://cdn.test/{}/versions/{}/raw{}", name, version, path),
                size: files.get(&path).map(|c| c.len() as u64),
                highlight: documentable,
                path,
                content: None,
            });
        }

        let prefix = if path == "/" { "/".to_string() } else { format!("{}/", path) };
        let entries: Vec<DirEntry> = files
            .keys()
            .filter_map(|p| p.strip_prefix(&prefix))
            .map(|rest| DirEntry {
                name: rest.to_string(),
                kind: EntryKind::File,
                size: None,
                doc: None,
            })
            .collect();
        if !entries.is_empty() {
            return PageResult::Dir(DirPage {
                module: summary,
                path,
                entries,
            });
        }

        PageResult::NotFound(NotFoundPage {
            module: Some(summary),
            path: Some(path),
        })
    }
}

#[async_trait]
impl MetadataGateway for FakeRegistry {
    async fn fetch_page(&self, query: &PageQuery) -> Result<PageOutcome> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        if self.gateway_down {
            return Err(RouterError::UpstreamError("gateway unavailable".to_string()));
        }

        let name = query.module.name.as_str();
        let Some(module) = self.modules.get(name) else {
            return Ok(PageOutcome::NotExists);
        };

        let Some(latest) = module.latest() else {
            return Ok(PageOutcome::Success(PageResult::NoVersions(NoVersionsPage {
                name: name.to_string(),
            })));
        };

        let Some(version) = query.module.version.as_deref() else {
            return Ok(PageOutcome::ImplicitLatest(latest.clone()));
        };

        if !module.versions.iter().any(|v| v == version) {
            return Ok(PageOutcome::Success(PageResult::InvalidVersion(
                InvalidVersionPage {
                    module: Self::summary(name, module),
                },
            )));
        }

        if let Some(canonical) = module.canonical.get(&query.module.upstream_path()) {
            return Ok(PageOutcome::CanonicalPathRedirect(canonical.clone()));
        }

        Ok(PageOutcome::Success(self.page_for(query, name, module, version)))
    }
}

#[async_trait]
impl ContentSource for FakeRegistry {
    async fn fetch_version_list(&self, name: &str) -> Result<Option<VersionList>> {
        self.version_list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .modules
            .get(name)
            .map(|m| VersionList::new(m.latest().cloned(), m.versions.clone())))
    }

    async fn fetch_raw_content(
        &self,
        name: &str,
        version: &str,
        path: &str,
    ) -> Result<Option<RawContent>> {
        self.raw_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .modules
            .get(name)
            .and_then(|m| m.files.get(version))
            .and_then(|files| files.get(path))
            .map(|content| RawContent {
                bytes: Bytes::from(content.clone()),
                content_type: Some("application/typescript; charset=utf-8".to_string()),
            }))
    }

    async fn fetch_readme(&self, name: &str, version: &str, readme: &ReadmeRef) -> Result<String> {
        self.readme_calls.fetch_add(1, Ordering::SeqCst);
        self.modules
            .get(name)
            .and_then(|m| m.files.get(version))
            .and_then(|files| files.get(&readme.path))
            .cloned()
            .ok_or_else(|| RouterError::NotFound(readme.path.clone()))
    }
}

/// Registry with `oak` (two versions), `std` and `empty` (no versions)
pub fn sample_registry() -> FakeRegistry {
    FakeRegistry::new()
        .with_module(
            "oak",
            FakeModule::new(&["v12.6.0", "0.1.0"])
                .file("0.1.0", "/README.md", "# oak")
                .file("0.1.0", "/mod.ts", "export * from \"./application.ts\";")
                .file("v12.6.0", "/README.md", "# oak 12")
                .file("v12.6.0", "/mod.ts", "export * from \"./application.ts\";")
                .file("v12.6.0", "/examples/mod.ts", "export {};")
                .canonical("/examples", "/examples/mod.ts"),
        )
        .with_module(
            "std",
            FakeModule::new(&["0.200.0"])
                .file("0.200.0", "/fmt/testing.ts", "export {};")
                .file("0.200.0", "/fmt/colors.ts", "export {};"),
        )
        .with_module("empty", FakeModule::new(&[]))
}

pub fn handler_for(registry: Arc<FakeRegistry>) -> ModuleHandler {
    ModuleHandler::new(registry.clone(), registry, &RouterConfig::default())
}

pub fn get(uri: &str, accept: Option<&str>) -> Request<()> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(accept) = accept {
        builder = builder.header("accept", accept);
    }
    builder.body(()).unwrap()
}

pub fn location(response: &Response<Full<Bytes>>) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

pub async fn body_json(response: Response<Full<Bytes>>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Full<Bytes>>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
