//! Page data enrichment
//!
//! Some pages need data the metadata gateway does not carry: the readme text
//! for the info view and the file content for the source view. Failures here
//! never fail the request; they degrade the page and are reported back.

use crate::content_source::ContentSource;
use crate::error::{RouterError, Result};
use crate::models::{ModuleRef, View};
use crate::page::{FileContent, FilePage, ModuleInfoPage, PageResult};
use std::sync::Arc;

/// What an enrichment step was trying to attach
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentTarget {
    Readme,
    FileContent,
}

impl EnrichmentTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrichmentTarget::Readme => "readme",
            EnrichmentTarget::FileContent => "file_content",
        }
    }
}

/// A recovered enrichment failure
#[derive(Debug, Clone)]
pub struct EnrichmentFailure {
    pub target: EnrichmentTarget,
    pub error: RouterError,
}

/// A page after enrichment, with the failure it recovered from, if any
#[derive(Debug, Clone)]
pub struct Enriched {
    pub page: PageResult,
    pub failure: Option<EnrichmentFailure>,
}

impl Enriched {
    fn unchanged(page: PageResult) -> Self {
        Enriched { page, failure: None }
    }
}

pub struct PageEnricher {
    content: Arc<dyn ContentSource>,
}

impl PageEnricher {
    pub fn new(content: Arc<dyn ContentSource>) -> Self {
        PageEnricher { content }
    }

    /// Attach view-specific data to `page`
    ///
    /// `module` must carry the concrete version the page was resolved for.
    pub async fn enrich(&self, module: &ModuleRef, view: View, page: PageResult) -> Enriched {
        let Some(version) = module.version.as_deref() else {
            return Enriched::unchanged(page);
        };

        match page {
            PageResult::ModuleInfo(info) if view == View::Info => {
                self.attach_readme(&module.name, version, info).await
            }
            PageResult::File(file) if view == View::Source => {
                self.attach_content(&module.name, version, file).await
            }
            page @ (PageResult::NoVersions(_)
            | PageResult::InvalidVersion(_)
            | PageResult::NotFound(_)
            | PageResult::Dir(_)
            | PageResult::File(_)
            | PageResult::Index(_)
            | PageResult::ModuleInfo(_)
            | PageResult::Symbol(_)) => Enriched::unchanged(page),
        }
    }

    async fn attach_readme(&self, name: &str, version: &str, mut info: ModuleInfoPage) -> Enriched {
        let Some(readme) = info.readme.clone() else {
            return Enriched::unchanged(PageResult::ModuleInfo(info));
        };

        let failure = match self.content.fetch_readme(name, version, &readme).await {
            Ok(text) => {
                info.readme_content = Some(text);
                None
            }
            Err(error) => Some(EnrichmentFailure {
                target: EnrichmentTarget::Readme,
                error,
            }),
        };

        Enriched {
            page: PageResult::ModuleInfo(info),
            failure,
        }
    }

    async fn attach_content(&self, name: &str, version: &str, mut file: FilePage) -> Enriched {
        let (content, failure) = match self.fetch_file(name, version, &file.path).await {
            Ok(bytes) => (FileContent::from_bytes(&bytes), None),
            Err(error) => (
                FileContent::Error(error.to_string()),
                Some(EnrichmentFailure {
                    target: EnrichmentTarget::FileContent,
                    error,
                }),
            ),
        };

        file.content = Some(content);
        Enriched {
            page: PageResult::File(file),
            failure,
        }
    }

    async fn fetch_file(&self, name: &str, version: &str, path: &str) -> Result<bytes::Bytes> {
        self.content
            .fetch_raw_content(name, version, path)
            .await?
            .map(|raw| raw.bytes)
            .ok_or_else(|| RouterError::NotFound(format!("file {}", path)))
    }
}
