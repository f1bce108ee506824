//! HTTP gateway and content source against a mock upstream

use registry_router::page::ReadmeRef;
use registry_router::{
    ContentSource, HttpContentSource, HttpMetadataGateway, MetadataGateway, ModuleRef,
    PageOutcome, PageQuery, PageResult, RouterError, View,
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn query(view: View, name: &str, version: Option<&str>, sub_path: &[&str]) -> PageQuery {
    let module =
        ModuleRef::new(name, version.map(str::to_string), sub_path.iter().copied()).unwrap();
    PageQuery::new(view, module, None)
}

// ============================================================================
// Metadata gateway
// ============================================================================

#[tokio::test]
async fn test_gateway_404_is_not_exists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/pages/mod/doc/missing/1.0.0/mod.ts"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpMetadataGateway::new(&server.uri()).unwrap();
    let outcome = gateway
        .fetch_page(&query(View::Doc, "missing", Some("1.0.0"), &["mod.ts"]))
        .await
        .unwrap();
    assert_eq!(outcome, PageOutcome::NotExists);
}

#[tokio::test]
async fn test_gateway_302_is_implicit_latest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/pages/mod/info/oak/__latest__/"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "/v2/pages/mod/info/oak/v12.6.0/"),
        )
        .mount(&server)
        .await;

    let gateway = HttpMetadataGateway::new(&server.uri()).unwrap();
    let outcome = gateway
        .fetch_page(&query(View::Info, "oak", None, &[]))
        .await
        .unwrap();
    assert_eq!(outcome, PageOutcome::ImplicitLatest("v12.6.0".to_string()));
}

#[tokio::test]
async fn test_gateway_302_for_versioned_request_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/pages/mod/info/oak/v1.0.0/"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "/v2/pages/mod/info/oak/v12.6.0/"),
        )
        .mount(&server)
        .await;

    let gateway = HttpMetadataGateway::new(&server.uri()).unwrap();
    let result = gateway
        .fetch_page(&query(View::Info, "oak", Some("v1.0.0"), &[]))
        .await;
    assert!(matches!(result, Err(RouterError::UpstreamStatus { status: 302, .. })));
}

#[tokio::test]
async fn test_gateway_301_is_canonical_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/pages/mod/doc/oak/v12.6.0/examples"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", "/v2/pages/mod/doc/oak/v12.6.0/examples/mod.ts"),
        )
        .mount(&server)
        .await;

    let gateway = HttpMetadataGateway::new(&server.uri()).unwrap();
    let outcome = gateway
        .fetch_page(&query(View::Doc, "oak", Some("v12.6.0"), &["examples"]))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        PageOutcome::CanonicalPathRedirect("/examples/mod.ts".to_string())
    );
}

#[tokio::test]
async fn test_gateway_200_decodes_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/pages/mod/source/oak/v12.6.0/mod.ts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "file",
            "module": { "name": "oak", "latest_version": "v12.6.0" },
            "path": "/mod.ts",
            "source_url": "https://cdn.deno.land/oak/versions/v12.6.0/raw/mod.ts",
            "size": 42,
            "highlight": true
        })))
        .mount(&server)
        .await;

    let gateway = HttpMetadataGateway::new(&server.uri()).unwrap();
    let outcome = gateway
        .fetch_page(&query(View::Source, "oak", Some("v12.6.0"), &["mod.ts"]))
        .await
        .unwrap();
    match outcome {
        PageOutcome::Success(PageResult::File(file)) => {
            assert_eq!(file.path, "/mod.ts");
            assert_eq!(file.size, Some(42));
        }
        other => panic!("expected file page, got {:?}", other),
    }
}

#[tokio::test]
async fn test_gateway_passes_symbol() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/pages/mod/doc/oak/v12.6.0/mod.ts"))
        .and(query_param("symbol", "Application"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "symbol",
            "module": { "name": "oak" },
            "path": "/mod.ts",
            "symbol": "Application",
            "doc_nodes": [{ "name": "Application", "kind": "class" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpMetadataGateway::new(&server.uri()).unwrap();
    let module = ModuleRef::new("oak", Some("v12.6.0".to_string()), ["mod.ts"]).unwrap();
    let page_query = PageQuery::new(View::Doc, module, Some("Application".to_string()));
    let outcome = gateway.fetch_page(&page_query).await.unwrap();
    assert_eq!(outcome.kind_name(), "symbol");
}

#[tokio::test]
async fn test_gateway_5xx_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let gateway = HttpMetadataGateway::new(&server.uri()).unwrap();
    let result = gateway
        .fetch_page(&query(View::Doc, "oak", Some("v12.6.0"), &["mod.ts"]))
        .await;
    let err = result.unwrap_err();
    assert!(err.is_upstream_failure());
    assert_eq!(err.to_http_status(), 502);
}

#[tokio::test]
async fn test_gateway_garbage_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let gateway = HttpMetadataGateway::new(&server.uri()).unwrap();
    let result = gateway
        .fetch_page(&query(View::Doc, "oak", Some("v12.6.0"), &["mod.ts"]))
        .await;
    assert!(matches!(result, Err(RouterError::ParseError(_))));
}

#[tokio::test]
async fn test_gateway_connection_refused() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let gateway = HttpMetadataGateway::new(&format!("http://127.0.0.1:{}", port)).unwrap();
    let result = gateway
        .fetch_page(&query(View::Doc, "oak", Some("v12.6.0"), &["mod.ts"]))
        .await;
    assert!(matches!(result, Err(RouterError::UpstreamError(_))));
}

// ============================================================================
// Content source
// ============================================================================

#[tokio::test]
async fn test_content_version_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oak/meta/versions.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latest": "v12.6.0",
            "versions": ["v12.6.0", "v12.5.0"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = HttpContentSource::new(&server.uri()).unwrap();
    let list = source.fetch_version_list("oak").await.unwrap().unwrap();
    assert_eq!(list.latest.as_deref(), Some("v12.6.0"));
    assert_eq!(list.all.len(), 2);
}

#[tokio::test]
async fn test_content_403_and_404_mean_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/nope/meta/versions.json"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oak/versions/v1.0.0/raw/missing.ts"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let source = HttpContentSource::new(&server.uri()).unwrap();
    assert!(source.fetch_version_list("nope").await.unwrap().is_none());
    assert!(source
        .fetch_raw_content("oak", "v1.0.0", "/missing.ts")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_content_raw_bytes_keep_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oak/versions/v12.6.0/raw/mod.ts"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("export {};", "application/typescript; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let source = HttpContentSource::new(&server.uri()).unwrap();
    let raw = source
        .fetch_raw_content("oak", "v12.6.0", "/mod.ts")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&raw.bytes[..], b"export {};");
    assert_eq!(
        raw.content_type.as_deref(),
        Some("application/typescript; charset=utf-8")
    );
}

#[tokio::test]
async fn test_content_readme() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oak/versions/v12.6.0/raw/README.md"))
        .respond_with(ResponseTemplate::new(200).set_body_string("# oak"))
        .mount(&server)
        .await;

    let source = HttpContentSource::new(&server.uri()).unwrap();
    let readme = ReadmeRef {
        path: "/README.md".to_string(),
    };
    assert_eq!(
        source.fetch_readme("oak", "v12.6.0", &readme).await.unwrap(),
        "# oak"
    );

    let missing = ReadmeRef {
        path: "/MISSING.md".to_string(),
    };
    let err = source.fetch_readme("oak", "v12.6.0", &missing).await.unwrap_err();
    assert!(matches!(err, RouterError::NotFound(_)));
}

#[tokio::test]
async fn test_content_unexpected_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let source = HttpContentSource::new(&server.uri()).unwrap();
    let result = source.fetch_version_list("oak").await;
    assert!(matches!(result, Err(RouterError::UpstreamStatus { status: 500, .. })));
}
