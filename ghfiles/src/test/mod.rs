//! End-to-end tests through the full router against a `wiremock` upstream.

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::CorsOrigin;
use crate::test_utils::{create_test_app, create_test_config, mount_put_success};

/// Uploads two files, then lists the folder the upstream reports back.
#[test_log::test(tokio::test)]
async fn test_e2e_upload_then_list() {
    let upstream = MockServer::start().await;
    mount_put_success(&upstream, "a.txt").await;
    mount_put_success(&upstream, "b.txt").await;
    Mock::given(method("GET"))
        .and(path("/repos/octocat/my-docs/contents/uploads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "a.txt", "type": "file", "html_url": "https://github.com/octocat/my-docs/blob/main/uploads/a.txt" },
            { "name": "b.txt", "type": "file", "html_url": "https://github.com/octocat/my-docs/blob/main/uploads/b.txt" }
        ])))
        .expect(1)
        .mount(&upstream)
        .await;

    let app = create_test_app(&upstream.uri());

    for name in ["a.txt", "b.txt"] {
        let response = app
            .post("/upload")
            .json(&json!({ "fileName": name, "fileContent": format!("contents of {name}") }))
            .await;
        response.assert_status_ok();
        assert_eq!(
            response.json::<Value>()["fileUrl"],
            format!("https://github.com/octocat/my-docs/blob/main/uploads/{name}")
        );
    }

    let response = app.get("/files").await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!([
            { "name": "a.txt", "downloadUrl": "https://github.com/octocat/my-docs/blob/main/uploads/a.txt" },
            { "name": "b.txt", "downloadUrl": "https://github.com/octocat/my-docs/blob/main/uploads/b.txt" }
        ])
    );

    let puts: Vec<_> = upstream
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.method.as_str() == "PUT")
        .collect();
    assert_eq!(puts.len(), 2);
}

/// Uploading the same name twice targets the same upstream path both times.
#[test_log::test(tokio::test)]
async fn test_e2e_repeated_upload_targets_same_path() {
    let upstream = MockServer::start().await;
    mount_put_success(&upstream, "notes.txt").await;
    let app = create_test_app(&upstream.uri());

    for content in ["first", "second"] {
        app.post("/upload")
            .json(&json!({ "fileName": "notes.txt", "fileContent": content }))
            .await
            .assert_status_ok();
    }

    let received = upstream.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].url.path(), received[1].url.path());
    assert_eq!(received[0].url.path(), "/repos/octocat/my-docs/contents/uploads/notes.txt");
}

#[test_log::test(tokio::test)]
async fn test_root_redirects_to_docs() {
    let upstream = MockServer::start().await;
    let app = create_test_app(&upstream.uri());

    let response = app.get("/").await;

    response.assert_status(StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.header("location"), "/api-docs");
}

#[test_log::test(tokio::test)]
async fn test_healthz() {
    let upstream = MockServer::start().await;
    let app = create_test_app(&upstream.uri());

    let response = app.get("/healthz").await;

    response.assert_status_ok();
    assert_eq!(response.text(), "OK");
}

#[test_log::test(tokio::test)]
async fn test_openapi_document_is_served() {
    let upstream = MockServer::start().await;
    let app = create_test_app(&upstream.uri());

    let response = app.get("/api-docs/openapi.json").await;

    response.assert_status_ok();
    let doc: Value = response.json();
    assert_eq!(doc["info"]["title"], "GitHub File Upload API");
    assert!(doc["paths"]["/upload"]["post"].is_object());
    assert!(doc["paths"]["/files"]["get"].is_object());
}

#[test_log::test(tokio::test)]
async fn test_docs_ui_is_served() {
    let upstream = MockServer::start().await;
    let app = create_test_app(&upstream.uri());

    let response = app.get("/api-docs").await;

    response.assert_status_ok();
    let content_type = response.header("content-type");
    assert!(content_type.to_str().unwrap().starts_with("text/html"));
}

#[test_log::test(tokio::test)]
async fn test_unknown_route_is_not_found() {
    let upstream = MockServer::start().await;
    let app = create_test_app(&upstream.uri());

    app.get("/upload/notes.txt").await.assert_status(StatusCode::NOT_FOUND);
    // Metrics are off unless enabled
    app.get("/internal/metrics").await.assert_status(StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
async fn test_cors_preflight_allows_any_origin_by_default() {
    let upstream = MockServer::start().await;
    let app = create_test_app(&upstream.uri());

    let response = app
        .method(Method::OPTIONS, "/upload")
        .add_header("origin", "https://somewhere.example.com")
        .add_header("access-control-request-method", "POST")
        .add_header("access-control-request-headers", "content-type")
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("access-control-allow-origin"), "*");
    assert_eq!(response.header("access-control-max-age"), "3600");
    let methods = response.header("access-control-allow-methods");
    assert!(methods.to_str().unwrap().contains("POST"));
}

#[test_log::test(tokio::test)]
async fn test_cors_restricted_origins() {
    let upstream = MockServer::start().await;
    let mut config = create_test_config(&upstream.uri());
    config.cors.allowed_origins = vec![CorsOrigin::Url(Url::parse("https://docs.example.com/").unwrap())];
    config.cors.allow_credentials = true;
    let app = crate::Application::new(config).unwrap().into_test_server();

    let allowed = app.get("/healthz").add_header("origin", "https://docs.example.com").await;
    assert_eq!(allowed.header("access-control-allow-origin"), "https://docs.example.com");
    assert_eq!(allowed.header("access-control-allow-credentials"), "true");

    let denied = app.get("/healthz").add_header("origin", "https://evil.example.com").await;
    assert!(denied.maybe_header("access-control-allow-origin").is_none());
}

/// The Prometheus recorder is process-global, so this is the only test that enables metrics.
#[test_log::test(tokio::test)]
async fn test_metrics_endpoint_when_enabled() {
    let upstream = MockServer::start().await;
    let mut config = create_test_config(&upstream.uri());
    config.enable_metrics = true;
    let app = crate::Application::new(config).unwrap().into_test_server();

    app.get("/healthz").await.assert_status_ok();

    let response = app.get("/internal/metrics").await;
    response.assert_status_ok();
    let metrics = response.text();
    assert!(metrics.contains("# TYPE") || metrics.contains("# HELP"), "unexpected metrics output: {metrics}");
}
