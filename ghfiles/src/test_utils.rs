//! Test utilities: configs pointing at a `wiremock` upstream and ready-made test servers.

use std::time::Duration;

use axum_test::TestServer;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::{Config, ContentEncoding, Token, UpstreamConfig};

pub fn create_test_upstream_config(api_url: &str) -> UpstreamConfig {
    UpstreamConfig {
        api_url: Url::parse(api_url).expect("Invalid test api url"),
        token: Token::new("ghp_test"),
        owner: "octocat".to_string(),
        repository: "my-docs".to_string(),
        folder: "uploads".to_string(),
        branch: None,
        content_encoding: ContentEncoding::Base64,
        timeout: Duration::from_secs(5),
        user_agent: "ghfiles-test".to_string(),
        max_pages: 10,
    }
}

/// A valid config whose upstream is `api_url`. Also installs the rustls provider so the
/// result can go straight into [`crate::Application::new`].
pub fn create_test_config(api_url: &str) -> Config {
    crate::install_crypto_provider();

    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        upstream: create_test_upstream_config(api_url),
        ..Default::default()
    }
}

pub fn create_test_app(api_url: &str) -> TestServer {
    crate::Application::new(create_test_config(api_url))
        .expect("Failed to create application")
        .into_test_server()
}

/// Mounts a successful contents `PUT` for `uploads/<name>`.
pub async fn mount_put_success(server: &MockServer, name: &str) {
    Mock::given(method("PUT"))
        .and(path(format!("/repos/octocat/my-docs/contents/uploads/{name}")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "content": {
                "name": name,
                "path": format!("uploads/{name}"),
                "html_url": format!("https://github.com/octocat/my-docs/blob/main/uploads/{name}"),
                "download_url": format!("https://raw.githubusercontent.com/octocat/my-docs/main/uploads/{name}")
            },
            "commit": { "message": format!("Upload {name}") }
        })))
        .mount(server)
        .await;
}
