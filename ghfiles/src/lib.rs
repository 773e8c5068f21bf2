//! # ghfiles: a small file facade over a GitHub repository
//!
//! `ghfiles` exposes two JSON endpoints that let clients store text files in, and list files
//! from, one folder of a GitHub repository. The repository, folder and credential are fixed by
//! configuration; callers only ever name a file.
//!
//! ## Request Flow
//!
//! `POST /upload` takes `{fileName, fileContent}`, validates both fields, and issues a single
//! `PUT` against the GitHub contents API for `<folder>/<fileName>` with the commit message
//! `Upload <fileName>`. The browsable URL of the stored file is returned as `fileUrl`.
//!
//! `GET /files` lists the folder (following `Link: rel="next"` pages up to a configured cap)
//! and projects each entry to `{name, downloadUrl}`, preserving the upstream order.
//!
//! Failures come in three kinds, see [`errors::Error`]: invalid input (400, upstream never
//! called), upstream rejections (status and body forwarded under `details`), and anything
//! else (500 with a fixed message, details only in the logs).
//!
//! ## Core Components
//!
//! - [`config`]: YAML + environment configuration via `figment`
//! - [`upstream`]: the [`upstream::ContentStore`] seam and its GitHub implementation
//! - [`api`]: handlers and wire models
//! - [`openapi`]: generated API documentation, served at `/api-docs`
//! - [`telemetry`]: `tracing` setup with optional OTLP export
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use ghfiles::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     ghfiles::install_crypto_provider();
//!
//!     let args = ghfiles::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     ghfiles::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     Application::new(config)?
//!         .serve(async {
//!             tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!         })
//!         .await
//! }
//! ```
pub mod api;
pub mod config;
pub mod errors;
pub mod openapi;
pub mod telemetry;
pub mod upstream;

#[cfg(test)]
mod test;
#[cfg(test)]
pub mod test_utils;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    response::Redirect,
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use config::{CorsConfig, CorsOrigin};
use openapi::ApiDoc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info};
use upstream::{ContentStore, github::GithubContents};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Where `GET /` sends callers.
pub const DOCS_PATH: &str = "/api-docs";

/// Installs the `aws-lc-rs` rustls provider as the process default.
///
/// `reqwest` is built without a bundled provider, so this must run before the first upstream
/// client is created. Calling it again is a no-op.
pub fn install_crypto_provider() {
    // Err only means a provider is already installed
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(Arc::new(config))
///     .store(Arc::new(GithubContents::new(&config.upstream)?))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ContentStore>,
}

/// Builds the CORS layer from configuration.
///
/// A `*` entry allows any origin. URL entries are reduced to their origin (`scheme://host[:port]`)
/// since that is what browsers send in the `Origin` header.
pub fn create_cors_layer(config: &CorsConfig) -> anyhow::Result<CorsLayer> {
    let wildcard = config.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard));
    if wildcard && config.allow_credentials {
        anyhow::bail!("CORS wildcard origin cannot be combined with allow_credentials");
    }

    let allow_origin = if wildcard {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(config.allow_credentials);

    if let Some(max_age) = config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router.
///
/// Routes: `/` (redirect to the docs), `/healthz`, `/upload`, `/files`, the Scalar UI at
/// `/api-docs` and its document at `/api-docs/openapi.json`. Prometheus metrics are mounted at
/// `/internal/metrics` when `enable_metrics` is set.
///
/// # Errors
///
/// Returns an error if the CORS configuration is unusable.
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let config = &state.config;

    let router = Router::new()
        .route("/", get(|| async { Redirect::temporary(DOCS_PATH) }))
        .route("/healthz", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .route("/upload", post(api::handlers::files::upload_file))
        .route("/files", get(api::handlers::files::list_files))
        .with_state(state.clone())
        .merge(Scalar::with_url(DOCS_PATH, ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(config.max_body_bytes));

    let mut router = router.layer(create_cors_layer(&config.cors)?);

    if config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Owns the router and configuration for the lifetime of the process.
///
/// 1. **Create**: [`Application::new`] builds the upstream client and the router
/// 2. **Serve**: [`Application::serve`] binds the listener and handles requests until the
///    shutdown future resolves, then flushes telemetry
pub struct Application {
    router: Router,
    config: Arc<Config>,
}

impl Application {
    /// Create an application talking to the GitHub API described by `config.upstream`.
    ///
    /// A rustls crypto provider must be installed first, see [`install_crypto_provider`].
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let store = GithubContents::new(&config.upstream)?;
        Self::with_store(config, Arc::new(store))
    }

    /// Create an application backed by an arbitrary [`ContentStore`].
    pub fn with_store(config: Config, store: Arc<dyn ContentStore>) -> anyhow::Result<Self> {
        debug!("Starting with configuration: {:#?}", config);

        let config = Arc::new(config);
        let state = AppState::builder().config(config.clone()).store(store).build();
        let router = build_router(&state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            folder = %self.config.upstream.folder,
            "Listening on http://{}, docs at http://localhost:{}{}",
            bind_addr, self.config.port, DOCS_PATH
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CorsConfig;
    use url::Url;

    #[test]
    fn test_cors_layer_rejects_wildcard_with_credentials() {
        let config = CorsConfig {
            allowed_origins: vec![CorsOrigin::Wildcard],
            allow_credentials: true,
            max_age: None,
        };
        assert!(create_cors_layer(&config).is_err());
    }

    #[test]
    fn test_cors_layer_accepts_url_origins_with_credentials() {
        let config = CorsConfig {
            allowed_origins: vec![
                CorsOrigin::Url(Url::parse("https://docs.example.com/").unwrap()),
                CorsOrigin::Url(Url::parse("http://localhost:3000").unwrap()),
            ],
            allow_credentials: true,
            max_age: Some(600),
        };
        assert!(create_cors_layer(&config).is_ok());
    }
}
