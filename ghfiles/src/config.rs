//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The file path
//! defaults to `config.yaml` but can be specified via the `-f` flag or the `GHFILES_CONFIG`
//! environment variable. A missing file is not an error: every value has a default except the
//! upstream credentials.
//!
//! ## Loading Priority
//!
//! Sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Prefixed environment variables** - `GHFILES_` variables, with `__` for nesting
//! 3. **Plain environment variables** - `GITHUB_TOKEN`, `OWNER`, `REPO` and `PORT`
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Credentials and target repository
//! GITHUB_TOKEN=ghp_xxx
//! OWNER=octocat
//! REPO=my-docs
//! PORT=10000
//!
//! # Nested overrides
//! GHFILES_UPSTREAM__FOLDER=attachments
//! GHFILES_UPSTREAM__CONTENT_ENCODING=passthrough
//! GHFILES_CORS__ALLOW_CREDENTIALS=false
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use url::Url;

use crate::errors::Error;
use crate::upstream::path::validate_segment;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "GHFILES_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// Built once at startup and handed to the router through [`crate::AppState`]. Handlers never
/// consult the process environment themselves.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Largest accepted request body, in bytes
    pub max_body_bytes: usize,
    /// Upstream content API settings
    pub upstream: UpstreamConfig,
    /// CORS policy for browser clients
    pub cors: CorsConfig,
    /// Expose Prometheus HTTP metrics at `/internal/metrics`
    pub enable_metrics: bool,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// Where and how uploaded files are stored upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Base URL of the GitHub REST API
    pub api_url: Url,
    /// Bearer credential sent with every upstream call
    #[serde(skip_serializing)]
    pub token: Token,
    /// Account or organisation owning the repository
    pub owner: String,
    /// Repository holding the uploaded files
    pub repository: String,
    /// Folder inside the repository under which every file is stored
    pub folder: String,
    /// Branch to commit to and list from; the repository default branch when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// How `fileContent` is turned into the upstream `content` field
    pub content_encoding: ContentEncoding,
    /// Timeout applied to each upstream call
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// `User-Agent` header; GitHub rejects requests without one
    pub user_agent: String,
    /// Maximum number of listing pages followed through `Link` headers
    pub max_pages: usize,
}

/// Encoding contract for uploaded content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    /// `fileContent` is raw text; it is base64-encoded before being sent
    #[default]
    Base64,
    /// `fileContent` is already base64 and is forwarded untouched
    Passthrough,
}

/// Opaque upstream credential. Never printed.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Token(<unset>)")
        } else {
            f.write_str("Token(<redacted>)")
        }
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
            max_body_bytes: 10 * 1024 * 1024,
            upstream: UpstreamConfig::default(),
            cors: CorsConfig::default(),
            enable_metrics: false,
            enable_otel_export: false,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse("https://api.github.com").unwrap(),
            token: Token::default(),
            owner: String::new(),
            repository: String::new(),
            folder: "uploads".to_string(),
            branch: None,
            content_encoding: ContentEncoding::default(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("ghfiles/", env!("CARGO_PKG_VERSION")).to_string(),
            max_pages: 10,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            allow_credentials: false,
            max_age: Some(3600), // Cache preflight for 1 hour
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        let upstream = &self.upstream;

        if upstream.token.is_empty() {
            return Err(invalid(
                "upstream.token is not configured. Set GITHUB_TOKEN or GHFILES_UPSTREAM__TOKEN.",
            ));
        }
        if upstream.owner.trim().is_empty() {
            return Err(invalid("upstream.owner is not configured. Set OWNER or GHFILES_UPSTREAM__OWNER."));
        }
        if upstream.repository.trim().is_empty() {
            return Err(invalid(
                "upstream.repository is not configured. Set REPO or GHFILES_UPSTREAM__REPOSITORY.",
            ));
        }

        if upstream.folder.is_empty() {
            return Err(invalid("upstream.folder cannot be empty"));
        }
        for segment in upstream.folder.split('/') {
            validate_segment(segment).map_err(|e| invalid(&format!("upstream.folder '{}' is invalid: {e}", upstream.folder)))?;
        }

        if upstream.timeout.is_zero() {
            return Err(invalid("upstream.timeout must be greater than zero"));
        }
        if upstream.max_pages == 0 {
            return Err(invalid("upstream.max_pages must be at least 1"));
        }
        if upstream.user_agent.trim().is_empty() {
            return Err(invalid("upstream.user_agent cannot be empty"));
        }

        if self.cors.allowed_origins.is_empty() {
            return Err(invalid("cors.allowed_origins cannot be empty. Add at least one allowed origin."));
        }

        // Browsers refuse a wildcard origin on credentialed requests
        let has_wildcard = self
            .cors
            .allowed_origins
            .iter()
            .any(|origin| matches!(origin, CorsOrigin::Wildcard));
        if has_wildcard && self.cors.allow_credentials {
            return Err(invalid(
                "CORS cannot use wildcard origin '*' with allow_credentials=true. Specify explicit origins.",
            ));
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Prefixed overrides; GHFILES_CONFIG belongs to the CLI
            .merge(Env::prefixed("GHFILES_").ignore(&["config"]).split("__"))
            // The plain variable names deployments already export
            .merge(Env::raw().only(&["PORT"]))
            .merge(Env::raw().only(&["GITHUB_TOKEN"]).map(|_| "upstream.token".into()))
            .merge(Env::raw().only(&["OWNER"]).map(|_| "upstream.owner".into()))
            .merge(Env::raw().only(&["REPO"]).map(|_| "upstream.repository".into()))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn invalid(message: &str) -> Error {
    Error::Internal {
        operation: format!("validate config: {message}"),
    }
}
