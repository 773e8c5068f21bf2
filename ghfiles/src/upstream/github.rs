//! [`ContentStore`] backed by the GitHub REST "repository contents" API.

use anyhow::{Context, bail};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::{
    Client, Response,
    header::{ACCEPT, HeaderMap, HeaderName, HeaderValue, LINK},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{ContentStore, FolderEntry, StoredFile, UpstreamError, path::ContentPath};
use crate::config::{ContentEncoding, Token, UpstreamConfig};

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

#[derive(Serialize)]
struct PutFileRequest<'a> {
    message: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Deserialize)]
struct PutFileResponse {
    content: Option<ContentDescriptor>,
}

#[derive(Deserialize)]
struct ContentDescriptor {
    html_url: Option<String>,
}

pub struct GithubContents {
    client: Client,
    api_url: Url,
    token: Token,
    owner: String,
    repository: String,
    branch: Option<String>,
    content_encoding: ContentEncoding,
    max_pages: usize,
}

impl GithubContents {
    /// Builds the client. A rustls crypto provider must already be installed.
    pub fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        if config.api_url.cannot_be_a_base() {
            bail!("upstream.api_url '{}' cannot be used as a base URL", config.api_url);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_MEDIA_TYPE));
        headers.insert(
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static(GITHUB_API_VERSION),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .context("Failed to create upstream HTTP client")?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            token: config.token.clone(),
            owner: config.owner.clone(),
            repository: config.repository.clone(),
            branch: config.branch.clone(),
            content_encoding: config.content_encoding,
            max_pages: config.max_pages,
        })
    }

    /// `{api_url}/repos/{owner}/{repo}/contents/{segments...}`, each segment percent-encoded.
    fn contents_url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, UpstreamError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::Malformed(format!("api url {} cannot be a base", self.api_url)))?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repository.as_str(), "contents"])
            .extend(segments);
        Ok(url)
    }

    fn encode(&self, content: &str) -> String {
        match self.content_encoding {
            ContentEncoding::Base64 => STANDARD.encode(content.as_bytes()),
            ContentEncoding::Passthrough => content.to_string(),
        }
    }
}

/// Reads the body of a non-success response. JSON bodies are kept as-is, anything else is
/// carried as a string.
async fn failure(response: Response) -> UpstreamError {
    let status = response.status();
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => return UpstreamError::Transport(e),
    };
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    UpstreamError::Status { status, body }
}

/// Extracts the `rel="next"` target from RFC 8288 `Link` headers.
pub(crate) fn next_page_link(headers: &HeaderMap) -> Option<Url> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|link| {
            let mut parts = link.split(';');
            let target = parts.next()?.trim().strip_prefix('<')?.strip_suffix('>')?;
            let is_next = parts.any(|param| {
                let Some((name, value)) = param.split_once('=') else {
                    return false;
                };
                name.trim().eq_ignore_ascii_case("rel")
                    && value
                        .trim()
                        .trim_matches('"')
                        .split_ascii_whitespace()
                        .any(|rel| rel.eq_ignore_ascii_case("next"))
            });
            if is_next { Url::parse(target).ok() } else { None }
        })
}

#[async_trait]
impl ContentStore for GithubContents {
    #[instrument(skip_all, fields(path = %path))]
    async fn put_file(&self, path: &ContentPath, message: &str, content: &str) -> Result<StoredFile, UpstreamError> {
        let url = self.contents_url(path.segments())?;
        let encoded = self.encode(content);
        let body = PutFileRequest {
            message,
            content: &encoded,
            branch: self.branch.as_deref(),
        };

        debug!(%url, bytes = encoded.len(), "Writing file upstream");

        let response = self.client.put(url).bearer_auth(self.token.expose()).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        let body_text = response.text().await?;
        let parsed: PutFileResponse = serde_json::from_str(&body_text)
            .map_err(|e| UpstreamError::Malformed(format!("error decoding response body: {e}")))?;

        parsed
            .content
            .and_then(|content| content.html_url)
            .filter(|html_url| !html_url.is_empty())
            .map(|html_url| StoredFile { html_url })
            .ok_or_else(|| UpstreamError::Malformed("response has no content.html_url".to_string()))
    }

    #[instrument(skip(self))]
    async fn list_folder(&self, folder: &str) -> Result<Vec<FolderEntry>, UpstreamError> {
        let mut url = self.contents_url(folder.split('/'))?;
        if let Some(branch) = &self.branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }

        let mut entries = Vec::new();
        let mut next = Some(url);
        let mut pages = 0;

        while let Some(url) = next.take() {
            pages += 1;
            debug!(%url, page = pages, "Listing folder upstream");

            let response = self.client.get(url).bearer_auth(self.token.expose()).send().await?;

            if !response.status().is_success() {
                let err = failure(response).await;
                if let UpstreamError::Status { status, body } = &err {
                    warn!(%status, body = %body, "Upstream listing failed");
                }
                return Err(err);
            }

            next = next_page_link(response.headers());

            // The bearer token goes with every page, so never leave the API origin
            if let Some(link) = &next
                && link.origin() != self.api_url.origin()
            {
                warn!(%link, "Refusing to follow next link to a foreign origin");
                return Err(UpstreamError::Malformed(format!(
                    "next page link {link} is outside {}",
                    self.api_url.origin().ascii_serialization()
                )));
            }

            let body_text = response.text().await?;
            let page: Vec<FolderEntry> = serde_json::from_str(&body_text)
                .map_err(|e| UpstreamError::Malformed(format!("expected a JSON array of entries: {e}")))?;
            entries.extend(page);

            if next.is_some() && pages >= self.max_pages {
                warn!(pages, entries = entries.len(), "Listing truncated at max_pages");
                break;
            }
        }

        Ok(entries)
    }
}
