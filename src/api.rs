use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::descriptor::ImageDescriptor;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub expression: String,
    #[serde(default)]
    pub recursive: bool,
}

impl Default for Alias {
    fn default() -> Self {
        Self {
            expression: "true".to_string(),
            recursive: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHistory {
    pub expression: String,
    #[serde(default)]
    pub uses: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    expression: &'a str,
    record: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    items: Vec<ImageDescriptor>,
}

#[derive(Debug, Serialize)]
struct ReplaceTagRequest<'a> {
    expression: &'a str,
    tag: &'a str,
}

/// Typed HTTP client for the noir search service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ApiClient {
    /// Create a new client with the given endpoint and timeout.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, endpoint))
    }

    /// Create from an existing `reqwest::Client` (e.g. shared in tests).
    pub fn with_client(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url =
            Url::parse(&self.endpoint).map_err(|err| Error::InvalidUrl(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(format!("{} cannot be a base", self.endpoint)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── Search ────────────────────────────────────────────────────────────

    /// `POST /search`; `record` appends the expression to server-side history.
    pub async fn search(&self, expression: &str, record: bool) -> Result<Vec<ImageDescriptor>> {
        let resp = self
            .client
            .post(self.url(&["search"])?)
            .json(&SearchRequest { expression, record })
            .send()
            .await?;
        let result: SearchResult = parse_response(resp).await?;
        debug!(expression, count = result.items.len(), "search finished");
        Ok(result.items)
    }

    /// Raw bytes behind an image URL.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Status { status, body });
        }
        Ok(resp.bytes().await?.to_vec())
    }

    // ── Aliases ───────────────────────────────────────────────────────────

    pub async fn aliases(&self) -> Result<Vec<String>> {
        let resp = self.client.get(self.url(&["aliases"])?).send().await?;
        parse_response(resp).await
    }

    pub async fn alias(&self, name: &str) -> Result<Option<Alias>> {
        let resp = self.client.get(self.url(&["alias", name])?).send().await?;
        parse_response(resp).await
    }

    pub async fn update_alias(&self, name: &str, alias: &Alias) -> Result<Alias> {
        let resp = self
            .client
            .post(self.url(&["alias", name])?)
            .json(alias)
            .send()
            .await?;
        parse_response(resp).await
    }

    pub async fn delete_alias(&self, name: &str) -> Result<bool> {
        let resp = self
            .client
            .delete(self.url(&["alias", name])?)
            .send()
            .await?;
        parse_response(resp).await
    }

    // ── Tags ──────────────────────────────────────────────────────────────

    pub async fn tags(&self) -> Result<Vec<String>> {
        let resp = self.client.get(self.url(&["tags"])?).send().await?;
        parse_response(resp).await
    }

    pub async fn file_tags(&self, path: &str) -> Result<Vec<String>> {
        let mut url = self.url(&["file", "tags"])?;
        url.query_pairs_mut().append_pair("path", path);
        let resp = self.client.get(url).send().await?;
        parse_response(resp).await
    }

    /// Server-side rewrite of `expression` to select `tag`; `None` when the
    /// server has no rewrite for it.
    pub async fn replace_tag(&self, expression: &str, tag: &str) -> Result<Option<String>> {
        let resp = self
            .client
            .post(self.url(&["expression", "replace_tag"])?)
            .json(&ReplaceTagRequest { expression, tag })
            .send()
            .await?;
        parse_response(resp).await
    }

    /// Expression narrowed to `tag`, preferring the server's rewrite.
    pub async fn refine_with_tag(&self, expression: &str, tag: &str) -> Result<String> {
        Ok(self
            .replace_tag(expression, tag)
            .await?
            .unwrap_or_else(|| format!("#{tag} and {expression}")))
    }

    // ── History ───────────────────────────────────────────────────────────

    pub async fn history(&self) -> Result<Vec<SearchHistory>> {
        let resp = self.client.get(self.url(&["history"])?).send().await?;
        parse_response(resp).await
    }
}

/// Decode a JSON body, turning `{error: {code, message}}` into [`Error::Api`]
/// regardless of the HTTP status it arrived with.
async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await?;
    let value: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(_) if !status.is_success() => return Err(Error::Status { status, body }),
        Err(err) => return Err(err.into()),
    };
    if let Some(error) = value.get("error") {
        if let Ok(error) = serde_json::from_value::<ApiErrorBody>(error.clone()) {
            return Err(Error::Api {
                code: error.code,
                message: error.message,
            });
        }
    }
    if !status.is_success() {
        return Err(Error::Status { status, body });
    }
    Ok(serde_json::from_value(value)?)
}
