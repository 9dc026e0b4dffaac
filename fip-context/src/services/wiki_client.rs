//! Wikipedia opensearch client
//!
//! Resolves a performer display name to the title of its best-matching
//! Wikipedia page, in the underscore form DBpedia uses for resource names.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::types::{IdentityResolver, ResolveError};

const USER_AGENT: &str = concat!("fip-context/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Opensearch-backed identity resolver
pub struct WikiClient {
    http_client: reqwest::Client,
    api_url: String,
}

impl WikiClient {
    /// `api_url` is the `api.php` endpoint, e.g. `https://en.wikipedia.org/w/api.php`
    pub fn new(api_url: impl Into<String>) -> Result<Self, ResolveError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ResolveError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            api_url: api_url.into(),
        })
    }

    /// Look up the page title for `name` and convert it to an identifier
    pub async fn resolve_title(&self, name: &str) -> Result<String, ResolveError> {
        debug!(performer = %name, url = %self.api_url, "Querying Wikipedia opensearch");

        let response = self
            .http_client
            .get(&self.api_url)
            .query(&[
                ("action", "opensearch"),
                ("search", name),
                ("limit", "1"),
                ("namespace", "0"),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| ResolveError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Transport(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ResolveError::Transport(e.to_string()))?;

        let title = first_title(&body, name)?;
        let identifier = to_identifier(&title);
        debug!(performer = %name, identifier = %identifier, "Resolved performer");

        Ok(identifier)
    }
}

#[async_trait]
impl IdentityResolver for WikiClient {
    async fn resolve(&self, name: &str) -> Result<String, ResolveError> {
        self.resolve_title(name).await
    }
}

/// Extract `titles[0]` from an opensearch payload `[query, [titles], [descriptions], [urls]]`
fn first_title(body: &str, name: &str) -> Result<String, ResolveError> {
    let payload: Value = serde_json::from_str(body)
        .map_err(|e| ResolveError::BadResponse(format!("not JSON: {}", e)))?;

    let titles = payload
        .get(1)
        .and_then(Value::as_array)
        .ok_or_else(|| ResolveError::BadResponse("missing titles array".to_string()))?;

    match titles.first() {
        None => Err(ResolveError::NotFound {
            name: name.to_string(),
        }),
        Some(Value::String(title)) => Ok(title.clone()),
        Some(other) => Err(ResolveError::BadResponse(format!(
            "title is not a string: {}",
            other
        ))),
    }
}

/// Page title to URI-safe identifier
pub fn to_identifier(title: &str) -> String {
    title.replace(' ', "_")
}
