//! DBpedia SPARQL client
//!
//! Queries the `dbp:genre` facts of a resource over the SPARQL 1.1 protocol
//! (HTTP GET, `query` parameter, JSON results). Identifiers are whitelisted
//! before they are placed in the query text.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use crate::types::{GenreFact, GenreFactFetcher, GenreQueryError};

const USER_AGENT: &str = concat!("fip-context/", env!("CARGO_PKG_VERSION"));
const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";
const QUERY_TIMEOUT_SECS: u64 = 30;
const RESOURCE_NAMESPACE: &str = "http://dbpedia.org/resource/";
const GENRE_LIMIT: u32 = 10;

/// SPARQL JSON results document (only the parts we read)
#[derive(Debug, Deserialize)]
struct SparqlResults {
    results: SparqlBindings,
}

#[derive(Debug, Deserialize)]
struct SparqlBindings {
    bindings: Vec<Binding>,
}

#[derive(Debug, Deserialize)]
struct Binding {
    value: Option<BoundTerm>,
}

#[derive(Debug, Deserialize)]
struct BoundTerm {
    value: String,
}

/// SPARQL-backed genre fetcher
pub struct DbpediaClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl DbpediaClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, GenreQueryError> {
        let endpoint = endpoint.into();
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(QUERY_TIMEOUT_SECS))
            .build()
            .map_err(|e| GenreQueryError {
                identifier: endpoint.clone(),
                reason: format!("client setup failed: {}", e),
            })?;

        Ok(Self {
            http_client,
            endpoint,
        })
    }

    /// Fetch the genre facts of one resource
    pub async fn genre_facts(&self, identifier: &str) -> Result<Vec<GenreFact>, GenreQueryError> {
        let safe = sanitize_resource_name(identifier);
        if safe.is_empty() {
            debug!(identifier = %identifier, "Identifier sanitized to nothing, skipping query");
            return Ok(Vec::new());
        }

        let query = genre_query(&safe);
        debug!(identifier = %identifier, resource = %safe, url = %self.endpoint, "Querying DBpedia");

        let fail = |reason: String| GenreQueryError {
            identifier: identifier.to_string(),
            reason,
        };

        let response = self
            .http_client
            .get(&self.endpoint)
            .header(reqwest::header::ACCEPT, SPARQL_RESULTS_JSON)
            .query(&[("query", query.as_str()), ("format", SPARQL_RESULTS_JSON)])
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("HTTP {}", status)));
        }

        let results: SparqlResults = response
            .json()
            .await
            .map_err(|e| fail(format!("unparsable results: {}", e)))?;

        let facts = results
            .results
            .bindings
            .into_iter()
            .filter_map(|binding| binding.value)
            .filter_map(|term| genre_label(&term.value))
            .map(|label| GenreFact {
                identifier: safe.clone(),
                label,
            })
            .collect::<Vec<_>>();

        debug!(identifier = %safe, genres = facts.len(), "DBpedia genres fetched");
        Ok(facts)
    }
}

#[async_trait]
impl GenreFactFetcher for DbpediaClient {
    async fn genres_for(&self, identifier: &str) -> Result<HashSet<String>, GenreQueryError> {
        let facts = self.genre_facts(identifier).await?;
        Ok(facts.into_iter().map(|fact| fact.label).collect())
    }
}

/// Keep only characters that are safe inside a resource IRI
///
/// Spaces become `_` first, so display names and resource names map to the
/// same resource. Allowed afterwards: ASCII letters and digits, Latin-1
/// letters (U+00C0-U+00D6, U+00D8-U+00F6, U+00F8-U+00FF) and `_ ( ) , . -`.
pub fn sanitize_resource_name(name: &str) -> String {
    name.chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| is_resource_char(*c))
        .collect()
}

fn is_resource_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '_' | '(' | ')' | ',' | '.' | '-')
        || ('\u{C0}'..='\u{D6}').contains(&c)
        || ('\u{D8}'..='\u{F6}').contains(&c)
        || ('\u{F8}'..='\u{FF}').contains(&c)
}

/// Genre query for an already-sanitized resource name
fn genre_query(safe_name: &str) -> String {
    format!(
        "PREFIX dbp: <http://dbpedia.org/property/>\n\
         SELECT ?property ?value WHERE {{\n\
         \x20 <{ns}{name}> ?property ?value .\n\
         \x20 FILTER (?property = dbp:genre)\n\
         }}\n\
         LIMIT {limit}",
        ns = RESOURCE_NAMESPACE,
        name = safe_name,
        limit = GENRE_LIMIT
    )
}

/// Last `/` segment of a genre URI; `None` when empty
fn genre_label(uri: &str) -> Option<String> {
    let label = uri.rsplit('/').next().unwrap_or_default();
    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}
