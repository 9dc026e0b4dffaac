//! End-to-end pipeline tests
//!
//! Real FIP, Wikipedia and DBpedia clients talk to a wiremock server that
//! plays all three upstreams; the router and an in-memory store complete the
//! service.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower::util::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request as MockRequest, ResponseTemplate};

use fip_context::db::SqliteSongStore;
use fip_context::services::{DbpediaClient, EnrichmentOrchestrator, FanOut, FipClient, WikiClient};
use fip_context::types::{IdentityResolver, Track, UpstreamError};
use fip_context::{build_router, AppState};

/// Genre table served by the fake SPARQL endpoint, keyed by resource name
const GENRES: &[(&str, &[&str])] = &[
    ("Miles_Davis", &["Jazz", "Bebop"]),
    ("John_Coltrane", &["Jazz", "Free_jazz"]),
    ("A", &["Rock"]),
    ("B", &["Rock", "Pop"]),
];

fn sparql_responder(request: &MockRequest) -> ResponseTemplate {
    let query = request
        .url
        .query_pairs()
        .find(|(k, _)| k == "query")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default();

    let bindings: Vec<Value> = GENRES
        .iter()
        .find(|(name, _)| query.contains(&format!("<http://dbpedia.org/resource/{}>", name)))
        .map(|(_, genres)| {
            genres
                .iter()
                .map(|g| {
                    json!({
                        "property": {"type": "uri", "value": "http://dbpedia.org/property/genre"},
                        "value": {"type": "uri", "value": format!("http://dbpedia.org/resource/{}", g)}
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    ResponseTemplate::new(200).set_body_json(json!({
        "head": {"vars": ["property", "value"]},
        "results": {"bindings": bindings}
    }))
}

async fn mount_wiki_title(server: &MockServer, name: &str, title: Option<&str>) {
    let titles: Vec<&str> = title.into_iter().collect();
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("search", name))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([name, titles, [], []])))
        .mount(server)
        .await;
}

async fn mount_live(server: &MockServer, title: &str, performers: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/api/live"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "now": {
                "firstLine": {"title": title},
                "song": {"interpreters": performers}
            }
        })))
        .mount(server)
        .await;
}

async fn upstreams() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .respond_with(sparql_responder)
        .mount(&server)
        .await;
    server
}

fn enricher(server: &MockServer) -> EnrichmentOrchestrator {
    let wiki = WikiClient::new(format!("{}/w/api.php", server.uri())).unwrap();
    let dbpedia = DbpediaClient::new(format!("{}/sparql", server.uri())).unwrap();
    EnrichmentOrchestrator::new(Arc::new(wiki), Arc::new(dbpedia), FanOut::unbounded())
}

async fn app(server: &MockServer) -> axum::Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    fip_common::db::create_schema(&pool).await.unwrap();

    let fip = FipClient::new(format!("{}/api", server.uri())).unwrap();
    let state = AppState::new(
        Arc::new(fip),
        Arc::new(enricher(server)),
        Arc::new(SqliteSongStore::new(pool)),
    );
    build_router(state)
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn sorted(value: &Value) -> Vec<String> {
    let mut items: Vec<String> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    items.sort();
    items
}

#[tokio::test]
async fn test_miles_davis_end_to_end() {
    let server = upstreams().await;
    mount_live(&server, "So What", &["Miles Davis"]).await;
    mount_wiki_title(&server, "Miles Davis", Some("Miles Davis")).await;

    let (status, body) = get_json(app(&server).await, "/current").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "So What");
    assert_eq!(sorted(&body["genres"]), vec!["Bebop", "Jazz"]);
}

#[tokio::test]
async fn test_two_performers_share_a_genre() {
    let server = upstreams().await;
    mount_live(&server, "Duet", &["A", "B"]).await;
    mount_wiki_title(&server, "A", Some("A")).await;
    mount_wiki_title(&server, "B", Some("B")).await;

    let (status, body) = get_json(app(&server).await, "/current").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(sorted(&body["genres"]), vec!["Pop", "Rock"]);
}

#[tokio::test]
async fn test_unknown_artist_fails_with_500() {
    let server = upstreams().await;
    mount_live(&server, "Mystery", &["Unknown Artist XYZ"]).await;
    mount_wiki_title(&server, "Unknown Artist XYZ", None).await;

    let (status, body) = get_json(app(&server).await, "/current").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn test_enrich_directly_with_real_clients() {
    let server = upstreams().await;
    mount_wiki_title(&server, "Miles Davis", Some("Miles Davis")).await;
    mount_wiki_title(&server, "John Coltrane", Some("John Coltrane")).await;

    let track = Track::new(
        "So What",
        vec!["Miles Davis".to_string(), "John Coltrane".to_string()],
    );
    let enriched = enricher(&server).enrich(track).await.unwrap();

    let genres: Vec<&str> = enriched.genres.iter().map(String::as_str).collect();
    assert_eq!(genres, vec!["Bebop", "Free_jazz", "Jazz"]);
}

#[tokio::test]
async fn test_one_missing_page_blocks_whole_enrichment() {
    let server = upstreams().await;
    mount_wiki_title(&server, "Miles Davis", Some("Miles Davis")).await;
    mount_wiki_title(&server, "Unknown Artist XYZ", None).await;

    let track = Track::new(
        "Mystery",
        vec!["Miles Davis".to_string(), "Unknown Artist XYZ".to_string()],
    );
    let err = enricher(&server).enrich(track).await.unwrap_err();

    match err {
        UpstreamError::Resolution(aggregate) => {
            assert_eq!(aggregate.failure_count(), 1);
            assert!(aggregate.failures()[0].error.is_not_found());
        }
        other => panic!("expected Resolution error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_wiki_outage_is_transport_not_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let wiki = WikiClient::new(format!("{}/w/api.php", server.uri())).unwrap();
    let err = wiki.resolve("Miles Davis").await.unwrap_err();

    assert!(!err.is_not_found());
}
