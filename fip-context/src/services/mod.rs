//! Upstream clients and the enrichment pipeline
//!
//! - **fip_client** - current song from the FIP live API
//! - **wiki_client** - performer name -> Wikipedia page identifier
//! - **dbpedia_client** - page identifier -> DBpedia genre labels
//! - **fan_out** - concurrent per-input execution with failure aggregation
//! - **enrichment** - resolve performers, then fetch and merge genres

pub mod dbpedia_client;
pub mod enrichment;
pub mod fan_out;
pub mod fip_client;
pub mod wiki_client;

pub use dbpedia_client::DbpediaClient;
pub use enrichment::EnrichmentOrchestrator;
pub use fan_out::{AggregateError, BranchFailure, FanOut, FanOutOutcome};
pub use fip_client::FipClient;
pub use wiki_client::WikiClient;
