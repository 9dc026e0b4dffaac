//! HTTP API handlers for fip-context

pub mod current;
pub mod health;
pub mod history;

pub use current::current_routes;
pub use health::health_routes;
pub use history::history_routes;
