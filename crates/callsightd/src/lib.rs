//! Callsight daemon - call analysis service.
//!
//! Hosts the analysis engine behind a small HTTP API: analyze a call, fetch
//! a persisted report, aggregate stats, health.

pub mod routes;
pub mod server;
