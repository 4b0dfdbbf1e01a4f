//! Blocking client for a clinical practice's automation API.
//!
//! # Overview
//! `AutomationClient` turns domain operations (user stats, patients, agenda
//! sessions, financial summary, record creation) into HTTP calls under
//! `{base_url}/automation-api` and returns the decoded JSON. Requests and
//! responses cross a `Transport` seam as plain data, so everything above the
//! wire is testable without a server.
//!
//! # Design
//! - `ClientConfig` is fixed at construction: base URL, user id, timeout,
//!   cache settings.
//! - Operations come as `try_*` (explicit `Result`) and as lenient wrappers
//!   that log failures and return an empty object.
//! - `runner::run_automation` sequences the read operations into an
//!   `AutomationReport`; printing is left to the caller.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod runner;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use cache::CacheStats;
pub use client::AutomationClient;
pub use config::{CacheConfig, ClientConfig};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use runner::{run_automation, AutomationReport, DateRange, RunOptions, Step, StepOutcome};
pub use transport::{Transport, UreqTransport};
pub use types::{JsonObject, Listing, NewPatient, NewSession};
