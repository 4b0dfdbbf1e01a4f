//! Blocking client for the automation API.
//!
//! # Design
//! `AutomationClient` owns an immutable `ClientConfig`, a `Transport` and an
//! optional GET cache. Every call is independent: build an `HttpRequest`,
//! hand it to the transport, interpret the `HttpResponse`.
//!
//! Each operation comes in two forms. `try_*` returns `Result<Value, ApiError>`
//! so callers can tell a missing patient from an unreachable server. The
//! plain form logs the failure and returns an empty JSON object, for callers
//! that only want whatever data is available.

use std::sync::{Mutex, MutexGuard};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::cache::{CacheStats, ResponseCache};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{prepare_payload, JsonObject, REQUIRED_PATIENT_FIELDS, REQUIRED_SESSION_FIELDS};

/// Everything but RFC 3986 unreserved characters is escaped inside a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Client bound to one service and one user for its whole lifetime.
pub struct AutomationClient<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
    cache: Mutex<ResponseCache>,
}

impl AutomationClient<UreqTransport> {
    /// Builds a client that talks to the network through a pooled agent.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let transport = UreqTransport::new(config.timeout);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> AutomationClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, ApiError> {
        config.validate()?;
        let cache = Mutex::new(ResponseCache::new(config.cache.clone()));
        Ok(Self {
            config,
            transport,
            cache,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ------------------------------------------------------------------
    // Request executor
    // ------------------------------------------------------------------

    /// Executes `method` against `endpoint` (relative to the API prefix).
    ///
    /// Unsupported methods fail with `ApiError::UnsupportedMethod` before the
    /// transport is called.
    pub fn request(
        &self,
        method: &str,
        endpoint: &str,
        body: Option<&JsonObject>,
        query: &[(&str, &str)],
    ) -> Result<Value, ApiError> {
        let method: HttpMethod = method.parse()?;
        self.execute(method, endpoint, body, query)
    }

    pub fn execute(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<&JsonObject>,
        query: &[(&str, &str)],
    ) -> Result<Value, ApiError> {
        let request = self.build_request(method, endpoint, body, query)?;
        let cacheable = method == HttpMethod::Get;
        let key = request.cache_key();

        if cacheable {
            if let Some(hit) = self.cache().get(&key) {
                debug!(url = %request.url, "cache hit");
                return Ok(hit);
            }
        }

        debug!(method = %request.method, path = request.path(), query = ?request.query, "sending request");
        let response = self.transport.execute(&request)?;
        debug!(status = response.status, path = request.path(), "received response");
        let value = parse_response(response)?;

        if cacheable {
            self.cache().insert(key, value.clone());
        }
        Ok(value)
    }

    pub fn build_request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<&JsonObject>,
        query: &[(&str, &str)],
    ) -> Result<HttpRequest, ApiError> {
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method,
            url: format!("{}{}", self.config.api_root(), endpoint),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            headers: self.config.default_headers(),
            body,
        })
    }

    // ------------------------------------------------------------------
    // Cache
    // ------------------------------------------------------------------

    pub fn cache_stats(&self) -> CacheStats {
        self.cache().stats()
    }

    pub fn clear_cache(&self) {
        self.cache().clear();
        debug!("response cache cleared");
    }

    fn cache(&self) -> MutexGuard<'_, ResponseCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ------------------------------------------------------------------
    // Operations, fallible form
    // ------------------------------------------------------------------

    pub fn try_ping(&self) -> Result<Value, ApiError> {
        self.execute(HttpMethod::Get, "/ping", None, &[])
    }

    pub fn try_health(&self) -> Result<Value, ApiError> {
        self.execute(HttpMethod::Get, "/health", None, &[])
    }

    pub fn try_get_user_stats(&self) -> Result<Value, ApiError> {
        self.execute(HttpMethod::Get, &self.user_path("/stats"), None, &[])
    }

    pub fn try_get_patients(&self) -> Result<Value, ApiError> {
        self.execute(HttpMethod::Get, &self.user_path("/patients"), None, &[])
    }

    pub fn try_get_patient_by_id(&self, patient_id: &str) -> Result<Value, ApiError> {
        let patient_id = require_id(patient_id, "patient")?;
        let endpoint = self.user_path(&format!("/patient/{}", encode_segment(patient_id)));
        self.execute(HttpMethod::Get, &endpoint, None, &[])
    }

    /// Lists sessions. Filters are sent only when given and non-empty; dates
    /// are passed through as `YYYY-MM-DD` strings without validation.
    pub fn try_get_sessions(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
        patient_id: Option<&str>,
    ) -> Result<Value, ApiError> {
        let query = query_pairs(&[
            ("startDate", start_date),
            ("endDate", end_date),
            ("patientId", patient_id),
        ]);
        self.execute(HttpMethod::Get, &self.user_path("/agenda-sessions"), None, &query)
    }

    pub fn try_get_sessions_by_patient(&self, patient_id: &str) -> Result<Value, ApiError> {
        let patient_id = require_id(patient_id, "patient")?;
        let endpoint = self.user_path(&format!(
            "/patient/{}/agenda-sessions",
            encode_segment(patient_id)
        ));
        self.execute(HttpMethod::Get, &endpoint, None, &[])
    }

    pub fn try_get_financial_info(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Value, ApiError> {
        let query = query_pairs(&[("startDate", start_date), ("endDate", end_date)]);
        self.execute(HttpMethod::Get, &self.user_path("/financial"), None, &query)
    }

    pub fn try_create_patient<P: Serialize + ?Sized>(&self, patient: &P) -> Result<Value, ApiError> {
        let body = prepare_payload(patient, REQUIRED_PATIENT_FIELDS)?;
        let created = self.execute(HttpMethod::Post, &self.user_path("/patients"), Some(&body), &[])?;
        self.clear_cache();
        Ok(created)
    }

    pub fn try_create_session<P: Serialize + ?Sized>(&self, session: &P) -> Result<Value, ApiError> {
        let body = prepare_payload(session, REQUIRED_SESSION_FIELDS)?;
        let created =
            self.execute(HttpMethod::Post, &self.user_path("/agenda-sessions"), Some(&body), &[])?;
        self.clear_cache();
        Ok(created)
    }

    // ------------------------------------------------------------------
    // Operations, lenient form: failures are logged and yield `{}`
    // ------------------------------------------------------------------

    pub fn ping(&self) -> Value {
        lenient("ping", || self.try_ping())
    }

    pub fn health(&self) -> Value {
        lenient("health", || self.try_health())
    }

    pub fn get_user_stats(&self) -> Value {
        lenient("get_user_stats", || self.try_get_user_stats())
    }

    pub fn get_patients(&self) -> Value {
        lenient("get_patients", || self.try_get_patients())
    }

    pub fn get_patient_by_id(&self, patient_id: &str) -> Value {
        lenient("get_patient_by_id", || self.try_get_patient_by_id(patient_id))
    }

    pub fn get_sessions(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
        patient_id: Option<&str>,
    ) -> Value {
        lenient("get_sessions", || {
            self.try_get_sessions(start_date, end_date, patient_id)
        })
    }

    pub fn get_sessions_by_patient(&self, patient_id: &str) -> Value {
        lenient("get_sessions_by_patient", || {
            self.try_get_sessions_by_patient(patient_id)
        })
    }

    pub fn get_financial_info(&self, start_date: Option<&str>, end_date: Option<&str>) -> Value {
        lenient("get_financial_info", || {
            self.try_get_financial_info(start_date, end_date)
        })
    }

    pub fn create_patient<P: Serialize + ?Sized>(&self, patient: &P) -> Value {
        lenient("create_patient", || self.try_create_patient(patient))
    }

    pub fn create_session<P: Serialize + ?Sized>(&self, session: &P) -> Value {
        lenient("create_session", || self.try_create_session(session))
    }

    fn user_path(&self, suffix: &str) -> String {
        format!("/user/{}{}", encode_segment(self.config.user_id()), suffix)
    }
}

fn lenient(operation: &'static str, call: impl FnOnce() -> Result<Value, ApiError>) -> Value {
    info!(operation, "calling automation API");
    match call() {
        Ok(value) => value,
        Err(err) => {
            error!(operation, error = %err, "automation API call failed, returning empty result");
            Value::Object(Map::new())
        }
    }
}

/// Rejects blank ids; anything else is passed through untouched.
fn require_id<'a>(id: &'a str, kind: &'static str) -> Result<&'a str, ApiError> {
    if id.trim().is_empty() {
        return Err(ApiError::InvalidIdentifier(kind));
    }
    Ok(id)
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

fn query_pairs<'a>(filters: &[(&'a str, Option<&'a str>)]) -> Vec<(&'a str, &'a str)> {
    filters
        .iter()
        .filter_map(|(key, value)| match value {
            Some(v) if !v.is_empty() => Some((*key, *v)),
            _ => None,
        })
        .collect()
}

/// Map status codes of 400 and above to `ApiError`, then decode the body.
fn parse_response(response: HttpResponse) -> Result<Value, ApiError> {
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    if !response.is_success() {
        return Err(ApiError::Http {
            status: response.status,
            body: response.body,
        });
    }
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
