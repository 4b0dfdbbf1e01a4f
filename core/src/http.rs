//! HTTP transport types for the host-does-IO split.
//!
//! # Design
//! Requests and responses are described as plain data. `AutomationClient`
//! builds `HttpRequest` values and interprets `HttpResponse` values; a
//! `Transport` implementation moves the bytes. Keeping the boundary as data
//! lets unit tests inspect exactly what would go on the wire.

use std::fmt;
use std::str::FromStr;

use crate::error::ApiError;

/// HTTP method accepted by the request executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            _ => Err(ApiError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute and carries no query string; `query` holds the pairs in
/// the order they were added and is encoded by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Path component of `url`, without scheme and authority.
    pub fn path(&self) -> &str {
        let rest = self
            .url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.url);
        rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
    }

    /// Stable identity used as the response cache key.
    pub fn cache_key(&self) -> String {
        let mut key = format!("{} {}", self.method, self.url);
        for (i, (k, v)) in self.query.iter().enumerate() {
            key.push(if i == 0 { '?' } else { '&' });
            key.push_str(k);
            key.push('=');
            key.push_str(v);
        }
        key
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[test]
    fn method_parsing_is_case_insensitive() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("Post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
    }

    #[test]
    fn unknown_method_is_rejected() {
        let err = "DELETE".parse::<HttpMethod>().unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedMethod(ref m) if m == "DELETE"));
    }

    #[test]
    fn path_strips_scheme_and_host() {
        let req = request("http://localhost:3000/automation-api/user/u1/stats");
        assert_eq!(req.path(), "/automation-api/user/u1/stats");
        assert_eq!(request("http://localhost:3000").path(), "/");
    }

    #[test]
    fn cache_key_includes_query_in_order() {
        let mut req = request("http://h/a");
        req.query.push(("startDate".into(), "2024-01-01".into()));
        req.query.push(("endDate".into(), "2024-01-31".into()));
        assert_eq!(
            req.cache_key(),
            "GET http://h/a?startDate=2024-01-01&endDate=2024-01-31"
        );
        assert_eq!(req.query_value("endDate"), Some("2024-01-31"));
        assert_eq!(req.query_value("patientId"), None);
    }
}
