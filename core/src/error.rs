//! Error types for the automation API client.
//!
//! # Design
//! Two families share one enum. Configuration errors (`UnsupportedMethod`,
//! `InvalidConfig`, `InvalidIdentifier`, `MissingField`, `Serialization`) are
//! raised before the transport is touched. Transport errors cover everything
//! that happens on or after the wire: the connection itself, non-2xx statuses
//! and undecodable bodies. `NotFound` keeps its own variant because callers
//! often want to tell a missing record apart from a failing server.

use thiserror::Error;

/// Errors returned by `AutomationClient` and its transport.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request executor was asked for a method it does not speak.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// The client configuration is unusable.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    /// A resource identifier was empty or blank.
    #[error("invalid {0} identifier: must not be empty")]
    InvalidIdentifier(&'static str),

    /// A payload is missing a field the service requires.
    #[error("required field missing from payload: {0}")]
    MissingField(String),

    /// The request payload could not be serialized to a JSON object.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The request never produced an HTTP response (DNS, connect, timeout, ...).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a status of 400 or above other than 404.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body was not valid JSON.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    /// True for errors raised before any network traffic.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ApiError::UnsupportedMethod(_)
                | ApiError::InvalidConfig(_)
                | ApiError::InvalidIdentifier(_)
                | ApiError::MissingField(_)
                | ApiError::Serialization(_)
        )
    }

    /// HTTP status carried by the error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound => Some(404),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
