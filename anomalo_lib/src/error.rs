//! Error types for the Anomalo API client.

use std::path::PathBuf;
use thiserror::Error;

/// Base error type for Anomalo operations.
///
/// Each variant is a distinct failure class so callers can tell "the service
/// said no" ([`Error::Api`]) from "the service could not be reached"
/// ([`Error::Transport`]) from "a uniqueness assumption was violated"
/// ([`Error::Ambiguous`]).
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error("invalid request parameters: {0}")]
    Request(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Displays as the verbatim response body.
    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error(transparent)]
    Ambiguous(#[from] AmbiguousMatch),

    #[error("{0}")]
    InvalidArgument(String),
}

impl Error {
    /// HTTP status of a remote rejection, if this is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api(e) => Some(e.status_code),
            _ => None,
        }
    }
}

/// Raised when the API answers with anything other than HTTP 200.
///
/// The service's error payloads are inconsistent across endpoints (JSON
/// objects, arrays of strings, plain text), so the body is kept as-is.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    pub status_code: u16,
}

impl ApiError {
    pub fn new(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            status_code,
        }
    }
}

/// Raised when a lookup that relies on a natural key finds more than one
/// element carrying it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{description}. candidates: {}", candidates.join(", "))]
pub struct AmbiguousMatch {
    pub description: String,
    /// Identifying fields of every conflicting element, in collection order.
    pub candidates: Vec<String>,
}

/// Raised when host/token cannot be obtained.
#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("unable to read credentials file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse credentials file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("credentials file {} is missing a host or token", path.display())]
    Incomplete { path: PathBuf },

    // Never carry the token itself.
    #[error(
        "at least one anomalo API env variable is not set. Got host '{host}' and token length {token_len}"
    )]
    MissingEnv { host: String, token_len: usize },

    #[error("could not find anomalo credentials ({file}; {env})")]
    NotFound {
        file: Box<CredentialsError>,
        env: Box<CredentialsError>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_body_verbatim() {
        let err = Error::from(ApiError::new(r#"["API Error", "API Error 2"]"#, 400));
        assert_eq!(err.to_string(), r#"["API Error", "API Error 2"]"#);
        assert_eq!(err.status_code(), Some(400));
    }

    #[test]
    fn ambiguous_match_lists_candidates() {
        let err = AmbiguousMatch {
            description: "saw more than one check with ref freshness for table 7".to_string(),
            candidates: vec!["check 10".to_string(), "check 11".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "saw more than one check with ref freshness for table 7. candidates: check 10, check 11"
        );
    }

    #[test]
    fn missing_env_hides_token() {
        let err = CredentialsError::MissingEnv {
            host: "https://anomalo.example".to_string(),
            token_len: 0,
        };
        let msg = err.to_string();
        assert!(msg.contains("https://anomalo.example"));
        assert!(msg.contains("token length 0"));
    }
}
