//! Anomalo public API client library.
//!
//! Provides a typed client for the Anomalo data-quality API: tables, checks,
//! notification channels, and organizations, plus unique-match lookups over
//! the list endpoints.

pub mod client;
pub mod credentials;
pub mod error;
pub mod models;
pub mod search;

pub use client::{Client, HttpClientProvider, ParamEncoding};
pub use credentials::{get_credentials, get_credentials_from, CredentialSource, Credentials};
pub use error::{AmbiguousMatch, ApiError, CredentialsError, Error};
pub use search::{find_unique, Match, VALID_NOTIFICATION_CHANNELS};

/// Library version for User-Agent and diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
