//! Credential resolution: a local secrets file first, then environment
//! variables.

use crate::error::CredentialsError;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Secrets file looked up in the working directory by [`get_credentials`].
pub const DEFAULT_SECRETS_FILE: &str = "anomalo_secrets.json";
pub const HOST_ENV: &str = "ANOMALO_INSTANCE_HOST";
pub const TOKEN_ENV: &str = "ANOMALO_API_SECRET_TOKEN";

/// Host and bearer token for one Anomalo instance.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    #[serde(rename = "Host", alias = "host", default)]
    pub host: String,
    #[serde(rename = "Token", alias = "token", default)]
    pub token: String,
}

impl Credentials {
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            token: token.into(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.host.is_empty() && !self.token.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("token", &format_args!("<{} bytes>", self.token.len()))
            .finish()
    }
}

/// Where the credentials were found (for diagnostics).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    File(PathBuf),
    Environment,
}

/// Read credentials from a JSON file of the form `{"Host": ..., "Token": ...}`.
pub fn from_file(path: impl AsRef<Path>) -> Result<Credentials, CredentialsError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| CredentialsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let creds: Credentials =
        serde_json::from_str(&contents).map_err(|source| CredentialsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    if !creds.is_complete() {
        return Err(CredentialsError::Incomplete {
            path: path.to_path_buf(),
        });
    }
    Ok(creds)
}

/// Read credentials from `ANOMALO_INSTANCE_HOST` and `ANOMALO_API_SECRET_TOKEN`.
pub fn from_env() -> Result<Credentials, CredentialsError> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Read credentials through an arbitrary variable lookup.
pub fn from_lookup<F>(lookup: F) -> Result<Credentials, CredentialsError>
where
    F: Fn(&str) -> Option<String>,
{
    let creds = Credentials {
        host: lookup(HOST_ENV).unwrap_or_default(),
        token: lookup(TOKEN_ENV).unwrap_or_default(),
    };
    if !creds.is_complete() {
        return Err(CredentialsError::MissingEnv {
            host: creds.host,
            token_len: creds.token.len(),
        });
    }
    Ok(creds)
}

/// Resolve credentials from [`DEFAULT_SECRETS_FILE`], falling back to the
/// environment.
pub fn get_credentials() -> Result<(Credentials, CredentialSource), CredentialsError> {
    get_credentials_from(DEFAULT_SECRETS_FILE)
}

/// Resolve credentials from `path`, falling back to the environment.
pub fn get_credentials_from(
    path: impl AsRef<Path>,
) -> Result<(Credentials, CredentialSource), CredentialsError> {
    resolve(path.as_ref(), |key| std::env::var(key).ok())
}

fn resolve<F>(
    path: &Path,
    lookup: F,
) -> Result<(Credentials, CredentialSource), CredentialsError>
where
    F: Fn(&str) -> Option<String>,
{
    let file_err = match from_file(path) {
        Ok(creds) => return Ok((creds, CredentialSource::File(path.to_path_buf()))),
        Err(e) => e,
    };
    info!(
        path = %path.display(),
        "Did not find local anomalo credentials. Checking environment variables."
    );
    match from_lookup(lookup) {
        Ok(creds) => Ok((creds, CredentialSource::Environment)),
        Err(env_err) => {
            warn!(error = %env_err, "no anomalo credentials in environment");
            Err(CredentialsError::NotFound {
                file: Box::new(file_err),
                env: Box::new(env_err),
            })
        }
    }
}
