//! HTTP client for the Anomalo public API.

use crate::credentials::Credentials;
use crate::error::{ApiError, Error};
use crate::models::{
    ChangeOrganizationResponse, ConfigureTableRequest, ConfigureTableResponse,
    CreateCheckRequest, CreateCheckResponse, DeleteCheckRequest, DeleteCheckResponse,
    GetChecksResponse, GetNotificationChannelsResponse, GetTableResponse, Organization,
    PingResponse, RunChecksRequest, RunChecksResponse,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;
use url::Url;

const DEFAULT_API_VERSION: &str = "v1";

/// Builds the transport handle on first use.
pub type HttpClientProvider = Arc<dyn Fn() -> HttpClient + Send + Sync>;

/// How a request's JSON parameters travel to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamEncoding {
    /// Sent verbatim as the request body (POST, PUT).
    Body,
    /// Flattened into the URL query string; the body stays empty.
    Query,
}

impl ParamEncoding {
    pub fn for_method(method: &Method) -> Self {
        if *method == Method::POST || *method == Method::PUT {
            ParamEncoding::Body
        } else {
            ParamEncoding::Query
        }
    }
}

/// Anomalo API client.
///
/// The transport handle is built lazily on the first request and reused for
/// the lifetime of the client (and its clones made after that point).
#[derive(Clone)]
pub struct Client {
    host: String,
    token: String,
    api_version: String,
    user_agent: String,
    provider: Option<HttpClientProvider>,
    http: OnceLock<HttpClient>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("host", &self.host)
            .field("api_version", &self.api_version)
            .field("http_initialized", &self.http.get().is_some())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client for `host` (e.g. `https://app.anomalo.com`) with a bearer token.
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host: normalize_host(&host.into()),
            token: token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            user_agent: format!("anomalo-rs/{}", crate::VERSION),
            provider: None,
            http: OnceLock::new(),
        }
    }

    pub fn from_credentials(creds: Credentials) -> Self {
        Self::new(creds.host, creds.token)
    }

    /// Target another version of the public API than `v1`.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Use an already built transport handle (timeouts, proxies, ...).
    pub fn with_http_client(self, http: HttpClient) -> Self {
        Self {
            provider: None,
            http: OnceLock::from(http),
            ..self
        }
    }

    /// Build the transport handle with `provider` the first time it is needed.
    pub fn with_http_provider<F>(self, provider: F) -> Self
    where
        F: Fn() -> HttpClient + Send + Sync + 'static,
    {
        Self {
            provider: Some(Arc::new(provider)),
            http: OnceLock::new(),
            ..self
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn http(&self) -> &HttpClient {
        self.http.get_or_init(|| match &self.provider {
            Some(provider) => provider(),
            None => HttpClient::new(),
        })
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url, Error> {
        let raw = format!("{}/api/public/{}/{}", self.host, self.api_version, endpoint);
        Url::parse(&raw).map_err(|e| Error::Request(format!("invalid URL {raw}: {e}")))
    }

    fn headers(&self) -> Result<HeaderMap, Error> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| Error::Request("API token is not a valid header value".to_string()))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(ua) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        Ok(headers)
    }

    /// Perform one round trip to `endpoint` and return the raw response body.
    ///
    /// `params` must be a JSON object. For POST and PUT it becomes the request
    /// body unmodified; for every other method each top-level key is sent as a
    /// query parameter. Anything but HTTP 200 fails with [`Error::Api`] whose
    /// message is the response body.
    pub async fn dispatch(
        &self,
        endpoint: &str,
        method: Method,
        params: &str,
    ) -> Result<String, Error> {
        let encoding = ParamEncoding::for_method(&method);
        let mut url = self.endpoint_url(endpoint)?;
        let headers = self.headers()?;
        debug!(endpoint, method = %method, ?encoding, "dispatching anomalo request");

        let req = match encoding {
            ParamEncoding::Body => self
                .http()
                .request(method, url)
                .body(params.to_string()),
            ParamEncoding::Query => {
                let query = encode_query(params)?;
                if !query.is_empty() {
                    url.set_query(Some(&query));
                }
                self.http().request(method, url)
            }
        };

        let res = req.headers(headers).send().await?;
        let status = res.status();
        let body = res.text().await?;
        debug!(endpoint, status = status.as_u16(), bytes = body.len(), "anomalo response");
        if status != StatusCode::OK {
            return Err(Error::Api(ApiError::new(body, status.as_u16())));
        }
        Ok(body)
    }

    /// Serialize `params`, dispatch, and decode the response as `R`.
    pub async fn call<P, R>(&self, endpoint: &str, method: Method, params: &P) -> Result<R, Error>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let params = serde_json::to_string(params).map_err(|e| Error::Request(e.to_string()))?;
        let body = self.dispatch(endpoint, method, &params).await?;
        decode(&body)
    }

    pub async fn ping(&self) -> Result<PingResponse, Error> {
        self.call("ping", Method::GET, &json!({})).await
    }

    /// Look up a table by its full name, which starts with the warehouse name.
    pub async fn get_table_information(&self, table_name: &str) -> Result<GetTableResponse, Error> {
        self.call(
            "get_table_information",
            Method::GET,
            &json!({ "table_name": table_name }),
        )
        .await
    }

    /// Look up a table by its name without the warehouse prefix plus the
    /// warehouse ID. Use this when several warehouses share a name.
    pub async fn get_table_information_with_warehouse_id(
        &self,
        table_name: &str,
        warehouse_id: i64,
    ) -> Result<GetTableResponse, Error> {
        self.call(
            "get_table_information",
            Method::GET,
            &json!({ "table_name": table_name, "warehouse_id": warehouse_id }),
        )
        .await
    }

    pub async fn configure_table(
        &self,
        req: &ConfigureTableRequest,
    ) -> Result<ConfigureTableResponse, Error> {
        self.call("configure_table", Method::POST, req).await
    }

    pub async fn get_checks(&self, table_id: i64) -> Result<GetChecksResponse, Error> {
        self.call(
            "get_checks_for_table",
            Method::GET,
            &json!({ "table_id": table_id }),
        )
        .await
    }

    pub async fn create_check(&self, req: &CreateCheckRequest) -> Result<CreateCheckResponse, Error> {
        self.call("create_check", Method::POST, req).await
    }

    pub async fn delete_check(&self, req: &DeleteCheckRequest) -> Result<DeleteCheckResponse, Error> {
        self.call("delete_check", Method::POST, req).await
    }

    pub async fn run_checks(&self, req: &RunChecksRequest) -> Result<RunChecksResponse, Error> {
        self.call("run_checks", Method::POST, req).await
    }

    pub async fn get_notification_channels(&self) -> Result<GetNotificationChannelsResponse, Error> {
        self.call("list_notification_channels", Method::GET, &json!({}))
            .await
    }

    pub async fn get_organizations(&self) -> Result<Vec<Organization>, Error> {
        self.call("organizations", Method::GET, &json!({})).await
    }

    /// API keys act within one organization at a time; switch it to `org_id`.
    pub async fn change_organization(
        &self,
        org_id: i64,
    ) -> Result<ChangeOrganizationResponse, Error> {
        self.call(
            "organization",
            Method::PUT,
            &json!({ "id": org_id.to_string() }),
        )
        .await
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() || host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// Flatten a JSON object into `key=value&...`, values stringified.
///
/// Nested arrays and objects have no query-string form and are rejected.
pub fn encode_query(params: &str) -> Result<String, Error> {
    let parsed: Map<String, Value> = serde_json::from_str(params)
        .map_err(|e| Error::Request(format!("parameters must be a JSON object: {e}")))?;
    let mut pairs = Vec::with_capacity(parsed.len());
    for (key, value) in &parsed {
        let value = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            Value::Array(_) | Value::Object(_) => {
                return Err(Error::Request(format!(
                    "parameter '{key}' is nested; query parameters must be flat"
                )))
            }
        };
        pairs.push(format!(
            "{}={}",
            urlencoding::encode(key),
            urlencoding::encode(&value)
        ));
    }
    Ok(pairs.join("&"))
}

/// Decode the first JSON value of `body`; trailing bytes are ignored.
pub fn decode<R: DeserializeOwned>(body: &str) -> Result<R, Error> {
    let mut de = serde_json::Deserializer::from_str(body);
    R::deserialize(&mut de).map_err(Error::Decode)
}
