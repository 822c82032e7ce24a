use std::{borrow::Cow, time::Duration};

use crate::{error::Error, result::Result};
use log::{debug, info, log, Level};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT},
    Client as ReqwestClient, Method, Proxy, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://2ch.hk";

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// The `User-Agent` sent with every request.
pub const USER_AGENT_STRING: &str =
    "Mozilla/5.0 (Windows NT 6.1; rv:52.0) Gecko/20100101 Firefox/52.0";

/// A pooled HTTP session bound to one base URL.
///
/// Cloning is cheap: clones share the same connection pool and proxy settings.
#[derive(Debug, Clone)]
pub struct Session {
    http: ReqwestClient,
    base_url: Url,
    timeout: Duration,
    debug: bool,
}

impl Session {
    /// Builds a session for `base_url`.
    ///
    /// `proxies` is a list of `(scheme, proxy url)` pairs. The scheme is `http`,
    /// `https`, or anything else for a proxy applied to every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or a proxy is invalid.
    pub fn new(
        base_url: &str,
        proxies: &[(String, String)],
        timeout: Duration,
        debug: bool,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|source| Error::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;

        let mut builder = ReqwestClient::builder();
        for (scheme, proxy) in proxies {
            let proxy = match scheme.as_str() {
                "http" => Proxy::http(proxy.as_str()),
                "https" => Proxy::https(proxy.as_str()),
                _ => Proxy::all(proxy.as_str()),
            }
            .map_err(Error::ClientFormation)?;
            builder = builder.proxy(proxy);
        }
        let http = builder.build().map_err(Error::ClientFormation)?;

        Ok(Self {
            http,
            base_url,
            timeout,
            debug,
        })
    }

    /// Returns the base URL every relative path is joined to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `path` against the base URL.
    ///
    /// A leading `/` is ignored and the rest joins like a link would,
    /// so an absolute URL replaces the base entirely.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the joined URL does not parse.
    pub fn build_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| Error::InvalidUrl {
                url: path.to_string(),
                source,
            })
    }

    /// Sends `request` and normalizes the body.
    ///
    /// A body that decodes as JSON comes back as [`Body::Json`]. Anything else
    /// is handed back untouched as [`Body::Raw`].
    ///
    /// # Errors
    ///
    /// [`Error::StatusMismatch`] if the status differs from the expected one,
    /// [`Error::TransportUnavailable`] if no response arrived.
    pub async fn request(&self, request: Request<'_>) -> Result<Body> {
        let response = self.send(&request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?.to_vec();

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => Ok(Body::Json(value)),
            Err(err) => {
                debug!("body of {} is not json: {}", request.path, err);
                Ok(Body::Raw(RawResponse {
                    status,
                    headers,
                    bytes,
                }))
            }
        }
    }

    /// `GET`s `path` and decodes its JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Fails like [`Session::request`], or if the body is not JSON of shape `T`.
    pub async fn get_json<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.request(Request::get(path)).await?.into_json()
    }

    /// `GET`s `path` and returns the whole body as bytes.
    ///
    /// `timeout` covers the whole transfer, body included.
    pub(crate) async fn fetch_bytes(&self, path: &str, timeout: Duration) -> Result<Vec<u8>> {
        let response = self.send(&Request::get(path).timeout(timeout)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn send(&self, request: &Request<'_>) -> Result<Response> {
        let url = self.build_url(request.path)?;

        let mut headers = request.headers.clone();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));

        let mut builder = self
            .http
            .request(request.method.clone(), url.clone())
            .headers(headers)
            .timeout(request.timeout.unwrap_or(self.timeout));
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }

        info!("request for {} dispatched", url);
        let response = builder.send().await?;

        log!(self.level(), "response: {:#?}", &response);
        log!(self.level(), "response status: {}", response.status());

        let status = response.status();
        if status != request.expected {
            let reason = status.canonical_reason().unwrap_or_default().to_string();
            let text = response.text().await?;
            return Err(Error::StatusMismatch {
                status,
                expected: request.expected,
                reason,
                text,
            });
        }
        Ok(response)
    }

    fn level(&self) -> Level {
        if self.debug {
            Level::Info
        } else {
            Level::Debug
        }
    }
}

/// A single request to the API.
///
/// Built with [`Request::get`] or [`Request::new`] and refined with the
/// chaining methods. Unset values fall back to the session's defaults.
#[derive(Debug, Clone)]
pub struct Request<'a> {
    method: Method,
    path: &'a str,
    headers: HeaderMap,
    params: Vec<(String, String)>,
    form: Option<Vec<(String, String)>>,
    expected: StatusCode,
    timeout: Option<Duration>,
}

impl<'a> Request<'a> {
    /// A request for `path` using `method`, expecting `200 OK`.
    pub fn new(method: Method, path: &'a str) -> Self {
        Self {
            method,
            path,
            headers: HeaderMap::new(),
            params: Vec::new(),
            form: None,
            expected: StatusCode::OK,
            timeout: None,
        }
    }

    /// A `GET` request for `path`.
    pub fn get(path: &'a str) -> Self {
        Self::new(Method::GET, path)
    }

    /// A `POST` request for `path`.
    pub fn post(path: &'a str) -> Self {
        Self::new(Method::POST, path)
    }

    /// Adds a header. The `User-Agent` is always overwritten on dispatch.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds a query parameter on top of any already in the path.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Sends `fields` as a url-encoded form body.
    #[must_use]
    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.form = Some(fields);
        self
    }

    /// Overrides the status code treated as success.
    #[must_use]
    pub fn expect(mut self, status: StatusCode) -> Self {
        self.expected = status;
        self
    }

    /// Overrides the session timeout for this request.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the path this request targets.
    pub fn path(&self) -> &str {
        self.path
    }
}

/// The body of a successful response.
#[derive(Debug, Clone)]
pub enum Body {
    /// The body parsed as JSON.
    Json(Value),
    /// The body could not be parsed as JSON.
    Raw(RawResponse),
}

impl Body {
    /// Decodes a JSON body into `T`.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedBody`] for a raw body, [`Error::Json`] if the
    /// document does not have the shape of `T`.
    pub fn into_json<T>(self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        match self {
            Body::Json(value) => serde_json::from_value(value).map_err(Into::into),
            Body::Raw(_) => Err(Error::UnexpectedBody("a JSON document")),
        }
    }

    /// Returns the JSON document, if the body was one.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(value) => Some(value),
            Body::Raw(_) => None,
        }
    }
}

/// A response whose body was not JSON.
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    bytes: Vec<u8>,
}

impl RawResponse {
    /// Returns the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the raw body.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the body as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}
