//! HTTP capability the adapter posts through.

use std::fmt;
use std::time::Duration;

use reqwest::header;

use crate::{ConnectOptions, Dsn, Result, RqliteError, TransportError};

/// Raw HTTP response: status code and body text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking JSON POST capability.
///
/// Implementations own connection reuse, TLS, auth headers and timeouts. The
/// adapter never retries; a failed call surfaces as [`TransportError`].
pub trait HttpTransport: Send + Sync {
    /// Posts `body` (JSON text) to the absolute `url`.
    fn post_json(&self, url: &str, body: &str) -> std::result::Result<HttpResponse, TransportError>;
}

/// [`HttpTransport`] backed by `reqwest`'s blocking client.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: reqwest::blocking::Client,
    credentials: Option<(String, String)>,
    timeout: Duration,
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field(
                "credentials",
                &self.credentials.as_ref().map(|(user, _)| (user, "<redacted>")),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ReqwestTransport {
    pub fn new(options: &ConnectOptions) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .tcp_nodelay(true)
            .build()
            .map_err(|err| {
                RqliteError::Configuration(format!("could not build HTTP client: {err}"))
            })?;
        Ok(Self {
            http,
            credentials: None,
            timeout: Duration::from_millis(options.timeout_ms),
        })
    }

    /// Builds a transport using the DSN's basic-auth credentials, if any.
    pub fn for_dsn(dsn: &Dsn, options: &ConnectOptions) -> Result<Self> {
        let transport = Self::new(options)?;
        Ok(match dsn.credentials() {
            Some((username, password)) => transport.with_basic_auth(username, password),
            None => transport,
        })
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }
}

impl HttpTransport for ReqwestTransport {
    fn post_json(&self, url: &str, body: &str) -> std::result::Result<HttpResponse, TransportError> {
        let mut request = self
            .http
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .body(body.to_owned());
        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send().map_err(TransportError::request)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(TransportError::request)?;
        Ok(HttpResponse { status, body })
    }
}
