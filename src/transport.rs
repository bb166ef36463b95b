//! The request-execution capability used by workers, and its HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONNECTION};
use reqwest::{Client, Method, Url};

use crate::error::{Error, TransportError};
use crate::model::RequestTemplate;

/// Result of one completed request/response cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Exchange {
    pub status: u16,
    pub body_bytes: u64,
}

impl Exchange {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs requests on behalf of workers.
///
/// Implementations are shared by all workers of a run and must allow that
/// many concurrent callers.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Reusable per-worker request state.
    type Request: Send + Sync;

    /// One-time setup, done by each worker before it signals Ready.
    async fn prepare(&self, template: &RequestTemplate) -> Result<Self::Request, TransportError>;

    /// Sends the request with its full body, then reads and discards the response.
    async fn execute(&self, request: &Self::Request) -> Result<Exchange, TransportError>;
}

#[derive(Clone, Debug)]
pub struct TransportOptions {
    pub keep_alive: bool,
    pub compression: bool,
    pub max_idle_per_host: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            keep_alive: true,
            compression: true,
            max_idle_per_host: 10_000,
        }
    }
}

/// [`Transport`] backed by a pooled `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(options: &TransportOptions) -> Result<Self, TransportError> {
        let mut default_headers = HeaderMap::new();
        let max_idle = if options.keep_alive {
            options.max_idle_per_host
        } else {
            default_headers.insert(CONNECTION, HeaderValue::from_static("close"));
            0
        };

        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .gzip(options.compression)
            .pool_max_idle_per_host(max_idle)
            .pool_idle_timeout(Duration::from_secs(90))
            .default_headers(default_headers)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    type Request = reqwest::Request;

    async fn prepare(&self, template: &RequestTemplate) -> Result<Self::Request, TransportError> {
        let method = parse_method(template.method()).map_err(TransportError::Build)?;
        let url = parse_url(template.url()).map_err(TransportError::Build)?;

        let mut builder = self.client.request(method, url);
        for field in template.header_fields() {
            builder = builder.header(field.name.as_str(), field.value.as_str());
        }
        if let Some(credentials) = template.credentials() {
            builder = builder.basic_auth(&credentials.username, Some(&credentials.password));
        }
        if !template.payload().is_empty() {
            builder = builder.body(template.payload().clone());
        }
        Ok(builder.build()?)
    }

    async fn execute(&self, request: &Self::Request) -> Result<Exchange, TransportError> {
        let request = request.try_clone().ok_or(TransportError::NotReplayable)?;
        let response = self.client.execute(request).await?;
        let status = response.status().as_u16();

        // Drain the body so the connection can go back to the pool.
        let mut body_bytes = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            body_bytes += chunk?.len() as u64;
        }

        Ok(Exchange { status, body_bytes })
    }
}

/// Checks that `template` can be sent over HTTP, so bad input is reported
/// before any worker starts.
pub fn validate(template: &RequestTemplate) -> Result<(), Error> {
    parse_method(template.method()).map_err(Error::Config)?;
    parse_url(template.url()).map_err(Error::Config)?;
    for field in template.header_fields() {
        HeaderName::from_bytes(field.name.as_bytes())
            .map_err(|e| Error::Config(format!("header name `{}`: {e}", field.name)))?;
        HeaderValue::from_str(&field.value)
            .map_err(|e| Error::Config(format!("header `{}` value: {e}", field.name)))?;
    }
    Ok(())
}

fn parse_method(method: &str) -> Result<Method, String> {
    Method::from_bytes(method.as_bytes()).map_err(|e| format!("method `{method}`: {e}"))
}

fn parse_url(url: &str) -> Result<Url, String> {
    let parsed = Url::parse(url).map_err(|e| format!("url `{url}`: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(format!("url `{url}`: unsupported scheme `{scheme}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HeaderField;

    #[test]
    fn validate_accepts_plain_get() {
        let template = RequestTemplate::new("GET", "http://127.0.0.1/");
        assert!(validate(&template).is_ok());
    }

    #[test]
    fn validate_rejects_unknown_scheme() {
        let template = RequestTemplate::new("GET", "ftp://127.0.0.1/");
        assert!(matches!(validate(&template), Err(Error::Config(_))));
    }

    #[test]
    fn validate_rejects_bad_header_name() {
        let template = RequestTemplate::new("GET", "http://127.0.0.1/")
            .header(HeaderField::new("Bad Name", "x"));
        assert!(matches!(validate(&template), Err(Error::Config(_))));
    }

    #[test]
    fn validate_rejects_bad_method() {
        let template = RequestTemplate::new("GE T", "http://127.0.0.1/");
        assert!(matches!(validate(&template), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn prepare_resolves_headers_and_auth() {
        let transport = HttpTransport::new(&TransportOptions::default()).unwrap();
        let template = RequestTemplate::new("POST", "http://127.0.0.1:1/submit")
            .body("payload")
            .header(HeaderField::new("X-Tag", "one"))
            .header(HeaderField::new("X-Tag", "two"))
            .basic_auth("user", "secret");

        let request = transport.prepare(&template).await.unwrap();
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.url().path(), "/submit");

        let tags: Vec<_> = request
            .headers()
            .get_all("x-tag")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(tags, ["one", "two"]);
        assert_eq!(
            request.headers()["authorization"],
            "Basic dXNlcjpzZWNyZXQ="
        );
        assert_eq!(
            request.body().and_then(|b| b.as_bytes()),
            Some(&b"payload"[..])
        );
        assert!(request.try_clone().is_some());
    }

    #[test]
    fn only_2xx_is_success() {
        assert!(Exchange { status: 204, body_bytes: 0 }.is_success());
        assert!(!Exchange { status: 404, body_bytes: 9 }.is_success());
    }
}
