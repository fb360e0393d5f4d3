//! HTTP transport seam.
//!
//! The executor assembles a [`PreparedRequest`] and hands it to an
//! [`HttpTransport`]. Production code uses [`ReqwestTransport`]; tests swap in
//! a scripted transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use tokio::sync::RwLock;
use tracing::debug;

use super::Result;
use crate::config::ClientConfig;

/// A call as issued by capability code, before header assembly.
#[derive(Debug, Clone)]
pub struct AdtRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl AdtRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Fully assembled request: absolute URL, every header, timeout.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
    pub timeout: Duration,
}

/// Response with the body already read. HTTP errors are still responses.
#[derive(Debug, Clone)]
pub struct AdtResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl AdtResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// First value of a header, if it is valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Values of every `set-cookie` header.
    pub fn set_cookies(&self) -> impl Iterator<Item = &str> {
        self.headers
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: PreparedRequest) -> Result<AdtResponse>;

    /// Drop cookies held for the server session.
    async fn reset_cookies(&self) -> Result<()> {
        Ok(())
    }
}

/// reqwest-backed transport with its own cookie jar.
/// Clone of the inner client is cheap - reqwest::Client uses Arc internally.
pub struct ReqwestTransport {
    timeout: Duration,
    accept_invalid_certs: bool,
    client: RwLock<Client>,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Self::build_client(config.timeout(), config.accept_invalid_certs)?;
        Ok(Self {
            timeout: config.timeout(),
            accept_invalid_certs: config.accept_invalid_certs,
            client: RwLock::new(client),
        })
    }

    fn build_client(timeout: Duration, accept_invalid_certs: bool) -> Result<Client> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;
        Ok(client)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: PreparedRequest) -> Result<AdtResponse> {
        let client = self.client.read().await.clone();

        let mut builder = client
            .request(request.method, request.url)
            .headers(request.headers)
            .timeout(request.timeout);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(AdtResponse {
            status,
            headers,
            body,
        })
    }

    async fn reset_cookies(&self) -> Result<()> {
        // reqwest's jar can't be cleared in place, so start over with a new client
        let fresh = Self::build_client(self.timeout, self.accept_invalid_certs)?;
        *self.client.write().await = fresh;
        debug!("Cookie jar reset");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::api::AdtError;

    enum Scripted {
        Response(AdtResponse),
        NetworkFailure,
    }

    /// Replays queued responses in order and records every request.
    #[derive(Default)]
    pub(crate) struct MockTransport {
        script: Mutex<VecDeque<Scripted>>,
        requests: Mutex<Vec<PreparedRequest>>,
        cookie_resets: AtomicUsize,
    }

    impl MockTransport {
        pub(crate) fn push(&self, status: u16, headers: &[(&'static str, &str)], body: &str) {
            let mut map = HeaderMap::new();
            for &(name, value) in headers {
                map.append(
                    HeaderName::from_static(name),
                    HeaderValue::from_str(value).expect("test header value"),
                );
            }
            let status = StatusCode::from_u16(status).expect("test status");
            self.script
                .lock()
                .unwrap()
                .push_back(Scripted::Response(AdtResponse::new(status, map, body)));
        }

        pub(crate) fn push_network_failure(&self) {
            self.script.lock().unwrap().push_back(Scripted::NetworkFailure);
        }

        pub(crate) fn requests(&self) -> Vec<PreparedRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub(crate) fn paths(&self) -> Vec<String> {
            self.requests().iter().map(|r| r.url.path().to_string()).collect()
        }

        pub(crate) fn remaining(&self) -> usize {
            self.script.lock().unwrap().len()
        }

        pub(crate) fn cookie_resets(&self) -> usize {
            self.cookie_resets.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn send(&self, request: PreparedRequest) -> Result<AdtResponse> {
            self.requests.lock().unwrap().push(request);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Scripted::Response(response)) => Ok(response),
                Some(Scripted::NetworkFailure) => {
                    Err(AdtError::Network("connection refused".to_string()))
                }
                None => Err(AdtError::Network("no scripted response left".to_string())),
            }
        }

        async fn reset_cookies(&self) -> Result<()> {
            self.cookie_resets.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
