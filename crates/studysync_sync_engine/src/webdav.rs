//! WebDAV transport over HTTP.
//!
//! Uses the subset of WebDAV every common server supports:
//!
//! | Operation          | Request            | Success                        |
//! |--------------------|--------------------|--------------------------------|
//! | `probe`            | `PROPFIND` depth 0 | 2xx, 207, 405                  |
//! | `ensure_directory` | `MKCOL`            | 2xx, 405 (exists), 301         |
//! | `get_file`         | `GET`              | 2xx; 404 means missing         |
//! | `put_file`         | `PUT`              | 2xx                            |
//!
//! Every request carries HTTP Basic credentials.

use crate::config::{RemoteCredentials, TransportSettings};
use crate::error::{SyncError, SyncResult};
use crate::transport::RemoteTransport;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use zeroize::Zeroizing;

/// HTTP client for a WebDAV server.
pub struct WebDavClient {
    client: Client,
    base_url: String,
    username: String,
    password: Zeroizing<String>,
    propfind: Method,
    mkcol: Method,
}

impl std::fmt::Debug for WebDavClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDavClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl WebDavClient {
    /// Creates a client for `credentials`, falling back to `proxy_url` when
    /// the server URL is blank.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidConfig`] if no URL is available or the HTTP
    /// client cannot be built.
    pub fn new(
        credentials: &RemoteCredentials,
        proxy_url: &str,
        settings: &TransportSettings,
    ) -> SyncResult<Self> {
        let base_url = credentials.effective_url(proxy_url);
        if base_url.is_empty() {
            return Err(SyncError::InvalidConfig("remote URL is empty".into()));
        }

        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            username: credentials.username.clone(),
            password: Zeroizing::new(credentials.password().to_string()),
            propfind: extension_method(b"PROPFIND")?,
            mkcol: extension_method(b"MKCOL")?,
        })
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            format!("{}/", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(self.password.as_str()))
    }
}

fn extension_method(name: &[u8]) -> SyncResult<Method> {
    Method::from_bytes(name).map_err(|e| SyncError::InvalidConfig(e.to_string()))
}

fn status_error(status: StatusCode, path: &str) -> SyncError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SyncError::Unauthorized(path.to_string())
        }
        _ => SyncError::Http {
            status: status.as_u16(),
            path: path.to_string(),
        },
    }
}

fn transport_error(error: reqwest::Error, path: &str) -> SyncError {
    SyncError::Transport {
        message: format!("{path}: {error}"),
        retryable: error.is_timeout() || error.is_connect(),
    }
}

#[async_trait]
impl RemoteTransport for WebDavClient {
    async fn ensure_directory(&self, path: &str) -> SyncResult<()> {
        let url = format!("{}/", self.url(path).trim_end_matches('/'));
        let response = self
            .request(self.mkcol.clone(), url)
            .send()
            .await
            .map_err(|e| transport_error(e, path))?;

        let status = response.status();
        tracing::debug!(path, status = status.as_u16(), "MKCOL");
        match status {
            s if s.is_success() => Ok(()),
            StatusCode::METHOD_NOT_ALLOWED | StatusCode::MOVED_PERMANENTLY => Ok(()),
            s => Err(status_error(s, path)),
        }
    }

    async fn get_file(&self, path: &str) -> SyncResult<Option<Bytes>> {
        let response = self
            .request(Method::GET, self.url(path))
            .send()
            .await
            .map_err(|e| transport_error(e, path))?;

        let status = response.status();
        tracing::debug!(path, status = status.as_u16(), "GET");
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(status_error(status, path));
        }

        let body = response.bytes().await.map_err(|e| transport_error(e, path))?;
        Ok(Some(body))
    }

    async fn put_file(&self, path: &str, body: Bytes) -> SyncResult<()> {
        let size = body.len();
        let response = self
            .request(Method::PUT, self.url(path))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| transport_error(e, path))?;

        let status = response.status();
        tracing::debug!(path, size, status = status.as_u16(), "PUT");
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(status, path))
        }
    }

    async fn probe(&self) -> bool {
        let response = self
            .request(self.propfind.clone(), self.url(""))
            .header("Depth", "0")
            .send()
            .await;

        match response {
            Ok(response) => {
                let status = response.status();
                let ok = status.is_success()
                    || status == StatusCode::MULTI_STATUS
                    || status == StatusCode::METHOD_NOT_ALLOWED;
                if !ok {
                    tracing::warn!(
                        url = %self.base_url,
                        status = status.as_u16(),
                        "remote probe rejected"
                    );
                }
                ok
            }
            Err(e) => {
                tracing::warn!(url = %self.base_url, error = %e, "remote probe failed");
                false
            }
        }
    }
}
