//! Configuration for the sync engine.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;
use studysync_sync_protocol::{RemoteLayout, DEFAULT_ROOT};
use zeroize::Zeroizing;

/// Proxy endpoint used when no server URL is configured.
pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:8787/dav";

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportSettings {
    /// Whole-request timeout.
    pub timeout: Duration,
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("studysync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl TransportSettings {
    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Server address and Basic credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCredentials {
    /// Base URL of the WebDAV server. Blank means "use the proxy".
    pub server_url: String,
    /// Basic auth user name.
    pub username: String,
    #[serde(serialize_with = "serialize_secret", deserialize_with = "deserialize_secret")]
    password: Zeroizing<String>,
}

impl RemoteCredentials {
    /// Creates credentials.
    pub fn new(
        server_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// Basic auth password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// The URL requests go to: the server URL, or `proxy_url` when the
    /// server URL is blank. Trailing slashes are removed.
    #[must_use]
    pub fn effective_url(&self, proxy_url: &str) -> String {
        let url = self.server_url.trim();
        let url = if url.is_empty() { proxy_url.trim() } else { url };
        url.trim_end_matches('/').to_string()
    }
}

impl fmt::Debug for RemoteCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCredentials")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn serialize_secret<S: Serializer>(
    secret: &Zeroizing<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret)
}

fn deserialize_secret<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Zeroizing<String>, D::Error> {
    String::deserialize(deserializer).map(Zeroizing::new)
}

/// Whether remote sync is on, and with which credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RemoteConfig {
    /// Remote sync is off; everything stays local.
    #[default]
    Disabled,
    /// Remote sync is on.
    Configured(RemoteCredentials),
}

impl RemoteConfig {
    /// Builds the config from the raw settings the application stores.
    pub fn from_settings(
        server_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        enabled: bool,
    ) -> Self {
        if enabled {
            Self::Configured(RemoteCredentials::new(server_url, username, password))
        } else {
            Self::Disabled
        }
    }

    /// Returns true when remote sync is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Configured(_))
    }
}

/// Configuration for sync operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remote server, or disabled.
    pub remote: RemoteConfig,
    /// Folder under the server URL that holds the collections.
    pub remote_root: String,
    /// Used in place of a blank server URL.
    pub proxy_url: String,
    /// HTTP client settings.
    pub transport: TransportSettings,
    /// Page transfers in flight at once.
    pub max_concurrent_uploads: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(RemoteConfig::Disabled)
    }
}

impl SyncConfig {
    /// Creates a configuration with default settings.
    pub fn new(remote: RemoteConfig) -> Self {
        Self {
            remote,
            remote_root: DEFAULT_ROOT.to_string(),
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            transport: TransportSettings::default(),
            max_concurrent_uploads: 4,
        }
    }

    /// Sets the remote root folder.
    #[must_use]
    pub fn with_remote_root(mut self, root: impl Into<String>) -> Self {
        self.remote_root = root.into();
        self
    }

    /// Sets the proxy URL.
    #[must_use]
    pub fn with_proxy_url(mut self, url: impl Into<String>) -> Self {
        self.proxy_url = url.into();
        self
    }

    /// Sets the transport settings.
    #[must_use]
    pub fn with_transport(mut self, transport: TransportSettings) -> Self {
        self.transport = transport;
        self
    }

    /// Sets the page transfer concurrency.
    #[must_use]
    pub fn with_max_concurrent_uploads(mut self, count: usize) -> Self {
        self.max_concurrent_uploads = count;
        self
    }

    /// Remote file layout for this configuration.
    pub fn layout(&self) -> RemoteLayout {
        RemoteLayout::new(&self.remote_root)
    }

    /// Checks the configuration can be used.
    pub fn validate(&self) -> SyncResult<()> {
        if self.max_concurrent_uploads == 0 {
            return Err(SyncError::InvalidConfig(
                "max_concurrent_uploads must be at least 1".into(),
            ));
        }
        if let RemoteConfig::Configured(credentials) = &self.remote {
            if credentials.effective_url(&self.proxy_url).is_empty() {
                return Err(SyncError::InvalidConfig(
                    "no server URL and no proxy URL configured".into(),
                ));
            }
        }
        Ok(())
    }
}
