//! Server configuration document
//!
//! `GET /api/configuration` returns server-side constants, among them the
//! namespace used to hash room PINs. The document is fetched over HTTP the
//! first time it is needed and kept for the life of the cache; the workspace
//! owns one cache per process.

use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::OnceCell;
use uuid::Uuid;

pub const CONFIGURATION_PATH: &str = "/api/configuration";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Namespace for [`Room::hash_pin`](crate::shared::schema::Room::hash_pin)
    pub namespace: Uuid,
    #[serde(default)]
    pub version: String,
    /// Every other server constant, untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum ServerConfigError {
    #[error("configuration request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug)]
struct CacheInner {
    url: String,
    client: Client,
    cell: OnceCell<ServerConfig>,
}

/// Fetch-once cache of the [`ServerConfig`]. Clones share the cached value.
#[derive(Debug, Clone)]
pub struct ServerConfigCache {
    inner: Arc<CacheInner>,
}

impl ServerConfigCache {
    /// Cache that loads from `server_url` on first use
    pub fn new(server_url: &str) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                url: format!("{}{}", server_url.trim_end_matches('/'), CONFIGURATION_PATH),
                client: Client::new(),
                cell: OnceCell::new(),
            }),
        }
    }

    /// Cache that already holds `config` and never touches the network
    pub fn preloaded(config: ServerConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                url: String::new(),
                client: Client::new(),
                cell: OnceCell::new_with(Some(config)),
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.cell.initialized()
    }

    /// The configuration, fetching it on the first call. A failed fetch is
    /// not cached; the next call tries again.
    pub async fn get(&self) -> Result<&ServerConfig, ServerConfigError> {
        self.inner.cell.get_or_try_init(|| self.load()).await
    }

    pub async fn namespace(&self) -> Result<Uuid, ServerConfigError> {
        Ok(self.get().await?.namespace)
    }

    async fn load(&self) -> Result<ServerConfig, ServerConfigError> {
        tracing::info!("[Config] Fetching server configuration from {}", self.inner.url);
        let config = self
            .inner
            .client
            .get(&self.inner.url)
            .send()
            .await?
            .error_for_status()?
            .json::<ServerConfig>()
            .await?;
        tracing::debug!("[Config] Server configuration version {:?}", config.version);
        Ok(config)
    }
}
