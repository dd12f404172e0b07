//! Object storage access for the download proxy and the upload worker

use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use futures::TryStreamExt;
use reqwest::StatusCode;

use crate::config::StorageConfig;

/// Storage failures, classified by what the client should see
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found")]
    NotFound,

    #[error("Access denied")]
    Forbidden,

    #[error("Storage responded with status {0}")]
    Upstream(u16),

    #[error("Storage request failed: {0}")]
    Transport(String),
}

/// Object body plus the metadata the proxy forwards
pub struct StoredObject {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: Body,
}

/// Read access to the asset bucket
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stream an object's contents
    async fn fetch(&self, path: &str) -> Result<StoredObject, StorageError>;

    /// Whether an object exists at `path`
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;
}

/// Object storage over the bucket's REST endpoint
#[derive(Clone)]
pub struct HttpObjectStorage {
    client: reqwest::Client,
    objects_url: String,
}

impl HttpObjectStorage {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("assetmarket/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StorageError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            objects_url: config.objects_url(),
        })
    }

    fn media_url(&self, path: &str) -> String {
        format!("{}/{}?alt=media", self.objects_url, urlencoding::encode(path))
    }

    fn classify(status: StatusCode) -> StorageError {
        match status {
            StatusCode::NOT_FOUND => StorageError::NotFound,
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => StorageError::Forbidden,
            other => StorageError::Upstream(other.as_u16()),
        }
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn fetch(&self, path: &str) -> Result<StoredObject, StorageError> {
        let response = self
            .client
            .get(self.media_url(path))
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(path = %path, status = status.as_u16(), "Object storage returned an error");
            return Err(Self::classify(status));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response.content_length();
        let stream = response.bytes_stream().map_err(std::io::Error::other);

        Ok(StoredObject {
            content_type,
            content_length,
            body: Body::from_stream(stream),
        })
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let url = format!("{}/{}", self.objects_url, urlencoding::encode(path));
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(Self::classify(status)),
        }
    }
}

struct MemoryObject {
    content_type: String,
    data: Bytes,
}

/// Bucket held in memory, for local development and tests
#[derive(Default)]
pub struct MemoryObjectStorage {
    objects: RwLock<HashMap<String, MemoryObject>>,
    denied: RwLock<Vec<String>>,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object
    pub fn put(&self, path: &str, content_type: &str, data: impl Into<Bytes>) {
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        objects.insert(
            path.to_string(),
            MemoryObject {
                content_type: content_type.to_string(),
                data: data.into(),
            },
        );
    }

    /// Make every read under `prefix` fail with `Forbidden`
    pub fn deny(&self, prefix: &str) {
        let mut denied = self.denied.write().unwrap_or_else(|e| e.into_inner());
        denied.push(prefix.to_string());
    }

    fn check_access(&self, path: &str) -> Result<(), StorageError> {
        let denied = self.denied.read().unwrap_or_else(|e| e.into_inner());
        if denied.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            return Err(StorageError::Forbidden);
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn fetch(&self, path: &str) -> Result<StoredObject, StorageError> {
        self.check_access(path)?;

        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        let object = objects.get(path).ok_or(StorageError::NotFound)?;

        Ok(StoredObject {
            content_type: Some(object.content_type.clone()),
            content_length: Some(object.data.len() as u64),
            body: Body::from(object.data.clone()),
        })
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        self.check_access(path)?;

        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        Ok(objects.contains_key(path))
    }
}
