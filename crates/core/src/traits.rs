//! ObjectStore trait definition
//!
//! This trait defines the interface for S3-compatible storage operations.
//! It allows the engine to be decoupled from the specific S3 SDK implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Error, Result};
use crate::path::RemotePath;

/// Page size used when listing exhaustively
pub const LIST_PAGE_SIZE: i32 = 1000;

/// Metadata for an object or bucket
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object key or bucket name
    pub key: String,

    /// Size in bytes (None for buckets and prefixes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,

    /// Human-readable size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_human: Option<String>,

    /// Last modified timestamp (creation time for buckets)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<jiff::Timestamp>,

    /// ETag with surrounding quotes stripped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Storage class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,

    /// Content type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// User metadata without the `x-amz-meta-` prefix
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,

    /// Whether this is a directory/prefix
    pub is_dir: bool,
}

impl ObjectInfo {
    /// Create a new ObjectInfo for a file
    pub fn file(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size_bytes: Some(size),
            size_human: Some(humansize::format_size(size.max(0) as u64, humansize::BINARY)),
            ..Default::default()
        }
    }

    /// Create a new ObjectInfo for a directory/prefix
    pub fn dir(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            is_dir: true,
            ..Default::default()
        }
    }

    /// Create a new ObjectInfo for a bucket
    pub fn bucket(name: impl Into<String>) -> Self {
        Self::dir(name)
    }

    /// Size as an unsigned byte count
    pub fn size(&self) -> u64 {
        self.size_bytes.unwrap_or(0).max(0) as u64
    }
}

/// Strip the quotes S3 puts around ETags
pub fn normalize_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

/// Result of a list operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResult {
    /// Listed objects
    pub items: Vec<ObjectInfo>,

    /// Whether the result is truncated (more items available)
    pub truncated: bool,

    /// Continuation token for pagination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

/// Options for list operations
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Maximum number of keys to return per request
    pub max_keys: Option<i32>,

    /// Delimiter for grouping (usually "/")
    pub delimiter: Option<String>,

    /// Continuation token for pagination
    pub continuation_token: Option<String>,

    /// Whether to list recursively (ignore delimiter)
    pub recursive: bool,
}

/// Canned ACL applied at bucket creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BucketAcl {
    #[default]
    Private,
    PublicRead,
}

impl BucketAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketAcl::Private => "private",
            BucketAcl::PublicRead => "public-read",
        }
    }
}

/// Options for bucket creation
#[derive(Debug, Clone, Default)]
pub struct BucketOptions {
    /// Location constraint; store default when absent
    pub region: Option<String>,
    pub acl: BucketAcl,
}

/// HTTP method a presigned URL grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PresignMethod {
    Get,
    Put,
}

impl std::str::FromStr for PresignMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "PUT" => Ok(Self::Put),
            _ => Err(Error::Usage(format!(
                "unsupported method: {s} (use GET or PUT)"
            ))),
        }
    }
}

impl std::fmt::Display for PresignMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

/// Request body for an upload
pub struct UploadBody {
    /// Byte source; read exactly once
    pub reader: Box<dyn AsyncRead + Send + Sync + Unpin>,
    /// Exact number of bytes the reader yields
    pub size: u64,
    pub content_type: Option<String>,
    /// User metadata, sent as `x-amz-meta-*`
    pub metadata: HashMap<String, String>,
}

/// Outcome of a bulk delete request
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteOutcome {
    /// Keys the store reported as deleted
    pub deleted: Vec<String>,
    /// Keys the store refused, with its reason
    pub failed: Vec<(String, String)>,
}

/// Trait for S3-compatible storage operations
///
/// This trait is implemented by the S3 adapter and by in-memory fakes in tests.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List buckets
    async fn list_buckets(&self) -> Result<Vec<ObjectInfo>>;

    /// List one page of objects under a bucket or prefix
    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListResult>;

    /// Get object metadata, including user metadata
    async fn head_object(&self, path: &RemotePath) -> Result<ObjectInfo>;

    /// Check if a bucket exists
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    /// Create a bucket
    async fn create_bucket(&self, bucket: &str, options: &BucketOptions) -> Result<()>;

    /// Delete an empty bucket
    async fn delete_bucket(&self, bucket: &str) -> Result<()>;

    /// Stream an object's content into `writer`, returning the byte count
    async fn get_object(
        &self,
        path: &RemotePath,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64>;

    /// Upload an object, returning its metadata with the store's ETag
    async fn put_object(&self, path: &RemotePath, body: UploadBody) -> Result<ObjectInfo>;

    /// Delete a single object
    async fn delete_object(&self, path: &RemotePath) -> Result<()>;

    /// Delete up to 1000 objects in one request
    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> Result<DeleteOutcome>;

    /// Generate a time-limited URL for one object
    async fn presign(
        &self,
        path: &RemotePath,
        method: PresignMethod,
        expires_in: Duration,
    ) -> Result<String>;
}

/// List every object under `path`, following continuation tokens
pub async fn list_all(
    store: &dyn ObjectStore,
    path: &RemotePath,
    recursive: bool,
) -> Result<Vec<ObjectInfo>> {
    let mut items = Vec::new();
    let mut continuation_token: Option<String> = None;

    loop {
        let options = ListOptions {
            recursive,
            max_keys: Some(LIST_PAGE_SIZE),
            continuation_token: continuation_token.take(),
            ..Default::default()
        };

        let page = store.list_objects(path, options).await?;
        items.extend(page.items);

        match page.continuation_token {
            Some(token) if page.truncated => continuation_token = Some(token),
            _ => break,
        }
    }

    Ok(items)
}
