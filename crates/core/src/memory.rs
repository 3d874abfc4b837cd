//! In-memory ObjectStore used by the engine tests

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::fingerprint::{METADATA_KEY, bytes_md5};
use crate::path::RemotePath;
use crate::traits::{
    BucketOptions, DeleteOutcome, ListOptions, ListResult, ObjectInfo, ObjectStore,
    PresignMethod, UploadBody,
};

#[derive(Debug, Clone)]
struct Stored {
    data: Vec<u8>,
    etag: String,
    metadata: HashMap<String, String>,
    content_type: Option<String>,
}

pub struct MemoryStore {
    buckets: Mutex<BTreeMap<String, BTreeMap<String, Stored>>>,
    page_size: usize,
    corrupt_etags: AtomicBool,
    deny_create: AtomicBool,
    failing_keys: Mutex<HashSet<String>>,
    puts: AtomicUsize,
    gets: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(BTreeMap::new()),
            page_size: 1000,
            corrupt_etags: AtomicBool::new(false),
            deny_create: AtomicBool::new(false),
            failing_keys: Mutex::new(HashSet::new()),
            puts: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Return a wrong ETag for every upload from now on
    pub fn corrupt_etags(&self) {
        self.corrupt_etags.store(true, Ordering::SeqCst);
    }

    /// Reject every bucket creation as the store would for a missing permission
    pub fn deny_bucket_creation(&self) {
        self.deny_create.store(true, Ordering::SeqCst);
    }

    /// Make every request touching `key` fail with a network error
    pub fn fail_key(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    pub fn insert_bucket(&self, bucket: &str) {
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default();
    }

    /// Store an object as a previous single-part upload would have
    pub fn insert(&self, bucket: &str, key: &str, data: &[u8]) {
        let md5 = bytes_md5(data);
        self.insert_stored(
            bucket,
            key,
            Stored {
                data: data.to_vec(),
                etag: md5.clone(),
                metadata: HashMap::from([(METADATA_KEY.to_string(), md5)]),
                content_type: None,
            },
        );
    }

    /// Store an object with an opaque ETag and no recorded fingerprint
    pub fn insert_opaque(&self, bucket: &str, key: &str, data: &[u8]) {
        self.insert_stored(
            bucket,
            key,
            Stored {
                data: data.to_vec(),
                etag: format!("{}-2", bytes_md5(b"parts")),
                metadata: HashMap::new(),
                content_type: None,
            },
        );
    }

    fn insert_stored(&self, bucket: &str, key: &str, stored: Stored) {
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), stored);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|s| s.data.clone())
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.lock().unwrap().contains_key(bucket)
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    fn check_failing(&self, key: &str) -> Result<()> {
        if self.failing_keys.lock().unwrap().contains(key) {
            return Err(Error::Network(format!("injected failure for {key}")));
        }
        Ok(())
    }

    fn info(key: &str, stored: &Stored) -> ObjectInfo {
        let mut info = ObjectInfo::file(key, stored.data.len() as i64);
        info.etag = Some(stored.etag.clone());
        info.metadata = stored.metadata.clone();
        info.content_type = stored.content_type.clone();
        info.last_modified = Some(jiff::Timestamp::UNIX_EPOCH);
        info
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_buckets(&self) -> Result<Vec<ObjectInfo>> {
        Ok(self
            .buckets
            .lock()
            .unwrap()
            .keys()
            .map(ObjectInfo::bucket)
            .collect())
    }

    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListResult> {
        let buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get(&path.bucket)
            .ok_or_else(|| Error::NotFound(format!("Bucket not found: {}", path.bucket)))?;

        let prefix = path.key.as_str();
        let mut dirs = BTreeSet::new();
        let mut entries: BTreeMap<String, ObjectInfo> = BTreeMap::new();
        for (key, stored) in objects.range(prefix.to_string()..) {
            let Some(rest) = key.strip_prefix(prefix) else {
                break;
            };
            match rest.find('/') {
                Some(idx) if !options.recursive => {
                    dirs.insert(format!("{prefix}{}", &rest[..=idx]));
                }
                _ => {
                    entries.insert(key.clone(), Self::info(key, stored));
                }
            }
        }
        for dir in dirs {
            entries.insert(dir.clone(), ObjectInfo::dir(dir));
        }

        let start: usize = options
            .continuation_token
            .as_deref()
            .map(|t| t.parse().unwrap_or(0))
            .unwrap_or(0);
        let page = options
            .max_keys
            .map(|m| m as usize)
            .unwrap_or(self.page_size)
            .min(self.page_size);
        let all: Vec<ObjectInfo> = entries.into_values().collect();
        let end = (start + page).min(all.len());
        let truncated = end < all.len();

        Ok(ListResult {
            items: all[start..end].to_vec(),
            truncated,
            continuation_token: truncated.then(|| end.to_string()),
        })
    }

    async fn head_object(&self, path: &RemotePath) -> Result<ObjectInfo> {
        self.check_failing(&path.key)?;
        let buckets = self.buckets.lock().unwrap();
        buckets
            .get(&path.bucket)
            .and_then(|objects| objects.get(&path.key))
            .map(|stored| Self::info(&path.key, stored))
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.has_bucket(bucket))
    }

    async fn create_bucket(&self, bucket: &str, _options: &BucketOptions) -> Result<()> {
        if self.deny_create.load(Ordering::SeqCst) {
            return Err(Error::Credential(format!("AccessDenied: {bucket}")));
        }
        let mut buckets = self.buckets.lock().unwrap();
        if buckets.contains_key(bucket) {
            return Err(Error::General(format!(
                "BucketAlreadyOwnedByYou: {bucket}"
            )));
        }
        buckets.insert(bucket.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let mut buckets = self.buckets.lock().unwrap();
        match buckets.get(bucket) {
            None => Err(Error::NotFound(format!("Bucket not found: {bucket}"))),
            Some(objects) if !objects.is_empty() => {
                Err(Error::General(format!("BucketNotEmpty: {bucket}")))
            }
            Some(_) => {
                buckets.remove(bucket);
                Ok(())
            }
        }
    }

    async fn get_object(
        &self,
        path: &RemotePath,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64> {
        self.check_failing(&path.key)?;
        let data = self
            .object(&path.bucket, &path.key)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        self.gets.fetch_add(1, Ordering::SeqCst);
        writer.write_all(&data).await?;
        writer.flush().await?;
        Ok(data.len() as u64)
    }

    async fn put_object(&self, path: &RemotePath, mut body: UploadBody) -> Result<ObjectInfo> {
        let mut data = Vec::with_capacity(body.size as usize);
        body.reader.read_to_end(&mut data).await?;
        self.check_failing(&path.key)?;
        if !self.has_bucket(&path.bucket) {
            return Err(Error::NotFound(format!("Bucket not found: {}", path.bucket)));
        }
        self.puts.fetch_add(1, Ordering::SeqCst);

        let etag = if self.corrupt_etags.load(Ordering::SeqCst) {
            "00000000000000000000000000000000".to_string()
        } else {
            bytes_md5(&data)
        };
        let stored = Stored {
            data,
            etag: format!("\"{etag}\""),
            metadata: body.metadata,
            content_type: body.content_type,
        };
        let mut info = Self::info(&path.key, &stored);
        info.etag = Some(crate::traits::normalize_etag(&stored.etag));
        self.insert_stored(&path.bucket, &path.key, stored);
        Ok(info)
    }

    async fn delete_object(&self, path: &RemotePath) -> Result<()> {
        self.check_failing(&path.key)?;
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get_mut(&path.bucket)
            .ok_or_else(|| Error::NotFound(format!("Bucket not found: {}", path.bucket)))?;
        objects.remove(&path.key);
        Ok(())
    }

    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> Result<DeleteOutcome> {
        let failing = self.failing_keys.lock().unwrap().clone();
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| Error::NotFound(format!("Bucket not found: {bucket}")))?;

        let mut outcome = DeleteOutcome::default();
        for key in keys {
            if failing.contains(&key) {
                outcome.failed.push((key, "AccessDenied".to_string()));
            } else {
                objects.remove(&key);
                outcome.deleted.push(key);
            }
        }
        Ok(outcome)
    }

    async fn presign(
        &self,
        path: &RemotePath,
        method: PresignMethod,
        expires_in: Duration,
    ) -> Result<String> {
        Ok(format!(
            "https://memory.invalid/{}/{}?X-Amz-Expires={}&x-method={method}",
            path.bucket,
            path.key,
            expires_in.as_secs()
        ))
    }
}
