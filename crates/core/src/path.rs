//! Path parsing and classification
//!
//! Remote paths have the form `bucket[/key]`, optionally prefixed with `s3://`.
//! Whether an argument is local or remote is decided by [`classify`], where an
//! existing local path always wins over the remote interpretation.

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// A parsed remote path pointing to an S3 location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    /// Bucket name
    pub bucket: String,
    /// Object key or prefix (empty for bucket root)
    pub key: String,
}

impl RemotePath {
    /// Create a new RemotePath
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse `bucket[/key]`, accepting an optional `s3://` scheme
    pub fn parse(path: &str) -> Result<Self> {
        let path = path.strip_prefix("s3://").unwrap_or(path);
        let (bucket, key) = match path.split_once('/') {
            Some((bucket, key)) => (bucket, key),
            None => (path, ""),
        };
        if bucket.is_empty() {
            return Err(Error::Usage(format!(
                "invalid remote path '{path}': expected bucket[/key]"
            )));
        }
        Ok(Self::new(bucket, key))
    }

    /// Whether the key addresses a prefix rather than a single object
    pub fn is_dir(&self) -> bool {
        self.key.is_empty() || self.key.ends_with('/')
    }

    /// The key as a directory prefix: empty, or ending in exactly one `/`
    pub fn dir_prefix(&self) -> String {
        let trimmed = self.key.trim_end_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}/")
        }
    }

    /// Path to an object under this bucket
    pub fn with_key(&self, key: impl Into<String>) -> Self {
        Self::new(&self.bucket, key)
    }

    /// Last segment of the key, ignoring a trailing `/`
    pub fn file_name(&self) -> &str {
        let key = self.key.trim_end_matches('/');
        key.rsplit('/').next().unwrap_or(key)
    }
}

impl std::fmt::Display for RemotePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.key.is_empty() {
            write!(f, "{}", self.bucket)
        } else {
            write!(f, "{}/{}", self.bucket, self.key)
        }
    }
}

/// Operation selected for a `cp` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyPlan {
    /// Single local file to a remote object
    UploadFile { local: PathBuf, remote: RemotePath },
    /// Local directory tree to a remote prefix
    UploadDir { local: PathBuf, remote: RemotePath },
    /// Single remote object to a local path
    DownloadObject { remote: RemotePath, local: PathBuf },
    /// Every object under a remote prefix to a local directory
    DownloadPrefix { remote: RemotePath, local: PathBuf },
}

/// Decide what a `cp src dst` invocation means
///
/// Precedence: existing local file, existing local directory, then anything
/// containing a `/` is treated as `bucket/key`.
pub fn classify(src: &str, dst: &str, recursive: bool) -> Result<CopyPlan> {
    let local = Path::new(src);

    if local.is_file() {
        return Ok(CopyPlan::UploadFile {
            local: local.to_path_buf(),
            remote: RemotePath::parse(dst)?,
        });
    }

    if local.is_dir() {
        if !recursive {
            return Err(Error::Usage(format!(
                "source '{src}' is a directory, use --recursive"
            )));
        }
        return Ok(CopyPlan::UploadDir {
            local: local.to_path_buf(),
            remote: RemotePath::parse(dst)?,
        });
    }

    if src.contains('/') {
        let remote = RemotePath::parse(src)?;
        let local = PathBuf::from(dst);
        if recursive {
            return Ok(CopyPlan::DownloadPrefix { remote, local });
        }
        if remote.key.is_empty() {
            return Err(Error::Usage(format!(
                "remote path '{src}' has no object key, use --recursive to copy a prefix"
            )));
        }
        return Ok(CopyPlan::DownloadObject { remote, local });
    }

    Err(Error::Usage(format!("invalid source path: {src}")))
}

/// Object key for a single-file upload
///
/// `bucket` uses the file name, `bucket/dir/` appends the file name to the
/// prefix, and `bucket/name` uses `name` verbatim.
pub fn upload_key(local: &Path, remote: &RemotePath) -> String {
    let file_name = local
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if remote.is_dir() {
        format!("{}{}", remote.key, file_name)
    } else {
        remote.key.clone()
    }
}

/// Join a prefix and a local relative path into an object key
///
/// Separators are normalized to `/` whatever the host OS uses.
pub fn join_key(prefix: &str, relative: &Path) -> String {
    let relative = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    format!("{prefix}{relative}")
}

/// Local path for an object key below a prefix
///
/// Returns `None` when a key segment would not stay a plain file name
/// under `root` (`..`, `.`, drive prefixes, host separators), so a hostile
/// key can never place a file outside the destination.
pub fn local_path_for_key(root: &Path, prefix: &str, key: &str) -> Option<PathBuf> {
    let relative = key.strip_prefix(prefix).unwrap_or(key);
    let mut path = root.to_path_buf();
    for segment in relative.split('/').filter(|s| !s.is_empty()) {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == segment => path.push(name),
            _ => return None,
        }
    }
    Some(path)
}
