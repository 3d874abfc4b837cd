//! Single-object transfers
//!
//! Uploads record the local MD5 as user metadata, then stream the file
//! through a [`ProgressReader`] while hashing the bytes actually sent. Objects
//! up to [`VERIFY_THRESHOLD`] are checked against the ETag the store returns. Downloads stream into a `.part`
//! sibling of the destination and rename it into place once complete.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::fingerprint::{HashingReader, METADATA_KEY, VERIFY_THRESHOLD, file_md5};
use crate::path::RemotePath;
use crate::progress::{Progress, ProgressReader, ProgressWriter};
use crate::traits::{ObjectInfo, ObjectStore, UploadBody, normalize_etag};

/// Which way bytes move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Upload,
    Download,
}

/// One file to move, produced by a scan and consumed exactly once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTask {
    pub local: PathBuf,
    pub remote: RemotePath,
    pub direction: Direction,
    /// Size observed during the scan
    pub size_bytes: u64,
}

impl TransferTask {
    pub fn upload(local: PathBuf, remote: RemotePath, size_bytes: u64) -> Self {
        Self {
            local,
            remote,
            direction: Direction::Upload,
            size_bytes,
        }
    }

    pub fn download(remote: RemotePath, local: PathBuf, size_bytes: u64) -> Self {
        Self {
            local,
            remote,
            direction: Direction::Download,
            size_bytes,
        }
    }

    pub fn source(&self) -> String {
        match self.direction {
            Direction::Upload => self.local.display().to_string(),
            Direction::Download => self.remote.to_string(),
        }
    }

    pub fn destination(&self) -> String {
        match self.direction {
            Direction::Upload => self.remote.to_string(),
            Direction::Download => self.local.display().to_string(),
        }
    }

    /// Execute the task against `store`
    pub async fn run(&self, store: &dyn ObjectStore, progress: Arc<dyn Progress>) -> Result<()> {
        match self.direction {
            Direction::Upload => upload_file(store, &self.local, &self.remote, progress)
                .await
                .map(|_| ()),
            Direction::Download => download_object(store, &self.remote, &self.local, progress)
                .await
                .map(|_| ()),
        }
    }
}

/// Upload one local file to `remote`
///
/// The MD5 has to travel as request metadata, so the file is hashed once
/// before the upload and again as it streams. A file that changes in between
/// fails the upload, since the recorded `md5sum` no longer describes the
/// stored bytes.
pub async fn upload_file(
    store: &dyn ObjectStore,
    local: &Path,
    remote: &RemotePath,
    progress: Arc<dyn Progress>,
) -> Result<ObjectInfo> {
    let size = tokio::fs::metadata(local)
        .await
        .map_err(|e| Error::file("Cannot stat", local, e))?
        .len();
    let md5 = file_md5(local).await?;

    let file = tokio::fs::File::open(local)
        .await
        .map_err(|e| Error::file("Cannot open", local, e))?;
    let content_type = mime_guess::from_path(local)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    let (reader, streamed) = HashingReader::new(ProgressReader::new(file, progress));
    let body = UploadBody {
        reader: Box::new(reader),
        size,
        content_type: Some(content_type),
        metadata: HashMap::from([(METADATA_KEY.to_string(), md5.clone())]),
    };

    tracing::debug!(local = %local.display(), remote = %remote, size, "uploading");
    let info = store.put_object(remote, body).await?;

    let sent = streamed.hex();
    if sent != md5 {
        return Err(Error::General(format!(
            "{} changed while uploading to {remote}",
            local.display()
        )));
    }

    if size <= VERIFY_THRESHOLD {
        let remote_etag = info.etag.as_deref().map(normalize_etag).unwrap_or_default();
        if remote_etag != sent {
            return Err(Error::Integrity {
                key: remote.key.clone(),
                local: sent,
                remote: remote_etag,
            });
        }
    }

    Ok(info)
}

/// Where a single-object download lands
///
/// An existing directory receives the object under its last key segment,
/// anything else is used verbatim.
pub fn download_target(remote: &RemotePath, local: &Path) -> PathBuf {
    if local.is_dir() {
        local.join(remote.file_name())
    } else {
        local.to_path_buf()
    }
}

/// Download one object to exactly `dest`, returning the byte count
pub async fn download_object(
    store: &dyn ObjectStore,
    remote: &RemotePath,
    dest: &Path,
    progress: Arc<dyn Progress>,
) -> Result<u64> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::file("Cannot create directory", parent, e))?;
    }

    let part = part_path(dest);
    let file = tokio::fs::File::create(&part)
        .await
        .map_err(|e| Error::file("Cannot create", &part, e))?;

    tracing::debug!(remote = %remote, local = %dest.display(), "downloading");
    let mut writer = ProgressWriter::new(file, progress);
    let written = match store.get_object(remote, &mut writer).await {
        Ok(n) => n,
        Err(e) => {
            drop(writer);
            if let Err(cleanup) = tokio::fs::remove_file(&part).await {
                tracing::debug!(path = %part.display(), error = %cleanup, "could not remove partial file");
            }
            return Err(e);
        }
    };

    let mut file = writer.into_inner();
    file.flush()
        .await
        .map_err(|e| Error::file("Cannot write", &part, e))?;
    drop(file);

    tokio::fs::rename(&part, dest)
        .await
        .map_err(|e| Error::file("Cannot rename", &part, e))?;
    Ok(written)
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("download"));
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::bytes_md5;
    use crate::memory::MemoryStore;
    use crate::progress::NoProgress;
    use tempfile::TempDir;

    fn no_progress() -> Arc<dyn Progress> {
        Arc::new(NoProgress)
    }

    #[tokio::test]
    async fn test_upload_then_download_is_identical() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("data.bin");
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&src, &content).unwrap();

        let store = MemoryStore::new();
        store.insert_bucket("b");
        let remote = RemotePath::new("b", "run/data.bin");

        let info = upload_file(&store, &src, &remote, no_progress()).await.unwrap();
        assert_eq!(info.etag.as_deref(), Some(bytes_md5(&content).as_str()));

        let dest = dir.path().join("out").join("copy.bin");
        let n = download_object(&store, &remote, &dest, no_progress())
            .await
            .unwrap();
        assert_eq!(n, content.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), content);
        assert_eq!(
            file_md5(&src).await.unwrap(),
            file_md5(&dest).await.unwrap()
        );
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_upload_records_md5_and_content_type() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("notes.txt");
        std::fs::write(&src, "hello world").unwrap();

        let store = MemoryStore::new();
        store.insert_bucket("b");
        let remote = RemotePath::new("b", "notes.txt");
        upload_file(&store, &src, &remote, no_progress()).await.unwrap();

        let head = store.head_object(&remote).await.unwrap();
        assert_eq!(
            head.metadata.get(METADATA_KEY).map(String::as_str),
            Some("5eb63bbbe01eeed093cb22bb8f5acdc3")
        );
        assert_eq!(head.content_type.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_small_upload_with_bad_etag_fails_integrity() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("small.bin");
        std::fs::write(&src, vec![1u8; 10 * 1024]).unwrap();

        let store = MemoryStore::new();
        store.insert_bucket("b");
        store.corrupt_etags();
        let remote = RemotePath::new("b", "small.bin");

        let err = upload_file(&store, &src, &remote, no_progress())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Integrity { .. }));
        assert_eq!(err.exit_code(), 6);
        // The object is left in place
        assert!(store.object("b", "small.bin").is_some());
    }

    /// Rewrites the last byte of a file once the first chunk has been read
    struct RewriteTail {
        path: PathBuf,
        done: std::sync::atomic::AtomicBool,
    }

    impl Progress for RewriteTail {
        fn begin(&self, _total_bytes: u64) {}

        fn advance(&self, _bytes: u64) {
            use std::io::{Seek, SeekFrom, Write};
            if self.done.swap(true, std::sync::atomic::Ordering::SeqCst) {
                return;
            }
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .open(&self.path)
                .unwrap();
            file.seek(SeekFrom::End(-1)).unwrap();
            file.write_all(&[0xff]).unwrap();
        }

        fn finish(&self) {}
    }

    #[tokio::test]
    async fn test_file_changed_mid_upload_is_reported() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("growing.bin");
        // Larger than one file read, below the ETag threshold
        std::fs::write(&src, vec![0u8; 3 * 1024 * 1024]).unwrap();

        let store = MemoryStore::new();
        store.insert_bucket("b");
        let remote = RemotePath::new("b", "growing.bin");
        let progress = Arc::new(RewriteTail {
            path: src.clone(),
            done: Default::default(),
        });

        let err = upload_file(&store, &src, &remote, progress)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::General(_)));
        assert!(err.to_string().contains("changed while uploading"));
    }

    #[tokio::test]
    async fn test_large_upload_skips_etag_check() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("large.bin");
        let file = std::fs::File::create(&src).unwrap();
        file.set_len(50 * 1024 * 1024).unwrap();
        drop(file);

        let store = MemoryStore::new();
        store.insert_bucket("b");
        store.corrupt_etags();
        let remote = RemotePath::new("b", "large.bin");

        let info = upload_file(&store, &src, &remote, no_progress()).await.unwrap();
        assert_eq!(info.size(), 50 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let store = MemoryStore::new();
        store.insert_bucket("b");
        let err = upload_file(
            &store,
            Path::new("/no/such/file"),
            &RemotePath::new("b", "k"),
            no_progress(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::File { .. }));
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.insert_bucket("b");

        let dest = dir.path().join("missing.bin");
        let err = download_object(&store, &RemotePath::new("b", "missing.bin"), &dest, no_progress())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn test_download_target_existing_dir_uses_key_name() {
        let dir = TempDir::new().unwrap();
        let remote = RemotePath::new("b", "a/b/report.csv");
        assert_eq!(
            download_target(&remote, dir.path()),
            dir.path().join("report.csv")
        );

        let explicit = dir.path().join("renamed.csv");
        assert_eq!(download_target(&remote, &explicit), explicit);
    }

    #[test]
    fn test_task_display() {
        let task = TransferTask::upload(
            PathBuf::from("/tmp/a.txt"),
            RemotePath::new("b", "p/a.txt"),
            3,
        );
        assert_eq!(task.source(), "/tmp/a.txt");
        assert_eq!(task.destination(), "b/p/a.txt");
    }
}
