//! Content fingerprints
//!
//! The store's ETag is the MD5 of the content only for single-part uploads.
//! Uploads therefore also record the MD5 in user metadata, which is the only
//! usable fingerprint for objects above [`VERIFY_THRESHOLD`].

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use md5::{Digest, Md5};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use crate::error::{Error, Result};
use crate::traits::{ObjectInfo, normalize_etag};

/// Largest object whose ETag is compared against the local MD5
pub const VERIFY_THRESHOLD: u64 = 5 * 1024 * 1024;

/// User metadata key holding the uploader's MD5
pub const METADATA_KEY: &str = "md5sum";

const READ_CHUNK: usize = 64 * 1024;

/// Hex MD5 of a local file
pub async fn file_md5(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| Error::file("Cannot open", path, e))?;

    let mut hasher = Md5::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| Error::file("Cannot read", path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Hex MD5 of an in-memory buffer
pub fn bytes_md5(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Reader that hashes every byte it yields
///
/// The digest is shared with a [`StreamDigest`] handle so it can be read
/// after the reader itself has been handed off and consumed.
pub struct HashingReader<R> {
    inner: R,
    hasher: Arc<Mutex<Md5>>,
}

/// Handle onto the MD5 of whatever a [`HashingReader`] has yielded so far
#[derive(Clone)]
pub struct StreamDigest(Arc<Mutex<Md5>>);

impl<R> HashingReader<R> {
    pub fn new(inner: R) -> (Self, StreamDigest) {
        let hasher = Arc::new(Mutex::new(Md5::new()));
        let digest = StreamDigest(Arc::clone(&hasher));
        (Self { inner, hasher }, digest)
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for HashingReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            let chunk = &buf.filled()[before..];
            if !chunk.is_empty() {
                self.hasher
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .update(chunk);
            }
        }
        poll
    }
}

impl StreamDigest {
    /// Hex MD5 of the bytes streamed so far
    pub fn hex(&self) -> String {
        let hasher = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        hex::encode(hasher.clone().finalize())
    }
}

/// Fingerprint of a remote object comparable with a local MD5, if it has one
pub fn remote_fingerprint(info: &ObjectInfo) -> Option<String> {
    let recorded = info.metadata.get(METADATA_KEY).cloned();
    if info.size() <= VERIFY_THRESHOLD {
        info.etag.as_deref().map(normalize_etag).or(recorded)
    } else {
        recorded
    }
}
