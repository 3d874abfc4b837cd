//! Byte-level progress reporting
//!
//! Transfers report progress while bytes move: uploads through
//! [`ProgressReader`], downloads through [`ProgressWriter`]. The sink is a
//! single running counter and is only ever driven from one task.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Receiver of transfer progress
#[cfg_attr(test, mockall::automock)]
pub trait Progress: Send + Sync {
    /// Set the total number of bytes the operation will move
    fn begin(&self, total_bytes: u64);

    /// Record `bytes` more bytes transferred
    fn advance(&self, bytes: u64);

    /// The operation is over, successfully or not
    fn finish(&self);
}

/// Progress sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn begin(&self, _total_bytes: u64) {}
    fn advance(&self, _bytes: u64) {}
    fn finish(&self) {}
}

/// Reader that reports every chunk it yields
pub struct ProgressReader<R> {
    inner: R,
    progress: Arc<dyn Progress>,
}

impl<R> ProgressReader<R> {
    pub fn new(inner: R, progress: Arc<dyn Progress>) -> Self {
        Self { inner, progress }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            let read = buf.filled().len() - before;
            if read > 0 {
                self.progress.advance(read as u64);
            }
        }
        poll
    }
}

/// Writer that reports every chunk it accepts
pub struct ProgressWriter<W> {
    inner: W,
    progress: Arc<dyn Progress>,
}

impl<W> ProgressWriter<W> {
    pub fn new(inner: W, progress: Arc<dyn Progress>) -> Self {
        Self { inner, progress }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for ProgressWriter<W> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let poll = Pin::new(&mut self.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(written)) = &poll {
            self.progress.advance(*written as u64);
        }
        poll
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
