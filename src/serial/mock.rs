//! In-memory serial line for tests.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::task::noop_waker;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};

use super::{Result, SerialError, SerialLink};

/// Counters and one-shot faults shared with a [`MockLink`].
#[derive(Clone, Default)]
pub(crate) struct MockHandle {
    clears: Arc<AtomicUsize>,
    fail_next_clear: Arc<AtomicBool>,
    fail_next_write: Arc<AtomicBool>,
    eof_next_read: Arc<AtomicBool>,
}

impl MockHandle {
    pub(crate) fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    /// Next buffer reset fails as if the adapter was unplugged.
    pub(crate) fn fail_next_clear(&self) {
        self.fail_next_clear.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// Next read reports end of stream once, then the line works again.
    pub(crate) fn eof_next_read(&self) {
        self.eof_next_read.store(true, Ordering::SeqCst);
    }
}

pub(crate) struct MockLink {
    inner: DuplexStream,
    handle: MockHandle,
}

/// Host-side link, the device end of the line, and a handle to the link's faults.
pub(crate) fn mock_link() -> (MockLink, DuplexStream, MockHandle) {
    let (host, device) = tokio::io::duplex(256);
    let handle = MockHandle::default();
    let link = MockLink {
        inner: host,
        handle: handle.clone(),
    };
    (link, device, handle)
}

impl SerialLink for MockLink {
    fn clear_buffers(&mut self) -> Result<()> {
        if self.handle.fail_next_clear.swap(false, Ordering::SeqCst) {
            return Err(SerialError::SerialportError(serialport::Error::new(
                serialport::ErrorKind::NoDevice,
                "device unplugged",
            )));
        }

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut scratch = [0u8; 64];
        loop {
            let mut buf = ReadBuf::new(&mut scratch);
            match Pin::new(&mut self.inner).poll_read(&mut cx, &mut buf) {
                Poll::Ready(Ok(())) if !buf.filled().is_empty() => continue,
                Poll::Ready(Err(e)) => return Err(SerialError::IoError(e)),
                _ => break,
            }
        }
        self.handle.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl AsyncRead for MockLink {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.handle.eof_next_read.swap(false, Ordering::SeqCst) {
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for MockLink {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.handle.fail_next_write.swap(false, Ordering::SeqCst) {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "line down")));
        }
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
