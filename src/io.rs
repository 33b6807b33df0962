//! Poll contracts at the byte-stream boundary.
//!
//! These traits are the seam external I/O wrappers implement; the crate
//! itself ships only the in-memory [`Cursor`]. Implementations must
//! absorb `WouldBlock` and `Interrupted` internally, turning them into
//! `Pending` (with a registered waker) or a retry; neither kind ever
//! reaches a caller.

use std::io::{Error, ErrorKind, Result};

use crate::task::{Context, Poll};

/// An asynchronous byte source.
pub trait InputStream {
    /// Reads at most `buf.len()` bytes. `Ready(Ok(0))` means end of
    /// stream (provided `buf` is non-empty).
    fn poll_read(&mut self, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<Result<usize>>;
}

/// An asynchronous byte sink.
pub trait OutputStream {
    fn poll_write(&mut self, cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize>>;

    /// Resolves once every written byte has reached the underlying
    /// device.
    fn poll_flush(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>>;

    /// Flushes and closes. Closing is idempotent; writing after a
    /// successful close is an error.
    fn poll_close(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>>;
}

/// An asynchronous byte stream with a movable position.
pub trait SeekableStream {
    /// Moves the position by `offset` relative to the current one and
    /// resolves to the new absolute position. A zero offset reports the
    /// current position; seeking before the start is `InvalidInput`;
    /// seeking beyond the end is allowed.
    fn poll_seek(&mut self, cx: &mut Context<'_>, offset: i64) -> Poll<Result<u64>>;
}

impl<T: InputStream + ?Sized> InputStream for Box<T> {
    fn poll_read(&mut self, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<Result<usize>> {
        (**self).poll_read(cx, buf)
    }
}

impl<T: OutputStream + ?Sized> OutputStream for Box<T> {
    fn poll_write(&mut self, cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize>> {
        (**self).poll_write(cx, buf)
    }

    fn poll_flush(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        (**self).poll_flush(cx)
    }

    fn poll_close(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        (**self).poll_close(cx)
    }
}

/// Type-erased byte source.
pub type AnyInputStream = Box<dyn InputStream + Send>;

/// Type-erased byte sink.
pub type AnyOutputStream = Box<dyn OutputStream + Send>;

/// In-memory byte stream; the reference implementation of all three
/// contracts.
#[derive(Debug, Default)]
pub struct Cursor {
    data: Vec<u8>,
    position: u64,
    closed: bool,
}

impl Cursor {
    pub fn new(data: Vec<u8>) -> Cursor {
        Cursor { data, position: 0, closed: false }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    pub fn position(&self) -> u64 {
        self.position
    }
}

impl InputStream for Cursor {
    fn poll_read(&mut self, _cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<Result<usize>> {
        let position = self.position.min(self.data.len() as u64) as usize;
        let available = &self.data[position..];
        let count = available.len().min(buf.len());

        buf[..count].copy_from_slice(&available[..count]);
        self.position += count as u64;
        Poll::Ready(Ok(count))
    }
}

impl OutputStream for Cursor {
    fn poll_write(&mut self, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize>> {
        if self.closed {
            return Poll::Ready(Err(Error::new(ErrorKind::BrokenPipe, "stream is closed")));
        }

        // Writing past the end zero-fills the gap first.
        let end = self.position as usize + buf.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }

        let position = self.position as usize;
        self.data[position..end].copy_from_slice(buf);
        self.position = end as u64;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        if self.closed {
            return Poll::Ready(Err(Error::new(ErrorKind::BrokenPipe, "stream is closed")));
        }
        Poll::Ready(Ok(()))
    }

    fn poll_close(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.closed = true;
        Poll::Ready(Ok(()))
    }
}

impl SeekableStream for Cursor {
    fn poll_seek(&mut self, _cx: &mut Context<'_>, offset: i64) -> Poll<Result<u64>> {
        if offset == 0 {
            return Poll::Ready(Ok(self.position));
        }

        let target = self.position as i64 + offset;
        if target < 0 {
            return Poll::Ready(Err(Error::new(
                ErrorKind::InvalidInput,
                "seek before the start of the stream",
            )));
        }

        self.position = target as u64;
        Poll::Ready(Ok(self.position))
    }
}

#[cfg(test)]
mod tests {
    use crate::task::{Context, Poll, Waker};

    use super::*;

    fn with_cx(f: impl FnOnce(&mut Context<'_>)) {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(&waker);
        f(&mut cx);
    }

    #[test]
    fn read_to_eof() {
        with_cx(|cx| {
            let mut cursor = Cursor::new(vec![1, 2, 3]);
            let mut buf = [0u8; 2];

            assert!(matches!(cursor.poll_read(cx, &mut buf), Poll::Ready(Ok(2))));
            assert_eq!(buf, [1, 2]);
            assert!(matches!(cursor.poll_read(cx, &mut buf), Poll::Ready(Ok(1))));
            assert_eq!(buf[0], 3);
            // End of stream.
            assert!(matches!(cursor.poll_read(cx, &mut buf), Poll::Ready(Ok(0))));
        });
    }

    #[test]
    fn write_after_close_is_an_error() {
        with_cx(|cx| {
            let mut cursor = Cursor::default();

            assert!(matches!(cursor.poll_write(cx, b"ab"), Poll::Ready(Ok(2))));
            assert!(matches!(cursor.poll_close(cx), Poll::Ready(Ok(()))));
            assert!(matches!(cursor.poll_close(cx), Poll::Ready(Ok(()))));

            match cursor.poll_write(cx, b"c") {
                Poll::Ready(Err(e)) => assert_eq!(e.kind(), ErrorKind::BrokenPipe),
                other => panic!("unexpected result: {:?}", other),
            }
        });
    }

    #[test]
    fn seek_rules() {
        with_cx(|cx| {
            let mut cursor = Cursor::new(vec![0; 4]);

            assert!(matches!(cursor.poll_seek(cx, 0), Poll::Ready(Ok(0))));
            assert!(matches!(cursor.poll_seek(cx, 2), Poll::Ready(Ok(2))));
            // Beyond the end is allowed.
            assert!(matches!(cursor.poll_seek(cx, 10), Poll::Ready(Ok(12))));

            match cursor.poll_seek(cx, -100) {
                Poll::Ready(Err(e)) => assert_eq!(e.kind(), ErrorKind::InvalidInput),
                other => panic!("unexpected result: {:?}", other),
            }
        });
    }
}
