//! # I/O Adapter Boundary
//!
//! The buffer consumes streams through the [`IoAdapter`] trait, the Rust
//! rendering of the host's duck-typed stream contract: a "write all bytes"
//! operation for flushing and a "partial read" operation for pulling.
//!
//! ## Contract
//!
//! - `write_all` either writes every byte or fails with a transport error.
//! - `partial_read` replaces the contents of the reusable pull buffer with
//!   up to `max_len` bytes and returns the number filled. A count of zero
//!   means end of stream and is NOT an error at this layer; the caller
//!   decides whether running dry is an end-of-data condition.
//!
//! ## Provided Adapters
//!
//! - [`StreamIo`]: duplex wrapper over any `Read + Write` (sockets,
//!   `Cursor<Vec<u8>>`, files).
//! - [`SourceIo`]: read side only; flushing through it is a transport error.
//! - [`SinkIo`]: write side only; pulling from it reports end of stream.

use eyre::{bail, Result};
use std::io::{Read, Write};

/// Duck-typed stream capability consumed by the buffer.
pub trait IoAdapter {
    /// Writes every byte of `bytes` or fails.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Replaces `buf` with up to `max_len` bytes from the stream and returns
    /// the filled length. Zero means end of stream.
    fn partial_read(&mut self, max_len: usize, buf: &mut Vec<u8>) -> Result<usize>;
}

/// Adapter over a duplex std stream.
pub struct StreamIo<T> {
    inner: T,
}

impl<T> StreamIo<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Write> IoAdapter for StreamIo<T> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    fn partial_read(&mut self, max_len: usize, buf: &mut Vec<u8>) -> Result<usize> {
        buf.resize(max_len, 0);
        let filled = self.inner.read(buf)?;
        buf.truncate(filled);
        Ok(filled)
    }
}

/// Read-only adapter; binding it still lets the buffer flush fail loudly
/// instead of silently dropping bytes.
pub struct SourceIo<R> {
    inner: R,
}

impl<R> SourceIo<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> IoAdapter for SourceIo<R> {
    fn write_all(&mut self, _bytes: &[u8]) -> Result<()> {
        bail!("adapter is read-only")
    }

    fn partial_read(&mut self, max_len: usize, buf: &mut Vec<u8>) -> Result<usize> {
        buf.resize(max_len, 0);
        let filled = self.inner.read(buf)?;
        buf.truncate(filled);
        Ok(filled)
    }
}

/// Write-only adapter; pulling from it reports end of stream.
pub struct SinkIo<W> {
    inner: W,
}

impl<W> SinkIo<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> IoAdapter for SinkIo<W> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    fn partial_read(&mut self, _max_len: usize, buf: &mut Vec<u8>) -> Result<usize> {
        buf.clear();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn stream_io_partial_read_truncates_to_filled() {
        let mut io = StreamIo::new(Cursor::new(vec![1u8, 2, 3]));
        let mut buf = Vec::new();

        let filled = io.partial_read(16, &mut buf).unwrap();
        assert_eq!(filled, 3);
        assert_eq!(buf, vec![1, 2, 3]);

        let filled = io.partial_read(16, &mut buf).unwrap();
        assert_eq!(filled, 0, "exhausted cursor reports end of stream");
        assert!(buf.is_empty());
    }

    #[test]
    fn source_io_rejects_writes() {
        let mut io = SourceIo::new(Cursor::new(vec![0u8; 4]));
        assert!(io.write_all(b"x").is_err());
    }

    #[test]
    fn sink_io_reports_end_of_stream() {
        let mut io = SinkIo::new(Vec::new());
        io.write_all(b"abc").unwrap();
        assert_eq!(io.get_ref(), b"abc");

        let mut buf = vec![9u8; 8];
        assert_eq!(io.partial_read(8, &mut buf).unwrap(), 0);
        assert!(buf.is_empty());
    }
}
