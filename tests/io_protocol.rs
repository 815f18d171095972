//! # I/O Protocol Integration Tests
//!
//! This module tests the buffer's fill/flush protocol against bound
//! adapters.
//!
//! ## Test Coverage
//!
//! 1. Flush Semantics
//!    - A consuming flush writes every buffered byte in append order and
//!      empties the buffer
//!    - A peek flush writes the same bytes without consuming, so repeating
//!      it writes them again
//!    - Appends against a full tail flush before growing when bound
//!
//! 2. Pass-Through Writes
//!    - Shared payloads above the write threshold bypass buffering: the
//!      buffered prefix flushes first, then the payload goes straight to
//!      the adapter
//!
//! 3. Fill Semantics
//!    - `ensure_readable` pulls until satisfied and stops at end of stream,
//!      keeping already-pulled bytes buffered
//!    - Blocking reads pull once when starved; end of stream is `Ok`, not
//!      an error
//!    - Pulls never exceed the configured pull size
//!
//! 4. Adapter Failure
//!    - Flushing through a read-only adapter surfaces the transport error

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Cursor;
use std::rc::Rc;

use bytes::Bytes;
use eyre::{bail, Result};
use segbuf::config::PAGE_SIZE;
use segbuf::{IoAdapter, SlabPool, SourceIo, StreamBuffer, StreamIo};

/// Write-only adapter that records every `write_all` call, sharing the
/// record with the test through an `Rc`.
struct RecordingSink {
    writes: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl RecordingSink {
    fn new() -> (Self, Rc<RefCell<Vec<Vec<u8>>>>) {
        let writes = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                writes: Rc::clone(&writes),
            },
            writes,
        )
    }
}

impl IoAdapter for RecordingSink {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.writes.borrow_mut().push(bytes.to_vec());
        Ok(())
    }

    fn partial_read(&mut self, _max_len: usize, buf: &mut Vec<u8>) -> Result<usize> {
        buf.clear();
        Ok(0)
    }
}

/// Read-only adapter that serves a fixed script of reads, then reports
/// end of stream forever.
struct ScriptedSource {
    reads: VecDeque<Vec<u8>>,
}

impl ScriptedSource {
    fn new(reads: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            reads: reads.into_iter().collect(),
        }
    }
}

impl IoAdapter for ScriptedSource {
    fn write_all(&mut self, _bytes: &[u8]) -> Result<()> {
        bail!("test source does not accept writes")
    }

    fn partial_read(&mut self, max_len: usize, buf: &mut Vec<u8>) -> Result<usize> {
        buf.clear();
        if let Some(chunk) = self.reads.pop_front() {
            assert!(chunk.len() <= max_len, "script exceeds the pull size");
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.len())
    }
}

fn buffer() -> StreamBuffer {
    StreamBuffer::new(SlabPool::new())
}

fn flatten(writes: &Rc<RefCell<Vec<Vec<u8>>>>) -> Vec<u8> {
    writes.borrow().iter().flatten().copied().collect()
}

// ============================================================================
// Flush Tests
// ============================================================================

#[test]
fn test_flush_writes_buffered_bytes_in_order_and_consumes() {
    let mut buf = buffer();
    let mut expected = Vec::new();
    for round in 0..3u8 {
        let piece = vec![round; PAGE_SIZE + 5];
        expected.extend_from_slice(&piece);
        buf.append(&piece).unwrap();
    }

    let (sink, writes) = RecordingSink::new();
    buf.bind_io(Box::new(sink));

    let written = buf.flush().unwrap();
    assert_eq!(written, expected.len());
    assert_eq!(flatten(&writes), expected);
    assert!(buf.is_empty());

    // Nothing left: a second flush is a no-op.
    assert_eq!(buf.flush().unwrap(), 0);
    assert_eq!(flatten(&writes).len(), expected.len());
}

#[test]
fn test_peek_flush_keeps_content_and_repeats_verbatim() {
    let mut buf = buffer();
    buf.append(b"first").unwrap();
    buf.append(&[0x77; PAGE_SIZE]).unwrap(); // force a second chunk
    let total = buf.all_readable_size();

    let (mut sink, writes) = RecordingSink::new();
    assert_eq!(buf.flush_to(&mut sink, false).unwrap(), total);
    assert_eq!(buf.all_readable_size(), total, "peek flush never consumes");

    // Mirroring again writes the identical bytes a second time.
    assert_eq!(buf.flush_to(&mut sink, false).unwrap(), total);
    let flat = flatten(&writes);
    assert_eq!(flat.len(), total * 2);
    assert_eq!(flat[..total], flat[total..]);
}

#[test]
fn test_bound_append_flushes_before_growing() {
    let mut buf = buffer();
    buf.append(&[0x01; PAGE_SIZE]).unwrap();
    assert_eq!(buf.writable_size(), 0);

    let (sink, writes) = RecordingSink::new();
    buf.bind_io(Box::new(sink));

    // The tail is full, so the overflow flushes the buffered page instead
    // of chaining a new chunk onto it.
    buf.append(&[0x02; 10]).unwrap();
    assert_eq!(flatten(&writes), vec![0x01; PAGE_SIZE]);
    assert_eq!(buf.all_readable_size(), 10);
}

// ============================================================================
// Pass-Through Tests
// ============================================================================

#[test]
fn test_large_shared_payload_passes_through_the_adapter() {
    let mut buf = buffer();
    let (sink, writes) = RecordingSink::new();
    buf.bind_io(Box::new(sink));

    let payload = Bytes::from(vec![0xCD; 1024 * 1024]);
    buf.append(b"ab").unwrap();
    buf.append_shared(payload.clone()).unwrap();

    // Ordering is preserved: buffered prefix first, then the payload in a
    // single un-buffered write.
    let recorded = writes.borrow();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0], b"ab");
    assert_eq!(recorded[1], payload);
    drop(recorded);

    assert!(buf.is_empty(), "pass-through leaves nothing buffered");
}

#[test]
fn test_small_shared_payload_stays_buffered() {
    let mut buf = buffer();
    let (sink, writes) = RecordingSink::new();
    buf.bind_io(Box::new(sink));

    buf.append_shared(Bytes::from_static(b"tiny")).unwrap();
    assert!(writes.borrow().is_empty(), "below threshold never flushes");
    assert_eq!(buf.all_readable_size(), 4);
}

// ============================================================================
// Fill Tests
// ============================================================================

#[test]
fn test_ensure_readable_stops_at_end_of_stream() {
    let mut buf = buffer();
    buf.bind_io(Box::new(ScriptedSource::new([vec![0xAA; 100]])));

    // The stream ends after 100 bytes, so 150 cannot be produced; the 100
    // already pulled must stay readable.
    assert!(!buf.ensure_readable(150).unwrap());
    assert_eq!(buf.all_readable_size(), 100);

    let mut out = [0u8; 100];
    assert_eq!(buf.read_nonblock(&mut out), 100);
    assert_eq!(out, [0xAA; 100]);
}

#[test]
fn test_ensure_readable_pulls_until_satisfied() {
    let mut buf = buffer();
    buf.bind_io(Box::new(ScriptedSource::new([
        vec![1u8; 60],
        vec![2u8; 60],
        vec![3u8; 60],
    ])));

    assert!(buf.ensure_readable(150).unwrap());
    assert_eq!(buf.all_readable_size(), 180, "whole pulls are kept");
}

#[test]
fn test_ensure_readable_unbound_is_short_not_an_error() {
    let mut buf = buffer();
    buf.append(b"abc").unwrap();
    assert!(buf.ensure_readable(3).unwrap());
    assert!(!buf.ensure_readable(4).unwrap());
    assert_eq!(buf.all_readable_size(), 3);
}

#[test]
fn test_read_byte_pulls_once_then_reports_starvation() {
    let mut buf = buffer();
    buf.bind_io(Box::new(ScriptedSource::new([vec![b'z']])));

    assert_eq!(buf.read_byte().unwrap(), Some(b'z'));
    assert_eq!(buf.read_byte().unwrap(), None, "end of stream is Ok(None)");
}

#[test]
fn test_read_exact_spans_multiple_pulls() {
    let mut buf = buffer();
    buf.bind_io(Box::new(ScriptedSource::new([
        b"hello ".to_vec(),
        b"world".to_vec(),
    ])));

    let mut out = [0u8; 11];
    assert!(buf.read_exact(&mut out).unwrap());
    assert_eq!(&out, b"hello world");

    let mut more = [0u8; 1];
    assert!(!buf.read_exact(&mut more).unwrap());
}

#[test]
fn test_fill_respects_the_pull_size() {
    let mut buf = buffer();
    buf.set_io_pull_size(0); // clamps to the 1 KiB floor
    let pull_size = buf.io_pull_size();

    buf.bind_io(Box::new(StreamIo::new(Cursor::new(vec![0x55u8; 100 * 1024]))));
    let pulled = buf.fill_from_io().unwrap();
    assert_eq!(pulled, pull_size);
    assert_eq!(buf.all_readable_size(), pull_size);
}

#[test]
fn test_unbind_returns_the_buffer_to_starved_reads() {
    let mut buf = buffer();
    buf.bind_io(Box::new(ScriptedSource::new([b"xy".to_vec()])));
    assert_eq!(buf.read_byte().unwrap(), Some(b'x'));

    assert!(buf.unbind_io().is_some());
    assert!(!buf.has_io());

    // The byte already pulled is still buffered; after that, starved.
    assert_eq!(buf.read_byte().unwrap(), Some(b'y'));
    assert_eq!(buf.read_byte().unwrap(), None);
}

// ============================================================================
// Round-Trip Through an Adapter
// ============================================================================

#[test]
fn test_flush_then_refill_round_trips_through_a_stream() {
    let message: Vec<u8> = (0..u8::MAX).cycle().take(PAGE_SIZE * 3 + 41).collect();

    // Producer side: buffer, then flush into an in-memory stream.
    let mut writer = buffer();
    writer.append(&message).unwrap();
    let mut transport = StreamIo::new(Cursor::new(Vec::new()));
    writer.flush_to(&mut transport, true).unwrap();
    assert!(writer.is_empty());

    // Consumer side: rewind and pull everything back out.
    let mut cursor = transport.into_inner();
    cursor.set_position(0);
    let mut reader = buffer();
    reader.bind_io(Box::new(SourceIo::new(cursor)));

    let mut out = vec![0u8; message.len()];
    assert!(reader.read_exact(&mut out).unwrap());
    assert_eq!(out, message);
    assert_eq!(reader.read_byte().unwrap(), None);
}

// ============================================================================
// Adapter Failure Tests
// ============================================================================

#[test]
fn test_flush_through_a_read_only_adapter_fails() {
    let mut buf = buffer();
    buf.append(b"doomed").unwrap();
    buf.bind_io(Box::new(SourceIo::new(Cursor::new(Vec::new()))));

    assert!(buf.flush().is_err());
}
