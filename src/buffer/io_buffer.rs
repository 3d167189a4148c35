//! Growable read/write buffer backed by the slab pool

use super::growth::{
    grow_capacity, should_compact, DEFAULT_SIZE, MAX_BUFFER_LENGTH, MIN_READ,
};
use crate::error::{Error, Result};
use crate::pool::{get_bytes, put_bytes, Storage};
use std::fmt;
use std::io;
use tracing::trace;

/// A growable byte buffer with separate read and write cursors.
///
/// Owns at most one block of pooled backing storage. The write cursor is
/// the storage's logical length; `off` is the next unread byte. Writes
/// extend the tail, growing in place when the capacity allows, otherwise
/// compacting already-read prefix bytes away or reallocating through the
/// pool. Single-owner: not safe for concurrent use (wrap in [`crate::Pipe`]
/// for producer/consumer access).
///
/// `free` is the only operation that returns the backing to the pool;
/// `reset` clears the cursors but keeps the backing for reuse.
pub struct IoBuffer {
    storage: Option<Storage>,
    /// Next unread byte
    off: usize,
    /// Saved read position for `restore`
    mark: Option<usize>,
    eof: bool,
}

impl IoBuffer {
    /// An empty buffer with no backing storage.
    pub fn new() -> Self {
        Self {
            storage: None,
            off: 0,
            mark: None,
            eof: false,
        }
    }

    /// A buffer with pooled backing of at least `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buf = Self::new();
        buf.alloc(capacity);
        buf
    }

    /// Acquire backing storage, freeing any currently held block first.
    /// A zero size falls back to a small default.
    pub fn alloc(&mut self, size: usize) {
        if self.storage.is_some() {
            self.free();
        }
        let size = if size == 0 { DEFAULT_SIZE } else { size };
        let mut storage = get_bytes(size);
        storage.set_len(0);
        self.storage = Some(storage);
    }

    /// Return the backing storage to the pool. Subsequent writes allocate
    /// fresh backing.
    pub fn free(&mut self) {
        self.reset();
        if let Some(storage) = self.storage.take() {
            put_bytes(storage);
        }
    }

    /// Clear cursors and the EOF flag; backing storage is retained.
    pub fn reset(&mut self) {
        if let Some(storage) = self.storage.as_mut() {
            storage.set_len(0);
        }
        self.off = 0;
        self.mark = None;
        self.eof = false;
    }

    /// Unread byte count.
    pub fn len(&self) -> usize {
        match &self.storage {
            Some(storage) => storage.len() - self.off,
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity of the backing storage (0 without backing).
    pub fn cap(&self) -> usize {
        self.storage.as_ref().map(Storage::capacity).unwrap_or(0)
    }

    /// Zero-copy view of the unread bytes.
    pub fn bytes(&self) -> &[u8] {
        match &self.storage {
            Some(storage) => &storage[self.off..],
            None => &[],
        }
    }

    /// Zero-copy view of the first `n` unread bytes, or `None` when fewer
    /// are buffered. Does not move the read cursor.
    pub fn peek(&self, n: usize) -> Option<&[u8]> {
        let unread = self.bytes();
        if n > unread.len() {
            return None;
        }
        Some(&unread[..n])
    }

    /// Consume `offset` unread bytes without copying them out. Offsets
    /// beyond the unread region are ignored.
    pub fn drain(&mut self, offset: usize) {
        if offset > self.len() {
            return;
        }
        self.off += offset;
    }

    /// Save the read cursor for a later `restore`.
    pub fn mark(&mut self) {
        self.mark = Some(self.off);
    }

    /// Rewind the read cursor to the last `mark`, if one is set.
    pub fn restore(&mut self) {
        if let Some(mark) = self.mark.take() {
            self.off = mark;
        }
    }

    pub fn eof(&self) -> bool {
        self.eof
    }

    pub fn set_eof(&mut self, eof: bool) {
        self.eof = eof;
    }

    /// Copy unread bytes into `dst`, advancing the read cursor.
    ///
    /// A drained buffer resets to the empty state and reports end-of-data:
    /// `Ok(0)` for an empty `dst`, [`Error::Eof`] otherwise.
    pub fn read(&mut self, dst: &mut [u8]) -> Result<usize> {
        if self.len() == 0 {
            self.reset();
            if dst.is_empty() {
                return Ok(0);
            }
            return Err(Error::Eof);
        }
        let storage = self.storage.as_ref().unwrap();
        let n = dst.len().min(storage.len() - self.off);
        dst[..n].copy_from_slice(&storage[self.off..self.off + n]);
        self.off += n;
        Ok(n)
    }

    /// Append `data` to the tail, growing as needed.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let pos = self.prepare(data.len())?;
        let storage = self.storage.as_mut().unwrap();
        storage.raw_mut()[pos..pos + data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    pub fn write_str(&mut self, s: &str) -> Result<usize> {
        self.write(s.as_bytes())
    }

    pub fn write_byte(&mut self, b: u8) -> Result<()> {
        self.write(&[b]).map(|_| ())
    }

    /// Fixed-width big-endian integer writers. Byte order matches the
    /// decode side: read the same width back and use `from_be_bytes`.
    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.write(&v.to_be_bytes()).map(|_| ())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write(&v.to_be_bytes()).map(|_| ())
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        self.write(&v.to_be_bytes()).map(|_| ())
    }

    /// Append without reporting the count; the pipe-facing write.
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        self.write(data).map(|_| ())
    }

    /// Ensure room for `n` more bytes without moving the write cursor.
    ///
    /// Tries in-place extension first; otherwise compacts the already-read
    /// prefix away or reallocates along the growth curve. Either move path
    /// rebases the read cursor to 0 and preserves every unread byte.
    pub fn grow(&mut self, n: usize) -> Result<()> {
        let pos = self.prepare(n)?;
        // reserve only: roll the write cursor back
        self.storage.as_mut().unwrap().set_len(pos);
        Ok(())
    }

    /// Make room for `n` bytes at the tail, extend the write cursor over
    /// them, and return the position to copy at.
    fn prepare(&mut self, n: usize) -> Result<usize> {
        if self.storage.is_none() {
            let mut storage = get_bytes(n.max(DEFAULT_SIZE));
            storage.set_len(0);
            self.storage = Some(storage);
        }

        let unread = self.len();
        if unread == 0 && self.off != 0 {
            // nothing live; restart at the front
            self.reset();
        }

        let storage = self.storage.as_mut().unwrap();
        let write_len = storage.len();
        let needed = write_len.checked_add(n).ok_or(Error::TooLarge)?;
        if needed <= storage.capacity() {
            storage.set_len(needed);
            return Ok(write_len);
        }

        if should_compact(unread, n, storage.capacity()) {
            // shift live bytes to the front, reclaiming the read prefix
            storage.raw_mut().copy_within(self.off..write_len, 0);
            storage.set_len(unread + n);
        } else {
            let old = self.storage.take().unwrap();
            let need = unread + n;
            let mut fresh = get_bytes(grow_capacity(old.capacity(), need));
            trace!(
                old_capacity = old.capacity(),
                new_capacity = fresh.capacity(),
                unread,
                "reallocating buffer backing"
            );
            fresh.raw_mut()[..unread].copy_from_slice(&old[self.off..]);
            fresh.set_len(need);
            put_bytes(old);
            self.storage = Some(fresh);
        }
        self.off = 0;
        self.mark = None;
        Ok(unread)
    }

    /// Spare tail capacity available without growing.
    fn spare(&self) -> usize {
        match &self.storage {
            Some(storage) => storage.capacity() - storage.len(),
            None => 0,
        }
    }

    /// Pull bytes from `r` until it reports end-of-input, growing whenever
    /// the spare tail drops below the minimum read threshold.
    pub fn read_from<R: io::Read>(&mut self, r: &mut R) -> Result<u64> {
        let mut total = 0u64;
        loop {
            if self.spare() < MIN_READ {
                self.grow(MIN_READ)?;
            }
            let storage = self.storage.as_mut().unwrap();
            let n = r.read(storage.spare_mut())?;
            if n == 0 {
                return Ok(total);
            }
            let write_len = storage.len();
            storage.set_len(write_len + n);
            total += n as u64;
        }
    }

    /// Pull bytes from `r` with a single read call.
    ///
    /// A fully drained buffer is reset first, and one holding an oversized
    /// block (capacity above [`MAX_BUFFER_LENGTH`]) is freed and reissued
    /// at the minimum read size so a single large read does not pin a
    /// large block indefinitely. A zero-length read sets the EOF flag.
    pub fn read_once<R: io::Read>(&mut self, r: &mut R) -> Result<u64> {
        if self.storage.is_none() {
            self.alloc(MIN_READ);
        }
        if self.len() == 0 {
            self.reset();
            if self.cap() > MAX_BUFFER_LENGTH {
                trace!(capacity = self.cap(), "reclaiming oversized drained buffer");
                self.free();
                self.alloc(MIN_READ);
            }
        }
        if self.spare() < MIN_READ {
            self.grow(MIN_READ)?;
        }
        let storage = self.storage.as_mut().unwrap();
        let n = r.read(storage.spare_mut())?;
        if n == 0 {
            self.eof = true;
            return Ok(0);
        }
        let write_len = storage.len();
        storage.set_len(write_len + n);
        Ok(n as u64)
    }

    /// Push unread bytes into `w`, advancing the read cursor past whatever
    /// the writer accepts.
    pub fn write_to<W: io::Write>(&mut self, w: &mut W) -> Result<u64> {
        let mut total = 0u64;
        while self.len() > 0 {
            let storage = self.storage.as_ref().unwrap();
            let unread = storage.len() - self.off;
            let m = w.write(&storage[self.off..])?;
            if m > unread {
                return Err(Error::InvalidWriteCount);
            }
            self.off += m;
            total += m as u64;
            if m == 0 {
                break;
            }
        }
        Ok(total)
    }
}

impl Default for IoBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for IoBuffer {
    /// Deep copy: the clone gets fresh pooled backing holding only the
    /// unread bytes.
    fn clone(&self) -> Self {
        let mut copy = IoBuffer::new();
        let unread = self.bytes();
        if !unread.is_empty() {
            copy.alloc(unread.len());
            let _ = copy.write(unread);
        }
        copy.eof = self.eof;
        copy
    }
}

impl fmt::Display for IoBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.bytes()))
    }
}

impl io::Read for IoBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match IoBuffer::read(self, buf) {
            Ok(n) => Ok(n),
            Err(Error::Eof) => Ok(0),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
        }
    }
}

impl io::Write for IoBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        IoBuffer::write(self, buf).map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for IoBuffer {
    fn drop(&mut self) {
        self.free();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_write_then_read_round_trip() {
        for len in [0usize, 1, 63, 64, 65, 1 << 20] {
            let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let mut buf = IoBuffer::new();

            assert_eq!(buf.write(&data).unwrap(), len);
            assert_eq!(buf.len(), len);

            let mut out = vec![0u8; len];
            if len == 0 {
                assert_eq!(buf.read(&mut out).unwrap(), 0);
            } else {
                assert_eq!(buf.read(&mut out).unwrap(), len);
                assert_eq!(out, data);
            }
        }
    }

    #[test]
    fn test_read_on_drained_buffer() {
        let mut buf = IoBuffer::with_capacity(64);
        buf.write(b"xy").unwrap();

        let mut out = [0u8; 2];
        buf.read(&mut out).unwrap();

        // Non-empty destination reports end-of-data as an error...
        assert_eq!(buf.read(&mut out), Err(Error::Eof));
        // ...an empty one reports clean completion.
        assert_eq!(buf.read(&mut []), Ok(0));
    }

    #[test]
    fn test_partial_reads_advance_cursor() {
        let mut buf = IoBuffer::new();
        buf.write(b"hello world").unwrap();

        let mut first = [0u8; 5];
        assert_eq!(buf.read(&mut first).unwrap(), 5);
        assert_eq!(&first, b"hello");
        assert_eq!(buf.len(), 6);
        assert_eq!(buf.bytes(), b" world");
    }

    #[test]
    fn test_grow_in_place_does_not_move_unread() {
        let mut buf = IoBuffer::with_capacity(1024);
        buf.write(b"abc").unwrap();
        buf.grow(100).unwrap();
        assert_eq!(buf.bytes(), b"abc");
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_grow_compacts_read_prefix() {
        let mut buf = IoBuffer::with_capacity(1024);
        assert_eq!(buf.cap(), 1024);

        let data: Vec<u8> = (0..1000).map(|i| (i % 256) as u8).collect();
        buf.write(&data).unwrap();
        let mut sink = vec![0u8; 950];
        buf.read(&mut sink).unwrap();

        // 50 unread + 100 requested fits in half the capacity: the live
        // bytes shift to the front instead of reallocating.
        let before = buf.bytes().to_vec();
        buf.write(&[0xEE; 100]).unwrap();
        assert_eq!(buf.cap(), 1024, "compaction must not reallocate");
        assert_eq!(&buf.bytes()[..50], &before[..]);
        assert_eq!(&buf.bytes()[50..], &[0xEE; 100]);
    }

    #[test]
    fn test_grow_reallocates_and_preserves_unread() {
        let mut buf = IoBuffer::with_capacity(1024);

        let data: Vec<u8> = (0..1000).map(|i| (i % 256) as u8).collect();
        buf.write(&data).unwrap();
        let mut sink = vec![0u8; 100];
        buf.read(&mut sink).unwrap();

        // 900 unread + 200 requested exceeds half the capacity: realloc.
        let before = buf.bytes().to_vec();
        buf.write(&[0x11; 200]).unwrap();
        assert_eq!(buf.cap(), 2048);
        assert_eq!(&buf.bytes()[..900], &before[..]);
        assert_eq!(&buf.bytes()[900..], &[0x11; 200]);
    }

    #[test]
    fn test_numeric_round_trip() {
        let mut buf = IoBuffer::new();

        for v in [0u16, 1, u16::MAX] {
            buf.write_u16(v).unwrap();
            let mut raw = [0u8; 2];
            buf.read(&mut raw).unwrap();
            assert_eq!(u16::from_be_bytes(raw), v);
        }
        for v in [0u32, 1, u32::MAX] {
            buf.write_u32(v).unwrap();
            let mut raw = [0u8; 4];
            buf.read(&mut raw).unwrap();
            assert_eq!(u32::from_be_bytes(raw), v);
        }
        for v in [0u64, 1, u64::MAX] {
            buf.write_u64(v).unwrap();
            let mut raw = [0u8; 8];
            buf.read(&mut raw).unwrap();
            assert_eq!(u64::from_be_bytes(raw), v);
        }
    }

    #[test]
    fn test_peek_and_drain() {
        let mut buf = IoBuffer::new();
        buf.write(b"abcdef").unwrap();

        assert_eq!(buf.peek(3), Some(&b"abc"[..]));
        assert_eq!(buf.peek(7), None);
        assert_eq!(buf.len(), 6, "peek must not consume");

        buf.drain(2);
        assert_eq!(buf.bytes(), b"cdef");
        buf.drain(100); // beyond unread: ignored
        assert_eq!(buf.bytes(), b"cdef");
    }

    #[test]
    fn test_mark_restore() {
        let mut buf = IoBuffer::new();
        buf.write(b"abcdef").unwrap();

        buf.drain(2);
        buf.mark();
        buf.drain(3);
        assert_eq!(buf.bytes(), b"f");

        buf.restore();
        assert_eq!(buf.bytes(), b"cdef");
    }

    #[test]
    fn test_reset_keeps_backing() {
        let mut buf = IoBuffer::with_capacity(256);
        buf.write(b"data").unwrap();
        buf.set_eof(true);

        buf.reset();
        assert_eq!(buf.len(), 0);
        assert!(!buf.eof());
        assert_eq!(buf.cap(), 256, "reset retains the backing block");
    }

    #[test]
    fn test_free_releases_backing() {
        let mut buf = IoBuffer::with_capacity(256);
        buf.write(b"data").unwrap();

        buf.free();
        assert_eq!(buf.cap(), 0);
        assert_eq!(buf.len(), 0);

        // Usable again after a fresh alloc.
        buf.alloc(64);
        buf.write(b"more").unwrap();
        assert_eq!(buf.bytes(), b"more");
    }

    #[test]
    fn test_read_from_pulls_until_eof() {
        let src: Vec<u8> = (0..3000).map(|i| (i % 256) as u8).collect();
        let mut cursor = Cursor::new(src.clone());

        let mut buf = IoBuffer::new();
        let n = buf.read_from(&mut cursor).unwrap();
        assert_eq!(n, 3000);
        assert_eq!(buf.bytes(), &src[..]);
    }

    #[test]
    fn test_read_once_single_pull() {
        let src = vec![7u8; 4096];
        let mut cursor = Cursor::new(src);

        let mut buf = IoBuffer::new();
        let n = buf.read_once(&mut cursor).unwrap();
        assert!(n > 0);
        assert_eq!(buf.len() as u64, n);
        assert!(!buf.eof());

        // Exhaust the source, then observe the EOF flag.
        while buf.read_once(&mut cursor).unwrap() > 0 {
            buf.drain(buf.len());
        }
        assert!(buf.eof());
    }

    #[test]
    fn test_read_once_reclaims_oversized_buffer() {
        let mut buf = IoBuffer::new();
        buf.alloc(MAX_BUFFER_LENGTH + 1);
        assert!(buf.cap() > MAX_BUFFER_LENGTH);

        let mut cursor = Cursor::new(vec![1u8; 16]);
        buf.read_once(&mut cursor).unwrap();
        assert!(
            buf.cap() <= MAX_BUFFER_LENGTH,
            "drained oversized block must be reissued smaller"
        );
        assert_eq!(buf.len(), 16);
    }

    #[test]
    fn test_write_to_drains_buffer() {
        let mut buf = IoBuffer::new();
        buf.write(b"stream me").unwrap();

        let mut out = Vec::new();
        let n = buf.write_to(&mut out).unwrap();
        assert_eq!(n, 9);
        assert_eq!(out, b"stream me");
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn test_clone_copies_unread_only() {
        let mut buf = IoBuffer::new();
        buf.write(b"abcdef").unwrap();
        buf.drain(2);

        let copy = buf.clone();
        assert_eq!(copy.bytes(), b"cdef");

        // Independent storage.
        buf.drain(4);
        assert_eq!(copy.bytes(), b"cdef");
    }

    #[test]
    fn test_display_renders_unread() {
        let mut buf = IoBuffer::new();
        buf.write_str("héllo").unwrap();
        buf.drain(0);
        assert_eq!(buf.to_string(), "héllo");
    }

    #[test]
    fn test_io_trait_interop() {
        use std::io::{Read, Write};

        let mut buf = IoBuffer::new();
        Write::write(&mut buf, b"via trait").unwrap();

        let mut out = String::new();
        Read::read_to_string(&mut buf, &mut out).unwrap();
        assert_eq!(out, "via trait");
    }
}
