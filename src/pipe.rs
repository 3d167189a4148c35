//! Blocking producer/consumer pipe over a growable buffer

use crate::buffer::IoBuffer;
use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::io;
use std::time::Duration;

/// Recommended caller-side read timeout.
///
/// Not enforced here: a caller needing one races [`Pipe::read`] against an
/// external signal and still calls [`Pipe::close_with_error`] to unblock
/// any other waiters.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(15);

struct PipeState {
    buf: IoBuffer,
    /// Terminal error, set once by the first close
    err: Option<Error>,
}

/// Synchronous producer/consumer byte stream over one [`IoBuffer`].
///
/// Writes append to the buffer and wake exactly one waiting reader — not a
/// broadcast, so multiple concurrent readers can starve; that is pipe
/// semantics, not a defect. Reads block while the buffer is empty and the
/// pipe open. Once the terminal error is set, writes fail immediately and
/// reads drain remaining buffered bytes before returning it.
pub struct Pipe {
    state: Mutex<PipeState>,
    readable: Condvar,
}

impl Pipe {
    /// A pipe whose buffer starts with pooled backing of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(PipeState {
                buf: IoBuffer::with_capacity(capacity),
                err: None,
            }),
            readable: Condvar::new(),
        }
    }

    /// Unread byte count.
    pub fn len(&self) -> usize {
        self.state.lock().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block until bytes are available or the pipe is closed.
    ///
    /// Buffered bytes win over the terminal error: a closed pipe keeps
    /// serving reads until drained, then returns the close cause.
    pub fn read(&self, dst: &mut [u8]) -> Result<usize> {
        let mut state = self.state.lock();
        loop {
            if state.buf.len() > 0 {
                return state.buf.read(dst);
            }
            if let Some(err) = &state.err {
                return Err(err.clone());
            }
            self.readable.wait(&mut state);
        }
    }

    /// Append `data` and wake one waiting reader.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let mut state = self.state.lock();
        if state.err.is_some() {
            return Err(Error::ClosedPipeWrite);
        }
        state.buf.append(data)?;
        self.readable.notify_one();
        Ok(data.len())
    }

    /// Set the terminal error and wake every waiter.
    ///
    /// `None` records the default end-of-stream cause. The first close
    /// wins; later calls only re-wake waiters.
    pub fn close_with_error(&self, err: Option<Error>) {
        let mut state = self.state.lock();
        if state.err.is_none() {
            state.err = Some(err.unwrap_or(Error::Eof));
        }
        self.readable.notify_all();
    }

    /// Close with the default end-of-stream cause.
    pub fn close(&self) {
        self.close_with_error(None);
    }
}

impl io::Read for &Pipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match Pipe::read(*self, buf) {
            Ok(n) => Ok(n),
            Err(Error::Eof) => Ok(0),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
        }
    }
}

impl io::Write for &Pipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Pipe::write(*self, buf).map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
