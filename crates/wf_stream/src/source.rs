//! Byte sources feeding a tokenizer.

use std::io;

use crate::error::StreamError;

// -----------------------------------------------------------------------------
// ByteSource

/// Outcome of one [`ByteSource::read`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk {
    /// This many bytes were written to the front of the buffer.
    Data(usize),
    /// No data right now; more may arrive later.
    Pending,
    /// The source is exhausted and will never produce more bytes.
    End,
}

/// An incremental supplier of stream bytes.
///
/// Sources distinguish "nothing right now" ([`Chunk::Pending`]) from
/// "nothing ever again" ([`Chunk::End`]); the tokenizer suspends on the
/// former and finishes the stream on the latter. A source at exhaustion
/// should report [`Chunk::End`] rather than `Data(0)`.
pub trait ByteSource {
    /// Reads the next chunk into the front of `buffer`.
    fn read(&mut self, buffer: &mut [u8]) -> Result<Chunk, StreamError>;
}

// -----------------------------------------------------------------------------
// IoSource

/// A [`ByteSource`] over any [`io::Read`].
///
/// A read of zero bytes is the end of the source. `WouldBlock` and
/// `Interrupted` surface as [`Chunk::Pending`]; every other I/O failure
/// is fatal.
#[derive(Debug)]
pub struct IoSource<R> {
    inner: R,
}

impl<R: io::Read> IoSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: io::Read> ByteSource for IoSource<R> {
    fn read(&mut self, buffer: &mut [u8]) -> Result<Chunk, StreamError> {
        match self.inner.read(buffer) {
            Ok(0) => Ok(Chunk::End),
            Ok(count) => Ok(Chunk::Data(count)),
            Err(error) => match error.kind() {
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => Ok(Chunk::Pending),
                _ => Err(StreamError::Source(error.to_string())),
            },
        }
    }
}

// -----------------------------------------------------------------------------
// SliceSource

/// A [`ByteSource`] over an in-memory slice, optionally dribbling its
/// contents out in fixed-size chunks to exercise incremental paths.
#[derive(Debug)]
pub struct SliceSource<'a> {
    bytes: &'a [u8],
    chunk: usize,
}

impl<'a> SliceSource<'a> {
    /// A source that hands out as much as each read can take.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, chunk: usize::MAX }
    }

    /// A source that hands out at most `chunk` bytes per read.
    pub fn chunked(bytes: &'a [u8], chunk: usize) -> Self {
        Self { bytes, chunk: chunk.max(1) }
    }
}

impl ByteSource for SliceSource<'_> {
    fn read(&mut self, buffer: &mut [u8]) -> Result<Chunk, StreamError> {
        if self.bytes.is_empty() {
            return Ok(Chunk::End);
        }
        let count = buffer.len().min(self.bytes.len()).min(self.chunk);
        buffer[..count].copy_from_slice(&self.bytes[..count]);
        self.bytes = &self.bytes[count..];
        Ok(Chunk::Data(count))
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_source_honors_its_chunk_size() {
        let mut source = SliceSource::chunked(b"abcdef", 4);
        let mut buffer = [0u8; 16];

        assert_eq!(source.read(&mut buffer).unwrap(), Chunk::Data(4));
        assert_eq!(&buffer[..4], b"abcd");
        assert_eq!(source.read(&mut buffer).unwrap(), Chunk::Data(2));
        assert_eq!(&buffer[..2], b"ef");
        assert_eq!(source.read(&mut buffer).unwrap(), Chunk::End);
    }

    #[test]
    fn io_source_translates_read_results() {
        struct Flaky(u8);

        impl io::Read for Flaky {
            fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
                self.0 += 1;
                match self.0 {
                    1 => Err(io::Error::from(io::ErrorKind::WouldBlock)),
                    2 => {
                        buffer[..2].copy_from_slice(b"ok");
                        Ok(2)
                    }
                    _ => Ok(0),
                }
            }
        }

        let mut source = IoSource::new(Flaky(0));
        let mut buffer = [0u8; 8];
        assert_eq!(source.read(&mut buffer).unwrap(), Chunk::Pending);
        assert_eq!(source.read(&mut buffer).unwrap(), Chunk::Data(2));
        assert_eq!(&buffer[..2], b"ok");
        assert_eq!(source.read(&mut buffer).unwrap(), Chunk::End);
    }

    #[test]
    fn io_source_surfaces_hard_failures() {
        struct Broken;

        impl io::Read for Broken {
            fn read(&mut self, _buffer: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
            }
        }

        let mut buffer = [0u8; 8];
        let error = IoSource::new(Broken).read(&mut buffer).unwrap_err();
        assert!(matches!(error, StreamError::Source(_)));
    }
}
