//! The incremental stream tokenizer.

use wf_codec::{BoundaryScanner, Codec, Scan};

use crate::error::StreamError;
use crate::sink::{DocumentSink, StreamEnd};
use crate::source::{ByteSource, Chunk};

/// Bytes requested from the source per pump step.
const READ_CHUNK: usize = 8 * 1024;

// -----------------------------------------------------------------------------
// Pump

/// Outcome of one [`StreamTokenizer::pump`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pump {
    /// Bytes were read and scanned; zero or more documents were delivered.
    Progressed,
    /// The source has nothing right now; pump again later.
    Pending,
    /// The source is exhausted and the sink was notified.
    EndOfStream,
}

/// Lifecycle of a [`StreamTokenizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No bytes have arrived yet.
    Idle,
    /// Bytes are arriving and documents are being framed.
    Reading,
    /// The source ended; no further deliveries will happen.
    EndOfStream,
    /// The stream failed; the error is held and repeated on every pump.
    Failed,
}

// -----------------------------------------------------------------------------
// StreamTokenizer

/// Splits an open-ended byte stream into complete documents.
///
/// The tokenizer owns its buffer exclusively: arriving bytes are
/// appended, a [`BoundaryScanner`] resumes over the unexamined tail, and
/// each range it completes is handed to the sink then discarded from the
/// front of the buffer. Only structural lexing happens here; a delivered
/// document may still fail to decode.
///
/// Driving is cooperative. [`pump`](Self::pump) performs exactly one
/// read-and-rescan step and never blocks beyond what the source's own
/// read does; [`run`](Self::run) pumps until the end of the source.
/// Failures are fatal to the stream: once [`State::Failed`] is reached
/// the held error is returned from every later pump and nothing more is
/// delivered.
pub struct StreamTokenizer<S, K> {
    source: S,
    sink: K,
    scanner: Box<dyn BoundaryScanner>,
    buffer: Vec<u8>,
    scratch: Vec<u8>,
    max_object_size: Option<usize>,
    state: State,
    error: Option<StreamError>,
}

impl<S: ByteSource, K: DocumentSink> StreamTokenizer<S, K> {
    /// Binds a source, a format's boundary rules, and a sink, framing
    /// every top-level structure as its own document.
    pub fn new(source: S, codec: &dyn Codec, sink: K) -> Self {
        Self::with_start_depth(source, codec, sink, 0)
    }

    /// Like [`new`](Self::new), but documents are the structures found at
    /// `start_depth`, for streams wrapped in an outer container.
    pub fn with_start_depth(source: S, codec: &dyn Codec, sink: K, start_depth: usize) -> Self {
        Self::with_scanner(source, codec.boundary_scanner(start_depth), sink)
    }

    /// Binds an explicit scanner instead of obtaining one from a codec.
    pub fn with_scanner(source: S, scanner: Box<dyn BoundaryScanner>, sink: K) -> Self {
        Self {
            source,
            sink,
            scanner,
            buffer: Vec::new(),
            scratch: vec![0; READ_CHUNK],
            max_object_size: None,
            state: State::Idle,
            error: None,
        }
    }

    /// Caps how large a single document may grow before the stream is
    /// failed. `None` lifts the cap.
    pub fn set_max_object_size(&mut self, limit: Option<usize>) {
        self.max_object_size = limit;
    }

    /// Where the tokenizer is in its lifecycle.
    pub fn state(&self) -> State {
        self.state
    }

    /// The error that failed the stream, if it failed.
    pub fn error(&self) -> Option<&StreamError> {
        self.error.as_ref()
    }

    /// The sink, for inspection between pumps.
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Consumes the tokenizer and returns its sink.
    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Performs one cooperative step: read one chunk, rescan, deliver
    /// any documents the new bytes completed.
    pub fn pump(&mut self) -> Result<Pump, StreamError> {
        match self.state {
            State::EndOfStream => return Ok(Pump::EndOfStream),
            State::Failed => {
                // `fail` stores the error before the state flips.
                let error = self.error.clone().unwrap_or_else(|| {
                    StreamError::Source("the stream already failed".into())
                });
                return Err(error);
            }
            State::Idle | State::Reading => {}
        }

        let count = match self.source.read(&mut self.scratch) {
            Ok(Chunk::Data(count)) => count,
            Ok(Chunk::Pending) => return Ok(Pump::Pending),
            Ok(Chunk::End) => return Ok(self.finish()),
            Err(error) => return Err(self.fail(error)),
        };

        self.state = State::Reading;
        self.buffer.extend_from_slice(&self.scratch[..count]);
        self.deliver_ready()?;
        Ok(Pump::Progressed)
    }

    /// Pumps until the source ends, yielding the thread while the source
    /// reports pending.
    pub fn run(&mut self) -> Result<(), StreamError> {
        loop {
            match self.pump()? {
                Pump::Progressed => {}
                Pump::Pending => std::thread::yield_now(),
                Pump::EndOfStream => return Ok(()),
            }
        }
    }

    fn deliver_ready(&mut self) -> Result<(), StreamError> {
        loop {
            match self.scanner.scan(&self.buffer) {
                Ok(Scan::Document { start, end }) => {
                    if let Some(limit) = self.max_object_size {
                        if end - start > limit {
                            return Err(self.fail(StreamError::SizeExceeded { limit }));
                        }
                    }
                    log::trace!("document ready: bytes {start}..{end}");
                    self.sink.document(&self.buffer[start..end]);
                    self.buffer.drain(..end);
                    self.scanner.rebase(end);
                }
                Ok(Scan::NeedMore) => {
                    if let (Some(limit), Some(start)) =
                        (self.max_object_size, self.scanner.document_start())
                    {
                        if self.buffer.len() - start > limit {
                            return Err(self.fail(StreamError::SizeExceeded { limit }));
                        }
                    }
                    return Ok(());
                }
                Err(error) => return Err(self.fail(StreamError::Framing(error))),
            }
        }
    }

    fn finish(&mut self) -> Pump {
        self.state = State::EndOfStream;
        let end = match self.scanner.document_start() {
            Some(start) => {
                log::debug!(
                    "source ended inside a document with {} pending bytes",
                    self.buffer.len() - start
                );
                StreamEnd::Incomplete { pending: self.buffer.split_off(start) }
            }
            None => StreamEnd::Clean,
        };
        self.sink.end_of_stream(end);
        Pump::EndOfStream
    }

    fn fail(&mut self, error: StreamError) -> StreamError {
        log::debug!("stream failed: {error}");
        self.error = Some(error.clone());
        self.state = State::Failed;
        error
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use wf_codec::{CodecError, JsonCodec, XmlRpcCodec};

    use super::*;
    use crate::source::{IoSource, SliceSource};

    #[derive(Default)]
    struct Collect {
        documents: Vec<String>,
        end: Option<StreamEnd>,
    }

    impl DocumentSink for Collect {
        fn document(&mut self, bytes: &[u8]) {
            self.documents.push(String::from_utf8_lossy(bytes).into_owned());
        }

        fn end_of_stream(&mut self, end: StreamEnd) {
            self.end = Some(end);
        }
    }

    #[test]
    fn splits_adjacent_documents_arriving_one_byte_at_a_time() {
        let source = SliceSource::chunked(br#"{"a":1}{"b":2}"#, 1);
        let mut tokenizer = StreamTokenizer::new(source, &JsonCodec, Collect::default());
        tokenizer.run().unwrap();
        assert_eq!(tokenizer.state(), State::EndOfStream);

        let sink = tokenizer.into_sink();
        assert_eq!(sink.documents, [r#"{"a":1}"#, r#"{"b":2}"#]);
        assert_eq!(sink.end, Some(StreamEnd::Clean));
    }

    #[test]
    fn documents_are_delivered_only_once_complete() {
        let source = SliceSource::chunked(br#"{"a":1}"#, 1);
        let mut tokenizer = StreamTokenizer::new(source, &JsonCodec, Collect::default());

        for _ in 0..6 {
            assert_eq!(tokenizer.pump().unwrap(), Pump::Progressed);
            assert!(tokenizer.sink().documents.is_empty());
        }
        assert_eq!(tokenizer.state(), State::Reading);

        // The closing brace completes the document.
        assert_eq!(tokenizer.pump().unwrap(), Pump::Progressed);
        assert_eq!(tokenizer.sink().documents, [r#"{"a":1}"#]);
    }

    #[test]
    fn oversized_in_progress_document_fails_without_delivery() {
        let source = SliceSource::chunked(br#"{"a":"0123456789"}"#, 1);
        let mut tokenizer = StreamTokenizer::new(source, &JsonCodec, Collect::default());
        tokenizer.set_max_object_size(Some(8));

        let error = tokenizer.run().unwrap_err();
        assert_eq!(error, StreamError::SizeExceeded { limit: 8 });
        assert_eq!(tokenizer.state(), State::Failed);
        assert_eq!(tokenizer.error(), Some(&error));

        // The failure is sticky.
        assert_eq!(tokenizer.pump().unwrap_err(), error);
        assert!(tokenizer.into_sink().documents.is_empty());
    }

    #[test]
    fn oversized_document_is_rejected_even_when_it_completes_in_one_read() {
        let source = SliceSource::new(br#"{"a":"0123456789"}"#);
        let mut tokenizer = StreamTokenizer::new(source, &JsonCodec, Collect::default());
        tokenizer.set_max_object_size(Some(8));

        let error = tokenizer.run().unwrap_err();
        assert_eq!(error, StreamError::SizeExceeded { limit: 8 });
        assert!(tokenizer.into_sink().documents.is_empty());
    }

    #[test]
    fn size_limit_leaves_smaller_documents_alone() {
        let source = SliceSource::chunked(br#"{"a":1}{"b":2}"#, 1);
        let mut tokenizer = StreamTokenizer::new(source, &JsonCodec, Collect::default());
        tokenizer.set_max_object_size(Some(7));

        tokenizer.run().unwrap();
        assert_eq!(tokenizer.into_sink().documents, [r#"{"a":1}"#, r#"{"b":2}"#]);
    }

    #[test]
    fn truncated_trailing_document_is_surfaced_as_incomplete() {
        let source = SliceSource::new(br#"{"a":1}{"b""#);
        let mut tokenizer = StreamTokenizer::new(source, &JsonCodec, Collect::default());
        tokenizer.run().unwrap();

        let sink = tokenizer.into_sink();
        assert_eq!(sink.documents, [r#"{"a":1}"#]);
        assert_eq!(sink.end, Some(StreamEnd::Incomplete { pending: br#"{"b""#.to_vec() }));
    }

    #[test]
    fn xml_markup_between_documents_is_not_a_document() {
        let stream = b"<value><int>1</int></value><!-- gap --><value><int>2</int></value>";
        let source = SliceSource::chunked(stream, 3);
        let mut tokenizer = StreamTokenizer::new(source, &XmlRpcCodec, Collect::default());
        tokenizer.run().unwrap();

        let sink = tokenizer.into_sink();
        assert_eq!(
            sink.documents,
            ["<value><int>1</int></value>", "<value><int>2</int></value>"]
        );
        assert_eq!(sink.end, Some(StreamEnd::Clean));
    }

    #[test]
    fn start_depth_frames_the_elements_of_an_outer_array() {
        let stream = br#"[{"a":1}, [2, 3], {"b":4}]"#;
        let source = SliceSource::chunked(stream, 1);
        let mut tokenizer =
            StreamTokenizer::with_start_depth(source, &JsonCodec, Collect::default(), 1);
        tokenizer.run().unwrap();

        let sink = tokenizer.into_sink();
        assert_eq!(sink.documents, [r#"{"a":1}"#, "[2, 3]", r#"{"b":4}"#]);
        assert_eq!(sink.end, Some(StreamEnd::Clean));
    }

    #[test]
    fn io_sources_feed_the_tokenizer() {
        let cursor = std::io::Cursor::new(br#"{"a":1}{"b":2}"#.to_vec());
        let mut tokenizer =
            StreamTokenizer::new(IoSource::new(cursor), &JsonCodec, Collect::default());
        tokenizer.run().unwrap();
        assert_eq!(tokenizer.into_sink().documents, [r#"{"a":1}"#, r#"{"b":2}"#]);
    }

    #[test]
    fn framing_errors_are_fatal() {
        let source = SliceSource::new(b"}");
        let mut tokenizer = StreamTokenizer::new(source, &JsonCodec, Collect::default());

        let error = tokenizer.run().unwrap_err();
        assert!(matches!(error, StreamError::Framing(CodecError::Syntax { offset: 0, .. })));
        assert_eq!(tokenizer.state(), State::Failed);
        assert_eq!(tokenizer.pump().unwrap_err(), error);
    }

    #[test]
    fn pending_sources_surface_as_pump_pending() {
        struct Stutter<'a> {
            inner: SliceSource<'a>,
            pause: bool,
        }

        impl ByteSource for Stutter<'_> {
            fn read(&mut self, buffer: &mut [u8]) -> Result<Chunk, StreamError> {
                if self.pause {
                    self.pause = false;
                    return Ok(Chunk::Pending);
                }
                self.pause = true;
                self.inner.read(buffer)
            }
        }

        let source = Stutter { inner: SliceSource::chunked(br#"{"a":1}"#, 4), pause: true };
        let mut tokenizer = StreamTokenizer::new(source, &JsonCodec, Collect::default());

        assert_eq!(tokenizer.pump().unwrap(), Pump::Pending);
        assert_eq!(tokenizer.pump().unwrap(), Pump::Progressed);

        tokenizer.run().unwrap();
        assert_eq!(tokenizer.into_sink().documents, [r#"{"a":1}"#]);
    }

    #[test]
    fn empty_sources_end_clean() {
        let mut tokenizer =
            StreamTokenizer::new(SliceSource::new(b""), &JsonCodec, Collect::default());

        assert_eq!(tokenizer.pump().unwrap(), Pump::EndOfStream);
        assert_eq!(tokenizer.state(), State::EndOfStream);
        // The end notification fires once; later pumps just repeat the state.
        assert_eq!(tokenizer.pump().unwrap(), Pump::EndOfStream);

        let sink = tokenizer.into_sink();
        assert!(sink.documents.is_empty());
        assert_eq!(sink.end, Some(StreamEnd::Clean));
    }

    #[test]
    fn closures_act_as_sinks() {
        let mut documents: Vec<String> = Vec::new();
        let source = SliceSource::chunked(br#"{"a":1}{"b":2}"#, 2);
        let mut tokenizer = StreamTokenizer::new(source, &JsonCodec, |bytes: &[u8]| {
            documents.push(String::from_utf8_lossy(bytes).into_owned());
        });
        tokenizer.run().unwrap();
        drop(tokenizer);

        assert_eq!(documents, [r#"{"a":1}"#, r#"{"b":2}"#]);
    }
}
