//! Consumers of completed documents.

/// How a stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// The source ended between documents; nothing was left over.
    Clean,
    /// The source ended inside a document. The partial bytes are
    /// surfaced here rather than dropped or passed off as a document.
    Incomplete {
        /// Everything received of the unterminated document.
        pending: Vec<u8>,
    },
}

/// Receives each completed document as it is recognized.
///
/// [`document`](Self::document) is called once per document, in stream
/// order, only after the document's final byte arrived. The slice is
/// valid for the duration of the call; a sink that needs the bytes later
/// copies them.
///
/// Any `FnMut(&[u8])` closure is a sink that ignores the end-of-stream
/// notification.
pub trait DocumentSink {
    /// Accepts one completed document.
    fn document(&mut self, bytes: &[u8]);

    /// Notified once when the source ends.
    fn end_of_stream(&mut self, end: StreamEnd) {
        let _ = end;
    }
}

impl<F: FnMut(&[u8])> DocumentSink for F {
    fn document(&mut self, bytes: &[u8]) {
        self(bytes);
    }
}
