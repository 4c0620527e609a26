//! Document boundary detection for byte streams.
//!
//! A [`BoundaryScanner`] finds where one top-level document ends and the
//! next begins inside a growing buffer, using just enough structural
//! lexing (nesting depth, string and markup state) to place the cut. It
//! never validates content; a recognized range may still fail to decode.
//!
//! Scanners are resumable by construction: all lexing state lives in the
//! struct, so a scan interrupted at any byte picks up exactly where it
//! stopped when more bytes arrive.

use crate::error::CodecError;

// -----------------------------------------------------------------------------
// BoundaryScanner

/// Outcome of one [`BoundaryScanner::scan`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// Every buffered byte was examined without completing a document.
    NeedMore,
    /// A complete document occupies `start..end` of the scanned buffer.
    Document {
        /// Offset of the document's first byte.
        start: usize,
        /// Offset one past the document's last byte.
        end: usize,
    },
}

/// Incremental recognition of document boundaries in one format.
///
/// The caller owns a buffer that only ever grows at the tail or has a
/// prefix removed. After appending bytes it calls [`scan`](Self::scan)
/// with the whole buffer; the scanner resumes from its internal cursor
/// and reports the first completed document, or that it ran out of input.
/// After the caller drops a buffer prefix it must call
/// [`rebase`](Self::rebase) so the scanner's offsets stay aligned.
///
/// A document is complete exactly when the nesting depth returns to the
/// scanner's start depth after having exceeded it. With the default start
/// depth of 0 every top-level container is one document; a start depth of
/// 1 treats the elements *inside* one outer container as the documents,
/// for streams that arrive wrapped in an envelope.
///
/// Bytes between documents that never raise the depth (whitespace,
/// separators, bare scalars, the envelope's own brackets) belong to no
/// document and are never reported.
pub trait BoundaryScanner {
    /// Resumes scanning `buffer` from the first unexamined byte.
    ///
    /// Returns the first document completed by the newly examined bytes,
    /// [`Scan::NeedMore`] once the buffer is exhausted, or a
    /// [`CodecError::Syntax`] when the bytes cannot be framed in this
    /// format at all. A framing error is permanent; the scanner is not
    /// usable afterwards.
    fn scan(&mut self, buffer: &[u8]) -> Result<Scan, CodecError>;

    /// Informs the scanner that `count` bytes were removed from the front
    /// of the buffer.
    fn rebase(&mut self, count: usize);

    /// Whether a document has started and not yet completed.
    fn in_document(&self) -> bool {
        self.document_start().is_some()
    }

    /// Offset of the in-progress document's first byte, if one started.
    fn document_start(&self) -> Option<usize>;
}

// -----------------------------------------------------------------------------
// JSON

/// [`BoundaryScanner`] for streams of JSON documents.
///
/// Tracks `{}`/`[]` nesting and string state (including escapes) so that
/// braces inside string literals never count. Top-level scalars between
/// documents are skipped: only containers can exceed the start depth.
#[derive(Debug)]
pub struct JsonBoundaryScanner {
    start_depth: usize,
    cursor: usize,
    depth: usize,
    doc_start: Option<usize>,
    in_string: bool,
    escaped: bool,
}

impl JsonBoundaryScanner {
    /// Creates a scanner that completes documents at `start_depth`.
    pub fn new(start_depth: usize) -> Self {
        Self {
            start_depth,
            cursor: 0,
            depth: 0,
            doc_start: None,
            in_string: false,
            escaped: false,
        }
    }
}

impl BoundaryScanner for JsonBoundaryScanner {
    fn scan(&mut self, buffer: &[u8]) -> Result<Scan, CodecError> {
        while let Some(&byte) = buffer.get(self.cursor) {
            let at = self.cursor;
            self.cursor += 1;

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match byte {
                // Strings are lexed even between documents so quoted
                // brackets in top-level scalars cannot open one.
                b'"' => self.in_string = true,
                b'{' | b'[' => {
                    if self.depth == self.start_depth && self.doc_start.is_none() {
                        self.doc_start = Some(at);
                    }
                    self.depth += 1;
                }
                b'}' | b']' => {
                    if self.depth == 0 {
                        return Err(CodecError::syntax(
                            at,
                            format!("unmatched closing `{}`", char::from(byte)),
                        ));
                    }
                    self.depth -= 1;
                    if self.depth == self.start_depth {
                        if let Some(start) = self.doc_start.take() {
                            return Ok(Scan::Document { start, end: self.cursor });
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(Scan::NeedMore)
    }

    fn rebase(&mut self, count: usize) {
        self.cursor -= count;
        if let Some(start) = &mut self.doc_start {
            *start -= count;
        }
    }

    fn document_start(&self) -> Option<usize> {
        self.doc_start
    }
}

// -----------------------------------------------------------------------------
// XML

/// Lexing position inside XML-like markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum XmlState {
    /// Character data between markup.
    Text,
    /// Just behind a `<`, kind not yet known.
    TagOpen,
    /// Inside a start tag; `quote` is the open attribute delimiter and
    /// `slash` whether the last byte was a potential self-closing `/`.
    StartTag { quote: Option<u8>, slash: bool },
    /// Inside an end tag (`</...>`).
    EndTag,
    /// Inside a processing instruction, waiting for `?>`; the flag marks
    /// a just-seen `?`.
    Pi(bool),
    /// Behind `<!`, kind not yet known.
    Bang,
    /// Behind `<!-`, expecting the second dash.
    BangDash,
    /// Inside a comment; counts the trailing dashes seen (0..=2).
    Comment(u8),
    /// Matching the `[CDATA[` introducer byte by byte.
    CdataOpen(u8),
    /// Inside a CDATA section; counts the trailing `]` seen (0..=2).
    Cdata(u8),
    /// Inside `<!DOCTYPE ...>`, tracking internal-subset brackets.
    Doctype(u8),
}

/// [`BoundaryScanner`] for streams of XML documents.
///
/// Counts element nesting: a start tag opens a level, a matching end tag
/// closes it, and a self-closing tag at the start depth is a complete
/// document by itself. Comments, CDATA sections, processing instructions,
/// XML declarations and DOCTYPE declarations are skipped, and quoted
/// attribute values hide any `>` they contain.
#[derive(Debug)]
pub struct XmlBoundaryScanner {
    start_depth: usize,
    cursor: usize,
    depth: usize,
    doc_start: Option<usize>,
    /// Offset of the `<` that opened the markup currently being lexed.
    tag_start: usize,
    state: XmlState,
}

const CDATA_INTRODUCER: &[u8] = b"[CDATA[";

impl XmlBoundaryScanner {
    /// Creates a scanner that completes documents at `start_depth`.
    pub fn new(start_depth: usize) -> Self {
        Self {
            start_depth,
            cursor: 0,
            depth: 0,
            doc_start: None,
            tag_start: 0,
            state: XmlState::Text,
        }
    }

    /// An end tag or self-closing tag dropped one level.
    fn close_element(&mut self, at: usize) -> Result<Option<Scan>, CodecError> {
        self.state = XmlState::Text;
        if self.depth == 0 {
            return Err(CodecError::syntax(at, "end tag without matching start tag"));
        }
        self.depth -= 1;
        if self.depth == self.start_depth {
            if let Some(start) = self.doc_start.take() {
                return Ok(Some(Scan::Document { start, end: self.cursor }));
            }
        }
        Ok(None)
    }
}

impl BoundaryScanner for XmlBoundaryScanner {
    fn scan(&mut self, buffer: &[u8]) -> Result<Scan, CodecError> {
        while let Some(&byte) = buffer.get(self.cursor) {
            let at = self.cursor;
            self.cursor += 1;

            match self.state {
                XmlState::Text => {
                    if byte == b'<' {
                        self.tag_start = at;
                        self.state = XmlState::TagOpen;
                    }
                }
                XmlState::TagOpen => match byte {
                    b'/' => self.state = XmlState::EndTag,
                    b'?' => self.state = XmlState::Pi(false),
                    b'!' => self.state = XmlState::Bang,
                    b'>' => {
                        return Err(CodecError::syntax(at, "empty tag `<>`"));
                    }
                    _ => {
                        // A start tag. At the start depth this is where a
                        // document begins, `<` included.
                        if self.depth == self.start_depth && self.doc_start.is_none() {
                            self.doc_start = Some(self.tag_start);
                        }
                        self.state = XmlState::StartTag { quote: None, slash: false };
                    }
                },
                XmlState::StartTag { quote: Some(q), .. } => {
                    if byte == q {
                        self.state = XmlState::StartTag { quote: None, slash: false };
                    }
                }
                XmlState::StartTag { quote: None, slash } => match byte {
                    b'"' | b'\'' => {
                        self.state = XmlState::StartTag { quote: Some(byte), slash: false };
                    }
                    b'/' => self.state = XmlState::StartTag { quote: None, slash: true },
                    b'>' if slash => {
                        // Self-closing: the element opens and closes here.
                        self.depth += 1;
                        if let Some(scan) = self.close_element(at)? {
                            return Ok(scan);
                        }
                    }
                    b'>' => {
                        self.state = XmlState::Text;
                        self.depth += 1;
                    }
                    _ => {
                        if slash {
                            self.state = XmlState::StartTag { quote: None, slash: false };
                        }
                    }
                },
                XmlState::EndTag => {
                    if byte == b'>' {
                        if let Some(scan) = self.close_element(at)? {
                            return Ok(scan);
                        }
                    }
                }
                XmlState::Pi(saw_question) => match byte {
                    b'>' if saw_question => self.state = XmlState::Text,
                    b'?' => self.state = XmlState::Pi(true),
                    _ => self.state = XmlState::Pi(false),
                },
                XmlState::Bang => match byte {
                    b'-' => self.state = XmlState::BangDash,
                    // The `[` is the first byte of `[CDATA[`.
                    b'[' => self.state = XmlState::CdataOpen(1),
                    b'>' => self.state = XmlState::Text,
                    _ => self.state = XmlState::Doctype(0),
                },
                XmlState::BangDash => {
                    if byte == b'-' {
                        self.state = XmlState::Comment(0);
                    } else {
                        return Err(CodecError::syntax(at, "malformed comment open `<!-`"));
                    }
                }
                XmlState::Comment(dashes) => match byte {
                    b'-' => self.state = XmlState::Comment((dashes + 1).min(2)),
                    b'>' if dashes >= 2 => self.state = XmlState::Text,
                    _ => self.state = XmlState::Comment(0),
                },
                XmlState::CdataOpen(matched) => {
                    if byte == CDATA_INTRODUCER[matched as usize] {
                        if matched as usize + 1 == CDATA_INTRODUCER.len() {
                            self.state = XmlState::Cdata(0);
                        } else {
                            self.state = XmlState::CdataOpen(matched + 1);
                        }
                    } else {
                        return Err(CodecError::syntax(at, "malformed CDATA section open"));
                    }
                }
                XmlState::Cdata(brackets) => match byte {
                    b']' => self.state = XmlState::Cdata((brackets + 1).min(2)),
                    b'>' if brackets >= 2 => self.state = XmlState::Text,
                    _ => self.state = XmlState::Cdata(0),
                },
                XmlState::Doctype(brackets) => match byte {
                    b'[' => self.state = XmlState::Doctype(brackets.saturating_add(1)),
                    b']' if brackets > 0 => self.state = XmlState::Doctype(brackets - 1),
                    b'>' if brackets == 0 => self.state = XmlState::Text,
                    _ => {}
                },
            }
        }
        Ok(Scan::NeedMore)
    }

    fn rebase(&mut self, count: usize) {
        self.cursor -= count;
        if let Some(start) = &mut self.doc_start {
            *start -= count;
        }
        if self.tag_start >= count {
            self.tag_start -= count;
        } else {
            self.tag_start = 0;
        }
    }

    fn document_start(&self) -> Option<usize> {
        self.doc_start
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    /// Runs `scanner` over `input`, returning every completed document as
    /// an owned string, mimicking the buffer discipline of the tokenizer.
    fn collect(scanner: &mut dyn BoundaryScanner, input: &str) -> Vec<String> {
        let mut buffer = input.as_bytes().to_vec();
        let mut documents = Vec::new();
        loop {
            match scanner.scan(&buffer).unwrap() {
                Scan::Document { start, end } => {
                    documents.push(String::from_utf8(buffer[start..end].to_vec()).unwrap());
                    buffer.drain(..end);
                    scanner.rebase(end);
                }
                Scan::NeedMore => return documents,
            }
        }
    }

    #[test]
    fn json_splits_adjacent_documents() {
        let mut scanner = JsonBoundaryScanner::new(0);
        let documents = collect(&mut scanner, "{\"a\":1}{\"b\":2}");
        assert_eq!(documents, ["{\"a\":1}", "{\"b\":2}"]);
        assert!(!scanner.in_document());
    }

    #[test]
    fn json_ignores_brackets_inside_strings() {
        let mut scanner = JsonBoundaryScanner::new(0);
        let documents = collect(&mut scanner, r#"{"a":"}{","b":"\"}"}["}"]"#);
        assert_eq!(documents, [r#"{"a":"}{","b":"\"}"}"#, r#"["}"]"#]);
    }

    #[test]
    fn json_skips_scalars_between_documents() {
        let mut scanner = JsonBoundaryScanner::new(0);
        let documents = collect(&mut scanner, "null 17 \"{not a doc}\" [1] true");
        assert_eq!(documents, ["[1]"]);
    }

    #[test]
    fn json_byte_at_a_time_resumes() {
        let mut scanner = JsonBoundaryScanner::new(0);
        let input = b"{\"a\": [1, 2]} {\"b\":{}}";
        let mut buffer = Vec::new();
        let mut documents: Vec<Vec<u8>> = Vec::new();
        for &byte in input {
            buffer.push(byte);
            while let Scan::Document { start, end } = scanner.scan(&buffer).unwrap() {
                documents.push(buffer[start..end].to_vec());
                buffer.drain(..end);
                scanner.rebase(end);
            }
        }
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0], b"{\"a\": [1, 2]}");
        assert_eq!(documents[1], b"{\"b\":{}}");
    }

    #[test]
    fn json_start_depth_splits_enveloped_stream() {
        let mut scanner = JsonBoundaryScanner::new(1);
        let documents = collect(&mut scanner, "[{\"a\":1}, [2, 3], {\"b\":4}]");
        assert_eq!(documents, ["{\"a\":1}", "[2, 3]", "{\"b\":4}"]);
    }

    #[test]
    fn json_unmatched_close_is_fatal() {
        let mut scanner = JsonBoundaryScanner::new(0);
        let buffer = b"{\"a\":1}]";
        // The first document completes; the stray bracket fails the next scan.
        assert_eq!(scanner.scan(buffer).unwrap(), Scan::Document { start: 0, end: 7 });
        assert!(matches!(
            scanner.scan(buffer),
            Err(CodecError::Syntax { offset: 7, .. })
        ));
    }

    #[test]
    fn json_partial_document_is_reported_in_progress() {
        let mut scanner = JsonBoundaryScanner::new(0);
        assert_eq!(scanner.scan(b"  {\"a\":").unwrap(), Scan::NeedMore);
        assert!(scanner.in_document());
        assert_eq!(scanner.document_start(), Some(2));
    }

    #[test]
    fn xml_splits_adjacent_documents() {
        let mut scanner = XmlBoundaryScanner::new(0);
        let documents = collect(
            &mut scanner,
            "<a><b>text</b></a><c attr=\"v\"/><d>x</d>",
        );
        assert_eq!(documents, ["<a><b>text</b></a>", "<c attr=\"v\"/>", "<d>x</d>"]);
    }

    #[test]
    fn xml_skips_prolog_comments_and_cdata() {
        let mut scanner = XmlBoundaryScanner::new(0);
        let documents = collect(
            &mut scanner,
            "<?xml version=\"1.0\"?><!DOCTYPE a [<!ENTITY x \"y\">]>\
             <!-- <fake> --><a><![CDATA[</not-closing>]]></a><!-- tail -->",
        );
        assert_eq!(documents, ["<a><![CDATA[</not-closing>]]></a>"]);
    }

    #[test]
    fn xml_quoted_attribute_hides_closing_angle() {
        let mut scanner = XmlBoundaryScanner::new(0);
        let documents = collect(&mut scanner, "<a note='1 > 0' x=\"/>\">ok</a>");
        assert_eq!(documents, ["<a note='1 > 0' x=\"/>\">ok</a>"]);
    }

    #[test]
    fn xml_start_depth_splits_enveloped_stream() {
        let mut scanner = XmlBoundaryScanner::new(1);
        let documents = collect(&mut scanner, "<feed><item>1</item><item/></feed>");
        assert_eq!(documents, ["<item>1</item>", "<item/>"]);
        assert_eq!(scanner.scan(b"").unwrap(), Scan::NeedMore);
    }

    #[test]
    fn xml_unmatched_end_tag_is_fatal() {
        let mut scanner = XmlBoundaryScanner::new(0);
        assert!(matches!(
            scanner.scan(b"</a>"),
            Err(CodecError::Syntax { offset: 3, .. })
        ));
    }

    #[test]
    fn xml_document_start_includes_the_angle_bracket() {
        let mut scanner = XmlBoundaryScanner::new(0);
        assert_eq!(scanner.scan(b"  <methodCa").unwrap(), Scan::NeedMore);
        assert_eq!(scanner.document_start(), Some(2));
    }

    #[test]
    fn xml_byte_at_a_time_resumes() {
        let mut scanner = XmlBoundaryScanner::new(0);
        let input = b"<a p='>'><!--x--><b/></a><c/>";
        let mut buffer = Vec::new();
        let mut documents: Vec<Vec<u8>> = Vec::new();
        for &byte in input {
            buffer.push(byte);
            while let Scan::Document { start, end } = scanner.scan(&buffer).unwrap() {
                documents.push(buffer[start..end].to_vec());
                buffer.drain(..end);
                scanner.rebase(end);
            }
        }
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0], b"<a p='>'><!--x--><b/></a>");
        assert_eq!(documents[1], b"<c/>");
    }
}
