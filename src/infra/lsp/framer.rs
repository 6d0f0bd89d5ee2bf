//! LSP Message Framing
//!
//! Splits a server's stdout byte stream into JSON-RPC bodies framed with
//! `Content-Length` headers, and frames outgoing messages the same way.
//!
//! ```text
//! Content-Length: 123\r\n
//! \r\n
//! {"jsonrpc":"2.0",...}
//! ```

use serde::Serialize;
use serde_json::Value;

use crate::error::FrameError;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;
/// Output without a header terminator beyond this is noise
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Stream-resuming decoder
///
/// Bytes arrive in arbitrary chunks; a frame split across chunks is held
/// until its body is complete.
#[derive(Debug, Default)]
pub struct Framer {
    buffer: Vec<u8>,
    /// Body length of the frame whose header has already been consumed
    expected: Option<usize>,
    /// Prefix of `buffer` already searched for a header terminator
    scanned: usize,
}

impl Framer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and iterate over every frame now complete
    pub fn feed(&mut self, bytes: &[u8]) -> Frames<'_> {
        self.buffer.extend_from_slice(bytes);
        Frames { framer: self }
    }

    fn next_frame(&mut self) -> Option<Result<Value, FrameError>> {
        let length = match self.expected {
            Some(length) => length,
            None => {
                let Some(end) = self.find_terminator() else {
                    return self.discard_noise().map(Err);
                };
                let header = String::from_utf8_lossy(&self.buffer[..end]).into_owned();
                // The header is consumed whether or not it parses, which is
                // how the stream resynchronizes after a bad frame.
                self.buffer.drain(..end + HEADER_TERMINATOR.len());
                match parse_content_length(&header) {
                    Ok(length) => {
                        self.expected = Some(length);
                        length
                    }
                    Err(err) => return Some(Err(err)),
                }
            }
        };

        if self.buffer.len() < length {
            return None;
        }

        self.expected = None;
        let body: Vec<u8> = self.buffer.drain(..length).collect();
        tracing::trace!("LSP <- {}", String::from_utf8_lossy(&body));
        Some(serde_json::from_slice(&body).map_err(FrameError::from))
    }

    /// Resume the terminator search where the previous feed left off
    fn find_terminator(&mut self) -> Option<usize> {
        let from = self.scanned.saturating_sub(HEADER_TERMINATOR.len() - 1);
        match find(&self.buffer[from..], HEADER_TERMINATOR) {
            Some(pos) => {
                self.scanned = 0;
                Some(from + pos)
            }
            None => {
                self.scanned = self.buffer.len();
                None
            }
        }
    }

    /// Drop stdout noise once it outgrows any plausible header. The last
    /// line break is kept as a possible start of the next header.
    fn discard_noise(&mut self) -> Option<FrameError> {
        if self.buffer.len() <= MAX_HEADER_BYTES {
            return None;
        }
        let len = self.buffer.len();
        let keep_from = self
            .buffer
            .windows(2)
            .rposition(|pair| pair == b"\r\n")
            .filter(|&pos| pos > 0 && len - pos <= MAX_HEADER_BYTES)
            .unwrap_or(len - (HEADER_TERMINATOR.len() - 1));

        self.buffer.drain(..keep_from);
        self.scanned = self.buffer.len();
        Some(FrameError::NoHeader(keep_from))
    }
}

/// Lazy sequence of frames decoded by one `feed` call
pub struct Frames<'a> {
    framer: &'a mut Framer,
}

impl Iterator for Frames<'_> {
    type Item = Result<Value, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.framer.next_frame()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_content_length(header: &str) -> Result<usize, FrameError> {
    let mut content_length = None;

    for line in header.split("\r\n") {
        // Other headers (Content-Type) and stray noise lines are ignored
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            let value = value.trim();
            let length: usize = value
                .parse()
                .map_err(|_| FrameError::InvalidLength(value.to_string()))?;
            content_length = Some(length);
        }
    }

    let length = content_length.ok_or(FrameError::MissingLength)?;
    if length > MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge(length));
    }
    Ok(length)
}

/// Frame a message for the wire as a single buffer
pub fn encode<T: Serialize>(message: &T) -> serde_json::Result<Vec<u8>> {
    let json = serde_json::to_string(message)?;
    tracing::trace!("LSP -> {}", json);

    let mut frame = format!("Content-Length: {}\r\n\r\n", json.len()).into_bytes();
    frame.extend_from_slice(json.as_bytes());
    Ok(frame)
}
