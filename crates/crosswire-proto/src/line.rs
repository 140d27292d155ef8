//! Line framing for the byte-stream side.
//!
//! The byte-stream transport has no message boundaries; this module imposes
//! them by splitting on `\n`. A single read may carry zero, one, or many
//! complete lines, and a line may span any number of reads, so the framer
//! buffers the trailing partial line between [`LineFramer::push`] calls.
//!
//! # Invariants
//!
//! - A line is not a message until its terminator has been seen. An
//!   unterminated line at stream end is discarded, never flushed (the peer
//!   that stopped mid-line never finished saying anything).
//! - Each message is trimmed of surrounding whitespace; lines that trim to
//!   empty are skipped entirely.
//! - The buffered partial line is bounded. Once the bound is exceeded the
//!   framer returns [`ProtocolError::LineTooLong`] and the connection must
//!   be closed - there is no way to resynchronize mid-line.
//! - Splitting happens on raw bytes, so multi-byte UTF-8 sequences split
//!   across reads reassemble correctly. Invalid UTF-8 is replaced lossily,
//!   matching the forgiving decoding of typical engine-side senders.

use crate::errors::{ProtocolError, Result};

/// Default bound on a single buffered line (64 KiB).
pub const DEFAULT_MAX_LINE: usize = 64 * 1024;

/// Stateful splitter turning raw byte chunks into whole trimmed messages.
#[derive(Debug)]
pub struct LineFramer {
    /// Bytes of the current unterminated line.
    partial: Vec<u8>,
    /// Maximum permitted length of a buffered line, in bytes.
    max_line: usize,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE)
    }
}

impl LineFramer {
    /// Create a framer with the given line bound in bytes.
    #[must_use]
    pub fn new(max_line: usize) -> Self {
        Self { partial: Vec::new(), max_line }
    }

    /// Feed one read chunk, returning every message it completes.
    ///
    /// Messages come back trimmed, non-empty, in wire order.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::LineTooLong`] if the unterminated tail exceeds the
    /// configured bound. The framer's buffer is cleared; the caller must
    /// close the connection.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        let mut messages = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (line, tail) = rest.split_at(pos);
            rest = &tail[1..]; // skip the terminator

            let complete = if self.partial.is_empty() {
                String::from_utf8_lossy(line).into_owned()
            } else {
                self.partial.extend_from_slice(line);
                let joined = String::from_utf8_lossy(&self.partial).into_owned();
                self.partial.clear();
                joined
            };

            let trimmed = complete.trim();
            if !trimmed.is_empty() {
                messages.push(trimmed.to_owned());
            }
        }

        if self.partial.len() + rest.len() > self.max_line {
            self.partial.clear();
            return Err(ProtocolError::LineTooLong { max: self.max_line });
        }
        self.partial.extend_from_slice(rest);

        Ok(messages)
    }

    /// Whether an unterminated line is currently buffered.
    ///
    /// Only useful for diagnostics at stream end; the buffered bytes are
    /// intentionally dropped when the framer is.
    #[must_use]
    pub fn has_partial(&self) -> bool {
        !self.partial.is_empty()
    }

    /// Frame one outgoing message for the byte-stream side.
    ///
    /// The written bytes are `trim(payload) + "\n"` - exactly one
    /// terminator per message, never batched.
    #[must_use]
    pub fn encode(payload: &str) -> String {
        let mut out = String::with_capacity(payload.len() + 1);
        out.push_str(payload.trim());
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_single_line() {
        let mut framer = LineFramer::default();
        let messages = framer.push(b"hello\n").unwrap();
        assert_eq!(messages, vec!["hello"]);
        assert!(!framer.has_partial());
    }

    #[test]
    fn one_read_many_lines() {
        let mut framer = LineFramer::default();
        let messages = framer.push(b"a\nb\nc\n").unwrap();
        assert_eq!(messages, vec!["a", "b", "c"]);
    }

    #[test]
    fn line_spanning_reads_reassembles() {
        let mut framer = LineFramer::default();
        assert!(framer.push(b"hel").unwrap().is_empty());
        assert!(framer.has_partial());
        let messages = framer.push(b"lo\nworld").unwrap();
        assert_eq!(messages, vec!["hello"]);
        assert!(framer.has_partial());
    }

    #[test]
    fn blank_and_whitespace_lines_skipped() {
        let mut framer = LineFramer::default();
        let messages = framer.push(b"\n  \n\t\nreal\n").unwrap();
        assert_eq!(messages, vec!["real"]);
    }

    #[test]
    fn messages_are_trimmed() {
        let mut framer = LineFramer::default();
        let messages = framer.push(b"  padded \r\n").unwrap();
        assert_eq!(messages, vec!["padded"]);
    }

    #[test]
    fn multibyte_utf8_split_across_reads() {
        let mut framer = LineFramer::default();
        let bytes = "héllo\n".as_bytes();
        // Split inside the two-byte 'é' sequence.
        assert!(framer.push(&bytes[..2]).unwrap().is_empty());
        let messages = framer.push(&bytes[2..]).unwrap();
        assert_eq!(messages, vec!["héllo"]);
    }

    #[test]
    fn oversized_line_errors_and_clears() {
        let mut framer = LineFramer::new(8);
        let err = framer.push(b"0123456789").unwrap_err();
        assert_eq!(err, ProtocolError::LineTooLong { max: 8 });
        assert!(!framer.has_partial());
    }

    #[test]
    fn bound_applies_across_reads() {
        let mut framer = LineFramer::new(8);
        assert!(framer.push(b"01234").unwrap().is_empty());
        assert!(framer.push(b"56789").is_err());
    }

    #[test]
    fn terminated_line_may_reach_bound() {
        let mut framer = LineFramer::new(8);
        let messages = framer.push(b"01234567\n").unwrap();
        assert_eq!(messages, vec!["01234567"]);
    }

    #[test]
    fn encode_appends_exactly_one_terminator() {
        assert_eq!(LineFramer::encode("msg"), "msg\n");
        assert_eq!(LineFramer::encode("  msg \n"), "msg\n");
        assert_eq!(LineFramer::encode(""), "\n");
    }
}
