//! Fuzz target for line-framer chunk boundary conditions
//!
//! The framer consumes attacker-controlled bytes straight off the socket,
//! so it must never panic and never buffer past its bound.
//!
//! # Strategy
//!
//! - Arbitrary byte chunks, including invalid UTF-8 and bare `\n` runs
//! - Arbitrary chunk boundaries (each input slice is one "read")
//! - Small line bounds to hit the overflow path often
//!
//! # Invariants
//!
//! - `push` never panics for any input
//! - After `LineTooLong` the framer has an empty buffer and stays usable
//! - Emitted messages are trimmed and non-empty

#![no_main]

use arbitrary::Arbitrary;
use crosswire_proto::{LineFramer, ProtocolError};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    max_line: u16,
    chunks: Vec<Vec<u8>>,
}

fuzz_target!(|input: Input| {
    let max_line = usize::from(input.max_line.max(1));
    let mut framer = LineFramer::new(max_line);

    for chunk in &input.chunks {
        match framer.push(chunk) {
            Ok(messages) => {
                for message in messages {
                    assert!(!message.is_empty());
                    assert_eq!(message.trim(), message);
                }
            },
            Err(ProtocolError::LineTooLong { max }) => {
                assert_eq!(max, max_line);
                assert!(!framer.has_partial(), "buffer must be cleared after overflow");
            },
            Err(_) => unreachable!("push only fails with LineTooLong"),
        }
    }
});
