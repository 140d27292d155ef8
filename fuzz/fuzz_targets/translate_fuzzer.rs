//! Fuzz target for envelope/event translation
//!
//! Frame payloads arrive from untrusted WebSocket peers; translation must
//! reject garbage with structured errors, never panic.
//!
//! # Invariants
//!
//! - `to_back`/`to_front` never panic for any input text
//! - Whatever `to_back` forwards parses as a named event
//! - Whatever `to_front` forwards parses as an envelope with a
//!   whitelisted type

#![no_main]

use crosswire_proto::{Envelope, EventMessage, EventWhitelist, Translator};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|text: &str| {
    let translator = Translator::event_bridge();
    let whitelist = EventWhitelist::default();

    if let Ok(Some(forwarded)) = translator.to_back(text) {
        let event = EventMessage::parse(&forwarded).expect("forwarded text must be a valid event");
        assert!(!event.event.trim().is_empty());
    }

    if let Ok(Some(forwarded)) = translator.to_front(text) {
        let envelope =
            Envelope::parse(&forwarded).expect("forwarded text must be a valid envelope");
        assert!(whitelist.allows(&envelope.kind));
    }
});
