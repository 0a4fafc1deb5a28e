//! Fuzz target for envelope and event decoding.
//!
//! Arbitrary bytes are fed through the full inbound decode path: wire
//! string to [`Envelope`], then typed decoding against every namespace's
//! closed event set. Invalid input must always surface as an error, never
//! a panic.

#![no_main]

use huddle_proto::{Envelope, Namespace, PresenceEvent, RoomEvent};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(envelope) = Envelope::decode(raw) else {
        return;
    };

    // A structurally valid envelope may still carry any payload; typed
    // decoding must reject bad shapes without panicking.
    let _ = PresenceEvent::from_envelope(&envelope);
    let _ = RoomEvent::from_envelope(Namespace::Chat, &envelope);
    let _ = RoomEvent::from_envelope(Namespace::Project, &envelope);

    // Anything that decoded must re-encode.
    if let Ok(event) = RoomEvent::from_envelope(Namespace::Chat, &envelope) {
        let reencoded = event.into_envelope();
        assert!(reencoded.is_ok(), "decoded event failed to re-encode");
    }
});
