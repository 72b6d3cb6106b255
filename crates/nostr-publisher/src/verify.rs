//! Bridge between [`SignedEvent`] and `nostr_sdk` events, including
//! signature verification.

use bookmark_core::SignedEvent;
use nostr_sdk::prelude::*;

use crate::Error;

/// Convert to the SDK event type. Checks the wire shape, not the signature.
pub fn to_nostr_event(event: &SignedEvent) -> Result<Event, Error> {
    let json = event.to_json()?;
    Event::from_json(json).map_err(|err| Error::InvalidEvent(err.to_string()))
}

/// Verify the event id and Schnorr signature.
pub fn verify_signature(event: &SignedEvent) -> Result<(), Error> {
    to_nostr_event(event)?
        .verify()
        .map_err(|err| Error::Signature(err.to_string()))
}
