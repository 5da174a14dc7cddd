//! STX/ETX delimited, DLE-escaped frame transport.
//!
//! This is the link-layer framing underneath the agent protocol: [`wrap`]
//! turns a payload into a self-delimited frame ready to write to a pipe, and
//! [`Decoder`] turns a stream of bytes read from a pipe back into payloads,
//! resynchronizing after garbage or truncated frames.

#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::collections::VecDeque;

/// Start of heading — interface announcement frame type.
pub const SOH: u8 = 0x01;
/// Start of text — frame delimiter, marks the start of a stuffed frame.
pub const STX: u8 = 0x02;
/// End of text — frame delimiter, marks the end of a stuffed frame.
pub const ETX: u8 = 0x03;
/// End of transmission — termination frame type.
pub const EOT: u8 = 0x04;
/// Acknowledge — positive response frame type.
pub const ACK: u8 = 0x06;
/// Data link escape — escapes `DLE`, `STX`, `ETX` within a frame body.
pub const DLE: u8 = 0x10;
/// Negative acknowledge — negative response frame type.
pub const NAK: u8 = 0x15;
/// Synchronous idle — heartbeat/resync frame type.
pub const SYN: u8 = 0x16;
/// Field separator — Ethernet data frame type.
pub const FS: u8 = 0x1C;

const ESCAPED_DLE: u8 = b'p';
const ESCAPED_STX: u8 = b'b';
const ESCAPED_ETX: u8 = b'c';

/// A frame failed to decode and was dropped.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The frame ended with an escape byte that had no following byte, or an
    /// escape byte was followed by something other than `b`, `c`, or `p`.
    #[error("dangling or unrecognised DLE escape sequence in frame")]
    DanglingEscape,
}

/// Escapes `payload` and wraps it in `STX ... ETX` delimiters.
///
/// Substitutions: `DLE` → `DLE,'p'`, `STX` → `DLE,'b'`, `ETX` → `DLE,'c'`.
/// Because each output byte is decided from a single input byte in one
/// forward pass, the three substitutions never interact with each other's
/// output, even though the three-pass reading of this rule (DLE first, then
/// STX, then ETX) suggests an ordering dependency.
pub fn wrap(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 2);
    out.push(STX);
    for &b in payload {
        match b {
            DLE => out.extend_from_slice(&[DLE, ESCAPED_DLE]),
            STX => out.extend_from_slice(&[DLE, ESCAPED_STX]),
            ETX => out.extend_from_slice(&[DLE, ESCAPED_ETX]),
            other => out.push(other),
        }
    }
    out.push(ETX);
    out
}

/// Streaming de-stuffer. Feed it bytes as they arrive from the child's
/// stdout; pull complete payloads back out with [`Decoder::next_frame`].
#[derive(Debug, Default)]
pub struct Decoder {
    buf: VecDeque<u8>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends freshly-read bytes to the internal buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend(bytes.iter().copied());
    }

    /// Extracts the next complete frame from the buffer, if one is present.
    ///
    /// Bytes preceding the first `STX` are discarded (resynchronization). A
    /// `STX` with no matching `ETX` yet is left in the buffer. A frame whose
    /// body fails to unescape is dropped; the buffer still advances past its
    /// `ETX` so a later call can make progress on subsequent frames.
    pub fn next_frame(&mut self) -> Option<Result<Vec<u8>, DecodeError>> {
        let stx_pos = self.buf.iter().position(|&b| b == STX)?;
        if stx_pos > 0 {
            tracing::debug!(discarded = stx_pos, "resynchronizing, discarding bytes before STX");
            self.buf.drain(..stx_pos);
        }

        let etx_pos = self.buf.iter().skip(1).position(|&b| b == ETX)? + 1;

        let raw: Vec<u8> = self.buf.iter().skip(1).take(etx_pos - 1).copied().collect();
        self.buf.drain(..=etx_pos);

        match unescape(&raw) {
            Ok(payload) => Some(Ok(payload)),
            Err(e) => {
                tracing::debug!("dropping malformed frame: {e}");
                Some(Err(e))
            }
        }
    }
}

fn unescape(raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(raw.len());
    let mut iter = raw.iter().copied();

    while let Some(b) = iter.next() {
        if b != DLE {
            out.push(b);
            continue;
        }

        match iter.next() {
            Some(ESCAPED_STX) => out.push(STX),
            Some(ESCAPED_ETX) => out.push(ETX),
            Some(ESCAPED_DLE) => out.push(DLE),
            _ => return Err(DecodeError::DanglingEscape),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::Strategy;

    #[test]
    fn wraps_and_escapes_payload() {
        let wrapped = wrap(&[0x10, 0x02, 0x03]);
        assert_eq!(
            wrapped,
            vec![0x02, 0x10, 0x70, 0x10, 0x62, 0x10, 0x63, 0x03]
        );
    }

    #[test]
    fn round_trips_arbitrary_payload() {
        let payload = b"\x10\x02\x03hello\x01\x04\x06\x15\x16\x1c";
        let wrapped = wrap(payload);

        let mut decoder = Decoder::new();
        decoder.feed(&wrapped);
        assert_eq!(decoder.next_frame().unwrap().unwrap(), payload);
        assert!(decoder.next_frame().is_none());
    }

    #[test]
    fn decodes_multiple_frames_fed_in_one_chunk() {
        let mut decoder = Decoder::new();
        decoder.feed(&wrap(b"one"));
        decoder.feed(&wrap(b"two"));

        assert_eq!(decoder.next_frame().unwrap().unwrap(), b"one");
        assert_eq!(decoder.next_frame().unwrap().unwrap(), b"two");
        assert!(decoder.next_frame().is_none());
    }

    #[test]
    fn decodes_frame_split_across_many_small_feeds() {
        let wrapped = wrap(b"split-across-chunks");

        let mut decoder = Decoder::new();
        for byte in &wrapped {
            decoder.feed(&[*byte]);
        }

        assert_eq!(decoder.next_frame().unwrap().unwrap(), b"split-across-chunks");
    }

    #[test]
    fn resynchronizes_past_garbage_without_stx() {
        let mut decoder = Decoder::new();
        decoder.feed(b"garbage-with-no-stx-bytes-in-it");
        decoder.feed(&wrap(b"payload"));

        assert_eq!(decoder.next_frame().unwrap().unwrap(), b"payload");
    }

    #[test]
    fn incomplete_frame_waits_for_more_bytes() {
        let mut decoder = Decoder::new();
        decoder.feed(&[STX, b'h', b'i']);
        assert!(decoder.next_frame().is_none());

        decoder.feed(&[ETX]);
        assert_eq!(decoder.next_frame().unwrap().unwrap(), b"hi");
    }

    #[test]
    fn dangling_escape_is_reported_and_buffer_advances() {
        let mut decoder = Decoder::new();
        decoder.feed(&[STX, b'x', DLE, ETX]);
        decoder.feed(&wrap(b"next"));

        assert_eq!(
            decoder.next_frame().unwrap().unwrap_err(),
            DecodeError::DanglingEscape
        );
        assert_eq!(decoder.next_frame().unwrap().unwrap(), b"next");
    }

    #[test]
    fn unrecognised_escape_is_reported() {
        let mut decoder = Decoder::new();
        decoder.feed(&[STX, DLE, b'z', ETX]);

        assert_eq!(
            decoder.next_frame().unwrap().unwrap_err(),
            DecodeError::DanglingEscape
        );
    }

    proptest::proptest! {
        #[test]
        fn round_trip_holds_for_any_payload(payload in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..128)) {
            let mut decoder = Decoder::new();
            decoder.feed(&wrap(&payload));
            proptest::prop_assert_eq!(decoder.next_frame().unwrap().unwrap(), payload);
        }

        #[test]
        fn resync_holds_for_any_stx_free_garbage(
            garbage in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..64)
                .prop_map(|v| v.into_iter().filter(|b| *b != STX).collect::<Vec<u8>>()),
            payload in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..64),
        ) {
            let mut decoder = Decoder::new();
            decoder.feed(&garbage);
            decoder.feed(&wrap(&payload));
            proptest::prop_assert_eq!(decoder.next_frame().unwrap().unwrap(), payload);
        }
    }
}
