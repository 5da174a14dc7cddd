use crate::error::{EmitError, ParseError};
use crate::ipv6_address::Ipv6Address;

/// ICMPv6 protocol number within an IPv6 next-header chain.
pub const PROTOCOL: u8 = 58;

const FIXED_HEADER_LEN: usize = 4 + 8;

/// A parsed ICMPv6 message: type, code, the four-octet type-specific word
/// (folded in here as an 8-octet "body" to keep the echo/NA/RA families
/// uniform), and whatever payload followed.
///
/// Unlike the extension headers in [`crate::ipv6`], this type has no
/// reference back to the datagram that carried it. Its checksum depends on
/// the enclosing source and destination addresses, so callers that want to
/// render it must supply those explicitly through [`Icmpv6Message::emit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icmpv6Message {
    pub msg_type: u8,
    pub msg_code: u8,
    pub body: [u8; 8],
    pub payload: Vec<u8>,
}

impl Icmpv6Message {
    pub fn new(msg_type: u8, msg_code: u8, body: [u8; 8], payload: Vec<u8>) -> Self {
        Self {
            msg_type,
            msg_code,
            body,
            payload,
        }
    }

    pub(crate) fn parse(remaining: &[u8]) -> Result<(Self, usize), ParseError> {
        if remaining.len() < FIXED_HEADER_LEN {
            return Err(ParseError::TooShort {
                need: FIXED_HEADER_LEN,
                have: remaining.len(),
            });
        }

        let msg_type = remaining[0];
        let msg_code = remaining[1];
        // remaining[2..4] is the on-wire checksum; verification is the
        // decoder's concern, not parsing, so it is not retained here.
        let mut body = [0u8; 8];
        body.copy_from_slice(&remaining[4..FIXED_HEADER_LEN]);
        let payload = remaining[FIXED_HEADER_LEN..].to_vec();
        let consumed = remaining.len();

        Ok((
            Self {
                msg_type,
                msg_code,
                body,
                payload,
            },
            consumed,
        ))
    }

    /// Renders the message with a checksum computed over the ICMPv6
    /// pseudo-header (RFC 8200 §8.1) built from `src` and `dst`.
    pub fn emit(&self, src: Ipv6Address, dst: Ipv6Address) -> Vec<u8> {
        let upper_layer_len = (FIXED_HEADER_LEN + self.payload.len()) as u32;

        let mut buf = Vec::with_capacity(40 + self.payload.len());
        buf.extend_from_slice(&src.octets());
        buf.extend_from_slice(&dst.octets());
        buf.extend_from_slice(&upper_layer_len.to_be_bytes());
        buf.extend_from_slice(&[0, 0, 0]);
        buf.push(PROTOCOL);

        let message_start = buf.len();
        buf.push(self.msg_type);
        buf.push(self.msg_code);
        buf.extend_from_slice(&[0, 0]);
        buf.extend_from_slice(&self.body);
        buf.extend_from_slice(&self.payload);

        let checksum = inet_checksum::checksum(&buf, 0);
        buf[message_start + 2..message_start + 4].copy_from_slice(&checksum.to_be_bytes());

        buf[message_start..].to_vec()
    }

    /// Renders the message without an enclosing datagram. ICMPv6's checksum
    /// is not meaningful without the pseudo-header addresses, so this always
    /// fails; it exists so callers that only have an `Icmpv6Message` in hand
    /// get a typed error instead of a call to [`Icmpv6Message::emit`] with
    /// made-up addresses.
    pub fn emit_standalone(&self) -> Result<Vec<u8>, EmitError> {
        Err(EmitError::MissingContext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> Ipv6Address {
        let mut octets = [0u8; 16];
        octets[0] = 0xfe;
        octets[1] = 0x80;
        octets[15] = last;
        Ipv6Address::new(octets)
    }

    #[test]
    fn parse_reads_fixed_header_and_keeps_trailing_payload() {
        let mut wire = vec![128, 0, 0xaa, 0xbb, 1, 2, 3, 4, 5, 6, 7, 8];
        wire.extend_from_slice(b"echo-data");

        let (msg, consumed) = Icmpv6Message::parse(&wire).unwrap();
        assert_eq!(consumed, wire.len());
        assert_eq!(msg.msg_type, 128);
        assert_eq!(msg.msg_code, 0);
        assert_eq!(msg.body, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(msg.payload, b"echo-data");
    }

    #[test]
    fn parse_rejects_buffer_shorter_than_fixed_header() {
        let wire = [128, 0, 0, 0];
        assert_eq!(
            Icmpv6Message::parse(&wire).unwrap_err(),
            ParseError::TooShort { need: 12, have: 4 }
        );
    }

    #[test]
    fn emit_fills_in_a_verifiable_checksum() {
        let msg = Icmpv6Message::new(128, 0, [0, 0, 0, 0, 0, 0, 0, 0], b"ping".to_vec());
        let wire = msg.emit(addr(1), addr(2));

        let mut pseudo = Vec::new();
        pseudo.extend_from_slice(&addr(1).octets());
        pseudo.extend_from_slice(&addr(2).octets());
        pseudo.extend_from_slice(&(wire.len() as u32).to_be_bytes());
        pseudo.extend_from_slice(&[0, 0, 0, PROTOCOL]);
        pseudo.extend_from_slice(&wire);

        assert_eq!(inet_checksum::checksum(&pseudo, 0), 0);
    }

    #[test]
    fn parse_then_emit_round_trips_the_message() {
        let original = Icmpv6Message::new(129, 0, [9, 9, 0, 0, 0, 0, 0, 0], b"pong".to_vec());
        let wire = original.emit(addr(1), addr(2));
        let (parsed, consumed) = Icmpv6Message::parse(&wire).unwrap();

        assert_eq!(consumed, wire.len());
        assert_eq!(parsed.msg_type, original.msg_type);
        assert_eq!(parsed.msg_code, original.msg_code);
        assert_eq!(parsed.body, original.body);
        assert_eq!(parsed.payload, original.payload);
    }

    #[test]
    fn emit_standalone_reports_missing_context() {
        let msg = Icmpv6Message::new(128, 0, [0; 8], Vec::new());
        assert_eq!(msg.emit_standalone().unwrap_err(), EmitError::MissingContext);
    }
}
