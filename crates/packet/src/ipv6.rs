use crate::error::ParseError;
use crate::icmpv6::Icmpv6Message;
use crate::ipv6_address::Ipv6Address;
use crate::registry::CodecRegistry;

const FIXED_HEADER_LEN: usize = 40;
const NO_NEXT_HEADER: u8 = 59;

/// An IPv6 extension header this crate has no dedicated codec for. Preserved
/// verbatim (next-header tag plus body) so a datagram can be re-emitted
/// byte-identical even when it carries headers this crate doesn't otherwise
/// understand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericExtensionHeader {
    /// The IPv6 protocol number this header was reached under (i.e. the
    /// previous header's next-header value), which doubles as this header's
    /// own type identity on the wire.
    pub protocol: u8,
    pub body: Vec<u8>,
}

impl GenericExtensionHeader {
    fn emit(&self, next_header: u8) -> Vec<u8> {
        let mut body = self.body.clone();
        if body.len() < 6 {
            body.resize(6, 0);
        }
        let overhang = (body.len() - 6) % 8;
        if overhang != 0 {
            body.resize(body.len() + (8 - overhang), 0);
        }

        let ext_len = ((body.len() - 6) / 8) as u8;
        let mut out = Vec::with_capacity(2 + body.len());
        out.push(next_header);
        out.push(ext_len);
        out.extend(body);
        out
    }
}

/// One node in an IPv6 extension header chain. Closed over the two codecs
/// this crate implements; a future next-header codec would add a variant
/// here and a registration in [`CodecRegistry::with_defaults`], rather than
/// any change to the chain-walking logic in [`Ipv6Datagram::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header {
    Generic(GenericExtensionHeader),
    Icmpv6(Icmpv6Message),
}

impl Header {
    fn protocol_number(&self) -> u8 {
        match self {
            Header::Generic(h) => h.protocol,
            Header::Icmpv6(_) => crate::icmpv6::PROTOCOL,
        }
    }

    fn emit(&self, next_header: u8, src: Ipv6Address, dst: Ipv6Address) -> Vec<u8> {
        match self {
            Header::Generic(h) => h.emit(next_header),
            Header::Icmpv6(h) => h.emit(src, dst),
        }
    }
}

/// A parsed IPv6 datagram: fixed header fields plus the chain of extension
/// and upper-layer headers that followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6Datagram {
    pub traffic_class: u8,
    pub flow_label: u32,
    pub hop_limit: u8,
    pub source: Ipv6Address,
    pub destination: Ipv6Address,
    pub headers: Vec<Header>,
}

impl Ipv6Datagram {
    pub fn parse(bytes: &[u8], registry: &CodecRegistry) -> Result<Self, ParseError> {
        if bytes.len() < FIXED_HEADER_LEN {
            return Err(ParseError::TooShort {
                need: FIXED_HEADER_LEN,
                have: bytes.len(),
            });
        }

        let version = bytes[0] >> 4;
        if version != 6 {
            return Err(ParseError::WrongVersion(version));
        }
        let traffic_class = (bytes[0] << 4) | (bytes[1] >> 4);
        let flow_label =
            (u32::from(bytes[1] & 0x0f) << 16) | (u32::from(bytes[2]) << 8) | u32::from(bytes[3]);
        // bytes[4..6] is the payload length; the chain walk below is
        // self-describing and is driven off the actual remaining slice
        // instead, so the declared length is not consulted here.
        let mut next_header = bytes[6];
        let hop_limit = bytes[7];
        let mut source = [0u8; 16];
        source.copy_from_slice(&bytes[8..24]);
        let mut destination = [0u8; 16];
        destination.copy_from_slice(&bytes[24..40]);

        let mut headers = Vec::new();
        let mut remaining = &bytes[FIXED_HEADER_LEN..];

        while next_header != NO_NEXT_HEADER && !remaining.is_empty() {
            let parser = registry.header_parser(next_header);
            let parsed = parser(next_header, remaining)?;
            remaining = &remaining[parsed.consumed..];
            headers.push(parsed.header);

            match parsed.next_header {
                None | Some(NO_NEXT_HEADER) => break,
                Some(nh) => next_header = nh,
            }
        }

        Ok(Self {
            traffic_class,
            flow_label,
            hop_limit,
            source: Ipv6Address::new(source),
            destination: Ipv6Address::new(destination),
            headers,
        })
    }

    /// Re-derives each header's next-header link from chain order (rather
    /// than storing it redundantly) and renders the fixed header followed by
    /// every header in the chain.
    pub fn emit(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        for (i, header) in self.headers.iter().enumerate() {
            let next_header = self
                .headers
                .get(i + 1)
                .map(Header::protocol_number)
                .unwrap_or(NO_NEXT_HEADER);
            payload.extend(header.emit(next_header, self.source, self.destination));
        }

        let first_next_header = self
            .headers
            .first()
            .map(Header::protocol_number)
            .unwrap_or(NO_NEXT_HEADER);

        let mut out = Vec::with_capacity(FIXED_HEADER_LEN + payload.len());
        out.push(0x60 | (self.traffic_class >> 4));
        out.push((self.traffic_class << 4) | ((self.flow_label >> 16) as u8 & 0x0f));
        out.extend_from_slice(&(self.flow_label as u16).to_be_bytes());
        out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        out.push(first_next_header);
        out.push(self.hop_limit);
        out.extend_from_slice(&self.source.octets());
        out.extend_from_slice(&self.destination.octets());
        out.extend(payload);
        out
    }
}
