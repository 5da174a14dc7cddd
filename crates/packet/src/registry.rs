use std::collections::HashMap;

use crate::error::ParseError;
use crate::icmpv6::{self, Icmpv6Message};
use crate::ipv6::{GenericExtensionHeader, Header, Ipv6Datagram};

/// A next-header-chain parser: given the IPv6 protocol number that selected
/// it and the bytes remaining in the datagram's payload, produces the parsed
/// header, how many bytes it consumed, and the protocol number of whatever
/// follows (`None` if this header is terminal).
pub type HeaderParser = fn(protocol: u8, remaining: &[u8]) -> Result<ParsedHeader, ParseError>;

/// An EtherType-chain parser: given the bytes following the Ethernet header
/// and the registry to resolve any further chain with, produces the decoded
/// IPv6 datagram.
pub type EtherTypeParser = fn(&[u8], &CodecRegistry) -> Result<Ipv6Datagram, ParseError>;

pub struct ParsedHeader {
    pub header: Header,
    pub next_header: Option<u8>,
    pub consumed: usize,
}

/// Maps wire-level type tags (EtherTypes, IPv6 next-header values) to the
/// codecs that decode them.
///
/// The registry is passed explicitly rather than held in a global or woven
/// into the types it decodes, so a caller can register extra codecs (or
/// none) without reaching for interior mutability or `lazy_static`-style
/// globals. [`CodecRegistry::with_defaults`] wires up the two codecs this
/// crate implements; any protocol number with no registered parser falls
/// back to [`generic_extension_header`], and there is deliberately no entry
/// for 59 (No Next Header) — it is never looked up because the chain walk in
/// [`Ipv6Datagram::parse`](crate::ipv6::Ipv6Datagram::parse) stops before
/// consulting the registry when it sees that value.
pub struct CodecRegistry {
    ethertypes: HashMap<u16, EtherTypeParser>,
    next_headers: HashMap<u8, HeaderParser>,
}

impl CodecRegistry {
    pub fn empty() -> Self {
        Self {
            ethertypes: HashMap::new(),
            next_headers: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register_ethertype(crate::ethernet::ETHERTYPE_IPV6, parse_ipv6_ethertype);
        registry.register_next_header(icmpv6::PROTOCOL, parse_icmpv6_header);
        registry
    }

    pub fn register_ethertype(&mut self, ethertype: u16, parser: EtherTypeParser) {
        self.ethertypes.insert(ethertype, parser);
    }

    pub fn register_next_header(&mut self, protocol: u8, parser: HeaderParser) {
        self.next_headers.insert(protocol, parser);
    }

    pub fn ethertype_parser(&self, ethertype: u16) -> Option<EtherTypeParser> {
        self.ethertypes.get(&ethertype).copied()
    }

    /// Looks up the parser registered for `protocol`, falling back to the
    /// generic extension header codec for any unrecognised value.
    pub(crate) fn header_parser(&self, protocol: u8) -> HeaderParser {
        self.next_headers
            .get(&protocol)
            .copied()
            .unwrap_or(generic_extension_header)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn parse_ipv6_ethertype(bytes: &[u8], registry: &CodecRegistry) -> Result<Ipv6Datagram, ParseError> {
    Ipv6Datagram::parse(bytes, registry)
}

fn parse_icmpv6_header(_protocol: u8, remaining: &[u8]) -> Result<ParsedHeader, ParseError> {
    let (message, consumed) = Icmpv6Message::parse(remaining)?;
    Ok(ParsedHeader {
        header: Header::Icmpv6(message),
        next_header: None,
        consumed,
    })
}

/// Parses any IPv6 extension header this crate has no dedicated codec for:
/// a one-octet next-header field, a one-octet length in 8-octet units (per
/// RFC 8200 §4, counting everything after the first 8 octets), and the body.
pub(crate) fn generic_extension_header(
    protocol: u8,
    remaining: &[u8],
) -> Result<ParsedHeader, ParseError> {
    if remaining.len() < 2 {
        return Err(ParseError::TooShort {
            need: 2,
            have: remaining.len(),
        });
    }

    let next_header = remaining[0];
    let ext_len = remaining[1] as usize;
    let body_len = 6 + 8 * ext_len;
    let total = 2 + body_len;

    if remaining.len() < total {
        return Err(ParseError::TruncatedExtensionHeader);
    }

    Ok(ParsedHeader {
        header: Header::Generic(GenericExtensionHeader {
            protocol,
            body: remaining[2..total].to_vec(),
        }),
        next_header: Some(next_header),
        consumed: total,
    })
}
