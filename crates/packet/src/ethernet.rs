use crate::error::ParseError;
use crate::ipv6::Ipv6Datagram;
use crate::mac::MacAddress;
use crate::registry::CodecRegistry;

pub const ETHERTYPE_IPV6: u16 = 0x86DD;

const HEADER_LEN: usize = 14;

/// An Ethernet II frame: destination and source MAC addresses, an EtherType,
/// and the raw payload bytes. The raw payload is always kept so the frame
/// can be re-emitted byte-identical even for EtherTypes nothing in the
/// registry understands; [`EthernetFrame::resolve`] additionally decodes it
/// when a parser is registered for the EtherType.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetFrame {
    pub destination: MacAddress,
    pub source: MacAddress,
    pub ethertype: u16,
    pub payload: Vec<u8>,
}

impl EthernetFrame {
    pub fn new(destination: MacAddress, source: MacAddress, ethertype: u16, payload: Vec<u8>) -> Self {
        Self {
            destination,
            source,
            ethertype,
            payload,
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() < HEADER_LEN {
            return Err(ParseError::TooShort {
                need: HEADER_LEN,
                have: bytes.len(),
            });
        }

        let mut destination = [0u8; 6];
        destination.copy_from_slice(&bytes[0..6]);
        let mut source = [0u8; 6];
        source.copy_from_slice(&bytes[6..12]);
        let ethertype = u16::from_be_bytes([bytes[12], bytes[13]]);
        let payload = bytes[HEADER_LEN..].to_vec();

        Ok(Self {
            destination: MacAddress::new(destination),
            source: MacAddress::new(source),
            ethertype,
            payload,
        })
    }

    pub fn emit(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.extend_from_slice(&self.destination.octets());
        out.extend_from_slice(&self.source.octets());
        out.extend_from_slice(&self.ethertype.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Decodes [`EthernetFrame::payload`] using whatever parser `registry`
    /// has registered for [`EthernetFrame::ethertype`]. Returns `Ok(None)`
    /// for an EtherType the registry doesn't know, rather than an error —
    /// an unrecognised EtherType is an ordinary, expected outcome for a
    /// frame on a live link, not a malformed one.
    pub fn resolve(&self, registry: &CodecRegistry) -> Result<Option<Ipv6Datagram>, ParseError> {
        match registry.ethertype_parser(self.ethertype) {
            Some(parser) => parser(&self.payload, registry).map(Some),
            None => Ok(None),
        }
    }
}
