use std::fmt;

use crate::error::ParseError;

/// An EUI-48 MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Bit 1 of the first octet: set when the address is locally administered
    /// rather than assigned by the manufacturer.
    pub const fn is_locally_administered(&self) -> bool {
        self.0[0] & 0b0000_0010 != 0
    }

    /// Bit 0 of the first octet: set for multicast (and broadcast) addresses.
    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0b0000_0001 != 0
    }

    pub fn parse(text: &str) -> Result<Self, ParseError> {
        text.parse()
    }
}

impl std::str::FromStr for MacAddress {
    type Err = ParseError;

    /// Accepts six lowercase-or-uppercase hex pairs separated uniformly by
    /// either `:` or `-`. Mixing separators within one address is rejected.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let separator = text
            .bytes()
            .find(|b| *b == b':' || *b == b'-')
            .ok_or(ParseError::InvalidMacText)?;

        let parts: Vec<&str> = text.split(separator as char).collect();
        if parts.len() != 6 {
            return Err(ParseError::InvalidMacText);
        }

        let mut octets = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            if part.len() != 2 {
                return Err(ParseError::InvalidMacText);
            }
            octets[i] = u8::from_str_radix(part, 16).map_err(|_| ParseError::InvalidMacText)?;
        }

        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}
