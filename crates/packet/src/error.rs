/// Structural parse failures anywhere in the codec stack.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("buffer too short: need at least {need} bytes, have {have}")]
    TooShort { need: usize, have: usize },
    #[error("IPv6 version field was {0}, expected 6")]
    WrongVersion(u8),
    #[error("extension header declares a body that does not fit in the remaining bytes")]
    TruncatedExtensionHeader,
    #[error("MAC address text did not match six hex pairs with a uniform separator")]
    InvalidMacText,
}

/// Failures when rendering a parsed structure back to wire bytes.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EmitError {
    /// An [`crate::icmpv6::Icmpv6Message`] was asked to render itself without
    /// being given the enclosing datagram's addresses.
    #[error("ICMPv6 checksum requires the containing datagram's addresses")]
    MissingContext,
}
