//! Ethernet / IPv6 / ICMPv6 codec stack.
//!
//! Layering mirrors the wire: [`ethernet::EthernetFrame`] carries an opaque
//! payload that [`registry::CodecRegistry`] lazily resolves into an
//! [`ipv6::Ipv6Datagram`], whose own [`ipv6::Header`] chain is walked the
//! same way, one next-header value at a time. Nothing in here owns a
//! registry or reaches for a global one; callers build a
//! [`registry::CodecRegistry`] once (typically [`registry::CodecRegistry::with_defaults`])
//! and pass it to whichever `resolve`/`parse` call needs it.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod ethernet;
pub mod icmpv6;
pub mod ipv6;
pub mod ipv6_address;
pub mod mac;
pub mod registry;

pub use error::{EmitError, ParseError};
pub use ethernet::EthernetFrame;
pub use icmpv6::Icmpv6Message;
pub use ipv6::{GenericExtensionHeader, Header, Ipv6Datagram};
pub use ipv6_address::Ipv6Address;
pub use mac::MacAddress;
pub use registry::CodecRegistry;
