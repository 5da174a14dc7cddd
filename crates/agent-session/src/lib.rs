//! Agent link state machine and child-process transport.
//!
//! [`session::AgentSession`] is the synchronous part: the inbound
//! classifier and the outbound transmit queue described by the link
//! protocol. [`transport::run`] is the async part: it spawns the agent
//! executable, feeds its stdout through [`byteframe::Decoder`], and drives
//! the session until the child exits.

pub mod session;
pub mod transport;

pub use session::{AgentInfo, AgentSession, ClassifyError, Event, InterfaceHints};
pub use transport::{run, SessionCommand, TransportError};
