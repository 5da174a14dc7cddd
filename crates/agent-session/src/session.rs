use std::collections::VecDeque;

use packet::{EthernetFrame, MacAddress};

/// A structural failure while classifying an inbound link frame. These never
/// propagate out of [`AgentSession`] — they are logged at the classify site
/// and answered with a `NAK`, exactly like a [`packet::ParseError`] on an
/// `FS` frame.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("SOH body malformed: {0}")]
    MalformedSoh(&'static str),
    #[error("unrecognised link frame type {0:#04x}")]
    UnknownFrameType(u8),
}

/// The interface facts announced by the agent on `SOH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentInfo {
    pub mac: MacAddress,
    pub mtu: u16,
    pub index: u32,
    pub name: String,
}

/// Observable outcomes of the link state machine, drained one at a time via
/// [`AgentSession::next_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connected(AgentInfo),
    ReceivedFrame(EthernetFrame),
    Disconnected,
}

/// User-provided interface hints, passed to the agent on spawn and restored
/// whenever the child process exits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceHints {
    pub if_name: Option<String>,
    pub if_mac: Option<MacAddress>,
    pub if_mtu: Option<u16>,
}

/// The agent link state machine: the inbound classifier and the outbound
/// transmit queue with per-frame retry bookkeeping.
///
/// This type is deliberately synchronous and knows nothing about `tokio` or
/// child processes — [`crate::transport::run`] drives it from an async read
/// loop, feeding it decoded inbound payloads and draining its outbound
/// frames and events. Keeping the state machine itself synchronous is what
/// makes it straightforward to unit test without spinning up a runtime.
#[derive(Debug)]
pub struct AgentSession {
    if_name: Option<String>,
    if_mac: Option<MacAddress>,
    if_mtu: Option<u16>,
    if_idx: Option<u32>,
    initial_hints: InterfaceHints,

    tx_buffer: VecDeque<Vec<u8>>,
    frame_pending: bool,
    retries_left: u8,
    tx_attempts: u8,

    outbound: VecDeque<Vec<u8>>,
    events: VecDeque<Event>,

    started: bool,
}

impl AgentSession {
    pub fn new(tx_attempts: u8, hints: InterfaceHints) -> Self {
        Self {
            if_name: hints.if_name.clone(),
            if_mac: hints.if_mac,
            if_mtu: hints.if_mtu,
            if_idx: None,
            initial_hints: hints,
            tx_buffer: VecDeque::new(),
            frame_pending: false,
            retries_left: tx_attempts,
            tx_attempts,
            outbound: VecDeque::new(),
            events: VecDeque::new(),
            started: false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub(crate) fn mark_started(&mut self) {
        self.started = true;
    }

    pub fn if_name(&self) -> Option<&str> {
        self.if_name.as_deref()
    }

    pub fn if_mac(&self) -> Option<MacAddress> {
        self.if_mac
    }

    pub fn if_mtu(&self) -> Option<u16> {
        self.if_mtu
    }

    pub fn if_idx(&self) -> Option<u32> {
        self.if_idx
    }

    /// Queues an Ethernet frame for transmission. Frames leave in the order
    /// they were queued, one in flight at a time.
    pub fn send_ethernet_frame(&mut self, frame: Vec<u8>) {
        self.tx_buffer.push_back(frame);
        if !self.frame_pending {
            self.pump();
        }
    }

    /// Queues a bare `EOT` so the agent knows to exit. Cooperative only: it
    /// does not kill the child process.
    pub fn stop(&mut self) {
        self.outbound.push_back(vec![byteframe::EOT]);
    }

    /// Feeds one decoded inbound payload (type octet plus body) through the
    /// classifier in the table from §4.4.
    pub fn on_inbound(&mut self, payload: &[u8]) {
        let Some((&type_byte, body)) = payload.split_first() else {
            self.reply_nak(ClassifyError::UnknownFrameType(0));
            return;
        };

        match type_byte {
            byteframe::SOH => match parse_soh(body) {
                Ok(info) => {
                    self.if_mac = Some(info.mac);
                    self.if_mtu = Some(info.mtu);
                    self.if_idx = Some(info.index);
                    self.if_name = Some(info.name.clone());
                    self.events.push_back(Event::Connected(info));
                    self.outbound.push_back(vec![byteframe::ACK]);
                }
                Err(e) => self.reply_nak(e),
            },
            byteframe::FS => match EthernetFrame::parse(body) {
                Ok(frame) => {
                    self.events.push_back(Event::ReceivedFrame(frame));
                    self.outbound.push_back(vec![byteframe::ACK]);
                }
                Err(e) => {
                    tracing::debug!("dropping malformed FS frame: {e}");
                    self.outbound.push_back(vec![byteframe::NAK]);
                }
            },
            byteframe::SYN => self.outbound.push_back(vec![byteframe::ACK]),
            byteframe::ACK => self.transmit_done(true),
            byteframe::NAK => self.transmit_done(false),
            other => self.reply_nak(ClassifyError::UnknownFrameType(other)),
        }
    }

    fn reply_nak(&mut self, err: ClassifyError) {
        tracing::debug!("{err}");
        self.outbound.push_back(vec![byteframe::NAK]);
    }

    /// Resets transmit and interface state after the child process exits,
    /// and reports the disconnect.
    pub fn on_child_exited(&mut self) {
        self.started = false;
        self.tx_buffer.clear();
        self.frame_pending = false;
        self.retries_left = self.tx_attempts;
        self.outbound.clear();
        self.if_name = self.initial_hints.if_name.clone();
        self.if_mac = self.initial_hints.if_mac;
        self.if_mtu = self.initial_hints.if_mtu;
        self.if_idx = None;
        self.events.push_back(Event::Disconnected);
    }

    /// Drains the next observable event, if any.
    pub fn next_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Drains the next outbound link-layer payload (type octet plus body)
    /// ready to be wrapped by [`byteframe::wrap`] and written to the agent.
    pub fn next_outbound(&mut self) -> Option<Vec<u8>> {
        self.outbound.pop_front()
    }

    fn pump(&mut self) {
        loop {
            let Some(head) = self.tx_buffer.front() else {
                self.frame_pending = false;
                self.retries_left = self.tx_attempts;
                return;
            };

            if self.retries_left == 0 {
                tracing::debug!("dropping queued frame after exhausting retries");
                self.tx_buffer.pop_front();
                self.retries_left = self.tx_attempts;
                continue;
            }

            let mut frame = Vec::with_capacity(1 + head.len());
            frame.push(byteframe::FS);
            frame.extend_from_slice(head);
            self.outbound.push_back(frame);
            self.frame_pending = true;
            self.retries_left -= 1;
            return;
        }
    }

    fn transmit_done(&mut self, success: bool) {
        if self.tx_buffer.is_empty() {
            return;
        }
        if success {
            self.tx_buffer.pop_front();
            self.retries_left = self.tx_attempts;
        }
        self.frame_pending = false;
        self.pump();
    }
}

fn parse_soh(body: &[u8]) -> Result<AgentInfo, ClassifyError> {
    const FIXED_LEN: usize = 6 + 2 + 4 + 1;
    if body.len() < FIXED_LEN {
        return Err(ClassifyError::MalformedSoh("body shorter than fixed fields"));
    }

    let mut mac_octets = [0u8; 6];
    mac_octets.copy_from_slice(&body[0..6]);
    let mac = MacAddress::new(mac_octets);
    let mtu = u16::from_be_bytes([body[6], body[7]]);
    let index = u32::from_be_bytes([body[8], body[9], body[10], body[11]]);
    let name_len = body[12] as usize;

    let name_bytes = body
        .get(13..13 + name_len)
        .ok_or(ClassifyError::MalformedSoh("name length exceeds body"))?;
    let name = String::from_utf8(name_bytes.to_vec())
        .map_err(|_| ClassifyError::MalformedSoh("interface name is not valid UTF-8"))?;

    Ok(AgentInfo {
        mac,
        mtu,
        index,
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soh_body(mac: [u8; 6], mtu: u16, idx: u32, name: &str) -> Vec<u8> {
        let mut body = mac.to_vec();
        body.extend_from_slice(&mtu.to_be_bytes());
        body.extend_from_slice(&idx.to_be_bytes());
        body.push(name.len() as u8);
        body.extend_from_slice(name.as_bytes());
        body
    }

    fn session() -> AgentSession {
        AgentSession::new(3, InterfaceHints::default())
    }

    #[test]
    fn soh_updates_state_emits_connected_and_acks() {
        let mut s = session();
        let mut payload = vec![byteframe::SOH];
        payload.extend(soh_body([2, 0, 0, 0, 0, 1], 1500, 7, "lh0"));

        s.on_inbound(&payload);

        assert_eq!(
            s.next_event(),
            Some(Event::Connected(AgentInfo {
                mac: MacAddress::new([2, 0, 0, 0, 0, 1]),
                mtu: 1500,
                index: 7,
                name: "lh0".into(),
            }))
        );
        assert_eq!(s.if_name(), Some("lh0"));
        assert_eq!(s.next_outbound(), Some(vec![byteframe::ACK]));
        assert_eq!(s.next_outbound(), None);
    }

    #[test]
    fn malformed_soh_is_nakked_without_a_connected_event() {
        let mut s = session();
        s.on_inbound(&[byteframe::SOH, 1, 2, 3]);

        assert_eq!(s.next_event(), None);
        assert_eq!(s.next_outbound(), Some(vec![byteframe::NAK]));
    }

    #[test]
    fn fs_with_valid_ethernet_frame_emits_received_frame_and_acks() {
        let mut s = session();
        let eth = EthernetFrame::new(
            MacAddress::new([2, 0, 0, 0, 0, 1]),
            MacAddress::new([2, 0, 0, 0, 0, 2]),
            0x86DD,
            vec![1, 2, 3],
        );
        let mut payload = vec![byteframe::FS];
        payload.extend(eth.emit());

        s.on_inbound(&payload);

        assert_eq!(s.next_event(), Some(Event::ReceivedFrame(eth)));
        assert_eq!(s.next_outbound(), Some(vec![byteframe::ACK]));
    }

    #[test]
    fn fs_with_truncated_frame_is_nakked_without_an_event() {
        let mut s = session();
        s.on_inbound(&[byteframe::FS, 1, 2, 3]);

        assert_eq!(s.next_event(), None);
        assert_eq!(s.next_outbound(), Some(vec![byteframe::NAK]));
    }

    #[test]
    fn syn_is_acked_with_no_other_effect() {
        let mut s = session();
        s.on_inbound(&[byteframe::SYN]);

        assert_eq!(s.next_event(), None);
        assert_eq!(s.next_outbound(), Some(vec![byteframe::ACK]));
    }

    #[test]
    fn unknown_type_is_nakked() {
        let mut s = session();
        s.on_inbound(&[0x7f]);

        assert_eq!(s.next_event(), None);
        assert_eq!(s.next_outbound(), Some(vec![byteframe::NAK]));
    }

    #[test]
    fn send_ethernet_frame_transmits_immediately_when_idle() {
        let mut s = session();
        s.send_ethernet_frame(vec![0xaa, 0xbb]);

        let mut expected = vec![byteframe::FS];
        expected.extend_from_slice(&[0xaa, 0xbb]);
        assert_eq!(s.next_outbound(), Some(expected));
        assert_eq!(s.next_outbound(), None);
    }

    #[test]
    fn second_send_waits_behind_frame_pending() {
        let mut s = session();
        s.send_ethernet_frame(vec![1]);
        s.send_ethernet_frame(vec![2]);

        // Only the head of queue is transmitted while frame_pending is set.
        assert_eq!(s.next_outbound(), Some(vec![byteframe::FS, 1]));
        assert_eq!(s.next_outbound(), None);

        s.on_inbound(&[byteframe::ACK]);
        assert_eq!(s.next_outbound(), Some(vec![byteframe::FS, 2]));
    }

    #[test]
    fn nak_retries_the_same_head_of_queue_frame() {
        let mut s = session();
        s.send_ethernet_frame(vec![9]);
        s.next_outbound();

        s.on_inbound(&[byteframe::NAK]);
        assert_eq!(s.next_outbound(), Some(vec![byteframe::FS, 9]));
    }

    #[test]
    fn frame_is_dropped_after_tx_attempts_exhausted() {
        let mut s = AgentSession::new(2, InterfaceHints::default());
        s.send_ethernet_frame(vec![5]);
        s.next_outbound(); // attempt 1

        s.on_inbound(&[byteframe::NAK]);
        s.next_outbound(); // attempt 2

        s.send_ethernet_frame(vec![6]);
        s.on_inbound(&[byteframe::NAK]); // retries exhausted, head dropped, pump moves on

        assert_eq!(s.next_outbound(), Some(vec![byteframe::FS, 6]));
    }

    #[test]
    fn stop_enqueues_bare_eot() {
        let mut s = session();
        s.stop();
        assert_eq!(s.next_outbound(), Some(vec![byteframe::EOT]));
    }

    #[test]
    fn child_exit_reverts_to_initial_hints_and_emits_disconnected() {
        let hints = InterfaceHints {
            if_name: Some("eth-hint".into()),
            if_mac: None,
            if_mtu: Some(1280),
        };
        let mut s = AgentSession::new(3, hints);

        let mut payload = vec![byteframe::SOH];
        payload.extend(soh_body([2, 0, 0, 0, 0, 9], 1500, 3, "lh0"));
        s.on_inbound(&payload);
        s.next_event();
        s.send_ethernet_frame(vec![1]);

        s.on_child_exited();

        assert_eq!(s.if_name(), Some("eth-hint"));
        assert_eq!(s.if_mtu(), Some(1280));
        assert_eq!(s.if_mac(), None);
        assert_eq!(s.if_idx(), None);
        assert_eq!(s.next_event(), Some(Event::Disconnected));
        assert_eq!(s.next_outbound(), None);
    }
}
