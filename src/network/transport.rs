//! Links and Addressing
//!
//! The point-to-point transport itself (connection establishment, NAT
//! traversal, delivery) is an external collaborator; this module fixes the
//! seam the rest of the crate talks to: addresses derived from room codes,
//! a sending handle per link, and the lifecycle events every link surfaces
//! to its owning event loop.
//!
//! An in-process [`MemoryHub`] implements the seam over tokio channels so a
//! whole session (coordinator plus participants) runs inside one process,
//! which is also how the event-loop tests drive the protocol end to end.
//! Per-link ordering is FIFO, matching what a real transport guarantees;
//! nothing orders frames across links.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rand::Rng;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::network::protocol::WireMessage;

/// Fixed prefix joining a room code into the coordinator's address, so
/// participants can derive the address from the code alone.
pub const ADDRESS_PREFIX: &str = "aula-wordle-";

/// Identifier of one link, unique per hub.
pub type LinkId = u64;

/// Transport-level address of a peer endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerAddress(String);

impl PeerAddress {
    /// Wrap a raw address string.
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// Fresh unique address for a participant endpoint.
    pub fn ephemeral() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coordinator address for a room code.
pub fn room_address(code: &str) -> PeerAddress {
    PeerAddress(format!("{ADDRESS_PREFIX}{code}"))
}

/// Human-shareable 5-digit room code.
pub fn generate_room_code<R: Rng>(rng: &mut R) -> String {
    rng.gen_range(10_000u32..100_000).to_string()
}

/// Transport failures. All link-local; none are fatal to the session.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The link is not open.
    #[error("link is closed")]
    LinkClosed,

    /// Nobody is listening at the dialed address.
    #[error("no peer listening at {0}")]
    Unreachable(PeerAddress),

    /// The address is already bound by another endpoint.
    #[error("address {0} already in use")]
    AddressInUse(PeerAddress),

    /// Outbound message could not be encoded.
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Lifecycle events a transport delivers to the owning event loop.
#[derive(Debug)]
pub enum LinkEvent {
    /// An inbound link finished opening; the handle sends to the new peer.
    Opened {
        /// Sending half of the new link.
        link: LinkHandle,
    },
    /// A frame arrived. Raw text; the receiving controller decodes it.
    Data {
        /// Link the frame arrived on.
        link_id: LinkId,
        /// Undecoded frame body.
        frame: String,
    },
    /// The link closed, from either side. Terminal for the link.
    Closed {
        /// Link that closed.
        link_id: LinkId,
    },
    /// The link failed. Terminal for the link.
    Error {
        /// Link that failed.
        link_id: LinkId,
        /// Transport-provided description.
        reason: String,
    },
}

/// Sending half of one bidirectional link.
///
/// Cheap to clone; all clones share the open flag, so a close observed
/// anywhere guards every later `send`.
#[derive(Clone, Debug)]
pub struct LinkHandle {
    id: LinkId,
    remote: PeerAddress,
    tx: mpsc::UnboundedSender<Packet>,
    open: Arc<AtomicBool>,
}

#[derive(Debug)]
enum Packet {
    Frame(String),
    Close,
}

impl LinkHandle {
    /// Link identifier.
    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Address of the peer on the far end.
    pub fn remote(&self) -> &PeerAddress {
        &self.remote
    }

    /// Whether the link still accepts sends.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Encode and send one message.
    pub fn send(&self, msg: &WireMessage) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::LinkClosed);
        }
        let frame = msg.to_json()?;
        self.tx.send(Packet::Frame(frame)).map_err(|_| {
            self.open.store(false, Ordering::Release);
            TransportError::LinkClosed
        })
    }

    /// Close the link. Both ends observe a `Closed` event.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            let _ = self.tx.send(Packet::Close);
        }
    }
}

/// In-process transport: a registry of listening endpoints connected by
/// channel pairs. One pump task per link forwards frames and reports the
/// close to both ends.
#[derive(Clone, Default)]
pub struct MemoryHub {
    inner: Arc<Mutex<HubInner>>,
}

#[derive(Default)]
struct HubInner {
    listeners: HashMap<PeerAddress, mpsc::UnboundedSender<LinkEvent>>,
    next_link_id: LinkId,
}

impl MemoryHub {
    /// Fresh hub with no endpoints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `addr` and return the endpoint plus its event stream.
    pub fn endpoint(
        &self,
        addr: PeerAddress,
    ) -> Result<(MemoryEndpoint, mpsc::UnboundedReceiver<LinkEvent>), TransportError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().expect("hub lock poisoned");

        // A dropped endpoint leaves a dead sender behind; rebinding its
        // address is fine.
        if let Some(existing) = inner.listeners.get(&addr) {
            if !existing.is_closed() {
                return Err(TransportError::AddressInUse(addr));
            }
        }
        inner.listeners.insert(addr.clone(), events_tx.clone());

        Ok((MemoryEndpoint { hub: self.clone(), addr, events_tx }, events_rx))
    }
}

/// One bound address on a [`MemoryHub`].
pub struct MemoryEndpoint {
    hub: MemoryHub,
    addr: PeerAddress,
    events_tx: mpsc::UnboundedSender<LinkEvent>,
}

impl MemoryEndpoint {
    /// This endpoint's own address.
    pub fn address(&self) -> &PeerAddress {
        &self.addr
    }

    /// Open a link to a listening endpoint.
    ///
    /// The handle is open on return (in-process links open synchronously);
    /// the listener observes an `Opened` event carrying its own handle.
    pub fn connect(&self, remote: &PeerAddress) -> Result<LinkHandle, TransportError> {
        let (remote_events, link_id) = {
            let mut inner = self.hub.inner.lock().expect("hub lock poisoned");
            let listener = inner
                .listeners
                .get(remote)
                .filter(|tx| !tx.is_closed())
                .cloned()
                .ok_or_else(|| TransportError::Unreachable(remote.clone()))?;
            let id = inner.next_link_id;
            inner.next_link_id += 1;
            (listener, id)
        };

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(true));

        let local = LinkHandle {
            id: link_id,
            remote: remote.clone(),
            tx: out_tx,
            open: open.clone(),
        };
        let peer = LinkHandle {
            id: link_id,
            remote: self.addr.clone(),
            tx: in_tx,
            open: open.clone(),
        };

        remote_events
            .send(LinkEvent::Opened { link: peer })
            .map_err(|_| TransportError::Unreachable(remote.clone()))?;

        tokio::spawn(pump_link(
            link_id,
            open,
            out_rx,
            remote_events,
            in_rx,
            self.events_tx.clone(),
        ));

        Ok(local)
    }
}

impl Drop for MemoryEndpoint {
    fn drop(&mut self) {
        let mut inner = self.hub.inner.lock().expect("hub lock poisoned");
        if let Some(tx) = inner.listeners.get(&self.addr) {
            if tx.same_channel(&self.events_tx) {
                inner.listeners.remove(&self.addr);
            }
        }
    }
}

/// Forward both directions of one link until either side closes, then tell
/// both ends.
async fn pump_link(
    link_id: LinkId,
    open: Arc<AtomicBool>,
    mut a_out: mpsc::UnboundedReceiver<Packet>,
    b_events: mpsc::UnboundedSender<LinkEvent>,
    mut b_out: mpsc::UnboundedReceiver<Packet>,
    a_events: mpsc::UnboundedSender<LinkEvent>,
) {
    loop {
        tokio::select! {
            pkt = a_out.recv() => match pkt {
                Some(Packet::Frame(frame)) => {
                    if b_events.send(LinkEvent::Data { link_id, frame }).is_err() {
                        break;
                    }
                }
                Some(Packet::Close) | None => break,
            },
            pkt = b_out.recv() => match pkt {
                Some(Packet::Frame(frame)) => {
                    if a_events.send(LinkEvent::Data { link_id, frame }).is_err() {
                        break;
                    }
                }
                Some(Packet::Close) | None => break,
            },
        }
    }

    open.store(false, Ordering::Release);
    let _ = a_events.send(LinkEvent::Closed { link_id });
    let _ = b_events.send(LinkEvent::Closed { link_id });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<LinkEvent>) -> LinkEvent {
        tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for link event")
            .expect("event stream ended")
    }

    #[test]
    fn test_room_addressing() {
        let addr = room_address("12345");
        assert_eq!(addr.as_str(), "aula-wordle-12345");
    }

    #[test]
    fn test_room_code_is_five_digits() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = generate_room_code(&mut rng);
            assert_eq!(code.len(), 5);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(!code.starts_with('0'));
        }
    }

    #[tokio::test]
    async fn test_connect_delivers_frames_both_ways() {
        let hub = MemoryHub::new();
        let (host, mut host_rx) = hub.endpoint(room_address("11111")).unwrap();
        let (guest, mut guest_rx) = hub.endpoint(PeerAddress::ephemeral()).unwrap();

        let guest_link = guest.connect(host.address()).unwrap();
        assert!(guest_link.is_open());

        let host_link = match next_event(&mut host_rx).await {
            LinkEvent::Opened { link } => link,
            other => panic!("expected Opened, got {other:?}"),
        };
        assert_eq!(host_link.remote(), guest.address());

        guest_link.send(&WireMessage::Reset).unwrap();
        match next_event(&mut host_rx).await {
            LinkEvent::Data { link_id, frame } => {
                assert_eq!(link_id, guest_link.id());
                assert_eq!(WireMessage::from_json(&frame).unwrap(), WireMessage::Reset);
            }
            other => panic!("expected Data, got {other:?}"),
        }

        host_link.send(&WireMessage::GameEnd).unwrap();
        match next_event(&mut guest_rx).await {
            LinkEvent::Data { frame, .. } => {
                assert_eq!(WireMessage::from_json(&frame).unwrap(), WireMessage::GameEnd);
            }
            other => panic!("expected Data, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_close_reaches_both_ends() {
        let hub = MemoryHub::new();
        let (host, mut host_rx) = hub.endpoint(room_address("22222")).unwrap();
        let (guest, mut guest_rx) = hub.endpoint(PeerAddress::ephemeral()).unwrap();

        let guest_link = guest.connect(host.address()).unwrap();
        let host_link = match next_event(&mut host_rx).await {
            LinkEvent::Opened { link } => link,
            other => panic!("expected Opened, got {other:?}"),
        };

        guest_link.close();
        assert!(matches!(next_event(&mut host_rx).await, LinkEvent::Closed { .. }));
        assert!(matches!(next_event(&mut guest_rx).await, LinkEvent::Closed { .. }));

        // Shared flag guards every later send, on both handles.
        assert!(!host_link.is_open());
        assert!(matches!(
            host_link.send(&WireMessage::Reset),
            Err(TransportError::LinkClosed)
        ));
        assert!(matches!(
            guest_link.send(&WireMessage::Reset),
            Err(TransportError::LinkClosed)
        ));
    }

    #[tokio::test]
    async fn test_connect_to_unbound_address_fails() {
        let hub = MemoryHub::new();
        let (guest, _guest_rx) = hub.endpoint(PeerAddress::ephemeral()).unwrap();
        let err = guest.connect(&room_address("99999")).unwrap_err();
        assert!(matches!(err, TransportError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_address_conflicts_and_rebind() {
        let hub = MemoryHub::new();
        let addr = room_address("33333");
        let (host, host_rx) = hub.endpoint(addr.clone()).unwrap();
        assert!(matches!(
            hub.endpoint(addr.clone()),
            Err(TransportError::AddressInUse(_))
        ));

        drop(host);
        drop(host_rx);
        assert!(hub.endpoint(addr).is_ok());
    }
}
