//! Coordination Layer
//!
//! Everything that moves session state between peers. The transport itself
//! is pluggable; this layer owns the message vocabulary, the fan-out rules,
//! and the two controller roles.

pub mod broadcast;
pub mod coordinator;
pub mod participant;
pub mod protocol;
pub mod transport;

pub use broadcast::Broadcaster;
pub use coordinator::{Coordinator, CoordinatorAction, CoordinatorHandle, Roster};
pub use participant::{ConnectionStatus, Participant};
pub use protocol::{GameStartPayload, WireMessage};
pub use transport::{
    generate_room_code, room_address, LinkEvent, LinkHandle, LinkId, MemoryEndpoint, MemoryHub,
    PeerAddress, TransportError,
};
