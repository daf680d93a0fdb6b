//! # Aula Wordle Session Coordinator
//!
//! Peer-to-peer session protocol for classroom word-guessing rounds: one
//! coordinator (instructor) drives authoritative round state, any number of
//! participants (students) mirror it over ephemeral links and report results.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       AULA WORDLE                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  game/           - Round logic (pure, no I/O)                │
//! │  ├── judge.rs    - Per-letter guess classification           │
//! │  ├── state.rs    - Session state machine (coordinator truth) │
//! │  ├── awards.rs   - Fastest / most-efficient rankings         │
//! │  └── replica.rs  - Participant-side state reducer            │
//! │                                                              │
//! │  network/        - Coordination layer (non-deterministic)    │
//! │  ├── protocol.rs - Tagged wire messages + JSON codec         │
//! │  ├── transport.rs- Link abstraction, room-code addressing    │
//! │  ├── broadcast.rs- Best-effort fan-out + join snapshots      │
//! │  ├── coordinator.rs - Instructor controller / event loop     │
//! │  └── participant.rs - Student controller / event loop        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership Model
//!
//! Session truth lives in exactly one place, the coordinator's
//! [`SessionState`](game::state::SessionState). Participants hold a
//! [`Replica`](game::replica::Replica) rebuilt purely from inbound messages;
//! their only outbound message is a one-shot result submission. Broadcast is
//! best-effort and link-local: a dead link never blocks delivery to the rest.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use game::awards::AwardSet;
pub use game::judge::{classify, keyboard_hints, LetterStatus};
pub use game::replica::{GuessOutcome, Replica};
pub use game::state::{InvalidWord, PlayerResult, RoundPhase, SessionState};
pub use network::protocol::WireMessage;
pub use network::transport::{LinkEvent, LinkHandle, PeerAddress};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default attempt budget per round
pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;

/// Shortest accepted secret word
pub const WORD_MIN_LEN: usize = 3;

/// Longest accepted secret word
pub const WORD_MAX_LEN: usize = 5;

/// Current wall-clock time as epoch milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
