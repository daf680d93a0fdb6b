//! Sync Broadcaster
//!
//! Fans every state transition out to all currently-open links and brings a
//! freshly-opened link up to date with a full snapshot. Strictly best-effort
//! and link-local: a failed or closed link is dropped from the active set
//! and never blocks, delays, or rolls back delivery to the others. There is
//! no acknowledgement and no replay; a peer that missed a broadcast catches
//! up only by reconnecting for a fresh snapshot.

use tracing::{debug, warn};

use crate::game::state::Snapshot;
use crate::network::protocol::WireMessage;
use crate::network::transport::{LinkHandle, LinkId};

/// The coordinator's set of active links.
#[derive(Debug, Default)]
pub struct Broadcaster {
    links: Vec<LinkHandle>,
}

impl Broadcaster {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a freshly-opened link to the active set.
    pub fn add(&mut self, link: LinkHandle) {
        self.links.push(link);
    }

    /// Remove a link from the active set. Returns whether it was present.
    pub fn remove(&mut self, link_id: LinkId) -> bool {
        let before = self.links.len();
        self.links.retain(|l| l.id() != link_id);
        self.links.len() != before
    }

    /// Number of links currently in the active set.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether no links are active.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Send `msg` to every open link. Dead links are pruned, the rest still
    /// get their copy. Returns how many links were delivered to.
    pub fn broadcast(&mut self, msg: &WireMessage) -> usize {
        let mut delivered = 0;
        self.links.retain(|link| {
            if !link.is_open() {
                debug!(link_id = link.id(), "pruning closed link from broadcast set");
                return false;
            }
            match link.send(msg) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(e) => {
                    warn!(link_id = link.id(), error = %e, "broadcast send failed, dropping link");
                    false
                }
            }
        });
        delivered
    }

    /// Send a full current-state snapshot to one link, the moment it opens.
    ///
    /// Covers first-time joiners and reconnects alike; the caller reads the
    /// snapshot from session state at this instant, so a late joiner never
    /// sees a stale or empty round.
    pub fn sync(link: &LinkHandle, snapshot: Snapshot) -> bool {
        match link.send(&WireMessage::GameStart(snapshot.into())) {
            Ok(()) => true,
            Err(e) => {
                warn!(link_id = link.id(), error = %e, "snapshot sync failed");
                false
            }
        }
    }
}
