//! Coordinator Controller
//!
//! The instructor side: owns session truth, the roster, and the active-link
//! set. Every external callback (link lifecycle, instructor actions) funnels
//! through this one type, so the state machine has a single writer and each
//! transition broadcasts from here and nowhere else.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::game::state::{InvalidWord, SessionState};
use crate::network::broadcast::Broadcaster;
use crate::network::protocol::WireMessage;
use crate::network::transport::{room_address, LinkEvent, LinkId, PeerAddress};
use crate::now_ms;

/// One participant as the coordinator saw it join, in join order.
#[derive(Clone, Debug)]
pub struct RosterEntry {
    /// Link that carried the join.
    pub link_id: LinkId,
    /// The participant's self-address.
    pub address: PeerAddress,
    /// False once the link closed or failed.
    pub connected: bool,
}

/// Coordinator-only presence list, join order preserved for display.
#[derive(Debug, Default)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    /// Record a joined participant.
    pub fn add(&mut self, link_id: LinkId, address: PeerAddress) {
        self.entries.push(RosterEntry { link_id, address, connected: true });
    }

    /// Mark a participant's link as gone. Returns whether it was known.
    pub fn mark_disconnected(&mut self, link_id: LinkId) -> bool {
        match self.entries.iter_mut().find(|e| e.link_id == link_id && e.connected) {
            Some(entry) => {
                entry.connected = false;
                true
            }
            None => false,
        }
    }

    /// All entries, join order.
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// How many participants are currently connected.
    pub fn connected_count(&self) -> usize {
        self.entries.iter().filter(|e| e.connected).count()
    }
}

/// Instructor actions, funneled into the coordinator's event loop.
#[derive(Debug)]
pub enum CoordinatorAction {
    /// Start a round with this word; the validation outcome comes back on
    /// the reply channel.
    Launch {
        /// Raw word as typed.
        word: String,
        /// Where to report acceptance or rejection.
        reply: oneshot::Sender<Result<(), InvalidWord>>,
    },
    /// Close the current round.
    Stop,
    /// Wipe the session back to idle.
    Reset,
    /// Stop the event loop.
    Shutdown,
}

/// Handle for driving a running coordinator loop.
#[derive(Clone, Debug)]
pub struct CoordinatorHandle {
    actions: mpsc::UnboundedSender<CoordinatorAction>,
}

impl CoordinatorHandle {
    /// Start a round. Resolves to the word-validation outcome.
    pub async fn launch(&self, word: &str) -> Result<(), InvalidWord> {
        let (reply, rx) = oneshot::channel();
        let _ = self.actions.send(CoordinatorAction::Launch { word: word.to_string(), reply });
        // A dropped loop means shutdown; report the word as simply ignored.
        rx.await.unwrap_or(Ok(()))
    }

    /// Close the current round.
    pub fn stop(&self) {
        let _ = self.actions.send(CoordinatorAction::Stop);
    }

    /// Wipe the session back to idle.
    pub fn reset(&self) {
        let _ = self.actions.send(CoordinatorAction::Reset);
    }

    /// Stop the event loop.
    pub fn shutdown(&self) {
        let _ = self.actions.send(CoordinatorAction::Shutdown);
    }
}

/// The instructor-side controller.
pub struct Coordinator {
    room_code: String,
    state: SessionState,
    roster: Roster,
    broadcaster: Broadcaster,
}

impl Coordinator {
    /// Fresh coordinator for a room.
    pub fn new(room_code: impl Into<String>) -> Self {
        Self {
            room_code: room_code.into(),
            state: SessionState::new(),
            roster: Roster::default(),
            broadcaster: Broadcaster::new(),
        }
    }

    /// Room code participants dial with.
    pub fn room_code(&self) -> &str {
        &self.room_code
    }

    /// Address participants derive from the room code.
    pub fn address(&self) -> PeerAddress {
        room_address(&self.room_code)
    }

    /// Session truth, read-only.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Presence list, read-only.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Apply one link lifecycle event.
    pub fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Opened { link } => {
                // Snapshot is read here, at open-handling time, so a joiner
                // mid-round gets the word in play right now.
                let synced = Broadcaster::sync(&link, self.state.snapshot());
                info!(
                    participant = %link.remote(),
                    synced,
                    "participant joined room {}",
                    self.room_code
                );
                self.roster.add(link.id(), link.remote().clone());
                self.broadcaster.add(link);
            }
            LinkEvent::Data { link_id, frame } => match WireMessage::from_json(&frame) {
                Ok(WireMessage::SubmitResult(result)) => {
                    let kept = self.state.submit(result.clone());
                    if kept {
                        info!(
                            participant = %result.display_name,
                            attempts = result.attempts,
                            time_ms = result.time_taken_ms,
                            correct = result.is_correct,
                            "result received"
                        );
                    } else {
                        debug!(link_id, "result arrived with no round set, dropped");
                    }
                }
                Ok(other) => {
                    debug!(link_id, kind = ?other, "unexpected message kind from participant");
                }
                Err(e) => {
                    warn!(link_id, error = %e, "malformed frame dropped");
                }
            },
            LinkEvent::Closed { link_id } => {
                self.broadcaster.remove(link_id);
                if self.roster.mark_disconnected(link_id) {
                    info!(link_id, "participant left");
                }
            }
            LinkEvent::Error { link_id, reason } => {
                warn!(link_id, reason = %reason, "link failed");
                self.broadcaster.remove(link_id);
                self.roster.mark_disconnected(link_id);
            }
        }
    }

    /// Start a round. Broadcasts the new snapshot before returning, so no
    /// later action can overtake it on any link.
    pub fn launch(&mut self, word: &str) -> Result<(), InvalidWord> {
        self.launch_at(word, now_ms())
    }

    /// `launch` with an explicit clock, for tests.
    pub fn launch_at(&mut self, word: &str, now: u64) -> Result<(), InvalidWord> {
        if self.state.launch(word, now)? {
            let delivered = self
                .broadcaster
                .broadcast(&WireMessage::GameStart(self.state.snapshot().into()));
            info!(
                word = self.state.word().unwrap_or_default(),
                delivered,
                "round launched"
            );
        } else {
            debug!("launch ignored, a round is already active");
        }
        Ok(())
    }

    /// Close the current round: broadcast round-end, then the awards as a
    /// second message. No-op outside an active round.
    pub fn stop(&mut self) {
        self.stop_at(now_ms())
    }

    /// `stop` with an explicit clock, for tests.
    pub fn stop_at(&mut self, now: u64) {
        let Some(awards) = self.state.stop(now) else {
            debug!("stop ignored, no active round");
            return;
        };
        self.broadcaster.broadcast(&WireMessage::GameEnd);
        self.broadcaster.broadcast(&WireMessage::Awards(awards.clone()));
        info!(
            results = self.state.results().len(),
            awarded = awards.fastest.len(),
            "round stopped"
        );
    }

    /// Wipe the session back to idle and tell everyone.
    pub fn reset(&mut self) {
        self.state.reset();
        self.broadcaster.broadcast(&WireMessage::Reset);
        info!("session reset");
    }

    /// Run the event loop until shutdown, consuming link events from the
    /// transport and actions from the instructor.
    ///
    /// Returns the controller so callers can inspect final state.
    pub async fn run(
        mut self,
        mut links: mpsc::UnboundedReceiver<LinkEvent>,
        mut actions: mpsc::UnboundedReceiver<CoordinatorAction>,
    ) -> Self {
        info!(room = %self.room_code, address = %self.address(), "coordinator ready");
        loop {
            tokio::select! {
                Some(event) = links.recv() => self.handle_link_event(event),
                action = actions.recv() => match action {
                    Some(CoordinatorAction::Launch { word, reply }) => {
                        let _ = reply.send(self.launch(&word));
                    }
                    Some(CoordinatorAction::Stop) => self.stop(),
                    Some(CoordinatorAction::Reset) => self.reset(),
                    Some(CoordinatorAction::Shutdown) | None => break,
                },
                else => break,
            }
        }
        info!(room = %self.room_code, "coordinator stopped");
        self
    }

    /// Action channel pair for [`run`](Self::run).
    pub fn action_channel() -> (CoordinatorHandle, mpsc::UnboundedReceiver<CoordinatorAction>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (CoordinatorHandle { actions: tx }, rx)
    }
}
