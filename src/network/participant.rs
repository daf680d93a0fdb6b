//! Participant Controller
//!
//! The student side: one link to the coordinator, a replica fed by whatever
//! arrives on it, and a guess composer. Its single outbound message is the
//! one-shot result submission when the local round ends. A closed or failed
//! link is terminal; recovering means joining the room again from scratch.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::game::replica::{GuessOutcome, Replica};
use crate::game::state::is_accepted_letter;
use crate::network::protocol::WireMessage;
use crate::network::transport::{
    room_address, LinkEvent, LinkHandle, MemoryEndpoint, TransportError,
};
use crate::now_ms;

/// Where this participant stands with the coordinator's room.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Link open, replica live.
    Connected,
    /// Link closed. Terminal; no automatic retry.
    Disconnected,
    /// Link failed. Terminal; no automatic retry.
    Failed,
}

/// The student-side controller.
pub struct Participant {
    id: String,
    display_name: String,
    replica: Replica,
    link: LinkHandle,
    status: ConnectionStatus,
    pending: String,
}

impl Participant {
    /// Join the room `code` through `endpoint`.
    ///
    /// Dials the address derived from the code; a failed dial surfaces as a
    /// transport error and the caller shows the room-not-found screen.
    pub fn join(
        endpoint: &MemoryEndpoint,
        code: &str,
        display_name: impl Into<String>,
        max_attempts: u32,
    ) -> Result<Self, TransportError> {
        let link = endpoint.connect(&room_address(code))?;
        let id = uuid::Uuid::new_v4().to_string();
        let display_name = display_name.into();
        info!(participant = %display_name, room = code, "joined room");
        Ok(Self {
            id,
            display_name,
            replica: Replica::new(max_attempts),
            link,
            status: ConnectionStatus::Connected,
            pending: String::new(),
        })
    }

    /// Stable identity attached to submitted results.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name shown in rankings.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Local projection of session state.
    pub fn replica(&self) -> &Replica {
        &self.replica
    }

    /// Link status. `Disconnected` and `Failed` are terminal.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// The guess currently being composed.
    pub fn pending_guess(&self) -> &str {
        &self.pending
    }

    /// Apply one link lifecycle event.
    pub fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Data { link_id, frame } if link_id == self.link.id() => {
                match WireMessage::from_json(&frame) {
                    Ok(msg) => {
                        match &msg {
                            WireMessage::GameStart(payload) if payload.is_active => {
                                self.pending.clear();
                                info!(participant = %self.display_name, "round started");
                            }
                            WireMessage::Reset => self.pending.clear(),
                            _ => {}
                        }
                        self.replica.apply(&msg);
                    }
                    Err(e) => warn!(link_id, error = %e, "malformed frame dropped"),
                }
            }
            LinkEvent::Closed { link_id } if link_id == self.link.id() => {
                info!(participant = %self.display_name, "link closed");
                self.status = ConnectionStatus::Disconnected;
            }
            LinkEvent::Error { link_id, reason } if link_id == self.link.id() => {
                warn!(participant = %self.display_name, reason = %reason, "link failed");
                self.status = ConnectionStatus::Failed;
            }
            // Participants accept no inbound links; events for other links
            // concern nobody here.
            _ => {}
        }
    }

    /// Wait for and apply the next link event. Returns `false` once the
    /// event stream ends.
    pub async fn next_event(&mut self, events: &mut mpsc::UnboundedReceiver<LinkEvent>) -> bool {
        match events.recv().await {
            Some(event) => {
                self.handle_link_event(event);
                true
            }
            None => false,
        }
    }

    /// Apply every already-queued link event without waiting.
    pub fn drain_events(&mut self, events: &mut mpsc::UnboundedReceiver<LinkEvent>) {
        while let Ok(event) = events.try_recv() {
            self.handle_link_event(event);
        }
    }

    /// Add one letter to the guess being composed.
    pub fn type_letter(&mut self, letter: char) {
        let Some(word_len) = self.replica.word().map(|w| w.chars().count()) else {
            return;
        };
        if !self.replica.is_active() || self.replica.my_result().is_some() {
            return;
        }
        let letter = letter.to_uppercase().next().unwrap_or(letter);
        if is_accepted_letter(letter) && self.pending.chars().count() < word_len {
            self.pending.push(letter);
        }
    }

    /// Remove the last composed letter.
    pub fn backspace(&mut self) {
        self.pending.pop();
    }

    /// Commit the composed guess once it fills the word length. A premature
    /// commit changes nothing and keeps the composition.
    pub fn commit_guess(&mut self) -> GuessOutcome {
        let word_len = self.replica.word().map(|w| w.chars().count());
        if word_len != Some(self.pending.chars().count()) {
            return GuessOutcome::NotAccepted;
        }
        let guess = std::mem::take(&mut self.pending);
        self.guess(&guess)
    }

    /// Enter a full guess. Finishing the round (solved or out of attempts)
    /// builds the result and sends it, exactly once.
    pub fn guess(&mut self, guess: &str) -> GuessOutcome {
        self.guess_at(guess, now_ms())
    }

    /// `guess` with an explicit clock, for tests.
    pub fn guess_at(&mut self, guess: &str, now: u64) -> GuessOutcome {
        let outcome = self.replica.push_guess(guess);
        match outcome {
            GuessOutcome::Solved => self.finish_round(true, now),
            GuessOutcome::OutOfAttempts => self.finish_round(false, now),
            GuessOutcome::Playing => {
                debug!(
                    participant = %self.display_name,
                    attempts = self.replica.guesses().len(),
                    "guess recorded"
                );
            }
            GuessOutcome::NotAccepted => {}
        }
        outcome
    }

    fn finish_round(&mut self, is_correct: bool, now: u64) {
        let Some(result) =
            self.replica
                .finish_round(&self.id, &self.display_name, is_correct, now)
        else {
            return;
        };

        info!(
            participant = %self.display_name,
            attempts = result.attempts,
            time_ms = result.time_taken_ms,
            correct = is_correct,
            "round finished, submitting result"
        );
        if let Err(e) = self.link.send(&WireMessage::SubmitResult(result)) {
            // Best effort: the result stays local, the coordinator will
            // simply never rank this participant.
            warn!(participant = %self.display_name, error = %e, "result submission failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::protocol::GameStartPayload;
    use crate::network::transport::{MemoryHub, PeerAddress};

    struct Room {
        hub: MemoryHub,
        host_rx: mpsc::UnboundedReceiver<LinkEvent>,
        _host: MemoryEndpoint,
    }

    fn room(code: &str) -> Room {
        let hub = MemoryHub::new();
        let (_host, host_rx) = hub.endpoint(room_address(code)).unwrap();
        Room { hub, host_rx, _host }
    }

    async fn host_link(room: &mut Room) -> LinkHandle {
        match room.host_rx.recv().await.unwrap() {
            LinkEvent::Opened { link } => link,
            other => panic!("expected Opened, got {other:?}"),
        }
    }

    async fn host_message(room: &mut Room) -> WireMessage {
        loop {
            match room.host_rx.recv().await.unwrap() {
                LinkEvent::Data { frame, .. } => {
                    return WireMessage::from_json(&frame).unwrap()
                }
                _ => continue,
            }
        }
    }

    fn start_round(word: &str) -> WireMessage {
        WireMessage::GameStart(GameStartPayload {
            word: Some(word.to_string()),
            is_active: true,
            start_time: Some(1_000),
        })
    }

    fn join(room: &Room, name: &str) -> (Participant, mpsc::UnboundedReceiver<LinkEvent>, MemoryEndpoint) {
        let (endpoint, rx) = room.hub.endpoint(PeerAddress::ephemeral()).unwrap();
        let participant = Participant::join(&endpoint, room_code_of(&room._host), name, 6).unwrap();
        (participant, rx, endpoint)
    }

    fn room_code_of(host: &MemoryEndpoint) -> &str {
        host.address()
            .as_str()
            .strip_prefix(crate::network::transport::ADDRESS_PREFIX)
            .unwrap()
    }

    #[tokio::test]
    async fn test_join_unknown_room_fails() {
        let hub = MemoryHub::new();
        let (endpoint, _rx) = hub.endpoint(PeerAddress::ephemeral()).unwrap();
        assert!(matches!(
            Participant::join(&endpoint, "00000", "Ana", 6),
            Err(TransportError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_solving_submits_result_once() {
        let mut room = room("50001");
        let (mut participant, _rx, _ep) = join(&room, "Ana");
        let _link = host_link(&mut room).await;

        participant.handle_link_event(LinkEvent::Data {
            link_id: _link.id(),
            frame: start_round("GATO").to_json().unwrap(),
        });

        assert_eq!(participant.guess_at("PESO", 2_000), GuessOutcome::Playing);
        assert_eq!(participant.guess_at("GATO", 3_500), GuessOutcome::Solved);

        match host_message(&mut room).await {
            WireMessage::SubmitResult(result) => {
                assert_eq!(result.display_name, "Ana");
                assert_eq!(result.attempts, 2);
                assert_eq!(result.time_taken_ms, 2_500);
                assert!(result.is_correct);
                assert_eq!(result.participant_id, participant.id());
            }
            other => panic!("expected SubmitResult, got {other:?}"),
        }

        // No further guesses, no second submission.
        assert_eq!(participant.guess_at("GATO", 4_000), GuessOutcome::NotAccepted);
        assert!(room.host_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_exhaustion_submits_incorrect_result() {
        let mut room = room("50002");
        let (endpoint, _rx) = room.hub.endpoint(PeerAddress::ephemeral()).unwrap();
        let mut participant = Participant::join(&endpoint, "50002", "Luis", 2).unwrap();
        let link = host_link(&mut room).await;

        participant.handle_link_event(LinkEvent::Data {
            link_id: link.id(),
            frame: start_round("GATO").to_json().unwrap(),
        });

        assert_eq!(participant.guess_at("PESO", 2_000), GuessOutcome::Playing);
        assert_eq!(participant.guess_at("MESA", 4_000), GuessOutcome::OutOfAttempts);

        match host_message(&mut room).await {
            WireMessage::SubmitResult(result) => {
                assert!(!result.is_correct);
                assert_eq!(result.attempts, 2);
            }
            other => panic!("expected SubmitResult, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_snapshot_via_event_stream_drives_replica() {
        let mut room = room("50003");
        let (mut participant, mut rx, _ep) = join(&room, "Ana");
        let link = host_link(&mut room).await;

        link.send(&start_round("RATON")).unwrap();
        assert!(participant.next_event(&mut rx).await);
        assert_eq!(participant.replica().word(), Some("RATON"));
        assert!(participant.replica().is_active());

        link.send(&WireMessage::GameEnd).unwrap();
        assert!(participant.next_event(&mut rx).await);
        assert!(!participant.replica().is_active());
    }

    #[tokio::test]
    async fn test_close_is_terminal() {
        let mut room = room("50004");
        let (mut participant, mut rx, _ep) = join(&room, "Ana");
        let link = host_link(&mut room).await;

        link.close();
        // Pump delivers the close to the participant's stream.
        while participant.status() == ConnectionStatus::Connected {
            assert!(participant.next_event(&mut rx).await);
        }
        assert_eq!(participant.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_error_event_marks_failed() {
        let room = room("50005");
        let (mut participant, _rx, _ep) = join(&room, "Ana");
        let link_id = participant.link.id();
        participant.handle_link_event(LinkEvent::Error {
            link_id,
            reason: "connection reset".to_string(),
        });
        assert_eq!(participant.status(), ConnectionStatus::Failed);
    }

    #[tokio::test]
    async fn test_compose_and_commit() {
        let room = room("50006");
        let (mut participant, _rx, _ep) = join(&room, "Ana");
        participant.handle_link_event(LinkEvent::Data {
            link_id: participant.link.id(),
            frame: start_round("GATO").to_json().unwrap(),
        });

        for c in ['g', 'a', 't', 'x', 'o'] {
            participant.type_letter(c);
        }
        // Word length caps composition at four letters.
        assert_eq!(participant.pending_guess(), "GATX");
        participant.backspace();
        participant.type_letter('o');
        assert_eq!(participant.pending_guess(), "GATO");

        assert_eq!(participant.commit_guess(), GuessOutcome::Solved);
        assert_eq!(participant.pending_guess(), "");
    }

    #[tokio::test]
    async fn test_compose_rejects_foreign_characters() {
        let room = room("50007");
        let (mut participant, _rx, _ep) = join(&room, "Ana");
        participant.handle_link_event(LinkEvent::Data {
            link_id: participant.link.id(),
            frame: start_round("AÑO").to_json().unwrap(),
        });

        participant.type_letter('a');
        participant.type_letter('1');
        participant.type_letter('ñ');
        participant.type_letter('o');
        assert_eq!(participant.pending_guess(), "AÑO");
    }

    #[tokio::test]
    async fn test_short_commit_is_not_accepted() {
        let room = room("50008");
        let (mut participant, _rx, _ep) = join(&room, "Ana");
        participant.handle_link_event(LinkEvent::Data {
            link_id: participant.link.id(),
            frame: start_round("GATO").to_json().unwrap(),
        });

        participant.type_letter('g');
        assert_eq!(participant.commit_guess(), GuessOutcome::NotAccepted);
        assert!(participant.replica().guesses().is_empty());
        // The partial composition survives a premature commit.
        assert_eq!(participant.pending_guess(), "G");
    }
}
