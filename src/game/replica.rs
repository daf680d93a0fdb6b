//! Participant Replica
//!
//! Each participant's local projection of session truth, rebuilt purely from
//! inbound wire messages. The only locally-owned pieces are the guess list
//! and the one-shot result; inbound messages never overwrite those except
//! for the explicit round-start/reset wipes.

use crate::game::awards::AwardSet;
use crate::game::judge::{self, LetterStatus};
use crate::game::state::PlayerResult;
use crate::network::protocol::WireMessage;

/// What recording a guess did to the local round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    /// Guess recorded, round continues.
    Playing,
    /// Guess matched the secret; compose and send the result.
    Solved,
    /// Attempt budget spent without solving; compose and send the result.
    OutOfAttempts,
    /// Not recorded: no active round, already finished, or wrong length.
    NotAccepted,
}

/// Participant-local projection of the coordinator's session state.
#[derive(Clone, Debug)]
pub struct Replica {
    word: Option<String>,
    is_active: bool,
    start_time: Option<u64>,
    guesses: Vec<String>,
    my_result: Option<PlayerResult>,
    awards: Option<AwardSet>,
    max_attempts: u32,
}

impl Replica {
    /// Empty replica with the given attempt budget.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            word: None,
            is_active: false,
            start_time: None,
            guesses: Vec::new(),
            my_result: None,
            awards: None,
            max_attempts,
        }
    }

    /// Mirrored secret word. Whether to show it on screen is a presentation
    /// choice; the replica always knows it.
    pub fn word(&self) -> Option<&str> {
        self.word.as_deref()
    }

    /// Whether the mirrored round accepts guesses.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Mirrored round start, epoch millis.
    pub fn start_time(&self) -> Option<u64> {
        self.start_time
    }

    /// Locally committed guesses, oldest first.
    pub fn guesses(&self) -> &[String] {
        &self.guesses
    }

    /// The locally produced result, once the round ended for this player.
    pub fn my_result(&self) -> Option<&PlayerResult> {
        self.my_result.as_ref()
    }

    /// Last received podiums, if the coordinator stopped a round.
    pub fn awards(&self) -> Option<&AwardSet> {
        self.awards.as_ref()
    }

    /// Attempt budget per round.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether this participant is on either podium of the last awards.
    pub fn is_awarded(&self, participant_id: &str) -> bool {
        self.awards.as_ref().is_some_and(|a| {
            a.fastest.iter().chain(a.most_efficient.iter())
                .any(|r| r.participant_id == participant_id)
        })
    }

    /// Apply one inbound message. Idempotent per message: applying the same
    /// message twice leaves the same state as applying it once.
    pub fn apply(&mut self, msg: &WireMessage) {
        match msg {
            WireMessage::GameStart(payload) => {
                if payload.is_active && payload.word.is_some() {
                    self.word = payload.word.clone();
                    self.is_active = true;
                    self.start_time = payload.start_time;
                    self.guesses.clear();
                    self.my_result = None;
                    self.awards = None;
                } else {
                    self.word = None;
                    self.is_active = false;
                    self.start_time = payload.start_time;
                }
            }
            WireMessage::GameEnd => {
                self.is_active = false;
            }
            WireMessage::Awards(awards) => {
                self.awards = Some(awards.clone());
            }
            WireMessage::Reset => {
                let max_attempts = self.max_attempts;
                *self = Self::new(max_attempts);
            }
            // Participants never receive result submissions.
            WireMessage::SubmitResult(_) => {}
        }
    }

    /// Record a locally entered guess.
    ///
    /// The guess is uppercased before comparison. Guesses are only accepted
    /// while the round is active, unfinished, and the guess length matches
    /// the secret.
    pub fn push_guess(&mut self, guess: &str) -> GuessOutcome {
        if !self.is_active || self.my_result.is_some() {
            return GuessOutcome::NotAccepted;
        }
        let Some(word) = self.word.clone() else {
            return GuessOutcome::NotAccepted;
        };

        let guess = guess.trim().to_uppercase();
        if guess.chars().count() != word.chars().count() {
            return GuessOutcome::NotAccepted;
        }

        self.guesses.push(guess.clone());

        if guess == word {
            GuessOutcome::Solved
        } else if self.guesses.len() as u32 >= self.max_attempts {
            GuessOutcome::OutOfAttempts
        } else {
            GuessOutcome::Playing
        }
    }

    /// Build this participant's one-shot result and remember it.
    ///
    /// Returns `None` if the round already produced a result (the result is
    /// created exactly once) or if no round is in progress.
    pub fn finish_round(
        &mut self,
        participant_id: &str,
        display_name: &str,
        is_correct: bool,
        now: u64,
    ) -> Option<PlayerResult> {
        if self.my_result.is_some() || self.word.is_none() {
            return None;
        }

        let result = PlayerResult {
            participant_id: participant_id.to_string(),
            display_name: display_name.to_string(),
            attempts: self.guesses.len().max(1) as u32,
            time_taken_ms: now.saturating_sub(self.start_time.unwrap_or(now)),
            submitted_at: now,
            is_correct,
        };
        self.my_result = Some(result.clone());
        Some(result)
    }

    /// Per-letter classification of every committed guess, for the board.
    pub fn classified_guesses(&self) -> Vec<(String, Vec<LetterStatus>)> {
        let Some(word) = self.word.as_deref() else {
            return Vec::new();
        };
        self.guesses
            .iter()
            .map(|g| (g.clone(), judge::classify(word, g)))
            .collect()
    }

    /// Best status per key over all committed guesses, for keyboard hints.
    pub fn keyboard_hints(&self) -> std::collections::BTreeMap<char, LetterStatus> {
        match self.word.as_deref() {
            Some(word) => judge::keyboard_hints(word, &self.guesses),
            None => Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::protocol::GameStartPayload;

    fn round_start(word: &str, start_time: u64) -> WireMessage {
        WireMessage::GameStart(GameStartPayload {
            word: Some(word.to_string()),
            is_active: true,
            start_time: Some(start_time),
        })
    }

    fn fresh(word: &str) -> Replica {
        let mut replica = Replica::new(6);
        replica.apply(&round_start(word, 1_000));
        replica
    }

    #[test]
    fn test_round_start_rebuilds_round() {
        let mut replica = Replica::new(6);
        replica.apply(&round_start("GATO", 1_000));
        assert_eq!(replica.word(), Some("GATO"));
        assert!(replica.is_active());
        assert_eq!(replica.start_time(), Some(1_000));
        assert!(replica.guesses().is_empty());
        assert!(replica.my_result().is_none());
    }

    #[test]
    fn test_round_start_clears_local_progress() {
        let mut replica = fresh("GATO");
        replica.push_guess("PESO");
        replica.push_guess("GATO");
        let _ = replica.finish_round("p1", "Ana", true, 2_000);

        replica.apply(&round_start("PERRO", 3_000));
        assert_eq!(replica.word(), Some("PERRO"));
        assert!(replica.guesses().is_empty());
        assert!(replica.my_result().is_none());
        assert!(replica.awards().is_none());
    }

    #[test]
    fn test_inactive_snapshot_clears_word() {
        let mut replica = fresh("GATO");
        replica.apply(&WireMessage::GameStart(GameStartPayload {
            word: None,
            is_active: false,
            start_time: None,
        }));
        assert_eq!(replica.word(), None);
        assert!(!replica.is_active());
    }

    #[test]
    fn test_reducer_is_idempotent() {
        let msg = round_start("GATO", 1_000);
        let mut once = Replica::new(6);
        once.apply(&msg);
        let mut twice = Replica::new(6);
        twice.apply(&msg);
        twice.apply(&msg);

        assert_eq!(once.word(), twice.word());
        assert_eq!(once.is_active(), twice.is_active());
        assert_eq!(once.start_time(), twice.start_time());
        assert_eq!(once.guesses(), twice.guesses());

        // Same for the end-of-round message.
        once.apply(&WireMessage::GameEnd);
        twice.apply(&WireMessage::GameEnd);
        twice.apply(&WireMessage::GameEnd);
        assert_eq!(once.is_active(), twice.is_active());
    }

    #[test]
    fn test_game_end_keeps_word_and_progress() {
        let mut replica = fresh("GATO");
        replica.push_guess("PESO");
        replica.apply(&WireMessage::GameEnd);
        assert!(!replica.is_active());
        assert_eq!(replica.word(), Some("GATO"));
        assert_eq!(replica.guesses().len(), 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut replica = fresh("GATO");
        replica.push_guess("GATO");
        let _ = replica.finish_round("p1", "Ana", true, 2_000);
        replica.apply(&WireMessage::Reset);

        assert_eq!(replica.word(), None);
        assert!(!replica.is_active());
        assert!(replica.guesses().is_empty());
        assert!(replica.my_result().is_none());
        assert_eq!(replica.max_attempts(), 6);
    }

    #[test]
    fn test_solve_on_matching_guess() {
        let mut replica = fresh("GATO");
        assert_eq!(replica.push_guess("PESO"), GuessOutcome::Playing);
        assert_eq!(replica.push_guess("gato"), GuessOutcome::Solved);
        assert_eq!(replica.guesses(), ["PESO", "GATO"]);
    }

    #[test]
    fn test_budget_exhaustion() {
        let mut replica = Replica::new(2);
        replica.apply(&round_start("GATO", 0));
        assert_eq!(replica.push_guess("PESO"), GuessOutcome::Playing);
        assert_eq!(replica.push_guess("MESA"), GuessOutcome::OutOfAttempts);
    }

    #[test]
    fn test_guess_gating() {
        let mut replica = Replica::new(6);
        // No round yet.
        assert_eq!(replica.push_guess("GATO"), GuessOutcome::NotAccepted);

        replica.apply(&round_start("GATO", 0));
        // Wrong length.
        assert_eq!(replica.push_guess("GA"), GuessOutcome::NotAccepted);
        assert!(replica.guesses().is_empty());

        // Round closed.
        replica.apply(&WireMessage::GameEnd);
        assert_eq!(replica.push_guess("GATO"), GuessOutcome::NotAccepted);
    }

    #[test]
    fn test_exactly_one_result() {
        let mut replica = Replica::new(2);
        replica.apply(&round_start("GATO", 1_000));
        replica.push_guess("PESO");
        replica.push_guess("MESA");

        let result = replica.finish_round("p1", "Ana", false, 9_000).unwrap();
        assert_eq!(result.attempts, 2);
        assert_eq!(result.time_taken_ms, 8_000);
        assert!(!result.is_correct);

        // Second call refuses: the result is created exactly once.
        assert!(replica.finish_round("p1", "Ana", false, 9_500).is_none());
        assert_eq!(replica.my_result().unwrap().submitted_at, 9_000);

        // Further guesses are ignored after finishing.
        assert_eq!(replica.push_guess("GATO"), GuessOutcome::NotAccepted);
    }

    #[test]
    fn test_awards_and_winner_check() {
        let mut replica = fresh("GATO");
        let winner = PlayerResult {
            participant_id: "p1".to_string(),
            display_name: "Ana".to_string(),
            attempts: 1,
            time_taken_ms: 2_000,
            submitted_at: 3_000,
            is_correct: true,
        };
        replica.apply(&WireMessage::Awards(AwardSet {
            fastest: vec![winner.clone()],
            most_efficient: vec![winner],
        }));

        assert!(replica.is_awarded("p1"));
        assert!(!replica.is_awarded("p2"));
    }

    #[test]
    fn test_board_classification() {
        let mut replica = fresh("ROSA");
        replica.push_guess("RIOS");
        let board = replica.classified_guesses();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].0, "RIOS");
        use crate::game::judge::LetterStatus::{Absent, Correct, Present};
        assert_eq!(board[0].1, vec![Correct, Absent, Present, Present]);
    }
}
