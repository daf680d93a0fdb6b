//! Session State Machine
//!
//! The authoritative round state owned by the coordinator. All mutation goes
//! through the four transition methods; the network layer broadcasts after
//! each successful transition. Participants never hold this type, only a
//! [`Replica`](crate::game::replica::Replica) derived from broadcasts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::awards::{self, AwardSet};
use crate::{WORD_MAX_LEN, WORD_MIN_LEN};

/// One participant's submission for a round.
///
/// Created once by the owning participant when its round ends, sent once,
/// immutable thereafter. The coordinator stores received copies in arrival
/// order; duplicates from a flapping link are appended, not merged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PlayerResult {
    /// Stable identity of the submitting participant.
    pub participant_id: String,
    /// Name shown in rankings.
    pub display_name: String,
    /// Guesses used, including the final one. At least 1.
    pub attempts: u32,
    /// Milliseconds from round start to finish.
    pub time_taken_ms: u64,
    /// Epoch millis when the participant finished.
    pub submitted_at: u64,
    /// Whether the secret was found.
    pub is_correct: bool,
}

/// Phase of the current round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// No word set, nothing to guess.
    #[default]
    Idle,
    /// Word set, submissions accepted.
    RoundActive,
    /// Word set, round closed, awards computed.
    RoundStopped,
}

/// Rejection reasons for a launched word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidWord {
    /// Empty after trimming.
    #[error("word is empty")]
    Empty,
    /// Character count outside the accepted range.
    #[error("word length {0} outside the accepted range")]
    Length(usize),
    /// Character outside A-Z plus Ñ.
    #[error("character {0:?} outside the accepted alphabet")]
    Alphabet(char),
}

/// Read-only view of the fields every participant mirrors.
///
/// Built on demand by [`SessionState::snapshot`] so link-open handlers always
/// see the state as of the moment they run, never a stale capture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// Current secret, if a round exists.
    pub word: Option<String>,
    /// Whether guessing is open.
    pub is_active: bool,
    /// Round start, epoch millis.
    pub start_time: Option<u64>,
}

/// Coordinator-owned session truth.
///
/// Invariants, held by construction: no word implies `Idle` implies empty
/// `results`; `results` only grows while a word is set and is cleared by
/// `launch` and `reset`.
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    word: Option<String>,
    phase: RoundPhase,
    start_time: Option<u64>,
    end_time: Option<u64>,
    results: Vec<PlayerResult>,
}

impl SessionState {
    /// Fresh session, no round.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Current secret word, if any.
    pub fn word(&self) -> Option<&str> {
        self.word.as_deref()
    }

    /// Whether submissions are currently accepted.
    pub fn is_active(&self) -> bool {
        self.phase == RoundPhase::RoundActive
    }

    /// Round start, epoch millis.
    pub fn start_time(&self) -> Option<u64> {
        self.start_time
    }

    /// Round end, epoch millis. Set by `stop`.
    pub fn end_time(&self) -> Option<u64> {
        self.end_time
    }

    /// All submissions received this round, arrival order.
    pub fn results(&self) -> &[PlayerResult] {
        &self.results
    }

    /// Submissions ordered by the moment each participant finished, for the
    /// live feed.
    pub fn results_by_submission_time(&self) -> Vec<&PlayerResult> {
        let mut ordered: Vec<&PlayerResult> = self.results.iter().collect();
        ordered.sort_by_key(|r| r.submitted_at);
        ordered
    }

    /// Read the fields participants mirror, as of now.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            word: self.word.clone(),
            is_active: self.is_active(),
            start_time: self.start_time,
        }
    }

    /// Start a new round with `word`.
    ///
    /// Valid from `Idle` and `RoundStopped`; from `RoundActive` this is a
    /// no-op returning `Ok(false)`. The word is trimmed, uppercased and
    /// validated against length and alphabet; a rejected word changes
    /// nothing. On `Ok(true)` the previous round's results are gone and the
    /// caller must broadcast the new snapshot before taking further actions.
    pub fn launch(&mut self, word: &str, now: u64) -> Result<bool, InvalidWord> {
        if self.phase == RoundPhase::RoundActive {
            return Ok(false);
        }

        let word = validate_word(word)?;

        self.word = Some(word);
        self.phase = RoundPhase::RoundActive;
        self.start_time = Some(now);
        self.end_time = None;
        self.results.clear();
        Ok(true)
    }

    /// Append a received submission.
    ///
    /// Accepted while a word is set, including after `stop` (a slow link may
    /// deliver late; the entry joins the record but awards already computed
    /// are not revised). Returns whether the result was kept. Duplicates per
    /// participant are kept as-is.
    pub fn submit(&mut self, result: PlayerResult) -> bool {
        if self.word.is_none() {
            return false;
        }
        self.results.push(result);
        true
    }

    /// Close the current round and compute awards.
    ///
    /// Only effective from `RoundActive`; otherwise nothing changes and
    /// `None` is returned. On success the caller broadcasts round-end first,
    /// then the returned awards as a second message.
    pub fn stop(&mut self, now: u64) -> Option<AwardSet> {
        if self.phase != RoundPhase::RoundActive {
            return None;
        }
        self.phase = RoundPhase::RoundStopped;
        self.end_time = Some(now);
        Some(awards::compute(&self.results))
    }

    /// Drop the round entirely and return to `Idle`. Valid from any state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Normalize and validate a launched word: trim, uppercase, length 3-5,
/// letters A-Z plus Ñ.
fn validate_word(raw: &str) -> Result<String, InvalidWord> {
    let word = raw.trim().to_uppercase();
    if word.is_empty() {
        return Err(InvalidWord::Empty);
    }
    let len = word.chars().count();
    if !(WORD_MIN_LEN..=WORD_MAX_LEN).contains(&len) {
        return Err(InvalidWord::Length(len));
    }
    if let Some(bad) = word.chars().find(|c| !is_accepted_letter(*c)) {
        return Err(InvalidWord::Alphabet(bad));
    }
    Ok(word)
}

/// The accepted alphabet: uppercase A-Z plus the extra letter Ñ.
pub fn is_accepted_letter(c: char) -> bool {
    matches!(c, 'A'..='Z' | 'Ñ')
}
