//! Guess Classification
//!
//! Pure judging of a guess against the secret word, plus the per-key
//! aggregation used for keyboard hinting.
//!
//! The per-letter rule is positional-first, containment-second and is
//! deliberately **uncapped**: `Present` is not limited by how many unmatched
//! instances of a letter the secret still has, so a guess with repeated
//! letters can earn several `Present` marks from a single occurrence in the
//! secret. That is the defined behavior of this game, not an approximation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Classification of one guessed letter.
///
/// Ordered by evidence strength so aggregation can take a plain maximum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterStatus {
    /// No evidence for this letter yet.
    Empty,
    /// Letter does not occur in the secret.
    Absent,
    /// Letter occurs in the secret, at a different position.
    Present,
    /// Letter matched its position exactly.
    Correct,
}

/// Classify a guess against the secret, one status per guess position.
///
/// Per position `i`: `Correct` if the letters match, else `Present` if the
/// secret contains the guessed letter anywhere, else `Absent`. Both inputs
/// are expected uppercase; comparison is by `char` so the extra letter `Ñ`
/// works like any other.
pub fn classify(secret: &str, guess: &str) -> Vec<LetterStatus> {
    let secret: Vec<char> = secret.chars().collect();
    guess
        .chars()
        .enumerate()
        .map(|(i, ch)| {
            if secret.get(i) == Some(&ch) {
                LetterStatus::Correct
            } else if secret.contains(&ch) {
                LetterStatus::Present
            } else {
                LetterStatus::Absent
            }
        })
        .collect()
}

/// Aggregate per-key status over all guesses so far.
///
/// A key's status is the best evidence any guess produced for it, with
/// precedence `Correct > Present > Absent > Empty`. A key that ever matched
/// its position is `Correct` no matter what other guesses showed for it.
/// Keys never guessed are absent from the map (implicitly `Empty`).
pub fn keyboard_hints(secret: &str, guesses: &[String]) -> BTreeMap<char, LetterStatus> {
    let mut hints = BTreeMap::new();
    for guess in guesses {
        for (ch, status) in guess.chars().zip(classify(secret, guess)) {
            let entry = hints.entry(ch).or_insert(LetterStatus::Empty);
            *entry = (*entry).max(status);
        }
    }
    hints
}
