//! Award Computation
//!
//! Ranks the correct submissions of a round into two podiums: fastest by
//! wall-clock solve time, most efficient by attempt count. Deterministic over
//! the same `results` sequence, so any replica can re-derive the exact podium
//! the coordinator broadcast.

use serde::{Deserialize, Serialize};

use crate::game::state::PlayerResult;

/// Podium size for each category.
pub const PODIUM_SIZE: usize = 3;

/// The two rankings broadcast when a round stops.
///
/// Derived and transient: computed at `stop`, sent once, never stored in
/// session truth. Lists hold at most [`PODIUM_SIZE`] entries and are never
/// padded; a participant may appear in both.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AwardSet {
    /// Correct results, ascending solve time.
    pub fastest: Vec<PlayerResult>,
    /// Correct results, ascending attempts, solve time as tie break.
    pub most_efficient: Vec<PlayerResult>,
}

/// Compute both podiums from the submissions of one round.
///
/// Only `is_correct` entries rank. Sorts are stable, so ties beyond the sort
/// key keep submission order.
pub fn compute(results: &[PlayerResult]) -> AwardSet {
    let correct: Vec<PlayerResult> =
        results.iter().filter(|r| r.is_correct).cloned().collect();

    let mut fastest = correct.clone();
    fastest.sort_by_key(|r| r.time_taken_ms);
    fastest.truncate(PODIUM_SIZE);

    let mut most_efficient = correct;
    most_efficient.sort_by_key(|r| (r.attempts, r.time_taken_ms));
    most_efficient.truncate(PODIUM_SIZE);

    AwardSet { fastest, most_efficient }
}
