//! Protocol Messages
//!
//! Wire format for coordinator/participant traffic over a link. Messages are
//! JSON objects `{"type": ..., "payload": ...}`; the tag set is fixed and an
//! unknown tag or a payload of the wrong shape fails decoding instead of
//! leaking untyped fields into the session.

use serde::{Deserialize, Serialize};

use crate::game::awards::AwardSet;
use crate::game::state::{PlayerResult, Snapshot};

/// Everything that travels over a link, coordinator to participant and back.
///
/// Four coordinator-to-participant kinds drive the replica; `SubmitResult` is
/// the single participant-to-coordinator kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireMessage {
    /// Full round snapshot: on launch, and to every link the moment it
    /// opens (late joiners and reconnects get current state, never stale).
    GameStart(GameStartPayload),

    /// Round closed, submissions no longer ranked.
    GameEnd,

    /// Podiums for the round that just ended. Always follows `GameEnd` as a
    /// second, distinct message.
    Awards(AwardSet),

    /// Session wiped back to idle.
    Reset,

    /// A participant's one-shot round result.
    SubmitResult(PlayerResult),
}

/// Payload of [`WireMessage::GameStart`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GameStartPayload {
    /// Current secret, `null` when no round exists.
    pub word: Option<String>,
    /// Whether guessing is open.
    pub is_active: bool,
    /// Round start, epoch millis.
    pub start_time: Option<u64>,
}

impl From<Snapshot> for GameStartPayload {
    fn from(snap: Snapshot) -> Self {
        Self {
            word: snap.word,
            is_active: snap.is_active,
            start_time: snap.start_time,
        }
    }
}

impl WireMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
