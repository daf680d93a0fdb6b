//! Runtime Configuration
//!
//! The few knobs outside the protocol: the attempt budget handed to
//! participants and the instructor's access code for opening a room. The
//! access check is local to the coordinator process and never crosses a
//! link.

use crate::DEFAULT_MAX_ATTEMPTS;

/// Session-level configuration.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Guesses each participant gets per round.
    pub max_attempts: u32,
    /// Required to open a room as coordinator. `None` disables the gate.
    pub access_code: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            access_code: None,
        }
    }
}

impl SessionConfig {
    /// Read configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_attempts: std::env::var("AULA_WORDLE_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            access_code: std::env::var("AULA_WORDLE_ACCESS_CODE").ok(),
        }
    }

    /// Check a provided instructor access code against the configured gate.
    pub fn gate_allows(&self, provided: Option<&str>) -> bool {
        match &self.access_code {
            Some(expected) => provided == Some(expected.as_str()),
            None => true,
        }
    }
}
