// Temporary suppression window for a guild's log output.
//
// The window is cleared lazily: whoever reads an expired pause clears it and
// is responsible for persisting the cleared config.

use super::modlog_models::SpaceConfig;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseCheck {
    /// No pause configured.
    Inactive,
    /// Paused, with the time left.
    Active(Duration),
    /// The pause had expired and was just cleared; the config must be saved.
    Cleared,
}

impl PauseCheck {
    pub fn is_paused(&self) -> bool {
        matches!(self, PauseCheck::Active(_))
    }
}

/// Evaluate the pause window at `now`, clearing it if it has run out.
pub fn check(config: &mut SpaceConfig, now: DateTime<Utc>) -> PauseCheck {
    match config.paused_until {
        None => PauseCheck::Inactive,
        Some(until) if now < until => PauseCheck::Active(until - now),
        Some(_) => {
            config.paused_until = None;
            PauseCheck::Cleared
        }
    }
}

/// Format a remaining pause as `Xm Ys`.
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.num_seconds().max(0);
    format!("{}m {}s", secs / 60, secs % 60)
}
