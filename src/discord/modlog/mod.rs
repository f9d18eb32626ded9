// Discord adapters for the moderation log: serenity-backed audit feed and
// log sink, event translation, embed formatting and slash commands.

pub mod audit_feed;
pub mod commands;
pub mod events;
pub mod formatter;
pub mod sink;

use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;

// Discord's epoch (2015-01-01T00:00:00Z) in unix milliseconds.
const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// Creation time encoded in a snowflake id.
pub fn snowflake_time(id: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(((id >> 22) + DISCORD_EPOCH_MS) as i64).unwrap_or_default()
}

/// HTTP status of a failed Discord API call, if there was one.
pub fn http_status(err: &serenity::Error) -> Option<u16> {
    match err {
        serenity::Error::Http(http_err) => http_err.status_code().map(|s| s.as_u16()),
        _ => None,
    }
}
