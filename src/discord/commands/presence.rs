// This module handles bot presence and lifecycle events.
//
// Discord-layer glue only: we work with Discord SDK types (Context,
// ActivityData, OnlineStatus) and keep the logic short.

use poise::serenity_prelude as serenity;

/// Shows how many servers the logger is currently watching.
pub fn set_watching(ctx: &serenity::Context, guild_count: usize) {
    let activity = serenity::ActivityData::watching(format!(
        "deleted messages in {} server{}",
        guild_count,
        if guild_count == 1 { "" } else { "s" }
    ));
    ctx.set_presence(Some(activity), serenity::OnlineStatus::Online);
}

/// Called once the bot is ready so we can announce a default presence message
/// without repeating the setup code at every call site.
pub fn on_ready(ctx: &serenity::Context, ready: &serenity::Ready) {
    set_watching(ctx, ready.guilds.len());
}
