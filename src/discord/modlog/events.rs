use super::audit_feed::SerenityAuditFeed;
use super::sink::ChannelSink;
use super::snowflake_time;
use crate::core::modlog::{BulkDeletion, MessageEdit, MessageSnapshot, ModLogError};
use crate::discord::Data;
use anyhow::Result;
use poise::serenity_prelude::{self as serenity, Context};

/// Build a snapshot from a serenity message. `None` for DMs.
pub fn snapshot_from_message(ctx: &Context, message: &serenity::Message) -> Option<MessageSnapshot> {
    let guild_id = message.guild_id?.get();

    Some(MessageSnapshot {
        message_id: message.id.get(),
        guild_id,
        channel_id: message.channel_id.get(),
        author_id: message.author.id.get(),
        author_name: message.author.name.clone(),
        author_bot: message.author.bot,
        author_roles: author_roles(ctx, message),
        content: message.content.clone(),
        attachments: message.attachments.iter().map(|a| a.url.clone()).collect(),
        created_at: snowflake_time(message.id.get()),
    })
}

// Gateway messages carry the member's roles; fall back to the guild cache.
fn author_roles(ctx: &Context, message: &serenity::Message) -> Vec<u64> {
    if let Some(member) = &message.member {
        return member.roles.iter().map(|r| r.get()).collect();
    }

    message
        .guild_id
        .and_then(|guild_id| ctx.cache.guild(guild_id))
        .and_then(|guild| {
            guild
                .members
                .get(&message.author.id)
                .map(|m| m.roles.iter().map(|r| r.get()).collect())
        })
        .unwrap_or_default()
}

// Prefer our own snapshot over the Serenity cache so we never miss deletes.
fn take_snapshot(
    ctx: &Context,
    data: &Data,
    channel_id: serenity::ChannelId,
    message_id: serenity::MessageId,
) -> Option<MessageSnapshot> {
    data.modlog.tracker().take(message_id.get()).or_else(|| {
        let cached = ctx
            .cache
            .message(channel_id, message_id)
            .map(|m| serenity::Message::clone(&m))?;
        snapshot_from_message(ctx, &cached)
    })
}

/// Remember every new guild message so later deletes/edits can be logged.
pub fn handle_message_create(ctx: &Context, data: &Data, message: &serenity::Message) {
    if let Some(snapshot) = snapshot_from_message(ctx, message) {
        data.modlog.tracker().remember(snapshot);
    }
}

pub async fn handle_message_delete(
    ctx: &Context,
    data: &Data,
    channel_id: serenity::ChannelId,
    message_id: serenity::MessageId,
    guild_id: Option<serenity::GuildId>,
) -> Result<()> {
    let guild_id = match guild_id {
        Some(id) => id.get(),
        None => return Ok(()),
    };

    let snapshot = match take_snapshot(ctx, data, channel_id, message_id) {
        Some(msg) if msg.guild_id == guild_id => msg,
        _ => {
            tracing::debug!(
                guild_id,
                message_id = message_id.get(),
                "Deleted message was never seen, skipping"
            );
            return Ok(());
        }
    };

    let feed = SerenityAuditFeed::new(ctx.http.clone());
    let sink = ChannelSink::new(ctx.http.clone());
    let outcome = data.modlog.handle_delete(snapshot, &feed, &sink).await?;
    tracing::debug!(guild_id, ?outcome, "Processed message delete");
    Ok(())
}

pub async fn handle_message_update(
    ctx: &Context,
    data: &Data,
    old: Option<&serenity::Message>,
    new: Option<&serenity::Message>,
    event: &serenity::MessageUpdateEvent,
) -> Result<()> {
    let guild_id = match event.guild_id {
        Some(id) => id.get(),
        None => return Ok(()),
    };

    // If we already tracked the message, use that snapshot as "before".
    let before = data
        .modlog
        .tracker()
        .get(event.id.get())
        .or_else(|| old.and_then(|m| snapshot_from_message(ctx, m)));

    let before = match before {
        Some(msg) if msg.guild_id == guild_id => msg,
        _ => return Ok(()),
    };

    // Partial updates only carry the fields that changed.
    let after = match new.and_then(|m| snapshot_from_message(ctx, m)) {
        Some(msg) => msg,
        None => MessageSnapshot {
            content: event
                .content
                .clone()
                .unwrap_or_else(|| before.content.clone()),
            attachments: event
                .attachments
                .as_ref()
                .map(|list| list.iter().map(|a| a.url.clone()).collect())
                .unwrap_or_else(|| before.attachments.clone()),
            ..before.clone()
        },
    };

    data.modlog.tracker().remember(after.clone());

    let sink = ChannelSink::new(ctx.http.clone());
    let outcome = data
        .modlog
        .handle_edit(MessageEdit { before, after }, &sink)
        .await?;
    tracing::debug!(guild_id, ?outcome, "Processed message edit");
    Ok(())
}

pub async fn handle_bulk_delete(
    ctx: &Context,
    data: &Data,
    channel_id: serenity::ChannelId,
    message_ids: &[serenity::MessageId],
    guild_id: Option<serenity::GuildId>,
) -> Result<()> {
    let guild_id = match guild_id {
        Some(id) => id.get(),
        None => return Ok(()),
    };

    let mut messages: Vec<MessageSnapshot> = message_ids
        .iter()
        .filter_map(|id| take_snapshot(ctx, data, channel_id, *id))
        .filter(|msg| msg.guild_id == guild_id)
        .collect();
    // Oldest first in the transcript.
    messages.sort_by_key(|msg| msg.message_id);

    let bulk = BulkDeletion {
        guild_id,
        channel_id: channel_id.get(),
        messages,
    };

    let feed = SerenityAuditFeed::new(ctx.http.clone());
    let sink = ChannelSink::new(ctx.http.clone());
    match data.modlog.handle_bulk_delete(bulk, &feed, &sink).await {
        Ok(outcome) => {
            tracing::debug!(
                guild_id,
                requested = message_ids.len(),
                ?outcome,
                "Processed bulk delete"
            );
            Ok(())
        }
        Err(ModLogError::MalformedEvent(reason)) => {
            tracing::debug!(guild_id, %reason, "Dropped bulk delete");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
