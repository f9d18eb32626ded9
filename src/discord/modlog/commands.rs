// Moderation log slash commands.
//
// Each command maps onto a single `ModLogService` call. A failed save is
// reported back to the caller so they know the change did not stick.

use super::sink::ChannelSink;
use crate::core::modlog::pause_gate::format_remaining;
use crate::core::modlog::{DispatchOutcome, StoreError};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

async fn reply(ctx: Context<'_>, text: impl Into<String>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content(text)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

async fn report_failure(ctx: Context<'_>, err: StoreError) -> Result<(), Error> {
    tracing::error!(
        command = %ctx.command().name,
        error = %err,
        "Failed to save moderation log config"
    );
    reply(
        ctx,
        format!("❌ Could not save the configuration, nothing was changed: {}", err),
    )
    .await
}

fn guild_id(ctx: &Context<'_>) -> Result<u64, Error> {
    Ok(ctx.guild_id().ok_or("Must be used in a server")?.get())
}

/// Add a channel that receives moderation logs.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn setup(
    ctx: Context<'_>,
    #[description = "Channel to log to"]
    #[channel_types("Text", "News")]
    channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;
    let channel_id = channel.id.get();

    match ctx.data().modlog.add_channel(guild_id, channel_id).await {
        Ok(true) => reply(ctx, format!("✅ Added <#{}> as a log channel.", channel_id)).await,
        Ok(false) => reply(ctx, format!("⚠️ <#{}> is already a log channel.", channel_id)).await,
        Err(e) => report_failure(ctx, e).await,
    }
}

/// Pause logging for a number of minutes.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn pause(
    ctx: Context<'_>,
    #[description = "How long to pause, in minutes"]
    #[min = 1]
    minutes: u32,
) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;

    match ctx.data().modlog.pause_for(guild_id, minutes).await {
        Ok(until) => {
            reply(
                ctx,
                format!(
                    "⏸️ Logging paused for {} minutes (until <t:{}:t>).",
                    minutes,
                    until.timestamp()
                ),
            )
            .await
        }
        Err(e) => report_failure(ctx, e).await,
    }
}

/// Resume logging immediately.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn unpause(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;

    match ctx.data().modlog.unpause(guild_id).await {
        Ok(()) => reply(ctx, "▶️ Logging unpaused.").await,
        Err(e) => report_failure(ctx, e).await,
    }
}

/// Never log deletions of messages with exactly this text.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn exempt(
    ctx: Context<'_>,
    #[description = "Exact message text (case-sensitive)"] text: String,
) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;

    match ctx.data().modlog.add_exempt_text(guild_id, text.clone()).await {
        Ok(true) => reply(ctx, format!("✅ Added `{}` as exempt text.", text)).await,
        Ok(false) => reply(ctx, format!("⚠️ `{}` is already exempt.", text)).await,
        Err(e) => report_failure(ctx, e).await,
    }
}

/// Remove an exempt text.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn removeexempt(
    ctx: Context<'_>,
    #[description = "Exempt text to remove"] text: String,
) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;

    match ctx.data().modlog.remove_exempt_text(guild_id, &text).await {
        Ok(true) => reply(ctx, format!("✅ Removed `{}` from exempt texts.", text)).await,
        Ok(false) => reply(ctx, "⚠️ That text was not exempt.").await,
        Err(e) => report_failure(ctx, e).await,
    }
}

/// Never log messages from members with this role.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn exemptrole(
    ctx: Context<'_>,
    #[description = "Role to exempt"] role: serenity::Role,
) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;
    let role_id = role.id.get();

    match ctx.data().modlog.add_exempt_role(guild_id, role_id).await {
        Ok(true) => reply(ctx, format!("✅ Added <@&{}> as an exempt role.", role_id)).await,
        Ok(false) => reply(ctx, format!("⚠️ <@&{}> is already exempt.", role_id)).await,
        Err(e) => report_failure(ctx, e).await,
    }
}

/// Reset all moderation log configuration for this server.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn reset(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;

    match ctx.data().modlog.reset(guild_id).await {
        Ok(()) => reply(ctx, "🔄 Reset complete. Please run /setup again.").await,
        Err(e) => report_failure(ctx, e).await,
    }
}

fn join_or_none(items: Vec<String>) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

/// Show log channels, exemptions and pause state.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;

    let status = match ctx.data().modlog.status(guild_id).await {
        Ok(status) => status,
        Err(e) => return report_failure(ctx, e).await,
    };
    let config = &status.config;

    let mut embed = serenity::CreateEmbed::default()
        .title("⚙️ Logger Status")
        .color(serenity::Color::BLUE)
        .field(
            "Log Channels",
            join_or_none(config.channels.iter().map(|c| format!("<#{}>", c)).collect()),
            false,
        )
        .field(
            "Exempt Roles",
            join_or_none(config.exempt_roles.iter().map(|r| format!("<@&{}>", r)).collect()),
            false,
        )
        .field(
            "Exempt Texts",
            join_or_none(config.exempt_texts.iter().map(|t| format!("`{}`", t)).collect()),
            false,
        );

    if let Some(remaining) = status.pause_remaining {
        embed = embed.field(
            "Paused",
            format!("{} remaining", format_remaining(remaining)),
            false,
        );
    }

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Send a test entry to every log channel.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn testlog(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;
    let sink = ChannelSink::new(ctx.serenity_context().http.clone());

    let outcome = ctx.data().modlog.send_test_record(guild_id, &sink).await?;
    let text = match outcome {
        DispatchOutcome::Paused => "⏸️ Logging is paused, test log not sent.".to_string(),
        DispatchOutcome::Delivered(report) if report.delivered + report.failed == 0 => {
            "⚠️ No log channels configured. Use /setup first.".to_string()
        }
        DispatchOutcome::Delivered(report) if report.failed > 0 => format!(
            "⚠️ Test log sent to {} channel(s), {} failed.",
            report.delivered, report.failed
        ),
        _ => "✅ Test log sent.".to_string(),
    };
    reply(ctx, text).await
}
