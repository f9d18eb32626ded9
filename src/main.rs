// This is the entry point of the moderation log bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (config file store)
// - `discord/` = Discord-specific adapters (commands, events, audit log, sink)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::modlog::{AttributionPolicy, ModLogService};
use crate::discord::commands::presence;
use crate::discord::modlog::events as modlog_events;
use crate::discord::{Data, Error};
use crate::infra::modlog::JsonConfigStore;
use poise::serenity_prelude as serenity;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "data/config.json";

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            // Snapshot the message so delete/edit events are reliable even when
            // Serenity's cache misses it.
            modlog_events::handle_message_create(ctx, data, new_message);
        }
        serenity::FullEvent::MessageDelete {
            channel_id,
            deleted_message_id,
            guild_id,
        } => {
            if let Err(e) = modlog_events::handle_message_delete(
                ctx,
                data,
                *channel_id,
                *deleted_message_id,
                *guild_id,
            )
            .await
            {
                tracing::error!("Error handling message delete: {}", e);
            }
        }
        serenity::FullEvent::MessageDeleteBulk {
            channel_id,
            multiple_deleted_messages_ids,
            guild_id,
        } => {
            if let Err(e) = modlog_events::handle_bulk_delete(
                ctx,
                data,
                *channel_id,
                multiple_deleted_messages_ids,
                *guild_id,
            )
            .await
            {
                tracing::error!("Error handling bulk message delete: {}", e);
            }
        }
        serenity::FullEvent::MessageUpdate {
            old_if_available,
            new,
            event,
        } => {
            if let Err(e) = modlog_events::handle_message_update(
                ctx,
                data,
                old_if_available.as_ref(),
                new.as_ref(),
                event,
            )
            .await
            {
                tracing::error!("Error handling message update: {}", e);
            }
        }
        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!("Bot logged in as {}", data_about_bot.user.name);
        }

        _ => {}
    }

    Ok(())
}

fn attribution_policy_from_env() -> AttributionPolicy {
    let mut policy = AttributionPolicy::default();
    if let Some(ms) = std::env::var("MODLOG_SETTLE_DELAY_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
    {
        policy.settle_delay = Duration::from_millis(ms);
    }
    policy
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Get Discord bot token from environment
    let token = std::env::var("DISCORD_TOKEN")
        .or_else(|_| std::env::var("DISCORD_BOT_TOKEN"))
        .expect(
            "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
        );

    let config_path = std::env::var("MODLOG_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).expect("Failed to create config directory");
        }
    }

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let config_store = JsonConfigStore::load(&config_path)
        .await
        .expect("Failed to load moderation log config");
    let modlog_service = Arc::new(ModLogService::new(
        config_store,
        attribution_policy_from_env(),
    ));

    // Create the data structure that will be shared across all commands
    let data = Data {
        modlog: Arc::clone(&modlog_service),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================
    // Configure the poise framework with our commands and settings.

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_MODERATION;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            // Register all our commands here
            commands: vec![
                discord::modlog::commands::setup(),
                discord::modlog::commands::pause(),
                discord::modlog::commands::unpause(),
                discord::modlog::commands::exempt(),
                discord::modlog::commands::removeexempt(),
                discord::modlog::commands::exemptrole(),
                discord::modlog::commands::reset(),
                discord::modlog::commands::status(),
                discord::modlog::commands::testlog(),
                discord::commands::help::help(),
            ],
            // Event handler for messages and other events
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!("Bot is starting up...");

                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                tracing::info!(
                    commands = framework.options().commands.len(),
                    "Commands registered"
                );
                presence::on_ready(ctx, ready);

                Ok(data)
            })
        })
        .build();

    // Create the client and start the bot
    let mut settings = serenity::cache::Settings::default();
    settings.max_messages = 10000;

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .cache_settings(settings)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}
