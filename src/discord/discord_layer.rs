// Discord layer - commands and event handlers.

use crate::core::modlog::ModLogService;
use crate::infra::modlog::JsonConfigStore;
use std::sync::Arc;

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "modlog/mod.rs"]
pub mod modlog;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Data that's shared across all commands.
/// This is where we store our services and configuration.
pub struct Data {
    pub modlog: Arc<ModLogService<JsonConfigStore>>,
}
