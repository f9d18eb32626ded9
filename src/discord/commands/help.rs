use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;
use std::collections::HashMap;

// Category definitions in display order
const CATEGORY_ORDER: &[&str] = &["Setup", "Exemptions", "Pausing", "Utilities"];

struct CommandMetadata {
    category: &'static str,
    priority: i32,
    usage: Option<&'static str>,
}

fn get_command_metadata(name: &str) -> CommandMetadata {
    let (category, priority, usage) = match name {
        "setup" => ("Setup", 100, Some("/setup <channel>")),
        "status" => ("Setup", 90, None),
        "testlog" => ("Setup", 80, None),
        "reset" => ("Setup", 10, None),
        "exempt" => ("Exemptions", 60, Some("/exempt <text>")),
        "removeexempt" => ("Exemptions", 55, Some("/removeexempt <text>")),
        "exemptrole" => ("Exemptions", 50, Some("/exemptrole <role>")),
        "pause" => ("Pausing", 40, Some("/pause <minutes>")),
        "unpause" => ("Pausing", 35, None),
        _ => ("Utilities", 0, None),
    };
    CommandMetadata {
        category,
        priority,
        usage,
    }
}

/// List all bot commands.
#[poise::command(slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let mut categories: HashMap<&str, Vec<(i32, String)>> = HashMap::new();

    for command in &ctx.framework().options().commands {
        if command.hide_in_help || command.name == "help" {
            continue;
        }

        let metadata = get_command_metadata(&command.name);
        let usage = metadata
            .usage
            .map(str::to_string)
            .unwrap_or_else(|| format!("/{}", command.name));
        let description = command
            .description
            .as_deref()
            .unwrap_or("No description provided.");

        categories
            .entry(metadata.category)
            .or_default()
            .push((metadata.priority, format!("• **{}** - {}", usage, description)));
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("📜 Logger Bot Commands")
        .description("Here's a list of all available commands:")
        .color(serenity::Color::BLUE);

    for category in CATEGORY_ORDER {
        if let Some(entries) = categories.get_mut(category) {
            // Sort by priority (descending)
            entries.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
            let lines: Vec<String> = entries.iter().map(|(_, s)| s.clone()).collect();
            embed = embed.field(*category, lines.join("\n"), false);
        }
    }

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
