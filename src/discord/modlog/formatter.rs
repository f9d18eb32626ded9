use crate::core::modlog::{LogRecord, RecordKind};
use poise::serenity_prelude::{self as serenity, CreateEmbed};

pub fn format_record(record: &LogRecord) -> CreateEmbed {
    let (title, color) = match record.kind {
        RecordKind::MessageDeleted => ("🗑 Message Deleted", serenity::Color::RED),
        RecordKind::MessageEdited => ("✏️ Message Edited", serenity::Color::ORANGE),
        RecordKind::BulkDelete => ("🧹 Bulk Message Delete", serenity::Color::DARK_RED),
        RecordKind::Test => ("🧪 Test Log", serenity::Color::new(0x2ECC71)),
    };

    let mut embed = CreateEmbed::default().title(title).color(color);

    if let Some(description) = &record.description {
        embed = embed.description(description);
    }

    for field in &record.fields {
        embed = embed.field(&field.name, &field.value, field.inline);
    }

    match serenity::Timestamp::from_unix_timestamp(record.timestamp.timestamp()) {
        Ok(ts) => embed.timestamp(ts),
        Err(_) => embed.timestamp(serenity::Timestamp::now()),
    }
}
