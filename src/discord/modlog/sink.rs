use super::formatter::format_record;
use super::http_status;
use crate::core::modlog::{LogRecord, LogSink, SinkError};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Posts records as embeds (plus an optional text file) to guild channels.
pub struct ChannelSink {
    http: Arc<serenity::Http>,
}

impl ChannelSink {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl LogSink for ChannelSink {
    async fn send(&self, channel_id: u64, record: &LogRecord) -> Result<(), SinkError> {
        let mut message = serenity::CreateMessage::new().embed(format_record(record));
        if let Some(file) = &record.attachment {
            message = message.add_file(serenity::CreateAttachment::bytes(
                file.content.clone().into_bytes(),
                file.filename.clone(),
            ));
        }

        serenity::ChannelId::new(channel_id)
            .send_message(&self.http, message)
            .await
            .map(|_| ())
            .map_err(|e| match http_status(&e) {
                Some(403) => SinkError::AccessDenied,
                Some(404) => SinkError::NotFound,
                _ => SinkError::Other(e.to_string()),
            })
    }
}
