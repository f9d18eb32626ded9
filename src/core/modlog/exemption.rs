use super::modlog_models::{MessageSnapshot, SpaceConfig};

/// Which kind of event is being checked. Text exemptions only cover deletions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Deletion,
    Edit,
}

/// True if the message must not be logged for this guild.
///
/// Text matching is exact and case-sensitive.
pub fn is_exempt(config: &SpaceConfig, message: &MessageSnapshot, kind: EventKind) -> bool {
    if message
        .author_roles
        .iter()
        .any(|role| config.exempt_roles.contains(role))
    {
        return true;
    }

    kind == EventKind::Deletion
        && message.has_content()
        && config.exempt_texts.iter().any(|t| *t == message.content)
}
