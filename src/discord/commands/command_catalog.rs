// Discord commands module.
// General-purpose commands live here; feature commands live next to their
// feature (see `discord/modlog/commands.rs`).

pub mod help;

// Bot presence management
pub mod presence;
