// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "modlog/mod.rs"]
pub mod modlog;
