//! Discord context interface — re-exported from the shared pipeline.
//!
//! `DiscordAppContext` is now an alias for `aegis_engine::pipeline::MessageContext`.
//! All channel adapters share the same trait, defined once in `aegis-engine` to
//! avoid circular dependencies.

pub use aegis_engine::pipeline::MessageContext as DiscordAppContext;
