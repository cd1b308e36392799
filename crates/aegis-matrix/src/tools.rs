//! Tool re-export for the Matrix adapter.
//!
//! All tools are shared — implemented once in `aegis-engine` and re-exported here
//! following the same thin-wrapper pattern as `aegis-discord/src/tools.rs`.

pub use aegis_engine::tools::build::build_tools;
