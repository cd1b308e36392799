//! Discord tool registry — re-exported from the shared pipeline in aegis-engine.
//!
//! All tool implementations (execute_command, bash, file tools) now live in
//! `aegis-engine/src/tools/` and are generic over `MessageContext`. This module
//! is a thin re-export so external consumers keep a stable import path if needed.

pub use aegis_engine::tools::build::{build_tools, tool_definitions};
