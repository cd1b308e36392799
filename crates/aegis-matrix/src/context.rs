//! Matrix context interface — re-exported from the shared pipeline.
//!
//! `MatrixAppContext` is an alias for `aegis_engine::pipeline::MessageContext`.
//! All channel adapters share the same trait, defined once in `aegis-engine`.

pub use aegis_engine::pipeline::MessageContext as MatrixAppContext;
