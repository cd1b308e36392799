//! `aegis-users` — cross-channel identity resolution and chat-platform
//! authorization.
//!
//! [`auth`] holds the per-platform [`auth::AuthStore`] (§4.10's authorization
//! handshake: unauthorized identities are issued a short code, redeemed
//! through the web UI or an `/auth` slash-command). `db`/`identity`/
//! `resolver`/`permissions`/`types` hold the SQLite-backed identity/role
//! model retained from the prior iteration of this crate for cross-channel
//! identity linking; callers that only need the authorization handshake can
//! depend on [`auth`] alone.

pub mod auth;
pub mod db;
pub mod error;
pub mod identity;
pub mod permissions;
pub mod resolver;
pub mod types;

pub use auth::{AuthCheck, AuthStore, AuthorizedIdentity, PendingCode};
pub use error::{Result, UserError};
pub use resolver::{ResolvedUser, UserResolver};
pub use types::{ContentFilter, User, UserIdentity};
