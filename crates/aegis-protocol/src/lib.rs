//! `aegis-protocol` — WS-RPC wire frames and handshake shapes used by
//! `aegis-gateway`'s websocket surface.

pub mod frames;
pub mod handshake;
pub mod methods;

pub use frames::{ErrorShape, EventFrame, InboundFrame, ReqFrame, ResFrame, StateVersion};
pub use handshake::{AuthPayload, ClientInfo, ConnectChallenge, ConnectParams, HelloOk};
