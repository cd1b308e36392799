//! Matrix room-message event handler registered on the `matrix-sdk` `Client`.

use std::sync::Arc;

use dashmap::DashMap;
use matrix_sdk::event_handler::Ctx;
use matrix_sdk::room::Room;
use matrix_sdk::ruma::events::room::encrypted::OriginalSyncRoomEncryptedEvent;
use matrix_sdk::ruma::events::room::message::{MessageType, OriginalSyncRoomMessageEvent};
use matrix_sdk::Client;
use serde_json::Value;
use tracing::warn;

use aegis_core::config::MatrixConfig;
use aegis_users::auth::AuthStore;

use crate::allow;
use crate::attach;
use crate::context::MatrixAppContext;
use crate::send;
use crate::typing::TypingHandle;

/// State injected into every event handler via `client.add_event_handler_context`.
pub struct MatrixHandlerState<C: MatrixAppContext + 'static> {
    pub ctx: Arc<C>,
    pub config: MatrixConfig,
    pub auth: Arc<AuthStore>,
    /// Image(s) received with no caption, waiting for the next text message
    /// from the same sender to consume them (§4.10 image-attach semantics).
    pub pending_images: DashMap<String, Vec<Value>>,
}

/// Main message handler registered on the `Client`.
///
/// Runs for every incoming room message event. Performs:
/// 1. Self-message filter
/// 2. Authorization handshake (deny-by-default, issues a code)
/// 3. DM guard
/// 4. `require_mention` guard for non-direct rooms
/// 5. User resolution via `UserResolver`
/// 6. Session key construction
/// 7. Slash command / `/auth` interception
/// 8. Image-attach-then-pending-caption handling
/// 9. Non-blocking LLM pipeline invocation with a typing indicator held for
///    the duration of the turn.
pub async fn handle_message<C: MatrixAppContext + 'static>(
    event: OriginalSyncRoomMessageEvent,
    room: Room,
    client: Client,
    state: Ctx<Arc<MatrixHandlerState<C>>>,
) {
    // 1. Ignore our own messages (echoes from the homeserver on send).
    if Some(&event.sender) == client.user_id().as_ref().map(|u| &**u) {
        return;
    }

    let sender_id = event.sender.to_string();

    // 2. Authorization handshake.
    if let Err(prompt) = allow::check(&state.auth, &sender_id) {
        send::send_response(&room, &prompt, None).await;
        return;
    }

    // 3. DM guard.
    let is_direct = room.is_direct().await.unwrap_or(false);
    if is_direct && !state.config.dm_allowed {
        return;
    }

    // 4. require_mention guard for non-direct rooms.
    if !is_direct && state.config.require_mention {
        let mentioned = client
            .user_id()
            .map(|me| event_mentions(&event.content.msgtype, me.as_str()))
            .unwrap_or(false);
        if !mentioned {
            return;
        }
    }

    // 5. Resolve Matrix user to an Aegis user id via UserResolver.
    let aegis_uid = match state.ctx.users().resolve("matrix", &sender_id) {
        Ok(resolved) => resolved.user().id.clone(),
        Err(_) => sender_id.clone(),
    };

    // 6. Build session key.
    let room_id = room.room_id().to_string();
    let session_key = format!("user:{aegis_uid}:matrix:{room_id}");

    // 7. Extract text body.
    let text = body_of(&event.content.msgtype).unwrap_or_default();

    if text.starts_with('/') {
        if let Some(response) = handle_local_command(&text, &state, &sender_id, &session_key).await
        {
            send::send_response(&room, &response, None).await;
            return;
        }

        if let Some(response) =
            aegis_engine::pipeline::slash::handle_slash_command(&text, state.ctx.as_ref()).await
        {
            send::send_response(&room, &response, None).await;
            return;
        }
    }

    // 8. Media extraction + pending-image/caption semantics.
    let incoming_media =
        attach::extract_media(&client, &event.content.msgtype, state.config.max_attachment_bytes)
            .await;

    if incoming_media.is_some() && text.trim().is_empty() {
        state
            .pending_images
            .insert(sender_id.clone(), incoming_media.unwrap());
        send::send_response(
            &room,
            "Got the image — reply with a caption and I'll take a look.",
            None,
        )
        .await;
        return;
    }

    let attachment_blocks = match state.pending_images.remove(&sender_id) {
        Some((_, mut pending)) => {
            if let Some(mut new_blocks) = incoming_media {
                pending.append(&mut new_blocks);
            }
            Some(pending)
        }
        None => incoming_media,
    };

    if text.trim().is_empty() && attachment_blocks.is_none() {
        return;
    }

    // 9. Spawn the LLM pipeline in a separate task (non-blocking).
    let ctx2 = Arc::clone(&state.ctx);
    let room2 = room.clone();
    let session_key2 = session_key.clone();
    let aegis_uid2 = aegis_uid.clone();
    let text2 = if text.trim().is_empty() {
        "[User sent attachment(s)]".to_string()
    } else {
        text
    };

    tokio::spawn(async move {
        use aegis_engine::pipeline::process_message_non_streaming;

        let typing = TypingHandle::start(room2.clone());

        let result = process_message_non_streaming(
            &ctx2,
            &session_key2,
            "matrix",
            &text2,
            None,
            None,
            None,
            None,
            attachment_blocks,
        )
        .await;

        typing.stop(room2.clone());

        match result {
            Ok(pm) => {
                send::send_response(&room2, &pm.content, None).await;
            }
            Err(e) => {
                warn!(error = %e, session = %session_key2, aegis_uid = %aegis_uid2, "matrix: LLM pipeline failed");
                send::send_response(&room2, &format!("Error: {e}"), None).await;
            }
        }
    });
}

/// Handler for events matrix-sdk could not decrypt (successfully decrypted
/// events are delivered as `OriginalSyncRoomMessageEvent` instead). Issues a
/// key request and informs the user the room key is missing.
pub async fn handle_undecryptable<C: MatrixAppContext + 'static>(
    event: OriginalSyncRoomEncryptedEvent,
    room: Room,
    _state: Ctx<Arc<MatrixHandlerState<C>>>,
) {
    warn!(
        room_id = %room.room_id(),
        event_id = %event.event_id,
        "matrix: undecryptable event, requesting room key"
    );
    if let Err(e) = room.request_room_key(&event).await {
        warn!(error = %e, "matrix: room key request failed");
    }
    send::send_response(
        &room,
        "I couldn't decrypt that message — the room key is missing. \
         I've requested it; if it doesn't arrive shortly, try re-sending from \
         a verified session.",
        None,
    )
    .await;
}

/// Extract the plain-text body from any message type that carries one
/// (text messages, and the caption/filename of media messages).
fn body_of(msgtype: &MessageType) -> Option<String> {
    match msgtype {
        MessageType::Text(c) => Some(c.body.clone()),
        MessageType::Notice(c) => Some(c.body.clone()),
        MessageType::Emote(c) => Some(c.body.clone()),
        MessageType::Image(c) => Some(c.body.clone()).filter(|b| !is_bare_filename(b)),
        MessageType::File(c) => Some(c.body.clone()).filter(|b| !is_bare_filename(b)),
        MessageType::Video(c) => Some(c.body.clone()).filter(|b| !is_bare_filename(b)),
        MessageType::Audio(c) => Some(c.body.clone()).filter(|b| !is_bare_filename(b)),
        _ => None,
    }
}

/// Media messages with no real caption carry the original filename as
/// `body` — that's not a caption, so treat it as "no text" for the
/// image-attach-then-pending-caption flow.
fn is_bare_filename(body: &str) -> bool {
    body.rsplit('.').next().map(|ext| ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric())).unwrap_or(false)
        && !body.contains(' ')
}

/// Whether a message event's content mentions `user_id`.
fn event_mentions(msgtype: &MessageType, user_id: &str) -> bool {
    if let MessageType::Text(c) = msgtype {
        if let Some(mentions) = &c.mentions {
            if mentions.user_ids.iter().any(|u| u.as_str() == user_id) {
                return true;
            }
        }
        return c.body.contains(user_id);
    }
    false
}

/// Handle commands local to the Matrix adapter (not in the shared slash handler).
async fn handle_local_command<C: MatrixAppContext + 'static>(
    text: &str,
    state: &MatrixHandlerState<C>,
    sender_id: &str,
    session_key: &str,
) -> Option<String> {
    let trimmed = text.trim();

    if trimmed.eq_ignore_ascii_case("/clear") {
        let history = state
            .ctx
            .memory()
            .get_history(session_key, 10_000)
            .unwrap_or_default();
        let count = history.len();
        let _ = state.ctx.memory().clear_session(session_key, "matrix");
        return Some(format!(
            "Session cleared. Removed {count} messages. Starting a fresh conversation."
        ));
    }

    if trimmed.eq_ignore_ascii_case("/whoami") {
        return Some(format!(
            "Session key: `{session_key}`\n\nProvider: `{}`",
            state.ctx.agent().provider().name()
        ));
    }

    if let Some(code) = trimmed.strip_prefix("/auth ") {
        return Some(match allow::redeem(&state.auth, code.trim()) {
            Ok((platform, user_id)) => {
                format!("Authorized {user_id} on {platform}.")
            }
            Err(e) => format!("Couldn't redeem that code: {e}"),
        });
    }

    let _ = sender_id;
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_format() {
        let key = format!("user:{}:matrix:{}", "abc123", "!roomid:example.org");
        assert!(key.starts_with("user:abc123:matrix:"));
        assert!(key.ends_with("!roomid:example.org"));
    }

    #[test]
    fn bare_filename_detected() {
        assert!(is_bare_filename("photo.jpg"));
        assert!(is_bare_filename("IMG_0001.png"));
        assert!(!is_bare_filename("look at this!"));
        assert!(!is_bare_filename("a.b c"));
    }
}
