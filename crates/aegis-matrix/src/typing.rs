//! Matrix typing indicator — re-asserted every 15 seconds.
//!
//! Matrix typing notices carry their own server-side TTL (commonly 20-30s
//! depending on homeserver); a 15s re-assert loop keeps the indicator live
//! through long tool rounds and debate turns without racing the TTL.
//! `TypingHandle::stop()` aborts the loop and clears the indicator.

use std::time::Duration;

use matrix_sdk::room::Room;

/// Handle to a background typing indicator task.
///
/// Call `stop()` once the response is ready so the indicator clears promptly
/// instead of waiting out its TTL.
pub struct TypingHandle(tokio::task::JoinHandle<()>);

impl TypingHandle {
    /// Spawn the typing indicator loop for `room`.
    ///
    /// Asserts typing=true immediately, then every 15 seconds.
    pub fn start(room: Room) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                let _ = room.typing_notice(true).await;
                tokio::time::sleep(Duration::from_secs(15)).await;
            }
        });
        TypingHandle(handle)
    }

    /// Abort the typing indicator loop and clear the indicator.
    pub fn stop(self, room: Room) {
        self.0.abort();
        tokio::spawn(async move {
            let _ = room.typing_notice(false).await;
        });
    }
}
