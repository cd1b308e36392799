//! Proactive Matrix delivery — sends scheduler-fired reminders to Matrix rooms.

use matrix_sdk::Client;
use tracing::warn;

use aegis_core::reminder::ReminderDelivery;

/// Background task that receives fired reminders and delivers them to Matrix rooms.
///
/// Spawned once in `adapter.rs` after the client has finished its initial sync.
/// Runs for the lifetime of the Matrix connection.
pub async fn run_matrix_delivery(
    client: Client,
    mut rx: tokio::sync::mpsc::Receiver<ReminderDelivery>,
) {
    while let Some(delivery) = rx.recv().await {
        let Some(room_id_str) = &delivery.room_id else {
            warn!(job_id = %delivery.job_id, "matrix delivery: no room_id stored in job action — skipping");
            continue;
        };

        let room_id = match matrix_sdk::ruma::RoomId::parse(room_id_str) {
            Ok(id) => id,
            Err(e) => {
                warn!(job_id = %delivery.job_id, room_id = %room_id_str, error = %e, "matrix delivery: invalid room id");
                continue;
            }
        };

        let Some(room) = client.get_room(&room_id) else {
            warn!(job_id = %delivery.job_id, room_id = %room_id_str, "matrix delivery: room not joined");
            continue;
        };

        let text = match &delivery.image_url {
            Some(url) => format!("{}\n{}", delivery.message, url),
            None => delivery.message.clone(),
        };

        tracing::debug!(job_id = %delivery.job_id, room_id = %room_id_str, "matrix: delivering reminder");

        crate::send::send_response(&room, &text, None).await;
        tracing::info!(job_id = %delivery.job_id, room_id = %room_id_str, "matrix: reminder delivered");
    }

    tracing::info!("matrix delivery task exiting (channel closed)");
}
