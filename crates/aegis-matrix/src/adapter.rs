//! Matrix channel adapter.
//!
//! Wraps a `matrix-sdk` `Client` and drives the sync loop until the process
//! exits. Reconnects automatically on transport errors (matrix-sdk's sync
//! loop itself retries transient failures; we only need to restart after a
//! hard error bubbles out of `sync()`).

use std::sync::Arc;

use dashmap::DashMap;
use matrix_sdk::config::SyncSettings;
use matrix_sdk::Client;
use tracing::{error, info, warn};

use aegis_core::config::MatrixConfig;
use aegis_core::reminder::ReminderDelivery;
use aegis_core::types::ChannelOutbound;
use aegis_users::auth::AuthStore;

use crate::context::MatrixAppContext;
use crate::handler::{handle_message, handle_undecryptable, MatrixHandlerState};

/// Matrix channel adapter.
pub struct MatrixAdapter<C: MatrixAppContext + 'static> {
    ctx: Arc<C>,
    config: MatrixConfig,
}

impl<C: MatrixAppContext + 'static> MatrixAdapter<C> {
    pub fn new(config: &MatrixConfig, ctx: Arc<C>) -> Self {
        Self {
            ctx,
            config: config.clone(),
        }
    }

    /// Log in, register handlers, and drive the sync loop.
    ///
    /// Never returns — runs for the lifetime of the process. Reconnects with
    /// a 30s backoff if the initial login fails, and restarts the sync loop
    /// with a 5s backoff if it exits with an error.
    ///
    /// If `delivery_rx` is `Some`, a proactive reminder delivery task is spawned.
    /// If `outbound_rx` is `Some`, a cross-channel outbound delivery task is spawned.
    pub async fn run(
        self,
        delivery_rx: Option<tokio::sync::mpsc::Receiver<ReminderDelivery>>,
        outbound_rx: Option<tokio::sync::mpsc::Receiver<ChannelOutbound>>,
    ) {
        let client = loop {
            match self.build_and_login().await {
                Ok(c) => break c,
                Err(e) => {
                    error!("Matrix: login failed ({e}), retrying in 30s");
                    tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                }
            }
        };

        let auth_dir = self.config.store_path.join("auth");
        let auth = match AuthStore::load(&auth_dir) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!("Matrix: failed to load authorization store ({e}), refusing to start");
                return;
            }
        };

        let state = Arc::new(MatrixHandlerState {
            ctx: Arc::clone(&self.ctx),
            config: self.config.clone(),
            auth,
            pending_images: DashMap::new(),
        });

        client.add_event_handler_context(Arc::clone(&state));
        client.add_event_handler(handle_message::<C>);
        client.add_event_handler(handle_undecryptable::<C>);

        if let Some(rx) = delivery_rx {
            let client2 = client.clone();
            tokio::spawn(crate::proactive::run_matrix_delivery(client2, rx));
        }

        if let Some(rx) = outbound_rx {
            let client2 = client.clone();
            tokio::spawn(run_outbound_delivery(client2, rx));
        }

        info!("Matrix: performing initial sync");
        if let Err(e) = client.sync_once(SyncSettings::default()).await {
            error!("Matrix: initial sync failed: {e}");
            return;
        }

        loop {
            info!("Matrix: starting sync loop");

            if let Err(e) = client.sync(SyncSettings::default()).await {
                warn!("Matrix: sync loop stopped with error ({e}), restarting in 5s");
            } else {
                warn!("Matrix: sync loop stopped cleanly, restarting in 5s");
            }

            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        }
    }

    /// Build a `Client` against the configured homeserver and restore or
    /// create a session, persisting crypto/session state to `store_path`.
    async fn build_and_login(&self) -> Result<Client, crate::error::MatrixError> {
        let client = Client::builder()
            .homeserver_url(&self.config.homeserver_url)
            .sqlite_store(&self.config.store_path, None)
            .build()
            .await?;

        if client.matrix_auth().logged_in() {
            return Ok(client);
        }

        let mut builder = client
            .matrix_auth()
            .login_username(&self.config.user_id, &self.config.password)
            .initial_device_display_name("aegis-matrix");

        if let Some(device_id) = &self.config.device_id {
            builder = builder.device_id(device_id);
        }

        builder.send().await?;
        Ok(client)
    }
}

/// Background task that delivers cross-channel outbound messages to Matrix rooms.
async fn run_outbound_delivery(client: Client, mut rx: tokio::sync::mpsc::Receiver<ChannelOutbound>) {
    info!("Matrix outbound delivery task started");
    while let Some(outbound) = rx.recv().await {
        let room_id = match matrix_sdk::ruma::RoomId::parse(&outbound.recipient) {
            Ok(id) => id,
            Err(_) => {
                warn!(recipient = %outbound.recipient, "matrix outbound: invalid room id");
                continue;
            }
        };

        let Some(room) = client.get_room(&room_id) else {
            warn!(recipient = %outbound.recipient, "matrix outbound: room not joined");
            continue;
        };

        crate::send::send_response(&room, &outbound.message, None).await;
    }
    warn!("Matrix outbound delivery task ended (channel closed)");
}
