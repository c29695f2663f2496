//! The service loop
//!
//! One task owns the engine. Timer ticks, bridge events and IPC requests are
//! multiplexed with `tokio::select!`, so every handler runs to completion
//! before the next one starts.

use anyhow::{Context, Result};
use blockd_api::{ClientRole, Event, EventPayload};
use blockd_config::Policy;
use blockd_core::{
    CoreEvent, Engine, EngineDeps, ProblemSupplier, RandomProblemSupplier,
};
use blockd_ipc::{IpcServer, ServerMessage};
use blockd_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use blockd_util::{ClientId, SystemClock};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::bridge::{BrowserBridge, RULES_FILE};
use crate::dispatch;

/// Database file inside the data dir
pub const DB_FILE: &str = "blockd.db";

/// Everything needed to start the service
pub struct ServiceOptions {
    pub policy: Policy,
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
    pub problems: Box<dyn ProblemSupplier>,
}

impl ServiceOptions {
    /// Socket and data dir come from the policy; problems are random
    pub fn from_policy(policy: Policy) -> Self {
        Self {
            socket_path: policy.service.socket_path.clone(),
            data_dir: policy.service.data_dir.clone(),
            policy,
            problems: Box::new(RandomProblemSupplier::new()),
        }
    }
}

/// Main service state
pub struct Service {
    engine: Engine,
    bridge: Arc<BrowserBridge>,
    ipc: Arc<IpcServer>,
    store: Arc<dyn Store>,
    tick_interval: Duration,
    roles: HashMap<ClientId, ClientRole>,
}

impl Service {
    /// Open the store, bind the socket and build the engine
    pub async fn new(options: ServiceOptions) -> Result<Self> {
        let ServiceOptions {
            policy,
            socket_path,
            data_dir,
            problems,
        } = options;

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join(DB_FILE);
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start()
            .await
            .with_context(|| format!("Failed to bind socket {:?}", socket_path))?;

        let bridge = Arc::new(BrowserBridge::new(Some(data_dir.join(RULES_FILE))));
        let tick_interval = policy.service.tick_interval;

        let engine = Engine::new(
            policy,
            EngineDeps {
                clock: Arc::new(SystemClock),
                store: store.clone(),
                installer: bridge.clone(),
                tabs: bridge.clone(),
                problems,
            },
        );

        Ok(Self {
            engine,
            bridge,
            ipc: Arc::new(ipc),
            store,
            tick_interval,
            roles: HashMap::new(),
        })
    }

    pub fn socket_path(&self) -> PathBuf {
        self.ipc.socket_path().to_path_buf()
    }

    /// Serve until `shutdown` resolves
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let mut ipc_messages = self
            .ipc
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;
        let mut bridge_events = self
            .bridge
            .take_event_receiver()
            .context("Bridge event receiver already taken")?;

        let ipc_accept = self.ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        // A failed first install leaves the engine running; ticks retry it
        if let Err(e) = self.engine.start().await {
            warn!(error = %e, "Engine started without installed rules");
        }

        let mut tick_timer = tokio::time::interval(self.tick_interval);
        tokio::pin!(shutdown);

        info!("Service running");

        loop {
            tokio::select! {
                _ = &mut shutdown => break,

                _ = tick_timer.tick() => {
                    if let Err(e) = self.engine.tick().await {
                        warn!(error = %e, "Tick failed");
                    }
                    self.publish_core_events();
                }

                Some(payload) = bridge_events.recv() => {
                    self.ipc.broadcast_event(Event::new(payload));
                }

                Some(msg) = ipc_messages.recv() => {
                    self.handle_ipc_message(msg).await;
                }
            }
        }

        info!("Shutting down blockdd");

        self.engine.shutdown();
        self.publish_core_events();
        self.ipc.broadcast_event(Event::new(EventPayload::Shutdown));
        self.ipc.shutdown();

        info!("Shutdown complete");
        Ok(())
    }

    async fn handle_ipc_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                let role = self
                    .roles
                    .get(&client_id)
                    .copied()
                    .unwrap_or(ClientRole::Observer);

                let response = dispatch::handle_request(
                    &mut self.engine,
                    &self.bridge,
                    &client_id,
                    role,
                    request,
                )
                .await;

                if let Err(e) = self.ipc.send_response(&client_id, response).await {
                    debug!(client_id = %client_id, error = %e, "Response not delivered");
                }

                self.publish_core_events();
            }

            ServerMessage::ClientConnected { client_id, info } => {
                info!(
                    client_id = %client_id,
                    role = ?info.role,
                    uid = ?info.uid,
                    "Client connected"
                );

                self.audit(AuditEventType::ClientConnected {
                    client_id: client_id.to_string(),
                    role: format!("{:?}", info.role),
                    uid: info.uid,
                });
                self.roles.insert(client_id, info.role);
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");

                self.audit(AuditEventType::ClientDisconnected {
                    client_id: client_id.to_string(),
                });
                self.roles.remove(&client_id);
            }
        }
    }

    fn publish_core_events(&mut self) {
        for event in self.engine.drain_events() {
            self.ipc.broadcast_event(Event::new(event_payload(event)));
        }
    }

    fn audit(&self, event: AuditEventType) {
        if let Err(e) = self.store.append_audit(AuditEvent::new(event)) {
            warn!(error = %e, "Failed to append audit event");
        }
    }
}

/// Wire form of an engine event
pub fn event_payload(event: CoreEvent) -> EventPayload {
    match event {
        CoreEvent::FocusModeChanged(view) => EventPayload::FocusModeChanged(view),
        CoreEvent::AccessGranted { domain, expires_at } => {
            EventPayload::AccessGranted { domain, expires_at }
        }
        CoreEvent::AccessRevoked { domain, reason } => {
            debug!(domain = %domain, reason = ?reason, "Access revoked");
            EventPayload::AccessRevoked { domain }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockd_api::FocusStatusView;
    use blockd_store::RevokeReason;
    use blockd_util::Domain;

    #[test]
    fn core_events_map_to_wire_events() {
        let payload = event_payload(CoreEvent::AccessRevoked {
            domain: Domain::parse("reddit.com").unwrap(),
            reason: RevokeReason::Expired,
        });
        assert!(matches!(payload, EventPayload::AccessRevoked { domain } if domain.as_str() == "reddit.com"));

        let payload = event_payload(CoreEvent::FocusModeChanged(FocusStatusView::inactive()));
        assert!(matches!(payload, EventPayload::FocusModeChanged(v) if !v.active));
    }
}
