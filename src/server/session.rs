use std::sync::Arc;

use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::watch;

use crate::protocol::{Frame, PacketId, ReceivedMessage, WriteMessage, parse_raw_string, read_frame};
use crate::server::client::ClientHandle;
use crate::server::worker::QueueEntry;
use crate::server::{ClientInfoEvent, ServerInner};
use crate::{OpenRgbResult, PROTOCOL_VERSION};

/// Frame dispatch loop for one connected client.
pub(crate) struct Session {
    server: Arc<ServerInner>,
    client: Arc<ClientHandle>,
    reader: OwnedReadHalf,
    shutdown: watch::Receiver<bool>,
}

impl Session {
    pub fn new(
        server: Arc<ServerInner>,
        client: Arc<ClientHandle>,
        reader: OwnedReadHalf,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            server,
            client,
            reader,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let addr = self.client.addr();
        loop {
            let frame = tokio::select! {
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                frame = read_frame(
                    &mut self.reader,
                    self.server.config.recv_timeout,
                    self.server.config.max_packet_size,
                ) => frame,
            };
            match frame {
                Ok(Some(frame)) => {
                    if let Err(e) = self.dispatch(frame).await {
                        // reply path failed, the client is gone
                        tracing::debug!("Client {addr} send failed: {e}");
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    // logged once per session: bad magic, oversize frame or
                    // a socket error all terminate the connection
                    tracing::info!("Terminating client {addr}: {e}");
                    break;
                }
            }
        }
        self.server.remove_client(&self.client);
        self.server
            .client_callbacks
            .signal(&ClientInfoEvent::Disconnected(self.client.info()));
        tracing::debug!("Client {addr} disconnected");
    }

    /// Handles one frame. Only a failed reply write is an error; malformed
    /// payloads are discarded and the session stays up.
    async fn dispatch(&mut self, frame: Frame) -> OpenRgbResult<()> {
        let Ok(packet_id) = PacketId::try_from(frame.packet_id) else {
            tracing::warn!(
                "Client {} sent unknown packet type {}, skipping",
                self.client.addr(),
                frame.packet_id
            );
            return Ok(());
        };

        if packet_id.is_controller_write() {
            self.enqueue_controller_write(packet_id, frame).await;
            return Ok(());
        }

        match packet_id {
            PacketId::RequestProtocolVersion => {
                let mut msg = ReceivedMessage::new(&frame.data, 0);
                let client_version = msg.read_u32().unwrap_or(0);
                let negotiated = client_version.min(PROTOCOL_VERSION);
                self.client.set_protocol_version(negotiated);
                tracing::debug!(
                    "Client {} negotiated protocol version {negotiated}",
                    self.client.addr()
                );
                self.reply(frame.device_id, packet_id, &negotiated.to_le_bytes())
                    .await
            }
            PacketId::SetClientName => {
                match parse_raw_string(&frame.data) {
                    Ok(name) => {
                        self.client.set_name(name);
                        self.server
                            .client_callbacks
                            .signal(&ClientInfoEvent::NameChanged(self.client.info()));
                    }
                    Err(e) => tracing::warn!("Discarding bad client name: {e}"),
                }
                Ok(())
            }
            PacketId::RequestControllerCount => {
                let count = self.server.registry.len() as u32;
                self.reply(frame.device_id, packet_id, &count.to_le_bytes())
                    .await
            }
            PacketId::RequestControllerData => self.reply_controller_data(frame).await,
            PacketId::RequestProfileList => {
                let names = match self.server.profile_manager() {
                    Some(pm) => pm.list_profiles(),
                    None => Vec::new(),
                };
                let mut buf = WriteMessage::new(self.client.protocol_version());
                buf.write_len_prefixed(&names)?;
                self.reply(frame.device_id, packet_id, buf.bytes()).await
            }
            PacketId::RequestLoadProfile
            | PacketId::RequestSaveProfile
            | PacketId::RequestDeleteProfile => {
                self.handle_profile_op(packet_id, &frame.data);
                Ok(())
            }
            PacketId::RequestPluginList => {
                let payload = {
                    let plugins = self.server.plugins.lock().clone();
                    super::plugin::encode_plugin_list(&plugins, self.client.protocol_version())?
                };
                self.reply(frame.device_id, packet_id, &payload).await
            }
            PacketId::PluginSpecific => self.reply_plugin_specific(frame).await,
            PacketId::DeviceListUpdated => {
                // server-to-client only; nothing to do
                Ok(())
            }
            other => {
                tracing::warn!("Unhandled packet {other:?} from {}", self.client.addr());
                Ok(())
            }
        }
    }

    async fn reply(&self, device_id: u32, packet_id: PacketId, data: &[u8]) -> OpenRgbResult<()> {
        self.client.send_frame(device_id, packet_id, data).await
    }

    async fn reply_controller_data(&self, frame: Frame) -> OpenRgbResult<()> {
        let requested = match frame.data.len() >= 4 {
            true => {
                let mut msg = ReceivedMessage::new(&frame.data, 0);
                Some(msg.read_u32()?)
            }
            false => None,
        };
        // negotiated clients may pin an older version in the request payload;
        // clients that skipped the handshake get the payload version unless
        // the legacy workaround pins them to version 0 framing
        let version = if self.client.has_negotiated() {
            let client_version = self.client.protocol_version();
            requested.map_or(client_version, |r| r.min(client_version))
        } else if self.server.legacy_workaround() {
            0
        } else {
            requested.map_or(0, |r| r.min(PROTOCOL_VERSION))
        };

        let payload = match self.server.registry.get(frame.device_id as usize) {
            Some(controller) => controller.encode(version).await?,
            None => {
                tracing::warn!(
                    "Client {} requested data for unknown device {}",
                    self.client.addr(),
                    frame.device_id
                );
                Vec::new()
            }
        };
        self.reply(frame.device_id, PacketId::RequestControllerData, &payload)
            .await
    }

    fn handle_profile_op(&self, packet_id: PacketId, data: &[u8]) {
        let name = match parse_raw_string(data) {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!("Discarding profile request with bad name: {e}");
                return;
            }
        };
        let Some(pm) = self.server.profile_manager() else {
            tracing::debug!("No profile manager installed, ignoring {packet_id:?}");
            return;
        };
        let result = match packet_id {
            PacketId::RequestLoadProfile => pm.load_profile(&name),
            PacketId::RequestSaveProfile => pm.save_profile(&name),
            PacketId::RequestDeleteProfile => pm.delete_profile(&name),
            _ => Ok(()),
        };
        if let Err(e) = result {
            tracing::warn!("Profile operation {packet_id:?} on '{name}' failed: {e}");
        }
    }

    async fn reply_plugin_specific(&self, frame: Frame) -> OpenRgbResult<()> {
        let callback = {
            let plugins = self.server.plugins.lock();
            plugins
                .get(frame.device_id as usize)
                .map(|p| Arc::clone(&p.callback))
        };
        let payload = match (callback, frame.data.len() >= 4) {
            (Some(callback), true) => {
                let mut msg = ReceivedMessage::new(&frame.data, 0);
                let sub_id = msg.read_u32()?;
                callback(sub_id, &frame.data[4..])
            }
            (Some(_), false) => {
                tracing::warn!("Plugin packet without sub id from {}", self.client.addr());
                Vec::new()
            }
            (None, _) => {
                tracing::warn!(
                    "Client {} addressed unknown plugin {}",
                    self.client.addr(),
                    frame.device_id
                );
                Vec::new()
            }
        };
        self.reply(frame.device_id, PacketId::PluginSpecific, &payload)
            .await
    }

    /// Copies a mutation payload into the target controller's work queue.
    /// Waiting on a full queue is the back-pressure path: the slow device
    /// stalls this client until the worker drains.
    async fn enqueue_controller_write(&self, packet_id: PacketId, frame: Frame) {
        let Some(controller) = self.server.registry.get(frame.device_id as usize) else {
            tracing::warn!(
                "Client {} addressed unknown device {}, dropping {packet_id:?}",
                self.client.addr(),
                frame.device_id
            );
            return;
        };
        let Some(tx) = self.server.worker_sender(controller.id()) else {
            tracing::warn!(
                "No worker for controller {}, dropping {packet_id:?}",
                controller.id()
            );
            return;
        };
        let entry = QueueEntry {
            payload: frame.data,
            packet_id,
            protocol_version: self.client.protocol_version(),
        };
        if tx.send(entry).await.is_err() {
            tracing::warn!(
                "Worker for controller {} shut down, dropping {packet_id:?}",
                controller.id()
            );
        }
    }
}
