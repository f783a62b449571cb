use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex as SyncMutex;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

use crate::OpenRgbResult;
use crate::protocol::{PacketId, write_frame};

/// Sentinel for a client that never negotiated a protocol version.
const NOT_NEGOTIATED: u32 = u32::MAX;

/// Server-side view of one connected client.
///
/// The write half lives behind its own lock, scoped around each frame, so
/// session replies and server broadcasts never interleave on the socket.
pub(crate) struct ClientHandle {
    id: u64,
    addr: SocketAddr,
    name: SyncMutex<String>,
    negotiated: AtomicU32,
    writer: Mutex<OwnedWriteHalf>,
}

impl ClientHandle {
    pub fn new(id: u64, addr: SocketAddr, writer: OwnedWriteHalf) -> Self {
        Self {
            id,
            addr,
            name: SyncMutex::new(String::new()),
            negotiated: AtomicU32::new(NOT_NEGOTIATED),
            writer: Mutex::new(writer),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    pub fn set_name(&self, name: String) {
        *self.name.lock() = name;
    }

    /// Protocol version used for this client's frames. Clients that never
    /// negotiated speak version 0 ("legacy").
    pub fn protocol_version(&self) -> u32 {
        match self.negotiated.load(Ordering::Acquire) {
            NOT_NEGOTIATED => 0,
            version => version,
        }
    }

    /// Whether the client went through the version exchange.
    pub fn has_negotiated(&self) -> bool {
        self.negotiated.load(Ordering::Acquire) != NOT_NEGOTIATED
    }

    pub fn set_protocol_version(&self, version: u32) {
        self.negotiated.store(version, Ordering::Release);
    }

    /// Sends one reply frame, holding the writer lock for its whole body.
    pub async fn send_frame(
        &self,
        device_id: u32,
        packet_id: PacketId,
        data: &[u8],
    ) -> OpenRgbResult<()> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, device_id, packet_id, data).await
    }

    /// Snapshot for the observability surface.
    pub fn info(&self) -> ClientInfo {
        ClientInfo {
            name: self.name(),
            addr: self.addr,
            protocol_version: self.protocol_version(),
        }
    }
}

/// Snapshot of one connected client, exposed through [`crate::Server::clients`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Label the client set through SET_CLIENT_NAME; empty until then.
    pub name: String,

    /// Peer address.
    pub addr: SocketAddr,

    /// Negotiated protocol version; 0 for legacy clients.
    pub protocol_version: u32,
}
