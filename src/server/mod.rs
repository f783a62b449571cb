//! SDK network server: accepts clients, answers metadata queries and funnels
//! controller writes through per-controller workers.

mod client;
mod config;
mod plugin;
mod session;
mod worker;

pub use client::ClientInfo;
pub use config::{DEFAULT_PORT, ServerConfig};
pub use plugin::{NetworkPlugin, PluginCallback, ProfileManager, SettingsManager};

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream, lookup_host};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::device::{CallbackRegistry, CallbackToken, Controller, ControllerFlags};
use crate::protocol::PacketId;
use crate::registry::{ControllerRegistry, RegistryEvent};
use crate::server::client::ClientHandle;
use crate::server::session::Session;
use crate::server::worker::QueueEntry;
use crate::{OpenRgbError, OpenRgbResult};

/// Client lifecycle event, delivered to callbacks registered through
/// [`Server::register_client_info_callback`].
#[derive(Debug, Clone)]
pub enum ClientInfoEvent {
    /// A client connected.
    Connected(ClientInfo),
    /// A client disconnected.
    Disconnected(ClientInfo),
    /// A client set or changed its name.
    NameChanged(ClientInfo),
}

/// Listening state change, delivered to callbacks registered through
/// [`Server::register_listening_callback`].
#[derive(Debug, Clone)]
pub enum ListeningEvent {
    /// The server bound its sockets and accepts clients.
    Started,
    /// The server stopped.
    Stopped,
    /// Binding failed; the server is offline.
    BindFailed(String),
}

struct WorkerHandle {
    tx: mpsc::Sender<QueueEntry>,
    handle: JoinHandle<()>,
}

/// State shared between the server handle, its sessions and its tasks.
pub(crate) struct ServerInner {
    pub config: ServerConfig,
    pub registry: Arc<ControllerRegistry>,
    pub client_callbacks: CallbackRegistry<ClientInfoEvent>,
    pub plugins: Mutex<Vec<NetworkPlugin>>,
    listening_callbacks: CallbackRegistry<ListeningEvent>,
    clients: Mutex<Vec<Arc<ClientHandle>>>,
    workers: Mutex<HashMap<u64, WorkerHandle>>,
    profile_manager: Mutex<Option<Arc<dyn ProfileManager>>>,
    settings_manager: Mutex<Option<Arc<dyn SettingsManager>>>,
    session_tasks: Mutex<Vec<JoinHandle<()>>>,
    local_addrs: Mutex<Vec<SocketAddr>>,
    shutdown: watch::Sender<bool>,
    online: AtomicBool,
    next_client_id: AtomicU64,
    legacy_workaround: AtomicBool,
}

impl ServerInner {
    fn spawn_session(self: &Arc<Self>, socket: TcpStream, addr: SocketAddr) {
        let (reader, writer) = socket.into_split();
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let client = Arc::new(ClientHandle::new(id, addr, writer));
        self.clients.lock().push(Arc::clone(&client));
        self.client_callbacks
            .signal(&ClientInfoEvent::Connected(client.info()));
        tracing::debug!("Client {addr} connected");

        let session = Session::new(
            Arc::clone(self),
            client,
            reader,
            self.shutdown.subscribe(),
        );
        let mut tasks = self.session_tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.push(tokio::spawn(session.run()));
    }

    pub fn remove_client(&self, client: &Arc<ClientHandle>) {
        self.clients.lock().retain(|c| c.id() != client.id());
    }

    pub fn profile_manager(&self) -> Option<Arc<dyn ProfileManager>> {
        self.profile_manager.lock().clone()
    }

    pub fn worker_sender(&self, controller_id: u64) -> Option<mpsc::Sender<QueueEntry>> {
        self.workers
            .lock()
            .get(&controller_id)
            .map(|w| w.tx.clone())
    }

    /// Whether never-negotiated clients are pinned to protocol version 0.
    pub fn legacy_workaround(&self) -> bool {
        self.legacy_workaround.load(Ordering::SeqCst)
    }

    async fn add_worker(&self, controller: &Arc<Controller>) {
        let coalesce = !controller
            .flags()
            .await
            .contains(ControllerFlags::ResetBeforeUpdate);
        let (tx, handle) = worker::spawn(
            Arc::clone(controller),
            coalesce,
            self.config.worker_queue_depth,
        );
        self.workers
            .lock()
            .insert(controller.id(), WorkerHandle { tx, handle });
    }

    /// Shuts a controller's worker down. Dropping the queue sender lets the
    /// worker drain first, so writes already accepted from clients are fully
    /// applied before the teardown completes.
    async fn remove_worker(&self, controller: &Arc<Controller>) {
        let worker = self.workers.lock().remove(&controller.id());
        if let Some(WorkerHandle { tx, handle }) = worker {
            drop(tx);
            if let Err(e) = handle.await {
                tracing::warn!("Worker for controller {} panicked: {e}", controller.id());
            }
        }
    }

    /// Best-effort DEVICE_LIST_UPDATED to every connected client; receivers
    /// are expected to re-enumerate.
    async fn broadcast_device_list_changed(&self) {
        let clients: Vec<Arc<ClientHandle>> = self.clients.lock().clone();
        tracing::debug!("Device list changed, notifying {} clients", clients.len());
        for client in clients {
            if let Err(e) = client
                .send_frame(0, PacketId::DeviceListUpdated, &[])
                .await
            {
                tracing::debug!("Failed notifying client {}: {e}", client.addr());
            }
        }
    }
}

/// The SDK network server.
///
/// Owns the listen sockets, the connected client list and one worker per
/// registered controller. `start`/`stop` bracket the whole lifecycle;
/// `stop` joins every task before returning.
pub struct Server {
    inner: Arc<ServerInner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    registry_token: Mutex<Option<CallbackToken>>,
}

impl Server {
    /// Creates a server over the given controller fleet. Nothing happens
    /// until [`Self::start`].
    pub fn new(registry: Arc<ControllerRegistry>, config: ServerConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        let legacy_workaround = AtomicBool::new(config.legacy_workaround);
        Self {
            inner: Arc::new(ServerInner {
                config,
                registry,
                client_callbacks: CallbackRegistry::new(),
                listening_callbacks: CallbackRegistry::new(),
                plugins: Mutex::new(Vec::new()),
                clients: Mutex::new(Vec::new()),
                workers: Mutex::new(HashMap::new()),
                profile_manager: Mutex::new(None),
                settings_manager: Mutex::new(None),
                session_tasks: Mutex::new(Vec::new()),
                local_addrs: Mutex::new(Vec::new()),
                shutdown,
                online: AtomicBool::new(false),
                next_client_id: AtomicU64::new(0),
                legacy_workaround,
            }),
            tasks: Mutex::new(Vec::new()),
            registry_token: Mutex::new(None),
        }
    }

    delegate::delegate! {
        to self.inner.config {
            /// Returns the configured host.
            pub fn host(&self) -> &str;
            /// Returns the configured port.
            pub fn port(&self) -> u16;
        }
    }

    /// Whether the server is accepting clients.
    pub fn online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    /// Addresses actually bound; useful with an ephemeral port.
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.inner.local_addrs.lock().clone()
    }

    /// Number of connected clients.
    pub fn num_clients(&self) -> usize {
        self.inner.clients.lock().len()
    }

    /// Snapshot of the connected clients.
    pub fn clients(&self) -> Vec<ClientInfo> {
        self.inner.clients.lock().iter().map(|c| c.info()).collect()
    }

    /// Registers an observer for client connect/disconnect/rename events.
    pub fn register_client_info_callback(
        &self,
        callback: impl Fn(&ClientInfoEvent) + Send + Sync + 'static,
    ) -> CallbackToken {
        self.inner.client_callbacks.register(callback)
    }

    /// Unregisters a client info observer.
    pub fn unregister_client_info_callback(&self, token: CallbackToken) -> bool {
        self.inner.client_callbacks.unregister(token)
    }

    /// Registers an observer for listening state changes.
    pub fn register_listening_callback(
        &self,
        callback: impl Fn(&ListeningEvent) + Send + Sync + 'static,
    ) -> CallbackToken {
        self.inner.listening_callbacks.register(callback)
    }

    /// Unregisters a listening state observer.
    pub fn unregister_listening_callback(&self, token: CallbackToken) -> bool {
        self.inner.listening_callbacks.unregister(token)
    }

    /// Installs the external profile store.
    pub fn set_profile_manager(&self, manager: Arc<dyn ProfileManager>) {
        *self.inner.profile_manager.lock() = Some(manager);
    }

    /// Installs the external settings store.
    pub fn set_settings_manager(&self, manager: Arc<dyn SettingsManager>) {
        *self.inner.settings_manager.lock() = Some(manager);
    }

    /// Registers a network plugin.
    pub fn register_plugin(&self, plugin: NetworkPlugin) {
        self.inner.plugins.lock().push(plugin);
    }

    /// Unregisters a network plugin by name.
    pub fn unregister_plugin(&self, name: &str) -> bool {
        let mut plugins = self.inner.plugins.lock();
        let before = plugins.len();
        plugins.retain(|p| p.name != name);
        plugins.len() != before
    }

    /// Binds the listen sockets and starts serving.
    ///
    /// Binding every address the host resolves to supports dual-stack and
    /// multi-homed setups. If nothing can be bound the server stays offline
    /// and listening observers get [`ListeningEvent::BindFailed`].
    pub async fn start(&self) -> OpenRgbResult<()> {
        if self.inner.online.load(Ordering::SeqCst) {
            return Err(OpenRgbError::Resource("server already running".to_string()));
        }
        self.apply_settings();
        self.inner.shutdown.send_replace(false);

        let mut addrs: Vec<SocketAddr> = lookup_host((self.host(), self.port()))
            .await
            .map_err(|e| {
                let reason = format!("cannot resolve {}:{}: {e}", self.host(), self.port());
                self.inner
                    .listening_callbacks
                    .signal(&ListeningEvent::BindFailed(reason.clone()));
                OpenRgbError::Resource(reason)
            })?
            .collect();
        addrs.dedup();

        let mut listeners = Vec::new();
        let mut last_error = String::new();
        for addr in addrs {
            match TcpListener::bind(addr).await {
                Ok(listener) => listeners.push(listener),
                Err(e) => {
                    tracing::warn!("Failed binding {addr}: {e}");
                    last_error = format!("{addr}: {e}");
                }
            }
        }
        if listeners.is_empty() {
            let reason = format!("no listen socket could be bound ({last_error})");
            self.inner
                .listening_callbacks
                .signal(&ListeningEvent::BindFailed(reason.clone()));
            return Err(OpenRgbError::Resource(reason));
        }

        {
            let mut local_addrs = self.inner.local_addrs.lock();
            local_addrs.clear();
            for listener in &listeners {
                if let Ok(addr) = listener.local_addr() {
                    local_addrs.push(addr);
                }
            }
        }

        // workers for the controllers already in the fleet
        for controller in self.inner.registry.snapshot() {
            self.inner.add_worker(&controller).await;
        }

        // registry changes reconcile workers and trigger the client broadcast
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let token = self
            .inner
            .registry
            .observe(move |event: &RegistryEvent| {
                let _ = event_tx.send(event.clone());
            });
        *self.registry_token.lock() = Some(token);

        let inner = Arc::clone(&self.inner);
        let housekeeping = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                match &event {
                    RegistryEvent::Added(controller) => inner.add_worker(controller).await,
                    RegistryEvent::Removed(controller) => inner.remove_worker(controller).await,
                }
                inner.broadcast_device_list_changed().await;
            }
        });
        self.tasks.lock().push(housekeeping);

        for listener in listeners {
            let inner = Arc::clone(&self.inner);
            let mut shutdown = self.inner.shutdown.subscribe();
            let accept_task = tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                break;
                            }
                        }
                        accepted = listener.accept() => match accepted {
                            Ok((socket, addr)) => inner.spawn_session(socket, addr),
                            Err(e) => tracing::warn!("Accept failed: {e}"),
                        },
                    }
                }
            });
            self.tasks.lock().push(accept_task);
        }

        self.inner.online.store(true, Ordering::SeqCst);
        self.inner
            .listening_callbacks
            .signal(&ListeningEvent::Started);
        tracing::info!("SDK server listening on {}:{}", self.host(), self.port());
        Ok(())
    }

    /// Reads server settings from the installed settings manager.
    fn apply_settings(&self) {
        let Some(settings) = self.inner.settings_manager.lock().clone() else {
            return;
        };
        let section = settings.get("Server");
        if let Some(enabled) = section
            .get("legacy_workaround")
            .and_then(serde_json::Value::as_bool)
        {
            // advisory to the encoder: pins never-negotiated clients to v0
            self.inner
                .legacy_workaround
                .store(enabled, Ordering::SeqCst);
            tracing::debug!("Legacy workaround {}", if enabled { "on" } else { "off" });
        }
    }

    /// Stops serving: closes listeners and sessions, drains every worker and
    /// joins all tasks before returning.
    pub async fn stop(&self) {
        if !self.inner.online.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.inner.shutdown.send(true);
        if let Some(token) = self.registry_token.lock().take() {
            self.inner.registry.unobserve(token);
        }

        let workers: Vec<WorkerHandle> = self
            .inner
            .workers
            .lock()
            .drain()
            .map(|(_, worker)| worker)
            .collect();
        for WorkerHandle { tx, handle } in workers {
            drop(tx);
            let _ = handle.await;
        }

        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            let _ = task.await;
        }
        let sessions: Vec<JoinHandle<()>> = self.inner.session_tasks.lock().drain(..).collect();
        for session in sessions {
            let _ = session.await;
        }

        self.inner.local_addrs.lock().clear();
        self.inner
            .listening_callbacks
            .signal(&ListeningEvent::Stopped);
        tracing::info!("SDK server stopped");
    }
}
