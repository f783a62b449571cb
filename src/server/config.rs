use std::time::Duration;

/// Default SDK server port.
pub const DEFAULT_PORT: u16 = 6742;

/// Network server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind. Every address it resolves to gets its own listen socket,
    /// so dual-stack or multi-homed setups work out of one config value.
    pub host: String,

    /// Port to bind.
    pub port: u16,

    /// Per-recv timeout on client sockets. A client that sends nothing for
    /// this long is treated as gone.
    pub recv_timeout: Duration,

    /// Ceiling on a frame's declared payload size. Larger frames terminate
    /// the connection.
    pub max_packet_size: u32,

    /// Capacity of each controller's work queue. A full queue blocks the
    /// submitting session until the device catches up.
    pub worker_queue_depth: usize,

    /// Forces protocol version 0 framing for clients that never negotiated a
    /// version. Advisory to the encoder only.
    pub legacy_workaround: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            recv_timeout: Duration::from_secs(5),
            max_packet_size: 16 * 1024 * 1024,
            worker_queue_depth: 32,
            legacy_workaround: false,
        }
    }
}

impl ServerConfig {
    /// Returns the configured host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the configured port.
    pub fn port(&self) -> u16 {
        self.port
    }
}
