use std::sync::Arc;

use serde_json::Value;

use crate::OpenRgbResult;
use crate::protocol::WriteMessage;

/// Handler invoked for plugin-specific packets.
///
/// Receives the sub-packet id and the payload, returns the reply bytes.
/// Handlers must be reentrant: concurrent sessions may invoke the same
/// plugin at the same time.
pub type PluginCallback = Arc<dyn Fn(u32, &[u8]) -> Vec<u8> + Send + Sync>;

/// A plugin reachable over the SDK socket.
///
/// Plugin-specific packets address plugins by their index in the registered
/// list, carried in the frame's device index field.
#[derive(Clone)]
pub struct NetworkPlugin {
    /// Protocol version spoken by the plugin itself.
    pub protocol_version: u32,

    /// Plugin name.
    pub name: String,

    /// Plugin description.
    pub description: String,

    /// Plugin version.
    pub version: String,

    /// Packet handler.
    pub callback: PluginCallback,
}

impl std::fmt::Debug for NetworkPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkPlugin")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("protocol_version", &self.protocol_version)
            .finish()
    }
}

/// Encodes the plugin list reply payload: a length prefix, a `u16` count and
/// per plugin name, description, version, index and protocol version.
pub(crate) fn encode_plugin_list(
    plugins: &[NetworkPlugin],
    protocol_version: u32,
) -> OpenRgbResult<Vec<u8>> {
    let mut inner = WriteMessage::new(protocol_version);
    inner.write_u16(plugins.len() as u16);
    for (index, plugin) in plugins.iter().enumerate() {
        inner.write_value(&plugin.name)?;
        inner.write_value(&plugin.description)?;
        inner.write_value(&plugin.version)?;
        inner.write_u32(index as u32);
        inner.write_u32(plugin.protocol_version);
    }

    let mut buf = WriteMessage::with_capacity(protocol_version, inner.len() + 4);
    buf.write_u32(inner.len() as u32);
    buf.write_slice(inner.bytes());
    Ok(buf.into_bytes())
}

/// Profile store the server queries and drives on behalf of clients.
/// Implemented externally; the wire protocol only carries profile names.
pub trait ProfileManager: Send + Sync {
    /// Names of the stored profiles.
    fn list_profiles(&self) -> Vec<String>;

    /// Applies a stored profile to the fleet.
    fn load_profile(&self, name: &str) -> OpenRgbResult<()>;

    /// Stores the current fleet state under `name`.
    fn save_profile(&self, name: &str) -> OpenRgbResult<()>;

    /// Deletes a stored profile.
    fn delete_profile(&self, name: &str) -> OpenRgbResult<()>;
}

/// Settings store consulted by the server on start. Implemented externally.
pub trait SettingsManager: Send + Sync {
    /// Returns the document stored under `section`.
    fn get(&self, section: &str) -> Value;

    /// Replaces the document stored under `section`.
    fn set(&self, section: &str, value: Value);

    /// Persists the settings.
    fn save(&self) -> OpenRgbResult<()>;
}
