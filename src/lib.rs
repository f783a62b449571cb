//! Server-side implementation of the [OpenRGB](https://gitlab.com/CalcProgrammer1/OpenRGB/-/blob/master/Documentation/OpenRGBSDK.md) SDK.
//!
//! This crate provides the two subsystems an OpenRGB-compatible daemon is
//! built around:
//!
//! * the **device abstraction layer**: [`ControllerData`] and friends model a
//!   heterogeneous RGB device (zones, LEDs, modes, segments, matrix maps) and
//!   serialize to the versioned SDK wire format; [`Controller`] binds a model
//!   to a [`DeviceBackend`] driver behind a readers-writer lock;
//! * the **SDK network server**: [`Server`] accepts any number of TCP
//!   clients, answers metadata queries from the [`ControllerRegistry`] and
//!   serializes hardware-facing writes through one worker per controller.
//!
//! The server is async and requires a [tokio](https://tokio.rs) runtime.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use openrgbd::{ControllerRegistry, OpenRgbResult, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> OpenRgbResult<()> {
//!     let registry = Arc::new(ControllerRegistry::new());
//!     // detection code registers controllers with the registry here
//!     let server = Server::new(registry, ServerConfig::default());
//!     server.start().await?;
//!     # server.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! Device drivers plug in by implementing [`DeviceBackend`] and registering a
//! [`Controller`] with the [`ControllerRegistry`]; profile and settings
//! storage plug in through [`ProfileManager`] and [`SettingsManager`].

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

#[doc(inline)]
pub use {
    device::*,
    error::{DecodeError, OpenRgbError, OpenRgbResult},
    protocol::PROTOCOL_VERSION,
    registry::*,
    server::*,
};

mod device;
mod error;
pub(crate) mod protocol;
mod registry;
mod server;
