//! Wire protocol layer: version-tagged byte codecs, packet ids and frame I/O.
//!
//! Serialization is a pure function of `(value, protocol_version)`; the
//! version rides on the buffer structs so every codec impl can gate the
//! fields that were added to the protocol over time.

pub mod data;
mod deserialize;
mod packet;
mod serialize;
mod stream;

pub(crate) use {data::*, deserialize::*, packet::*, serialize::*, stream::*};

/// Highest SDK protocol version supported by this server.
pub const PROTOCOL_VERSION: u32 = 4;
