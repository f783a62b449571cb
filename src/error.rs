use thiserror::Error;

/// Type alias for `Result<T, OpenRgbError>`
pub type OpenRgbResult<T> = std::result::Result<T, OpenRgbError>;

/// Errors raised by the SDK server and the device abstraction layer.
#[derive(Error, Debug)]
pub enum OpenRgbError {
    /// A client violated the wire protocol (bad magic, oversize frame, ...).
    ///
    /// The offending connection is terminated.
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// A packet payload could not be decoded.
    ///
    /// Mutation packets that fail to decode are discarded; the session stays up.
    #[error("Failed decoding payload")]
    Decode(#[from] DecodeError),

    /// Socket failure while exchanging data with a client.
    #[error("Failed exchanging data with client")]
    Io(#[from] std::io::Error),

    /// A system resource could not be acquired (bind failure, ...).
    #[error("Resource unavailable: {0}")]
    Resource(String),

    /// A caller violated a model invariant (resize outside bounds, out of
    /// range mode index, ...). The model is left unchanged.
    #[error("Invariant violated: {0}")]
    Invariant(String),
}

/// Errors raised while decoding a serialized description.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The message ended before the field being read.
    #[error("Truncated message: needed {needed} more bytes at offset {offset}")]
    Truncated {
        /// Read offset at which the message ran out.
        offset: usize,
        /// Bytes missing to complete the read.
        needed: usize,
    },

    /// A length prefix declared more bytes than the message holds.
    #[error("Length prefix declares {declared} bytes but only {available} follow")]
    BadLengthPrefix {
        /// Length declared by the prefix.
        declared: u32,
        /// Bytes actually remaining after the prefix.
        available: usize,
    },

    /// A string field was not NUL terminated or not valid UTF-8.
    #[error("Malformed string field: {0}")]
    BadString(String),

    /// A field held a value outside its domain (unknown discriminant, ...).
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// The decoded description violates a data model invariant.
    #[error("Decoded description violates an invariant: {0}")]
    InvariantViolation(String),
}
