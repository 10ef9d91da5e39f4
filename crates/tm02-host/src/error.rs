//! Error types for the host controller.

use std::time::Duration;

use thiserror::Error;
use tm02_protocol::{ProtocolError, StatusCode};

/// Faults of the underlying byte channel.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Operation on a closed connection.
    #[error("not connected")]
    NotConnected,

    /// Read or write on the channel failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port could not be opened or configured.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Frame could not be built.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Failure of one request/response exchange.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The request could not be sent or the response could not be read.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No valid frame arrived before the timeout.
    #[error("no response within {0:?}")]
    NoResponse(Duration),

    /// A frame arrived, but for a different command.
    #[error("unexpected response: expected command 0x{expected:02X}, got 0x{actual:02X}")]
    UnexpectedResponse {
        /// Command code expected in the reply.
        expected: u8,
        /// Command code actually received.
        actual: u8,
    },

    /// The reply payload could not be decoded (too short, bad UTF-8, ...).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The instrument acknowledged with a non-OK status.
    #[error("command 0x{command:02X} rejected: {status}")]
    Rejected {
        /// Command that was rejected.
        command: u8,
        /// Status reported by the instrument.
        status: StatusCode,
    },
}

/// Failure of a calibration table download, tagged with the failing stage.
///
/// The `Display` form is the message shown to the operator.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Nothing to send.
    #[error("calibration table is empty")]
    EmptyTable,

    /// The start command failed; no data was sent.
    #[error("failed to send start command: {0}")]
    Start(#[source] CommandError),

    /// A data packet failed; the transfer was abandoned at that packet.
    #[error("failed to send data packet {index}: {source}")]
    Packet {
        /// Index of the failing packet.
        index: u16,
        /// Underlying failure.
        #[source]
        source: CommandError,
    },

    /// All data was sent but the end command failed.
    #[error("failed to send end command: {0}")]
    End(#[source] CommandError),
}

/// Errors loading the host configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid YAML for [`crate::HostConfig`].
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
