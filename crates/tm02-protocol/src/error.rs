//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when encoding or decoding protocol frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame is too short to be valid.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Payload does not fit in the one-byte length field.
    #[error("payload too long: maximum {max} bytes, got {actual}")]
    PayloadTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual payload length.
        actual: usize,
    },

    /// First byte is not the frame head marker.
    #[error("bad frame head: 0x{0:02X}")]
    BadHead(u8),

    /// Last byte is not the frame tail marker.
    #[error("bad frame tail: 0x{0:02X}")]
    BadTail(u8),

    /// Declared payload length disagrees with the frame size.
    #[error("length mismatch: header declares {declared} payload bytes, frame is {actual} bytes")]
    LengthMismatch {
        /// Payload length from the length byte.
        declared: usize,
        /// Total frame size received.
        actual: usize,
    },

    /// Checksum over `cmd ++ len ++ payload` does not match.
    #[error("CRC mismatch: received 0x{received:04X}, computed 0x{computed:04X}")]
    CrcMismatch {
        /// CRC carried by the frame.
        received: u16,
        /// CRC computed locally.
        computed: u16,
    },

    /// Response carries a different command code than expected.
    #[error("unexpected response: expected command 0x{expected:02X}, got 0x{actual:02X}")]
    UnexpectedCommand {
        /// Command code the caller asked for.
        expected: u8,
        /// Command code in the response.
        actual: u8,
    },

    /// Payload is shorter than the response type requires.
    #[error("payload too short: expected at least {expected} bytes, got {actual}")]
    PayloadTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual payload length.
        actual: usize,
    },

    /// Unknown command code.
    #[error("unknown command code: 0x{0:02X}")]
    UnknownCommand(u8),

    /// Unknown response code.
    #[error("unknown response code: 0x{0:02X}")]
    UnknownResponse(u8),

    /// UTF-8 decoding error.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
}

/// Errors that can occur when loading or converting a calibration table.
#[derive(Error, Debug)]
pub enum TableError {
    /// I/O error opening or writing a table file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader or writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Binary table does not start with the table magic.
    #[error("bad table magic: 0x{0:08X}")]
    BadMagic(u32),

    /// Binary table is shorter than its header declares.
    #[error("binary table truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Size implied by the header.
        expected: usize,
        /// Actual data size.
        actual: usize,
    },
}
