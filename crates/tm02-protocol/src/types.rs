//! Common types used in the protocol.

use std::fmt;

use crate::constants::*;

/// Result status carried in byte 1 of an ACK payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// Command executed.
    Ok,
    /// Command code not recognised.
    InvalidCommand,
    /// Command parameter rejected.
    InvalidParameter,
    /// Request arrived with a bad checksum.
    CrcError,
    /// Instrument busy.
    Busy,
    /// Flash access failed.
    FlashError,
    /// Calibration table transfer rejected.
    TableError,
    /// Status code this host does not know.
    Unknown(u8),
}

impl StatusCode {
    /// Whether this status reports success.
    pub fn is_ok(self) -> bool {
        self == StatusCode::Ok
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Ok => write!(f, "ok"),
            StatusCode::InvalidCommand => write!(f, "invalid command"),
            StatusCode::InvalidParameter => write!(f, "invalid parameter"),
            StatusCode::CrcError => write!(f, "CRC error"),
            StatusCode::Busy => write!(f, "busy"),
            StatusCode::FlashError => write!(f, "flash error"),
            StatusCode::TableError => write!(f, "table error"),
            StatusCode::Unknown(code) => write!(f, "unknown status (0x{:02X})", code),
        }
    }
}

impl From<u8> for StatusCode {
    fn from(code: u8) -> Self {
        match code {
            STATUS_OK => StatusCode::Ok,
            STATUS_INVALID_CMD => StatusCode::InvalidCommand,
            STATUS_INVALID_PARAM => StatusCode::InvalidParameter,
            STATUS_CRC_ERROR => StatusCode::CrcError,
            STATUS_BUSY => StatusCode::Busy,
            STATUS_FLASH_ERROR => StatusCode::FlashError,
            STATUS_TABLE_ERROR => StatusCode::TableError,
            _ => StatusCode::Unknown(code),
        }
    }
}

impl From<StatusCode> for u8 {
    fn from(code: StatusCode) -> Self {
        match code {
            StatusCode::Ok => STATUS_OK,
            StatusCode::InvalidCommand => STATUS_INVALID_CMD,
            StatusCode::InvalidParameter => STATUS_INVALID_PARAM,
            StatusCode::CrcError => STATUS_CRC_ERROR,
            StatusCode::Busy => STATUS_BUSY,
            StatusCode::FlashError => STATUS_FLASH_ERROR,
            StatusCode::TableError => STATUS_TABLE_ERROR,
            StatusCode::Unknown(code) => code,
        }
    }
}

/// Excitation current source driving the sensing diode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CurrentSource {
    /// 10 µA source.
    #[default]
    Low,
    /// 17 µA source.
    High,
}

impl CurrentSource {
    /// Interpret a raw selector byte. Only the low bit is significant.
    pub fn from_bits(value: u8) -> Self {
        if value & 0x01 == 0 {
            CurrentSource::Low
        } else {
            CurrentSource::High
        }
    }

    /// Nominal excitation current in microamps.
    pub fn microamps(self) -> u8 {
        match self {
            CurrentSource::Low => 10,
            CurrentSource::High => 17,
        }
    }
}

impl From<CurrentSource> for u8 {
    fn from(source: CurrentSource) -> Self {
        match source {
            CurrentSource::Low => 0,
            CurrentSource::High => 1,
        }
    }
}

impl fmt::Display for CurrentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} µA", self.microamps())
    }
}

/// Snapshot returned by the status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStatus {
    /// Acquisition running.
    pub running: bool,
    /// Selected excitation source.
    pub current_source: CurrentSource,
    /// Probe connected and healthy.
    pub probe_ok: bool,
    /// Samples taken since acquisition started.
    pub sample_count: u32,
}

impl DeviceStatus {
    /// Encode as the 8-byte status payload.
    pub fn encode(&self) -> [u8; STATUS_PAYLOAD_SIZE] {
        let mut buf = [0u8; STATUS_PAYLOAD_SIZE];
        buf[0] = self.running as u8;
        buf[1] = self.current_source.into();
        buf[2] = self.probe_ok as u8;
        // buf[3] reserved
        buf[4..8].copy_from_slice(&self.sample_count.to_le_bytes());
        buf
    }
}

/// Telemetry pushed by the instrument in a data report frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataReport {
    /// Temperature in °C.
    pub temperature: f32,
    /// Sensor voltage in mV.
    pub voltage: f32,
    /// Loop current in mA.
    pub current: f32,
}
