//! Protocol constants
//!
//! These constants define the framing markers, command codes, status codes
//! and sizing limits used by the Ultra-TM02 serial protocol.

// ============================================================================
// Framing
// ============================================================================

/// First byte of every frame.
pub const FRAME_HEAD: u8 = 0xAA;
/// Last byte of every frame.
pub const FRAME_TAIL: u8 = 0x55;
/// Bytes a frame adds around its payload (head, cmd, len, crc x2, tail).
pub const FRAME_OVERHEAD: usize = 6;
/// Largest payload that fits in the one-byte length field.
pub const MAX_PAYLOAD_LEN: usize = 255;
/// Largest possible encoded frame.
pub const MAX_FRAME_LEN: usize = FRAME_OVERHEAD + MAX_PAYLOAD_LEN;

// ============================================================================
// Command Codes (host → instrument)
// ============================================================================

/// Read the device identifier string.
pub const CMD_GET_DEVICE_ID: u8 = 0x01;
/// Read the current temperature (°C).
pub const CMD_GET_TEMPERATURE: u8 = 0x02;
/// Read the sensor voltage (mV).
pub const CMD_GET_VOLTAGE: u8 = 0x03;
/// Read the 4-20 mA loop output current (mA).
pub const CMD_GET_CURRENT: u8 = 0x04;
/// Read the device status block.
pub const CMD_GET_STATUS: u8 = 0x05;

/// Select the excitation current source.
pub const CMD_SET_CURRENT_SRC: u8 = 0x10;
/// Set the trim adjustment of the 10 µA source.
pub const CMD_SET_CURRENT_ADJ_10: u8 = 0x11;
/// Set the trim adjustment of the 17 µA source.
pub const CMD_SET_CURRENT_ADJ_17: u8 = 0x12;

/// Set the temperature mapped to 4 mA.
pub const CMD_SET_4MA_TEMP: u8 = 0x20;
/// Set the temperature mapped to 20 mA.
pub const CMD_SET_20MA_TEMP: u8 = 0x21;

/// Start acquisition.
pub const CMD_START_ACQ: u8 = 0x30;
/// Stop acquisition.
pub const CMD_STOP_ACQ: u8 = 0x31;

/// Begin a calibration table transfer.
pub const CMD_LOAD_TABLE_START: u8 = 0x40;
/// One packet of calibration table points.
pub const CMD_LOAD_TABLE_DATA: u8 = 0x41;
/// Finish a calibration table transfer.
pub const CMD_LOAD_TABLE_END: u8 = 0x42;

/// Persist parameters to flash.
pub const CMD_SAVE_PARAM: u8 = 0x50;
/// Reload parameters from flash.
pub const CMD_LOAD_PARAM: u8 = 0x51;
/// Restore factory defaults.
pub const CMD_RESET_DEFAULT: u8 = 0x52;

// ============================================================================
// Response Codes (instrument → host)
// ============================================================================

/// Generic acknowledgement carrying a status code.
pub const CMD_ACK: u8 = 0x80;
/// Negative acknowledgement.
pub const CMD_NACK: u8 = 0x81;
/// Unsolicited telemetry report.
pub const CMD_DATA_REPORT: u8 = 0xF0;

// ============================================================================
// Status Codes (ACK payload byte 1)
// ============================================================================

/// Command executed.
pub const STATUS_OK: u8 = 0x00;
/// Command code not recognised.
pub const STATUS_INVALID_CMD: u8 = 0x01;
/// Command parameter rejected.
pub const STATUS_INVALID_PARAM: u8 = 0x02;
/// Instrument saw a CRC error on the request.
pub const STATUS_CRC_ERROR: u8 = 0x03;
/// Instrument is busy.
pub const STATUS_BUSY: u8 = 0x04;
/// Flash write or read failed.
pub const STATUS_FLASH_ERROR: u8 = 0x05;
/// Calibration table transfer rejected.
pub const STATUS_TABLE_ERROR: u8 = 0x06;

// ============================================================================
// Calibration Table
// ============================================================================

/// Maximum number of points the instrument flash can hold.
pub const MAX_TABLE_POINTS: usize = 4871;
/// Magic number of the at-rest binary table ("TBL\0" little-endian).
pub const TABLE_MAGIC: u32 = 0x004C_4254;
/// Size of the at-rest binary table header.
pub const TABLE_HEADER_SIZE: usize = 8;
/// Encoded size of one table point (two f32).
pub const TABLE_POINT_SIZE: usize = 8;
/// Encoded size of the packet index prefix.
pub const PACKET_INDEX_SIZE: usize = 2;
/// Default chunk size for [`crate::CalibrationTable::packets`].
pub const DEFAULT_POINTS_PER_PACKET: usize = 32;
/// Most points a single data frame can carry.
pub const MAX_POINTS_PER_PACKET: usize = (MAX_PAYLOAD_LEN - PACKET_INDEX_SIZE) / TABLE_POINT_SIZE;

// ============================================================================
// Payload Sizes
// ============================================================================

/// Size of a float reading payload.
pub const FLOAT_PAYLOAD_SIZE: usize = 4;
/// Size of the status block payload.
pub const STATUS_PAYLOAD_SIZE: usize = 8;
/// Size of the data report payload.
pub const DATA_REPORT_PAYLOAD_SIZE: usize = 12;
/// Minimum size of an ACK payload (echoed command, status).
pub const ACK_PAYLOAD_SIZE: usize = 2;
