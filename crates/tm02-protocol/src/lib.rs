//! Ultra-TM02 Serial Protocol
//!
//! This crate provides types and utilities for talking to the Ultra-TM02
//! temperature transmitter over its serial (USB CDC) link. The protocol is a
//! small request/response scheme: the host sends one framed command and the
//! instrument answers with exactly one frame before the next command may be
//! sent.
//!
//! # Frame Layout
//!
//! ```text
//! +------+-----+-----+-------------+--------+--------+------+
//! | 0xAA | cmd | len | payload[len]| crc_lo | crc_hi | 0x55 |
//! +------+-----+-----+-------------+--------+--------+------+
//! ```
//!
//! The CRC is CRC-16/MODBUS computed over `cmd ++ len ++ payload`.
//!
//! # Message Kinds
//!
//! - **Queries** (0x01-0x05): answered with a frame carrying the same command
//!   code and the requested value.
//! - **Settings and actions** (0x10-0x52): answered with a generic ACK frame
//!   (0x80) whose second payload byte is a [`StatusCode`].
//! - **Data reports** (0xF0): unsolicited telemetry pushed by the instrument.
//!
//! The crate also holds the calibration table codec used to prepare
//! voltage-to-temperature tables for chunked upload.
//!
//! # Example
//!
//! ```rust,ignore
//! use tm02_protocol::{Command, Frame, Response};
//!
//! let frame = Command::GetTemperature.to_frame()?;
//! port.write_all(&frame.encode())?;
//!
//! let reply = Frame::decode(&received)?;
//! if let Response::Temperature(celsius) = Response::decode(&reply)? {
//!     println!("{celsius:.2} °C");
//! }
//! ```

mod commands;
mod constants;
mod crc;
mod error;
mod frame;
mod responses;
mod table;
mod types;

pub use commands::*;
pub use constants::*;
pub use crc::*;
pub use error::*;
pub use frame::*;
pub use responses::*;
pub use table::*;
pub use types::*;
