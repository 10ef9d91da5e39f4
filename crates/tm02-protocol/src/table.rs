//! Calibration table codec.
//!
//! A calibration table maps sensor voltage (mV) to temperature (K). Tables
//! are read from two-column CSV files, stored at rest in a small binary
//! format and uploaded to the instrument in fixed-size packets.
//!
//! Binary layout (little-endian):
//!
//! ```text
//! +-----------+-------------+----------+------------------------------+
//! | magic u32 | count u16   | rsvd u16 | count x (voltage f32, temp f32)|
//! +-----------+-------------+----------+------------------------------+
//! ```

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use bytes::{Buf, BufMut};

use crate::constants::*;
use crate::error::{ProtocolError, TableError};

/// One calibration point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TablePoint {
    /// Sensor voltage in mV.
    pub voltage: f32,
    /// Temperature in K.
    pub temperature: f32,
}

impl TablePoint {
    /// Create a point.
    pub fn new(voltage: f32, temperature: f32) -> Self {
        TablePoint {
            voltage,
            temperature,
        }
    }

    fn put(&self, buf: &mut Vec<u8>) {
        buf.put_f32_le(self.voltage);
        buf.put_f32_le(self.temperature);
    }
}

/// One upload packet: a sequence index and a run of consecutive points.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePacket {
    /// Zero-based position of this packet in the transfer.
    pub index: u16,
    /// Points carried by this packet, in table order.
    pub points: Vec<TablePoint>,
}

impl TablePacket {
    /// Encode as a table data payload: `index u16 ++ points`.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(PACKET_INDEX_SIZE + self.points.len() * TABLE_POINT_SIZE);
        buf.put_u16_le(self.index);
        for point in &self.points {
            point.put(&mut buf);
        }
        buf
    }

    /// Decode a table data payload. Trailing bytes short of a full point
    /// are ignored.
    pub fn decode(mut data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < PACKET_INDEX_SIZE {
            return Err(ProtocolError::PayloadTooShort {
                expected: PACKET_INDEX_SIZE,
                actual: data.len(),
            });
        }
        let index = data.get_u16_le();
        let mut points = Vec::with_capacity(data.len() / TABLE_POINT_SIZE);
        while data.remaining() >= TABLE_POINT_SIZE {
            let voltage = data.get_f32_le();
            let temperature = data.get_f32_le();
            points.push(TablePoint::new(voltage, temperature));
        }
        Ok(TablePacket { index, points })
    }
}

/// An ordered voltage-to-temperature table, at most [`MAX_TABLE_POINTS`]
/// points long.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationTable {
    points: Vec<TablePoint>,
}

impl CalibrationTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from points, truncating anything past the flash limit.
    pub fn from_points(mut points: Vec<TablePoint>) -> Self {
        if points.len() > MAX_TABLE_POINTS {
            log::warn!(
                "calibration table has {} points, truncating to {}",
                points.len(),
                MAX_TABLE_POINTS
            );
            points.truncate(MAX_TABLE_POINTS);
        }
        CalibrationTable { points }
    }

    /// Load a table from a CSV file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let table = Self::from_reader(file)?;
        log::info!(
            "loaded calibration table {} ({} points)",
            path.display(),
            table.len()
        );
        Ok(table)
    }

    /// Parse a table from CSV text.
    ///
    /// The first row is a header and is skipped. Rows with fewer than two
    /// fields or with a field that is not a number are skipped one by one;
    /// only an I/O failure aborts the load.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut points = Vec::new();
        let mut skipped = 0usize;
        for result in csv.records() {
            let record = match result {
                Ok(record) => record,
                Err(err) if err.is_io_error() => return Err(err.into()),
                Err(err) => {
                    log::debug!("skipping unreadable row: {}", err);
                    skipped += 1;
                    continue;
                }
            };

            let parsed = match (record.get(0), record.get(1)) {
                (Some(v), Some(t)) => v.parse::<f32>().ok().zip(t.parse::<f32>().ok()),
                _ => None,
            };
            match parsed {
                Some((voltage, temperature)) => points.push(TablePoint::new(voltage, temperature)),
                None => {
                    let line = record.position().map(|p| p.line()).unwrap_or(0);
                    log::debug!("skipping non-numeric row at line {}", line);
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            log::debug!("{} rows skipped while parsing calibration table", skipped);
        }
        Ok(Self::from_points(points))
    }

    /// Write the table as two-column CSV with a header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(["Voltage_mV", "Temperature_K"])?;
        for point in &self.points {
            csv.write_record([
                format!("{:.3}", point.voltage),
                format!("{:.1}", point.temperature),
            ])?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Write the table to a CSV file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let file = File::create(path)?;
        self.write_csv(file)
    }

    /// Generate a full-size demonstration diode curve starting at 1.4 K in
    /// 0.1 K steps. The curve is a two-segment linear approximation, not a
    /// real sensor characteristic.
    pub fn sample() -> Self {
        let first = 14;
        let points = (first..first + MAX_TABLE_POINTS)
            .map(|t| {
                let temperature = t as f32 / 10.0;
                let voltage = if temperature < 77.0 {
                    1600.0 - 2.5 * temperature
                } else {
                    1200.0 - 2.0 * temperature
                };
                TablePoint::new(voltage, temperature)
            })
            .collect();
        CalibrationTable { points }
    }

    /// Points in table order.
    pub fn points(&self) -> &[TablePoint] {
        &self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the table has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Encode the at-rest binary form.
    pub fn to_binary(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(TABLE_HEADER_SIZE + self.points.len() * TABLE_POINT_SIZE);
        buf.put_u32_le(TABLE_MAGIC);
        buf.put_u16_le(self.points.len() as u16);
        buf.put_u16_le(0);
        for point in &self.points {
            point.put(&mut buf);
        }
        buf
    }

    /// Decode the at-rest binary form.
    pub fn from_binary(mut data: &[u8]) -> Result<Self, TableError> {
        if data.len() < TABLE_HEADER_SIZE {
            return Err(TableError::Truncated {
                expected: TABLE_HEADER_SIZE,
                actual: data.len(),
            });
        }
        let total = data.len();
        let magic = data.get_u32_le();
        if magic != TABLE_MAGIC {
            return Err(TableError::BadMagic(magic));
        }
        let count = data.get_u16_le() as usize;
        let _reserved = data.get_u16_le();

        let expected = TABLE_HEADER_SIZE + count * TABLE_POINT_SIZE;
        if total < expected {
            return Err(TableError::Truncated {
                expected,
                actual: total,
            });
        }

        let points = (0..count)
            .map(|_| {
                let voltage = data.get_f32_le();
                let temperature = data.get_f32_le();
                TablePoint::new(voltage, temperature)
            })
            .collect();
        Ok(Self::from_points(points))
    }

    /// Split the table into upload packets of `points_per_packet` points.
    ///
    /// Packets are numbered from zero in table order; the last one may be
    /// short. A size of zero is treated as one.
    pub fn packets(&self, points_per_packet: usize) -> Vec<TablePacket> {
        self.points
            .chunks(points_per_packet.max(1))
            .enumerate()
            .map(|(index, chunk)| TablePacket {
                index: index as u16,
                points: chunk.to_vec(),
            })
            .collect()
    }

    /// Number of packets [`CalibrationTable::packets`] would produce.
    pub fn packet_count(&self, points_per_packet: usize) -> usize {
        self.points.len().div_ceil(points_per_packet.max(1))
    }
}
