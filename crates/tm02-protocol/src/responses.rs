//! Responses from the instrument.

use crate::commands::read_f32;
use crate::constants::*;
use crate::error::ProtocolError;
use crate::frame::Frame;
use crate::types::*;

/// Frames the instrument sends back to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Device identifier string, trailing NUL padding removed.
    DeviceId(String),

    /// Temperature reading (°C).
    Temperature(f32),

    /// Sensor voltage (mV).
    Voltage(f32),

    /// Loop output current (mA).
    Current(f32),

    /// Status block.
    Status(DeviceStatus),

    /// Generic acknowledgement.
    Ack {
        /// Command being acknowledged.
        command: u8,
        /// Result of the command.
        status: StatusCode,
    },

    /// Negative acknowledgement.
    Nack {
        /// Command being rejected.
        command: u8,
        /// Reason.
        status: StatusCode,
    },

    /// Unsolicited telemetry.
    DataReport(DataReport),
}

impl Response {
    /// Decode a response from a frame.
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        let data = frame.payload();
        match frame.command() {
            CMD_GET_DEVICE_ID => {
                let text = std::str::from_utf8(data).map_err(|_| ProtocolError::InvalidUtf8)?;
                Ok(Response::DeviceId(text.trim_end_matches('\0').to_string()))
            }

            CMD_GET_TEMPERATURE => Ok(Response::Temperature(read_f32(data)?)),
            CMD_GET_VOLTAGE => Ok(Response::Voltage(read_f32(data)?)),
            CMD_GET_CURRENT => Ok(Response::Current(read_f32(data)?)),

            CMD_GET_STATUS => {
                if data.len() < STATUS_PAYLOAD_SIZE {
                    return Err(ProtocolError::PayloadTooShort {
                        expected: STATUS_PAYLOAD_SIZE,
                        actual: data.len(),
                    });
                }
                if data[1] > 1 {
                    log::debug!(
                        "status current source byte 0x{:02X} masked to low bit",
                        data[1]
                    );
                }
                Ok(Response::Status(DeviceStatus {
                    running: data[0] != 0,
                    current_source: CurrentSource::from_bits(data[1]),
                    probe_ok: data[2] != 0,
                    sample_count: u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
                }))
            }

            CMD_ACK | CMD_NACK => {
                if data.len() < ACK_PAYLOAD_SIZE {
                    return Err(ProtocolError::PayloadTooShort {
                        expected: ACK_PAYLOAD_SIZE,
                        actual: data.len(),
                    });
                }
                let command = data[0];
                let status = StatusCode::from(data[1]);
                if frame.command() == CMD_ACK {
                    Ok(Response::Ack { command, status })
                } else {
                    Ok(Response::Nack { command, status })
                }
            }

            CMD_DATA_REPORT => {
                if data.len() < DATA_REPORT_PAYLOAD_SIZE {
                    return Err(ProtocolError::PayloadTooShort {
                        expected: DATA_REPORT_PAYLOAD_SIZE,
                        actual: data.len(),
                    });
                }
                Ok(Response::DataReport(DataReport {
                    temperature: read_f32(&data[0..4])?,
                    voltage: read_f32(&data[4..8])?,
                    current: read_f32(&data[8..12])?,
                }))
            }

            code => Err(ProtocolError::UnknownResponse(code)),
        }
    }

    /// Build the frame the instrument would send for this response.
    pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
        match self {
            Response::DeviceId(id) => Frame::new(CMD_GET_DEVICE_ID, id.as_bytes()),
            Response::Temperature(value) => Frame::new(CMD_GET_TEMPERATURE, value.to_le_bytes()),
            Response::Voltage(value) => Frame::new(CMD_GET_VOLTAGE, value.to_le_bytes()),
            Response::Current(value) => Frame::new(CMD_GET_CURRENT, value.to_le_bytes()),
            Response::Status(status) => Frame::new(CMD_GET_STATUS, status.encode()),
            Response::Ack { command, status } => Ok(Frame::ack(*command, *status)),
            Response::Nack { command, status } => {
                Frame::new(CMD_NACK, vec![*command, (*status).into()])
            }
            Response::DataReport(report) => {
                let mut buf = Vec::with_capacity(DATA_REPORT_PAYLOAD_SIZE);
                buf.extend_from_slice(&report.temperature.to_le_bytes());
                buf.extend_from_slice(&report.voltage.to_le_bytes());
                buf.extend_from_slice(&report.current.to_le_bytes());
                Frame::new(CMD_DATA_REPORT, buf)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_trims_padding() {
        let frame = Frame::new(CMD_GET_DEVICE_ID, b"TM02-00000001\0\0\0".to_vec()).unwrap();
        assert_eq!(
            Response::decode(&frame).unwrap(),
            Response::DeviceId("TM02-00000001".to_string())
        );
    }

    #[test]
    fn test_device_id_invalid_utf8() {
        let frame = Frame::new(CMD_GET_DEVICE_ID, vec![0xFF, 0xFE]).unwrap();
        assert_eq!(Response::decode(&frame), Err(ProtocolError::InvalidUtf8));
    }

    #[test]
    fn test_temperature() {
        let frame = Frame::new(CMD_GET_TEMPERATURE, 25.0f32.to_le_bytes()).unwrap();
        assert_eq!(Response::decode(&frame).unwrap(), Response::Temperature(25.0));
    }

    #[test]
    fn test_float_too_short() {
        let frame = Frame::new(CMD_GET_VOLTAGE, vec![0x00, 0x00, 0x11]).unwrap();
        assert_eq!(
            Response::decode(&frame),
            Err(ProtocolError::PayloadTooShort {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_status_layout() {
        let payload = [1, 1, 1, 0, 0xE8, 0x03, 0x00, 0x00];
        let frame = Frame::new(CMD_GET_STATUS, payload).unwrap();
        assert_eq!(
            Response::decode(&frame).unwrap(),
            Response::Status(DeviceStatus {
                running: true,
                current_source: CurrentSource::High,
                probe_ok: true,
                sample_count: 1000,
            })
        );
    }

    #[test]
    fn test_status_source_byte_uses_low_bit() {
        let source = |byte: u8| {
            let frame = Frame::new(CMD_GET_STATUS, [0, byte, 1, 0, 0, 0, 0, 0]).unwrap();
            match Response::decode(&frame).unwrap() {
                Response::Status(status) => status.current_source,
                other => panic!("unexpected response: {:?}", other),
            }
        };
        assert_eq!(source(0x02), CurrentSource::Low);
        assert_eq!(source(0x03), CurrentSource::High);
        assert_eq!(source(0xFF), CurrentSource::High);
    }

    #[test]
    fn test_ack_and_nack() {
        let ack = Frame::new(CMD_ACK, vec![CMD_START_ACQ, STATUS_OK]).unwrap();
        assert_eq!(
            Response::decode(&ack).unwrap(),
            Response::Ack {
                command: CMD_START_ACQ,
                status: StatusCode::Ok
            }
        );

        let nack = Frame::new(CMD_NACK, vec![CMD_LOAD_TABLE_DATA, STATUS_TABLE_ERROR]).unwrap();
        assert_eq!(
            Response::decode(&nack).unwrap(),
            Response::Nack {
                command: CMD_LOAD_TABLE_DATA,
                status: StatusCode::TableError
            }
        );
    }

    #[test]
    fn test_single_byte_ack_is_too_short() {
        let ack = Frame::new(CMD_ACK, vec![STATUS_OK]).unwrap();
        assert!(matches!(
            Response::decode(&ack),
            Err(ProtocolError::PayloadTooShort { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_data_report_round_trip() {
        let report = Response::DataReport(DataReport {
            temperature: 21.5,
            voltage: 1012.25,
            current: 11.75,
        });
        let frame = report.to_frame().unwrap();
        assert_eq!(frame.payload().len(), DATA_REPORT_PAYLOAD_SIZE);
        assert_eq!(Response::decode(&frame).unwrap(), report);
    }

    #[test]
    fn test_unknown_response() {
        assert_eq!(
            Response::decode(&Frame::empty(0x33)),
            Err(ProtocolError::UnknownResponse(0x33))
        );
    }
}
