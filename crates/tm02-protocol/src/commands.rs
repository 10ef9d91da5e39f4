//! Commands that can be sent to the instrument.

use crate::constants::*;
use crate::error::ProtocolError;
use crate::frame::Frame;
use crate::table::TablePacket;
use crate::types::*;

/// Commands that can be sent to the instrument.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Read the device identifier.
    GetDeviceId,

    /// Read the current temperature.
    GetTemperature,

    /// Read the sensor voltage.
    GetVoltage,

    /// Read the loop output current.
    GetCurrent,

    /// Read the status block.
    GetStatus,

    /// Select the excitation source.
    SetCurrentSource(CurrentSource),

    /// Trim the 10 µA source (µA).
    SetCurrentAdjustLow(f32),

    /// Trim the 17 µA source (µA).
    SetCurrentAdjustHigh(f32),

    /// Temperature mapped to 4 mA.
    SetTempAt4mA(f32),

    /// Temperature mapped to 20 mA.
    SetTempAt20mA(f32),

    /// Start acquisition.
    StartAcquisition,

    /// Stop acquisition.
    StopAcquisition,

    /// Begin a table transfer.
    TableStart {
        /// Number of points that will follow.
        point_count: u16,
    },

    /// One table packet.
    TableData(TablePacket),

    /// Finish a table transfer.
    TableEnd,

    /// Persist parameters to flash.
    SaveParameters,

    /// Reload parameters from flash.
    LoadParameters,

    /// Restore factory defaults.
    ResetDefaults,
}

impl Command {
    /// The command code this command is sent with.
    pub fn code(&self) -> u8 {
        match self {
            Command::GetDeviceId => CMD_GET_DEVICE_ID,
            Command::GetTemperature => CMD_GET_TEMPERATURE,
            Command::GetVoltage => CMD_GET_VOLTAGE,
            Command::GetCurrent => CMD_GET_CURRENT,
            Command::GetStatus => CMD_GET_STATUS,
            Command::SetCurrentSource(_) => CMD_SET_CURRENT_SRC,
            Command::SetCurrentAdjustLow(_) => CMD_SET_CURRENT_ADJ_10,
            Command::SetCurrentAdjustHigh(_) => CMD_SET_CURRENT_ADJ_17,
            Command::SetTempAt4mA(_) => CMD_SET_4MA_TEMP,
            Command::SetTempAt20mA(_) => CMD_SET_20MA_TEMP,
            Command::StartAcquisition => CMD_START_ACQ,
            Command::StopAcquisition => CMD_STOP_ACQ,
            Command::TableStart { .. } => CMD_LOAD_TABLE_START,
            Command::TableData(_) => CMD_LOAD_TABLE_DATA,
            Command::TableEnd => CMD_LOAD_TABLE_END,
            Command::SaveParameters => CMD_SAVE_PARAM,
            Command::LoadParameters => CMD_LOAD_PARAM,
            Command::ResetDefaults => CMD_RESET_DEFAULT,
        }
    }

    /// Whether the instrument answers this command with a generic ACK.
    pub fn expects_ack(&self) -> bool {
        self.code() >= CMD_SET_CURRENT_SRC
    }

    /// Encode the command payload (without framing).
    pub fn encode_payload(&self) -> Vec<u8> {
        match self {
            Command::GetDeviceId
            | Command::GetTemperature
            | Command::GetVoltage
            | Command::GetCurrent
            | Command::GetStatus
            | Command::StartAcquisition
            | Command::StopAcquisition
            | Command::TableEnd
            | Command::SaveParameters
            | Command::LoadParameters
            | Command::ResetDefaults => Vec::new(),

            Command::SetCurrentSource(source) => vec![(*source).into()],

            Command::SetCurrentAdjustLow(value)
            | Command::SetCurrentAdjustHigh(value)
            | Command::SetTempAt4mA(value)
            | Command::SetTempAt20mA(value) => value.to_le_bytes().to_vec(),

            Command::TableStart { point_count } => point_count.to_le_bytes().to_vec(),

            Command::TableData(packet) => packet.encode(),
        }
    }

    /// Build the frame for this command.
    ///
    /// Fails only for a table packet too large for one frame.
    pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
        Frame::new(self.code(), self.encode_payload())
    }

    /// Parse a command frame as the instrument sees it.
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        let data = frame.payload();
        match frame.command() {
            CMD_GET_DEVICE_ID => Ok(Command::GetDeviceId),
            CMD_GET_TEMPERATURE => Ok(Command::GetTemperature),
            CMD_GET_VOLTAGE => Ok(Command::GetVoltage),
            CMD_GET_CURRENT => Ok(Command::GetCurrent),
            CMD_GET_STATUS => Ok(Command::GetStatus),

            CMD_SET_CURRENT_SRC => {
                require(data, 1)?;
                Ok(Command::SetCurrentSource(CurrentSource::from_bits(data[0])))
            }

            CMD_SET_CURRENT_ADJ_10 => Ok(Command::SetCurrentAdjustLow(read_f32(data)?)),
            CMD_SET_CURRENT_ADJ_17 => Ok(Command::SetCurrentAdjustHigh(read_f32(data)?)),
            CMD_SET_4MA_TEMP => Ok(Command::SetTempAt4mA(read_f32(data)?)),
            CMD_SET_20MA_TEMP => Ok(Command::SetTempAt20mA(read_f32(data)?)),

            CMD_START_ACQ => Ok(Command::StartAcquisition),
            CMD_STOP_ACQ => Ok(Command::StopAcquisition),

            CMD_LOAD_TABLE_START => {
                require(data, 2)?;
                Ok(Command::TableStart {
                    point_count: u16::from_le_bytes([data[0], data[1]]),
                })
            }
            CMD_LOAD_TABLE_DATA => Ok(Command::TableData(TablePacket::decode(data)?)),
            CMD_LOAD_TABLE_END => Ok(Command::TableEnd),

            CMD_SAVE_PARAM => Ok(Command::SaveParameters),
            CMD_LOAD_PARAM => Ok(Command::LoadParameters),
            CMD_RESET_DEFAULT => Ok(Command::ResetDefaults),

            code => Err(ProtocolError::UnknownCommand(code)),
        }
    }
}

fn require(data: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if data.len() < expected {
        return Err(ProtocolError::PayloadTooShort {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

pub(crate) fn read_f32(data: &[u8]) -> Result<f32, ProtocolError> {
    require(data, FLOAT_PAYLOAD_SIZE)?;
    Ok(f32::from_le_bytes([data[0], data[1], data[2], data[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TablePoint;

    #[test]
    fn test_query_payloads_are_empty() {
        for cmd in [
            Command::GetDeviceId,
            Command::GetTemperature,
            Command::GetVoltage,
            Command::GetCurrent,
            Command::GetStatus,
        ] {
            assert!(cmd.encode_payload().is_empty());
            assert!(!cmd.expects_ack());
        }
    }

    #[test]
    fn test_float_setter_payload() {
        let cmd = Command::SetTempAt4mA(-271.0);
        assert_eq!(cmd.code(), CMD_SET_4MA_TEMP);
        assert_eq!(cmd.encode_payload(), vec![0x00, 0x80, 0x87, 0xC3]);
        assert!(cmd.expects_ack());
    }

    #[test]
    fn test_table_start_payload() {
        let cmd = Command::TableStart { point_count: 4871 };
        assert_eq!(cmd.encode_payload(), 4871u16.to_le_bytes().to_vec());
    }

    #[test]
    fn test_decode_round_trip() {
        let packet = TablePacket {
            index: 3,
            points: vec![TablePoint::new(1400.0, 80.0), TablePoint::new(1398.0, 81.0)],
        };
        let commands = vec![
            Command::GetStatus,
            Command::SetCurrentSource(CurrentSource::High),
            Command::SetCurrentAdjustLow(0.25),
            Command::SetCurrentAdjustHigh(-0.5),
            Command::SetTempAt20mA(227.0),
            Command::TableStart { point_count: 100 },
            Command::TableData(packet),
            Command::ResetDefaults,
        ];
        for cmd in commands {
            let frame = cmd.to_frame().unwrap();
            assert_eq!(Command::decode(&frame).unwrap(), cmd);
        }
    }

    #[test]
    fn test_decode_unknown_command() {
        let frame = Frame::empty(0x7E);
        assert_eq!(
            Command::decode(&frame),
            Err(ProtocolError::UnknownCommand(0x7E))
        );
    }

    #[test]
    fn test_decode_short_setter() {
        let frame = Frame::new(CMD_SET_CURRENT_ADJ_10, vec![0x00, 0x00]).unwrap();
        assert_eq!(
            Command::decode(&frame),
            Err(ProtocolError::PayloadTooShort {
                expected: 4,
                actual: 2
            })
        );
    }

    #[test]
    fn test_decode_masks_current_source() {
        let frame = Frame::new(CMD_SET_CURRENT_SRC, vec![0x03]).unwrap();
        assert_eq!(
            Command::decode(&frame).unwrap(),
            Command::SetCurrentSource(CurrentSource::High)
        );
    }
}
