//! Serial transport tests over an in-memory stream.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Duration;

use tm02_host::{CommandError, Device, Transport, WireTransport};
use tm02_protocol::{
    Frame, ProtocolError, Response, StatusCode, CMD_ACK, CMD_GET_DEVICE_ID, CMD_GET_TEMPERATURE,
    CMD_GET_VOLTAGE, CMD_NACK, CMD_SAVE_PARAM, CMD_START_ACQ, CMD_STOP_ACQ, STATUS_BUSY,
    STATUS_OK,
};

/// Byte stream that hands out scripted chunks, then times out like an idle
/// serial port.
#[derive(Default)]
struct ScriptedPort {
    chunks: VecDeque<Vec<u8>>,
    written: Vec<u8>,
    eof: bool,
}

impl ScriptedPort {
    fn with_chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks: chunks.into(),
            ..Self::default()
        }
    }
}

impl Read for ScriptedPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.chunks.pop_front() {
            Some(chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.chunks.push_front(chunk[n..].to_vec());
                }
                Ok(n)
            }
            None if self.eof => Ok(0),
            None => {
                std::thread::sleep(Duration::from_millis(1));
                Err(io::Error::new(io::ErrorKind::TimedOut, "idle"))
            }
        }
    }
}

impl Write for ScriptedPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn temperature_frame(value: f32) -> Vec<u8> {
    Frame::new(CMD_GET_TEMPERATURE, value.to_le_bytes())
        .unwrap()
        .encode()
}

#[test]
fn test_receive_skips_leading_noise() {
    let mut bytes = vec![0x00, 0x13, 0x55, 0xFF];
    bytes.extend(temperature_frame(21.5));
    let mut transport = WireTransport::new(ScriptedPort::with_chunks(vec![bytes]));

    let frame = transport
        .receive(Duration::from_millis(100))
        .unwrap()
        .unwrap();
    assert_eq!(Response::decode(&frame).unwrap(), Response::Temperature(21.5));
}

#[test]
fn test_receive_assembles_split_frame() {
    let bytes = temperature_frame(-3.25);
    let chunks = bytes.chunks(3).map(|c| c.to_vec()).collect();
    let mut transport = WireTransport::new(ScriptedPort::with_chunks(chunks));

    let frame = transport
        .receive(Duration::from_millis(100))
        .unwrap()
        .unwrap();
    assert_eq!(frame.payload(), &(-3.25f32).to_le_bytes());
}

#[test]
fn test_corrupt_frame_is_no_response() {
    let mut bytes = temperature_frame(21.5);
    bytes[4] ^= 0x01;
    let mut transport = WireTransport::new(ScriptedPort::with_chunks(vec![bytes]));

    assert!(transport
        .receive(Duration::from_millis(20))
        .unwrap()
        .is_none());
}

#[test]
fn test_valid_frame_after_corrupt_one() {
    let mut bytes = temperature_frame(1.0);
    bytes[3] ^= 0x80;
    bytes.extend(temperature_frame(2.0));
    let mut transport = WireTransport::new(ScriptedPort::with_chunks(vec![bytes]));

    let frame = transport
        .receive(Duration::from_millis(100))
        .unwrap()
        .unwrap();
    assert_eq!(Response::decode(&frame).unwrap(), Response::Temperature(2.0));
}

#[test]
fn test_end_of_stream_is_no_response() {
    let port = ScriptedPort {
        eof: true,
        ..ScriptedPort::default()
    };
    let mut transport = WireTransport::new(port);
    assert!(transport.receive(Duration::from_secs(5)).unwrap().is_none());
}

#[test]
fn test_device_over_wire() {
    let ack = Frame::ack(CMD_START_ACQ, StatusCode::Ok).encode();
    let port = ScriptedPort::with_chunks(vec![temperature_frame(25.0), ack]);
    let mut device =
        Device::new(WireTransport::new(port)).with_response_timeout(Duration::from_millis(100));

    assert_eq!(device.temperature().unwrap(), 25.0);
    device.start_acquisition().unwrap();

    let written = device.into_transport().into_inner().unwrap().written;
    let mut expected = Frame::empty(CMD_GET_TEMPERATURE).encode();
    expected.extend(Frame::empty(CMD_START_ACQ).encode());
    assert_eq!(written, expected);
}

#[test]
fn test_wrong_response_code() {
    let port = ScriptedPort::with_chunks(vec![temperature_frame(25.0)]);
    let mut device =
        Device::new(WireTransport::new(port)).with_response_timeout(Duration::from_millis(50));

    assert!(matches!(
        device.voltage(),
        Err(CommandError::UnexpectedResponse {
            expected: CMD_GET_VOLTAGE,
            actual: CMD_GET_TEMPERATURE,
        })
    ));
}

#[test]
fn test_timeout_is_no_response() {
    let mut device = Device::new(WireTransport::new(ScriptedPort::default()))
        .with_response_timeout(Duration::from_millis(20));

    assert!(matches!(
        device.device_id(),
        Err(CommandError::NoResponse(_))
    ));
}

#[test]
fn test_frame_hidden_behind_stray_head() {
    let mut bytes = vec![0xAA, 0x03, 0x03];
    bytes.extend(Frame::empty(CMD_GET_DEVICE_ID).encode());
    let mut transport = WireTransport::new(ScriptedPort::with_chunks(vec![bytes]));

    let frame = transport
        .receive(Duration::from_millis(100))
        .unwrap()
        .unwrap();
    assert_eq!(frame.command(), CMD_GET_DEVICE_ID);
}

#[test]
fn test_long_stray_span_does_not_hold_frame() {
    let mut bytes = vec![0x13, 0xAA, 0xFF];
    bytes.extend(Frame::empty(CMD_GET_DEVICE_ID).encode());
    let mut transport = WireTransport::new(ScriptedPort::with_chunks(vec![bytes]));

    let frame = transport
        .receive(Duration::from_millis(100))
        .unwrap()
        .unwrap();
    assert_eq!(frame.command(), CMD_GET_DEVICE_ID);
}

fn device_answering(frames: Vec<Frame>) -> Device<WireTransport<ScriptedPort>> {
    let chunks = frames.iter().map(Frame::encode).collect();
    Device::new(WireTransport::new(ScriptedPort::with_chunks(chunks)))
        .with_response_timeout(Duration::from_millis(50))
}

#[test]
fn test_single_byte_ack_is_protocol_error() {
    let mut device = device_answering(vec![Frame::new(CMD_ACK, vec![STATUS_OK]).unwrap()]);

    assert!(matches!(
        device.start_acquisition(),
        Err(CommandError::Protocol(ProtocolError::PayloadTooShort {
            expected: 2,
            actual: 1,
        }))
    ));
}

#[test]
fn test_nack_is_rejected() {
    let mut device = device_answering(vec![
        Frame::new(CMD_NACK, vec![CMD_START_ACQ, STATUS_BUSY]).unwrap()
    ]);

    match device.start_acquisition() {
        Err(CommandError::Rejected { command, status }) => {
            assert_eq!(command, CMD_START_ACQ);
            assert_eq!(status, StatusCode::Busy);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_nack_with_ok_status_is_rejected() {
    let mut device = device_answering(vec![
        Frame::new(CMD_NACK, vec![CMD_STOP_ACQ, STATUS_OK]).unwrap()
    ]);

    assert!(matches!(
        device.stop_acquisition(),
        Err(CommandError::Rejected {
            command: CMD_STOP_ACQ,
            status: StatusCode::Ok,
        })
    ));
}

#[test]
fn test_data_reply_to_action_is_unexpected() {
    let mut device = device_answering(vec![Frame::new(
        CMD_GET_TEMPERATURE,
        25.0f32.to_le_bytes(),
    )
    .unwrap()]);

    assert!(matches!(
        device.start_acquisition(),
        Err(CommandError::UnexpectedResponse {
            expected: CMD_ACK,
            actual: CMD_GET_TEMPERATURE,
        })
    ));
}

#[test]
fn test_ack_for_other_command_is_unexpected() {
    // A late acknowledgement of an earlier save must not confirm this start
    let mut device = device_answering(vec![
        Frame::ack(CMD_SAVE_PARAM, StatusCode::Ok),
        Frame::ack(CMD_START_ACQ, StatusCode::Ok),
    ]);

    assert!(matches!(
        device.start_acquisition(),
        Err(CommandError::UnexpectedResponse {
            expected: CMD_START_ACQ,
            actual: CMD_SAVE_PARAM,
        })
    ));
}
