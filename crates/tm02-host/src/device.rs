//! Command layer.
//!
//! [`Device`] turns the request/response exchange into typed operations.
//! Exactly one command is in flight at a time: each operation sends one
//! frame and blocks until the matching response arrives or the response
//! timeout passes. Nothing is retried.

use std::fmt;
use std::time::Duration;

use tm02_protocol::{
    CalibrationTable, Command, CurrentSource, DeviceStatus, Frame, Response, TablePacket, CMD_ACK,
    CMD_NACK, MAX_POINTS_PER_PACKET,
};
use tracing::{debug, info, warn};

use crate::config::HostConfig;
use crate::error::{CommandError, TransportError, UploadError};
use crate::transport::{self, Endpoint, Transport};

/// Default time to wait for a response.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Device over whichever transport [`transport::connect`] picked.
pub type AnyDevice = Device<Box<dyn Transport>>;

/// Outcome of a successful table download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    /// Points sent.
    pub points: usize,
    /// Packets sent.
    pub packets: usize,
}

impl fmt::Display for UploadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "download complete: {} points in {} packets",
            self.points, self.packets
        )
    }
}

/// Typed access to an Ultra-TM02 over a [`Transport`].
pub struct Device<T: Transport> {
    transport: T,
    response_timeout: Duration,
    points_per_packet: usize,
}

impl AnyDevice {
    /// Connect to `endpoint` using the settings in `config`.
    pub fn connect(endpoint: &Endpoint, config: &HostConfig) -> Result<Self, TransportError> {
        let transport = transport::connect(endpoint, config.baud, &config.simulator)?;
        Ok(Device::new(transport)
            .with_response_timeout(config.response_timeout())
            .with_points_per_packet(config.points_per_packet))
    }
}

impl<T: Transport> Device<T> {
    /// Wrap an open transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            points_per_packet: MAX_POINTS_PER_PACKET,
        }
    }

    /// Set the response timeout.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set the number of points per table packet.
    ///
    /// Values are clamped to `1..=MAX_POINTS_PER_PACKET`, the most that fit
    /// in one frame.
    pub fn with_points_per_packet(mut self, points: usize) -> Self {
        let clamped = points.clamp(1, MAX_POINTS_PER_PACKET);
        if clamped != points {
            warn!(
                requested = points,
                used = clamped,
                "points per packet out of range, clamped"
            );
        }
        self.points_per_packet = clamped;
        self
    }

    /// Points sent per table packet.
    pub fn points_per_packet(&self) -> usize {
        self.points_per_packet
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give back the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Whether the transport is open.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Close the transport.
    pub fn disconnect(&mut self) {
        self.transport.disconnect();
    }

    // ========================================================================
    // Exchange
    // ========================================================================

    /// Send a raw command and wait for one response frame.
    pub fn send_command(&mut self, code: u8, payload: &[u8]) -> Result<Frame, CommandError> {
        let frame = Frame::new(code, payload)?;
        self.exchange(&frame)
    }

    fn exchange(&mut self, frame: &Frame) -> Result<Frame, CommandError> {
        debug!(command = frame.command(), "request");
        self.transport.send(frame)?;
        match self.transport.receive(self.response_timeout)? {
            Some(response) => Ok(response),
            None => {
                warn!(command = frame.command(), "no response");
                Err(CommandError::NoResponse(self.response_timeout))
            }
        }
    }

    fn execute(&mut self, command: &Command) -> Result<Frame, CommandError> {
        let frame = command.to_frame()?;
        self.exchange(&frame)
    }

    /// Run a query and pull the expected value out of its response, which
    /// must echo the command code.
    fn query<R>(
        &mut self,
        command: Command,
        extract: impl FnOnce(Response) -> Option<R>,
    ) -> Result<R, CommandError> {
        let code = command.code();
        let frame = self.execute(&command)?;
        let unexpected = CommandError::UnexpectedResponse {
            expected: code,
            actual: frame.command(),
        };
        if frame.command() != code {
            return Err(unexpected);
        }
        extract(Response::decode(&frame)?).ok_or(unexpected)
    }

    /// Run a setting or action and check its generic ACK.
    ///
    /// The ACK must echo `command`; an acknowledgement of some other command
    /// is a late reply to an earlier exchange.
    fn acknowledged(&mut self, command: Command) -> Result<(), CommandError> {
        let code = command.code();
        let frame = self.execute(&command)?;
        let unexpected = CommandError::UnexpectedResponse {
            expected: CMD_ACK,
            actual: frame.command(),
        };
        if frame.command() != CMD_ACK && frame.command() != CMD_NACK {
            return Err(unexpected);
        }
        let (echoed, status) = match Response::decode(&frame)? {
            Response::Ack { command, status } | Response::Nack { command, status } => {
                (command, status)
            }
            _ => return Err(unexpected),
        };
        if echoed != code {
            warn!(command = code, echoed, "acknowledgement for another command");
            return Err(CommandError::UnexpectedResponse {
                expected: code,
                actual: echoed,
            });
        }
        if frame.command() == CMD_ACK && status.is_ok() {
            return Ok(());
        }
        warn!(command = code, %status, "command rejected");
        Err(CommandError::Rejected {
            command: code,
            status,
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Read the device identifier.
    pub fn device_id(&mut self) -> Result<String, CommandError> {
        self.query(Command::GetDeviceId, |response| match response {
            Response::DeviceId(id) => Some(id),
            _ => None,
        })
    }

    /// Read the temperature (°C).
    pub fn temperature(&mut self) -> Result<f32, CommandError> {
        self.query(Command::GetTemperature, |response| match response {
            Response::Temperature(value) => Some(value),
            _ => None,
        })
    }

    /// Read the sensor voltage (mV).
    pub fn voltage(&mut self) -> Result<f32, CommandError> {
        self.query(Command::GetVoltage, |response| match response {
            Response::Voltage(value) => Some(value),
            _ => None,
        })
    }

    /// Read the loop output current (mA).
    pub fn output_current(&mut self) -> Result<f32, CommandError> {
        self.query(Command::GetCurrent, |response| match response {
            Response::Current(value) => Some(value),
            _ => None,
        })
    }

    /// Read the status block.
    pub fn status(&mut self) -> Result<DeviceStatus, CommandError> {
        self.query(Command::GetStatus, |response| match response {
            Response::Status(status) => Some(status),
            _ => None,
        })
    }

    // ========================================================================
    // Settings and actions
    // ========================================================================

    /// Select the excitation source.
    pub fn set_current_source(&mut self, source: CurrentSource) -> Result<(), CommandError> {
        self.acknowledged(Command::SetCurrentSource(source))
    }

    /// Select the excitation source from a raw selector; only the low bit
    /// is sent.
    pub fn set_current_source_raw(&mut self, value: u8) -> Result<(), CommandError> {
        if value > 1 {
            debug!(value, "current source selector masked to low bit");
        }
        self.set_current_source(CurrentSource::from_bits(value))
    }

    /// Trim the 10 µA source.
    pub fn set_current_adjust_low(&mut self, value: f32) -> Result<(), CommandError> {
        self.acknowledged(Command::SetCurrentAdjustLow(value))
    }

    /// Trim the 17 µA source.
    pub fn set_current_adjust_high(&mut self, value: f32) -> Result<(), CommandError> {
        self.acknowledged(Command::SetCurrentAdjustHigh(value))
    }

    /// Set the temperature mapped to 4 mA.
    pub fn set_temp_at_4ma(&mut self, temperature: f32) -> Result<(), CommandError> {
        self.acknowledged(Command::SetTempAt4mA(temperature))
    }

    /// Set the temperature mapped to 20 mA.
    pub fn set_temp_at_20ma(&mut self, temperature: f32) -> Result<(), CommandError> {
        self.acknowledged(Command::SetTempAt20mA(temperature))
    }

    /// Start continuous sampling.
    pub fn start_acquisition(&mut self) -> Result<(), CommandError> {
        self.acknowledged(Command::StartAcquisition)
    }

    /// Stop sampling; readings hold their last value.
    pub fn stop_acquisition(&mut self) -> Result<(), CommandError> {
        self.acknowledged(Command::StopAcquisition)
    }

    /// Persist the current parameters to flash.
    pub fn save_parameters(&mut self) -> Result<(), CommandError> {
        self.acknowledged(Command::SaveParameters)
    }

    /// Reload parameters from flash.
    pub fn load_parameters(&mut self) -> Result<(), CommandError> {
        self.acknowledged(Command::LoadParameters)
    }

    /// Restore factory defaults.
    pub fn reset_defaults(&mut self) -> Result<(), CommandError> {
        self.acknowledged(Command::ResetDefaults)
    }

    // ========================================================================
    // Calibration table transfer
    // ========================================================================

    /// Announce a table download of `point_count` points.
    pub fn table_start(&mut self, point_count: u16) -> Result<(), CommandError> {
        self.acknowledged(Command::TableStart { point_count })
    }

    /// Send one packet of table points.
    pub fn table_data(&mut self, packet: TablePacket) -> Result<(), CommandError> {
        self.acknowledged(Command::TableData(packet))
    }

    /// Finish a table download so the instrument commits it.
    pub fn table_end(&mut self) -> Result<(), CommandError> {
        self.acknowledged(Command::TableEnd)
    }

    /// Download `table` to the instrument.
    ///
    /// Sends start, then every packet in order, then end. `progress` is
    /// called with `(packets_sent, total_packets)` after each acknowledged
    /// packet. The first failure aborts the transfer; a new download has to
    /// start over from the beginning.
    pub fn download_table<F>(
        &mut self,
        table: &CalibrationTable,
        mut progress: F,
    ) -> Result<UploadSummary, UploadError>
    where
        F: FnMut(usize, usize),
    {
        if table.is_empty() {
            return Err(UploadError::EmptyTable);
        }

        let packets = table.packets(self.points_per_packet);
        let total = packets.len();
        info!(
            points = table.len(),
            packets = total,
            "starting calibration table download"
        );

        // Tables never exceed MAX_TABLE_POINTS, which fits in a u16
        self.table_start(table.len() as u16)
            .map_err(UploadError::Start)?;

        for (sent, packet) in packets.into_iter().enumerate() {
            let index = packet.index;
            self.table_data(packet)
                .map_err(|source| UploadError::Packet { index, source })?;
            progress(sent + 1, total);
        }

        self.table_end().map_err(UploadError::End)?;

        let summary = UploadSummary {
            points: table.len(),
            packets: total,
        };
        info!("{}", summary);
        Ok(summary)
    }

    /// [`Device::download_table`] reduced to a success flag and a message
    /// for display.
    pub fn upload_table<F>(&mut self, table: &CalibrationTable, progress: F) -> (bool, String)
    where
        F: FnMut(usize, usize),
    {
        match self.download_table(table, progress) {
            Ok(summary) => (true, summary.to_string()),
            Err(err) => {
                warn!(%err, "calibration table download failed");
                (false, err.to_string())
            }
        }
    }
}
