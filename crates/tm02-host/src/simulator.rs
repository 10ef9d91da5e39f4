//! Simulated instrument.
//!
//! [`SimulatedTransport`] answers commands the way an Ultra-TM02 would,
//! without any hardware. Responses are computed directly from the decoded
//! command; no bytes are encoded or parsed on the way back.

use std::thread;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tm02_protocol::{
    Command, CurrentSource, DeviceStatus, Frame, ProtocolError, Response, StatusCode, TablePoint,
};
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::transport::Transport;

/// Identifier the simulated instrument reports.
pub const SIMULATOR_DEVICE_ID: &str = "ULTRA-TM02-SIM01";

/// Per-query temperature drift bound while running (°C).
pub const TEMPERATURE_STEP: f32 = 0.5;

/// Per-query voltage drift bound while running (mV).
pub const VOLTAGE_STEP: f32 = 1.0;

const FACTORY_TEMPERATURE: f32 = 25.0;
const FACTORY_VOLTAGE: f32 = 580.0;
const FACTORY_CURRENT: f32 = 12.0;

/// Simulator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Artificial response latency in milliseconds.
    pub latency_ms: u64,
    /// Seed for the random drift; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            latency_ms: 50,
            seed: None,
        }
    }
}

/// Configurable parameters, as persisted by save/load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedParameters {
    /// Selected excitation source.
    pub current_source: CurrentSource,
    /// 10 µA source trim.
    pub current_adjust_low: f32,
    /// 17 µA source trim.
    pub current_adjust_high: f32,
    /// Temperature mapped to 4 mA.
    pub temp_at_4ma: f32,
    /// Temperature mapped to 20 mA.
    pub temp_at_20ma: f32,
}

impl Default for SimulatedParameters {
    fn default() -> Self {
        Self {
            current_source: CurrentSource::Low,
            current_adjust_low: 0.0,
            current_adjust_high: 0.0,
            temp_at_4ma: -271.0,
            temp_at_20ma: 227.0,
        }
    }
}

/// Observable state of the simulated instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedState {
    /// Reported identifier.
    pub device_id: String,
    /// Temperature (°C).
    pub temperature: f32,
    /// Sensor voltage (mV).
    pub voltage: f32,
    /// Last computed loop current (mA).
    pub current: f32,
    /// Acquisition running.
    pub running: bool,
    /// Configurable parameters.
    pub params: SimulatedParameters,
}

impl Default for SimulatedState {
    fn default() -> Self {
        Self {
            device_id: SIMULATOR_DEVICE_ID.to_string(),
            temperature: FACTORY_TEMPERATURE,
            voltage: FACTORY_VOLTAGE,
            current: FACTORY_CURRENT,
            running: false,
            params: SimulatedParameters::default(),
        }
    }
}

impl SimulatedState {
    /// Recompute the loop current from the temperature and the 4/20 mA
    /// points. Left unchanged when both points coincide.
    fn update_current(&mut self) {
        let span = self.params.temp_at_20ma - self.params.temp_at_4ma;
        if span != 0.0 {
            let ratio = (self.temperature - self.params.temp_at_4ma) / span;
            self.current = (4.0 + ratio * 16.0).clamp(4.0, 20.0);
        }
    }
}

/// Transport backed by an in-process simulated instrument.
pub struct SimulatedTransport {
    connected: bool,
    latency: Duration,
    rng: ChaCha8Rng,
    state: SimulatedState,
    /// Parameters held in simulated flash.
    saved: Option<SimulatedParameters>,
    /// Points received since the last table start.
    staging: Vec<TablePoint>,
    /// Points committed by the last table end.
    stored_table: Vec<TablePoint>,
    pending: Option<Frame>,
}

impl SimulatedTransport {
    /// Create a connected simulator.
    pub fn new(config: &SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            connected: true,
            latency: Duration::from_millis(config.latency_ms),
            rng,
            state: SimulatedState::default(),
            saved: None,
            staging: Vec::new(),
            stored_table: Vec::new(),
            pending: None,
        }
    }

    /// Current simulated state.
    pub fn state(&self) -> &SimulatedState {
        &self.state
    }

    /// Mutable access to the simulated state, for staging scenarios.
    pub fn state_mut(&mut self) -> &mut SimulatedState {
        &mut self.state
    }

    /// Calibration table committed by the last completed transfer.
    pub fn stored_table(&self) -> &[TablePoint] {
        &self.stored_table
    }

    fn respond(&mut self, frame: &Frame) -> Response {
        let code = frame.command();
        let command = match Command::decode(frame) {
            Ok(command) => command,
            Err(ProtocolError::UnknownCommand(_)) => {
                warn!(command = code, "simulator: unknown command");
                return ack(code, StatusCode::InvalidCommand);
            }
            Err(err) => {
                // Short parameters are acknowledged and ignored
                debug!(command = code, %err, "simulator: ignoring malformed parameters");
                return ack(code, StatusCode::Ok);
            }
        };

        let state = &mut self.state;
        match command {
            Command::GetDeviceId => return Response::DeviceId(state.device_id.clone()),
            Command::GetTemperature => {
                if state.running {
                    state.temperature += self
                        .rng
                        .gen_range(-TEMPERATURE_STEP..=TEMPERATURE_STEP);
                }
                return Response::Temperature(state.temperature);
            }
            Command::GetVoltage => {
                if state.running {
                    state.voltage += self.rng.gen_range(-VOLTAGE_STEP..=VOLTAGE_STEP);
                }
                return Response::Voltage(state.voltage);
            }
            Command::GetCurrent => {
                state.update_current();
                return Response::Current(state.current);
            }
            Command::GetStatus => {
                return Response::Status(DeviceStatus {
                    running: state.running,
                    current_source: state.params.current_source,
                    probe_ok: true,
                    sample_count: self.rng.gen_range(1..=1000),
                })
            }

            Command::SetCurrentSource(source) => {
                info!(%source, "simulator: current source set");
                state.params.current_source = source;
            }
            Command::SetCurrentAdjustLow(value) => {
                info!(value, "simulator: 10 µA adjustment set");
                state.params.current_adjust_low = value;
            }
            Command::SetCurrentAdjustHigh(value) => {
                info!(value, "simulator: 17 µA adjustment set");
                state.params.current_adjust_high = value;
            }
            Command::SetTempAt4mA(value) => {
                info!(value, "simulator: 4 mA point set");
                state.params.temp_at_4ma = value;
            }
            Command::SetTempAt20mA(value) => {
                info!(value, "simulator: 20 mA point set");
                state.params.temp_at_20ma = value;
            }

            Command::StartAcquisition => {
                info!("simulator: acquisition started");
                state.running = true;
            }
            Command::StopAcquisition => {
                info!("simulator: acquisition stopped");
                state.running = false;
            }

            Command::TableStart { point_count } => {
                info!(point_count, "simulator: table transfer started");
                self.staging.clear();
            }
            Command::TableData(packet) => {
                debug!(index = packet.index, points = packet.points.len(), "simulator: table packet");
                self.staging.extend(packet.points);
            }
            Command::TableEnd => {
                info!(points = self.staging.len(), "simulator: table transfer complete");
                self.stored_table = std::mem::take(&mut self.staging);
            }

            Command::SaveParameters => {
                info!("simulator: parameters saved");
                self.saved = Some(state.params);
            }
            Command::LoadParameters => {
                info!("simulator: parameters loaded");
                state.params = self.saved.unwrap_or_default();
            }
            Command::ResetDefaults => {
                info!("simulator: factory defaults restored");
                state.params = SimulatedParameters::default();
                state.temperature = FACTORY_TEMPERATURE;
                state.voltage = FACTORY_VOLTAGE;
            }
        }

        ack(code, StatusCode::Ok)
    }
}

fn ack(command: u8, status: StatusCode) -> Response {
    Response::Ack { command, status }
}

impl Transport for SimulatedTransport {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        debug!(
            command = frame.command(),
            payload = %hex::encode_upper(frame.payload()),
            "simulator: command received"
        );
        let response = self.respond(frame);
        self.pending = Some(response.to_frame()?);
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Frame>, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        match self.pending.take() {
            Some(frame) if self.latency <= timeout => {
                thread::sleep(self.latency);
                Ok(Some(frame))
            }
            _ => {
                thread::sleep(timeout);
                Ok(None)
            }
        }
    }

    fn disconnect(&mut self) {
        if self.connected {
            info!("disconnected from simulated instrument");
        }
        self.connected = false;
        self.state.running = false;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tm02_protocol::{CMD_ACK, CMD_GET_TEMPERATURE};

    fn simulator() -> SimulatedTransport {
        SimulatedTransport::new(&SimulatorConfig {
            latency_ms: 0,
            seed: Some(7),
        })
    }

    fn exchange(sim: &mut SimulatedTransport, command: Command) -> Response {
        sim.send(&command.to_frame().unwrap()).unwrap();
        let frame = sim.receive(Duration::from_millis(10)).unwrap().unwrap();
        Response::decode(&frame).unwrap()
    }

    #[test]
    fn test_factory_state() {
        let sim = simulator();
        let state = sim.state();
        assert_eq!(state.device_id, "ULTRA-TM02-SIM01");
        assert_eq!(state.temperature, 25.0);
        assert_eq!(state.voltage, 580.0);
        assert_eq!(state.current, 12.0);
        assert!(!state.running);
        assert_eq!(state.params, SimulatedParameters::default());
    }

    #[test]
    fn test_temperature_is_stable_when_stopped() {
        let mut sim = simulator();
        for _ in 0..5 {
            assert_eq!(
                exchange(&mut sim, Command::GetTemperature),
                Response::Temperature(25.0)
            );
        }
    }

    #[test]
    fn test_receive_without_request_times_out() {
        let mut sim = simulator();
        assert!(sim.receive(Duration::from_millis(1)).unwrap().is_none());
    }

    #[test]
    fn test_latency_beyond_timeout_is_no_response() {
        let mut sim = SimulatedTransport::new(&SimulatorConfig {
            latency_ms: 50,
            seed: Some(1),
        });
        sim.send(&Frame::empty(CMD_GET_TEMPERATURE)).unwrap();
        assert!(sim.receive(Duration::from_millis(5)).unwrap().is_none());
    }

    #[test]
    fn test_unknown_command_is_acked_invalid() {
        let mut sim = simulator();
        sim.send(&Frame::empty(0x7E)).unwrap();
        let frame = sim.receive(Duration::from_millis(10)).unwrap().unwrap();
        assert_eq!(frame.command(), CMD_ACK);
        assert_eq!(frame.payload(), &[0x7E, 0x01]);
    }

    #[test]
    fn test_short_setter_is_acked_without_change() {
        let mut sim = simulator();
        sim.send(&Frame::new(0x20, vec![0x00, 0x00]).unwrap()).unwrap();
        let frame = sim.receive(Duration::from_millis(10)).unwrap().unwrap();
        assert_eq!(frame.payload(), &[0x20, 0x00]);
        assert_eq!(sim.state().params.temp_at_4ma, -271.0);
    }

    #[test]
    fn test_save_and_load_parameters() {
        let mut sim = simulator();
        exchange(&mut sim, Command::SetTempAt4mA(-200.0));
        exchange(&mut sim, Command::SaveParameters);
        exchange(&mut sim, Command::SetTempAt4mA(0.0));
        exchange(&mut sim, Command::LoadParameters);
        assert_eq!(sim.state().params.temp_at_4ma, -200.0);
    }

    #[test]
    fn test_load_without_save_restores_defaults() {
        let mut sim = simulator();
        exchange(&mut sim, Command::SetCurrentSource(CurrentSource::High));
        exchange(&mut sim, Command::LoadParameters);
        assert_eq!(sim.state().params, SimulatedParameters::default());
    }

    #[test]
    fn test_disconnect_stops_acquisition() {
        let mut sim = simulator();
        exchange(&mut sim, Command::StartAcquisition);
        assert!(sim.state().running);
        sim.disconnect();
        assert!(!sim.state().running);
        assert!(matches!(
            sim.send(&Frame::empty(CMD_GET_TEMPERATURE)),
            Err(TransportError::NotConnected)
        ));
    }
}
