//! Transport abstraction.
//!
//! A transport moves whole frames to and from the instrument. There are two
//! implementations: [`WireTransport`] talks to a real serial port, and
//! [`SimulatedTransport`] fabricates the instrument's answers in-process.
//! Callers pick one through an [`Endpoint`], where the reserved name
//! [`SIMULATOR_ENDPOINT`] selects the simulator.

use std::fmt;
use std::time::Duration;

use tm02_protocol::Frame;
use tracing::{info, warn};

use crate::error::TransportError;
use crate::simulator::{SimulatedTransport, SimulatorConfig};
use crate::wire::WireTransport;

/// Reserved endpoint name that selects the simulated instrument.
pub const SIMULATOR_ENDPOINT: &str = "[simulator]";

/// Half-duplex frame channel to the instrument.
///
/// Every operation blocks the calling thread. `receive` waits at most
/// `timeout` for a complete, checksum-valid frame.
pub trait Transport {
    /// Whether the channel is open.
    fn is_connected(&self) -> bool;

    /// Send one frame.
    fn send(&mut self, frame: &Frame) -> Result<(), TransportError>;

    /// Wait for the next valid frame. `Ok(None)` means nothing valid
    /// arrived in time.
    fn receive(&mut self, timeout: Duration) -> Result<Option<Frame>, TransportError>;

    /// Close the channel. Closing twice is harmless.
    fn disconnect(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
        (**self).send(frame)
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Frame>, TransportError> {
        (**self).receive(timeout)
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }
}

/// Where to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// In-process simulated instrument.
    Simulator,
    /// Serial port by OS name (e.g. `/dev/ttyACM0`, `COM3`).
    Serial(String),
}

impl Endpoint {
    /// Interpret an endpoint name as listed by [`list_endpoints`].
    pub fn parse(name: &str) -> Self {
        if name == SIMULATOR_ENDPOINT {
            Endpoint::Simulator
        } else {
            Endpoint::Serial(name.to_string())
        }
    }

    /// Whether this endpoint selects the simulator.
    pub fn is_simulator(&self) -> bool {
        matches!(self, Endpoint::Simulator)
    }
}

impl From<&str> for Endpoint {
    fn from(name: &str) -> Self {
        Endpoint::parse(name)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Simulator => write!(f, "{}", SIMULATOR_ENDPOINT),
            Endpoint::Serial(name) => write!(f, "{}", name),
        }
    }
}

/// Open a transport to `endpoint`.
///
/// `baud` is ignored by the simulator.
pub fn connect(
    endpoint: &Endpoint,
    baud: u32,
    simulator: &SimulatorConfig,
) -> Result<Box<dyn Transport>, TransportError> {
    match endpoint {
        Endpoint::Simulator => {
            let transport = SimulatedTransport::new(simulator);
            info!("connected to simulated instrument");
            Ok(Box::new(transport))
        }
        Endpoint::Serial(name) => {
            let transport = WireTransport::open(name, baud)?;
            info!(port = %name, baud, "connected");
            Ok(Box::new(transport))
        }
    }
}

/// List selectable endpoints: the simulator first, then the serial ports the
/// OS reports.
pub fn list_endpoints() -> Vec<String> {
    let mut endpoints = vec![SIMULATOR_ENDPOINT.to_string()];
    match serialport::available_ports() {
        Ok(ports) => endpoints.extend(ports.into_iter().map(|p| p.port_name)),
        Err(err) => warn!(%err, "could not enumerate serial ports"),
    }
    endpoints
}
