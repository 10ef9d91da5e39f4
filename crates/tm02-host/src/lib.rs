//! Host-side controller for the Ultra-TM02 temperature transmitter.
//!
//! Layers, bottom-up:
//!
//! - [`Transport`]: moves whole frames to and from the instrument, either
//!   over a serial port ([`WireTransport`]) or to an in-process simulated
//!   instrument ([`SimulatedTransport`]).
//! - [`Device`]: typed queries, settings and the chunked calibration table
//!   download, one command in flight at a time.
//! - [`HostConfig`]: YAML configuration shared by the `tm02` binary.
//!
//! The library never installs a log subscriber; events go through
//! `tracing` and are dropped unless the application sets one up.
//!
//! ```rust,no_run
//! use tm02_host::{AnyDevice, Endpoint, HostConfig};
//!
//! let config = HostConfig::default();
//! let mut device = AnyDevice::connect(&Endpoint::Simulator, &config)?;
//! println!("{}: {:.2} °C", device.device_id()?, device.temperature()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod device;
mod error;
mod simulator;
mod transport;
mod wire;

pub use config::HostConfig;
pub use device::{AnyDevice, Device, UploadSummary, DEFAULT_RESPONSE_TIMEOUT};
pub use error::{CommandError, ConfigError, TransportError, UploadError};
pub use simulator::{
    SimulatedParameters, SimulatedState, SimulatedTransport, SimulatorConfig, SIMULATOR_DEVICE_ID,
    TEMPERATURE_STEP, VOLTAGE_STEP,
};
pub use transport::{connect, list_endpoints, Endpoint, Transport, SIMULATOR_ENDPOINT};
pub use wire::{SerialTransport, WireTransport};
