//! Serial-line transport.
//!
//! [`WireTransport`] frames outgoing commands onto any byte stream and feeds
//! incoming bytes through a [`FrameCodec`]. In production the stream is a
//! serial port; tests substitute an in-memory stream.

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tm02_protocol::{Frame, FrameCodec, MAX_FRAME_LEN};
use tracing::{debug, trace, warn};

use crate::error::TransportError;
use crate::transport::Transport;

/// Read timeout of a single serial read; the receive loop polls at this rate.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Transport over a serial port.
pub type SerialTransport = WireTransport<Box<dyn SerialPort>>;

/// Frame transport over a byte stream.
pub struct WireTransport<P: Read + Write> {
    port: Option<P>,
    codec: FrameCodec,
}

impl<P: Read + Write> WireTransport<P> {
    /// Wrap an already open stream.
    pub fn new(port: P) -> Self {
        WireTransport {
            port: Some(port),
            codec: FrameCodec::new(),
        }
    }

    /// Give back the stream, if still connected.
    pub fn into_inner(self) -> Option<P> {
        self.port
    }
}

impl WireTransport<Box<dyn SerialPort>> {
    /// Open `path` at `baud`, 8N1 without flow control.
    pub fn open(path: &str, baud: u32) -> Result<Self, TransportError> {
        let port = serialport::new(path, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(POLL_INTERVAL)
            .open()?;
        Ok(WireTransport::new(port))
    }
}

impl<P: Read + Write> Transport for WireTransport<P> {
    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotConnected)?;
        // Leftovers belong to an earlier exchange and must not answer this one
        let stale = self.codec.buffered_len();
        if stale > 0 {
            debug!(bytes = stale, "discarding stale receive buffer");
            self.codec.clear();
        }
        let bytes = frame.encode();
        debug!(tx = %hex::encode_upper(&bytes), "sending frame");
        port.write_all(&bytes)?;
        port.flush()?;
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Frame>, TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotConnected)?;
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; MAX_FRAME_LEN];

        loop {
            // Drain whatever is already buffered before reading more
            while let Some(result) = self.codec.decode() {
                match result {
                    Ok(frame) => {
                        trace!(command = frame.command(), len = frame.payload().len(), "frame received");
                        return Ok(Some(frame));
                    }
                    Err(err) => warn!(%err, "discarding invalid frame"),
                }
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }

            match port.read(&mut buf) {
                Ok(0) => {
                    debug!("stream closed while waiting for a frame");
                    return Ok(None);
                }
                Ok(n) => {
                    trace!(rx = %hex::encode_upper(&buf[..n]), "received bytes");
                    self.codec.push(&buf[..n]);
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn disconnect(&mut self) {
        if self.port.take().is_some() {
            debug!("serial port closed");
        }
        self.codec.clear();
    }
}
