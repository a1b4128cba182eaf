#[cfg(feature = "host")]
mod host;

#[cfg(feature = "host")]
pub use host::*;

use crate::transport::TransportError;

/// Baud rates offered to users picking a serial link.
pub const STANDARD_BAUD_RATES: &[u32] = &[
    50, 75, 110, 134, 150, 200, 300, 600, 1200, 1800, 2400, 3600, 4800, 7200, 9600, 14400, 19200,
    28800, 38400, 56000, 57600, 74880, 115200, 230400, 250000, 460800, 921600,
];

pub fn is_standard_baud_rate(baud_rate: u32) -> bool {
    STANDARD_BAUD_RATES.contains(&baud_rate)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPortInfo {
    /// Identifier used to open the port, e.g. `/dev/ttyUSB0` or `COM3`.
    pub id: String,
    pub display_name: String,
}

/// An open serial line delivering raw bytes.
pub trait SerialStream {
    /// Read whatever bytes are available into `buf`.
    ///
    /// Returns `Ok(0)` when nothing arrived yet, so callers can check for
    /// a stop request between reads. Any error means the line is unusable.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Release the port. Closing twice is a no-op.
    fn close(&mut self);
}

pub trait SerialPortProvider {
    fn list_serial_ports(&self) -> anyhow::Result<Vec<SerialPortInfo>>;

    fn open_serial_port(
        &self,
        id: &str,
        baud_rate: u32,
    ) -> anyhow::Result<Box<dyn SerialStream + Send>>;
}
