use super::*;
use serialport::{SerialPort, SerialPortType};
use std::{io::Read, time::Duration};

/// How long a read waits before reporting that nothing arrived.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// [`SerialPortProvider`] backed by the `serialport` crate.
#[derive(Default)]
pub struct HostSerialPorts;

impl SerialPortProvider for HostSerialPorts {
    fn list_serial_ports(&self) -> anyhow::Result<Vec<SerialPortInfo>> {
        Ok(serialport::available_ports()?
            .into_iter()
            .map(|port| {
                let display_name = match &port.port_type {
                    SerialPortType::UsbPort(usb) => usb
                        .product
                        .clone()
                        .or_else(|| usb.manufacturer.clone())
                        .map(|name| format!("{name} ({})", port.port_name))
                        .unwrap_or_else(|| port.port_name.clone()),
                    _ => port.port_name.clone(),
                };

                SerialPortInfo {
                    id: port.port_name,
                    display_name,
                }
            })
            .collect())
    }

    fn open_serial_port(
        &self,
        id: &str,
        baud_rate: u32,
    ) -> anyhow::Result<Box<dyn SerialStream + Send>> {
        let port = serialport::new(id, baud_rate)
            .timeout(POLL_INTERVAL)
            .open()?;

        log::trace!("serial port opened : {id} @ {baud_rate}");

        Ok(Box::new(HostSerialStream {
            id: id.to_owned(),
            port: Some(port),
        }))
    }
}

pub struct HostSerialStream {
    id: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialStream for HostSerialStream {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let Some(port) = self.port.as_mut() else {
            return Err(TransportError::Closed);
        };

        match port.read(buf) {
            Ok(0) => Err(TransportError::Closed),
            Ok(n) => Ok(n),
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::TimedOut
                        | std::io::ErrorKind::WouldBlock
                        | std::io::ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            log::trace!("serial port closed : {}", self.id);
        }
    }
}

impl Drop for HostSerialStream {
    fn drop(&mut self) {
        self.close();
    }
}
