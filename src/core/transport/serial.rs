//! Serial port channel implementation

use super::{ByteChannel, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;

/// Serial port parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SerialParity {
    /// No parity
    #[default]
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
}

/// Serial line configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Port name (e.g., COM3, /dev/ttyUSB0)
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits (5, 6, 7, 8)
    pub data_bits: u8,
    /// Stop bits (1, 2)
    pub stop_bits: u8,
    /// Parity
    pub parity: SerialParity,
}

impl SerialConfig {
    /// Create a new serial configuration with default line settings
    pub fn new(port: &str, baud_rate: u32) -> Self {
        Self {
            port: port.to_string(),
            baud_rate,
            data_bits: 8,
            stop_bits: 1,
            parity: SerialParity::None,
        }
    }

    /// Set data bits
    #[must_use]
    pub fn data_bits(mut self, bits: u8) -> Self {
        self.data_bits = bits;
        self
    }

    /// Set stop bits
    #[must_use]
    pub fn stop_bits(mut self, bits: u8) -> Self {
        self.stop_bits = bits;
        self
    }

    /// Set parity
    #[must_use]
    pub fn parity(mut self, parity: SerialParity) -> Self {
        self.parity = parity;
        self
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new("COM1", 115200)
    }
}

/// Serial port channel
pub struct SerialTransport {
    config: SerialConfig,
    port: Arc<parking_lot::Mutex<Option<Box<dyn SerialPort + Send>>>>,
}

impl SerialTransport {
    /// Create a new serial channel (not yet open)
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            port: Arc::new(parking_lot::Mutex::new(None)),
        }
    }
}

#[async_trait]
impl ByteChannel for SerialTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let data_bits = match self.config.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        };

        let stop_bits = match self.config.stop_bits {
            2 => StopBits::Two,
            _ => StopBits::One,
        };

        let parity = match self.config.parity {
            SerialParity::Odd => Parity::Odd,
            SerialParity::Even => Parity::Even,
            SerialParity::None => Parity::None,
        };

        let port = serialport::new(&self.config.port, self.config.baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => {
                    TransportError::PortNotFound(self.config.port.clone())
                }
                serialport::ErrorKind::Io(io_kind) => match io_kind {
                    std::io::ErrorKind::PermissionDenied => {
                        TransportError::PermissionDenied(self.config.port.clone())
                    }
                    _ => TransportError::ConnectionFailed(e.to_string()),
                },
                _ => TransportError::ConnectionFailed(e.to_string()),
            })?;

        *self.port.lock() = Some(port);
        tracing::debug!(port = %self.config.port, baud = self.config.baud_rate, "serial port opened");

        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        *self.port.lock() = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.lock().is_some()
    }

    async fn send(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let mut port_guard = self.port.lock();
        let port = port_guard.as_mut().ok_or(TransportError::Disconnected)?;

        port.write_all(data).map_err(TransportError::IoError)?;
        port.flush().map_err(TransportError::IoError)?;

        Ok(data.len())
    }

    async fn receive(&mut self) -> Result<Bytes, TransportError> {
        let mut port_guard = self.port.lock();
        let port = port_guard.as_mut().ok_or(TransportError::Disconnected)?;

        let mut buffer = vec![0u8; 4096];

        match port.read(&mut buffer) {
            Ok(0) => Err(TransportError::Disconnected),
            Ok(n) => {
                buffer.truncate(n);
                Ok(Bytes::from(buffer))
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                // No data available, return empty
                Ok(Bytes::new())
            }
            Err(e) => Err(TransportError::IoError(e)),
        }
    }

    fn connection_info(&self) -> String {
        format!(
            "{} @ {} baud ({}{}{})",
            self.config.port,
            self.config.baud_rate,
            self.config.data_bits,
            match self.config.parity {
                SerialParity::None => "N",
                SerialParity::Odd => "O",
                SerialParity::Even => "E",
            },
            self.config.stop_bits,
        )
    }
}

/// An available channel address with descriptive metadata.
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// System port name
    pub name: String,
    /// Human-readable description, when the platform provides one
    pub description: Option<String>,
}

/// List available serial ports
pub fn list_ports() -> Result<Vec<PortInfo>, TransportError> {
    let ports = serialport::available_ports().map_err(|e| TransportError::IoError(e.into()))?;

    Ok(ports
        .into_iter()
        .map(|p| {
            let description = match p.port_type {
                serialport::SerialPortType::UsbPort(usb) => Some(format!(
                    "USB {:04x}:{:04x} {}",
                    usb.vid,
                    usb.pid,
                    usb.product.unwrap_or_default()
                )),
                serialport::SerialPortType::BluetoothPort => Some("Bluetooth".to_string()),
                serialport::SerialPortType::PciPort => Some("PCI".to_string()),
                serialport::SerialPortType::Unknown => None,
            };
            PortInfo {
                name: p.port_name,
                description,
            }
        })
        .collect())
}
