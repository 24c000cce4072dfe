//! Serial port parameters, decoded from the configuration file's `serial` section.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serialport::{DataBits, Parity, StopBits};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    pub port: String,
    pub baudrate: u32,
    pub bytesize: u8,
    pub parity: SerialParity,
    pub stopbits: u8,
    pub timeout: f64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baudrate: 9600,
            bytesize: 8,
            parity: SerialParity::None,
            stopbits: 1,
            timeout: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SerialParity {
    #[serde(rename = "N")]
    None,
    #[serde(rename = "E")]
    Even,
    #[serde(rename = "O")]
    Odd,
}

impl SerialConfig {
    pub fn data_bits(&self) -> DataBits {
        match self.bytesize {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        }
    }

    pub fn stop_bits(&self) -> StopBits {
        match self.stopbits {
            2 => StopBits::Two,
            _ => StopBits::One,
        }
    }

    pub fn parity(&self) -> Parity {
        match self.parity {
            SerialParity::None => Parity::None,
            SerialParity::Even => Parity::Even,
            SerialParity::Odd => Parity::Odd,
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout)
    }

    pub fn apply_builder(&self, builder: serialport::SerialPortBuilder) -> serialport::SerialPortBuilder {
        builder
            .data_bits(self.data_bits())
            .stop_bits(self.stop_bits())
            .parity(self.parity())
            .timeout(self.read_timeout())
    }
}
