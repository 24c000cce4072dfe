//! Owns the serial port file handle: opens it with the configured framing,
//! reconnects on failure, and serializes reads/writes through one handle.

use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

use serialport::SerialPort;

use super::config::SerialConfig;
use crate::error::TransportError;

const RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_DELAY: Duration = Duration::from_millis(500);

pub struct SerialTransport {
    config: SerialConfig,
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open the configured port, retrying up to [`RECONNECT_ATTEMPTS`] times
    /// on failure before giving up.
    pub fn open(config: SerialConfig) -> Result<Self, TransportError> {
        let port = Self::open_with_retries(&config)?;
        Ok(Self { config, port })
    }

    fn open_with_retries(config: &SerialConfig) -> Result<Box<dyn SerialPort>, TransportError> {
        let mut last_err = None;
        for attempt in 1..=RECONNECT_ATTEMPTS {
            let builder = serialport::new(&config.port, config.baudrate);
            let builder = config.apply_builder(builder);
            match builder.open() {
                Ok(port) => return Ok(port),
                Err(err) => {
                    log::warn!(
                        "failed to open {} (attempt {attempt}/{RECONNECT_ATTEMPTS}): {err}",
                        config.port
                    );
                    last_err = Some(err);
                    thread::sleep(RECONNECT_DELAY);
                }
            }
        }
        Err(TransportError::Open {
            port: config.port.clone(),
            source: last_err.expect("loop runs at least once"),
        })
    }

    /// Re-open the port after it was lost. Called from the reader loop when
    /// a read returns a non-timeout I/O error.
    pub fn reconnect(&mut self) -> Result<(), TransportError> {
        log::warn!("reconnecting to {}", self.config.port);
        self.port = Self::open_with_retries(&self.config)?;
        Ok(())
    }

    pub fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        self.port.write_all(frame)?;
        self.port.flush()
    }
}

impl Read for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_nonexistent_port_fails_after_retries() {
        let config = SerialConfig {
            port: "/dev/nonexistent-port-for-tests".to_string(),
            ..SerialConfig::default()
        };
        let result = SerialTransport::open(config);
        assert!(result.is_err());
    }
}
