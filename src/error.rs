use thiserror::Error;

/// Errors raised by the slave store that callers need to match on.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("slave id {0} is already in use")]
    IdInUse(u8),

    #[error("maximum number of slaves ({0}) reached")]
    CapacityExceeded(usize),

    #[error("slave id {0} is not configured")]
    UnknownSlave(u8),

    #[error("slave id must be in 1..=247, got {0}")]
    InvalidSlaveId(u8),
}

/// Errors raised by the serial transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("exhausted {0} reconnection attempts")]
    ReconnectExhausted(u32),

    #[error("i/o error on serial port: {0}")]
    Io(#[from] std::io::Error),
}
