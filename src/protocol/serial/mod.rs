mod config;
mod transport;

pub use config::{SerialConfig, SerialParity};
pub use transport::SerialTransport;
