pub mod config;
pub mod error;
pub mod example_slave;
pub mod logging;
pub mod monitoring;
pub mod protocol;
pub mod server;
