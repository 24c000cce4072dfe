pub mod crc;
pub mod dispatcher;
pub mod exception;
pub mod frame;
pub mod handlers;
pub mod store;

pub use dispatcher::Dispatcher;
pub use exception::{is_exception_response, ExceptionCode};
pub use frame::read_modbus_frame;
pub use store::{RegisterKind, Slave, SlaveSnapshot, SlaveStore, Statistics, StatisticsSnapshot};
