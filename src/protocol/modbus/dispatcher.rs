//! The request dispatcher: validates CRC, locates the addressed slave,
//! decodes the function code, and produces either a success response or an
//! exception response.

use std::sync::Arc;

use super::crc::verify;
use super::exception::{build_exception_response, ExceptionCode};
use super::handlers;
use super::store::SlaveStore;

pub struct Dispatcher {
    store: Arc<SlaveStore>,
}

impl Dispatcher {
    pub fn new(store: Arc<SlaveStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<SlaveStore> {
        &self.store
    }

    /// Process one raw frame. Returns the bytes to write back to the wire,
    /// or `None` if the frame must be dropped silently (too short, CRC
    /// mismatch).
    pub fn handle(&self, frame: &[u8]) -> Option<Vec<u8>> {
        if frame.len() < 4 {
            return None;
        }

        let slave_id = frame[0];
        let function_code = frame[1];

        if !verify(frame) {
            // A CRC-invalid frame was never decoded, so it never entered any
            // slave's request count: total_requests == successful + failed
            // stays true without a matching "failed" increment here.
            log::warn!("CRC mismatch from slave {slave_id}, function 0x{function_code:02X}: dropping frame");
            return None;
        }

        let slave = match self.store.get(slave_id) {
            Some(slave) => slave,
            None => {
                log::warn!("frame addressed to unconfigured slave {slave_id}");
                return Some(build_exception_response(
                    slave_id,
                    function_code,
                    ExceptionCode::GatewayTargetDeviceFailed,
                ));
            }
        };

        self.store.record_request_received(slave_id, frame.len());

        let outcome = match function_code {
            0x01 => handlers::handle_read_coils(&slave, frame),
            0x02 => handlers::handle_read_discrete_inputs(&slave, frame),
            0x03 => handlers::handle_read_holding_registers(&slave, frame),
            0x04 => handlers::handle_read_input_registers(&slave, frame),
            0x05 => handlers::handle_write_single_coil(&slave, frame),
            0x06 => handlers::handle_write_single_register(&slave, frame),
            0x0F => handlers::handle_write_multiple_coils(&slave, frame),
            0x10 => handlers::handle_write_multiple_registers(&slave, frame),
            0x14 => handlers::handle_read_file_record(&slave, frame),
            _ => Err(ExceptionCode::IllegalFunction),
        };

        match outcome {
            Ok(response) => {
                self.store.record_success(slave_id, response.len());
                log::debug!(
                    "slave {slave_id} function 0x{function_code:02X}: {} byte response",
                    response.len()
                );
                Some(response)
            }
            Err(code) => {
                self.store.record_failure(slave_id);
                log::warn!("slave {slave_id} function 0x{function_code:02X}: exception 0x{:02X}", code as u8);
                Some(build_exception_response(slave_id, function_code, code))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::modbus::crc::append_crc;
    use crate::protocol::modbus::store::{RegisterKind, Slave};

    fn dispatcher_with_slave_one() -> Dispatcher {
        let store = Arc::new(SlaveStore::new(10));
        store.add(Slave::new(1, "a", "")).unwrap();
        Dispatcher::new(store)
    }

    #[test]
    fn short_frame_is_dropped() {
        let dispatcher = dispatcher_with_slave_one();
        assert!(dispatcher.handle(&[0x01, 0x03]).is_none());
    }

    #[test]
    fn crc_mismatch_is_dropped_and_never_responded_to() {
        let dispatcher = dispatcher_with_slave_one();
        let frame = [0x01, 0x03, 0x07, 0xDE, 0x00, 0x02, 0x00, 0x00];
        assert!(dispatcher.handle(&frame).is_none());
        let snapshot = dispatcher.store().snapshot(1).unwrap();
        assert_eq!(snapshot.statistics.failed, 0);
        assert_eq!(snapshot.statistics.total_requests, 0);
    }

    #[test]
    fn unknown_slave_gets_gateway_exception() {
        let dispatcher = dispatcher_with_slave_one();
        let mut frame = vec![0x02, 0x03, 0x00, 0x00, 0x00, 0x01];
        append_crc(&mut frame);
        let response = dispatcher.handle(&frame).unwrap();
        assert_eq!(&response[..3], &[0x02, 0x83, 0x0B]);
    }

    #[test]
    fn unsupported_function_yields_illegal_function() {
        let dispatcher = dispatcher_with_slave_one();
        let mut frame = vec![0x01, 0x07, 0x00, 0x00];
        append_crc(&mut frame);
        let response = dispatcher.handle(&frame).unwrap();
        assert_eq!(&response[..3], &[0x01, 0x87, 0x01]);
    }

    #[test]
    fn successful_request_increments_stats() {
        let dispatcher = dispatcher_with_slave_one();
        dispatcher
            .store()
            .update(1, RegisterKind::Holding, 0, 7)
            .unwrap();
        let mut frame = vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x01];
        append_crc(&mut frame);
        let response = dispatcher.handle(&frame).unwrap();
        assert_eq!(&response[3..5], &[0x00, 0x07]);

        let snapshot = dispatcher.store().snapshot(1).unwrap();
        assert_eq!(snapshot.statistics.total_requests, 1);
        assert_eq!(snapshot.statistics.successful, 1);
        assert_eq!(snapshot.statistics.failed, 0);
    }

    #[test]
    fn total_requests_equals_successful_plus_failed() {
        let dispatcher = dispatcher_with_slave_one();
        let mut ok_frame = vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x01];
        append_crc(&mut ok_frame);
        dispatcher.handle(&ok_frame);

        let mut bad_frame = vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x00]; // quantity 0
        append_crc(&mut bad_frame);
        dispatcher.handle(&bad_frame);

        let snapshot = dispatcher.store().snapshot(1).unwrap();
        assert_eq!(
            snapshot.statistics.total_requests,
            snapshot.statistics.successful + snapshot.statistics.failed
        );
    }
}
