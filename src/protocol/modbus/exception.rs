//! Exception responses: a reply whose function-code byte has bit 7 set,
//! carrying a one-byte exception code.

use super::crc::append_crc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    IllegalFunction = 0x01,
    IllegalDataValue = 0x03,
    ServerDeviceFailure = 0x04,
    GatewayTargetDeviceFailed = 0x0B,
}

pub fn build_exception_response(slave_id: u8, function_code: u8, code: ExceptionCode) -> Vec<u8> {
    let mut response = vec![slave_id, function_code | 0x80, code as u8];
    append_crc(&mut response);
    response
}

/// Whether `response` is an exception reply (function-code byte has bit 7
/// set). The dispatcher already recorded this reply against `failed`, never
/// `successful`, so callers must not reclassify it on a later write failure.
pub fn is_exception_response(response: &[u8]) -> bool {
    response.get(1).is_some_and(|b| b & 0x80 != 0)
}
