use super::read_u16;
use crate::protocol::modbus::crc::append_crc;
use crate::protocol::modbus::exception::ExceptionCode;
use crate::protocol::modbus::store::Slave;

const COIL_ON: u16 = 0xFF00;
const COIL_OFF: u16 = 0x0000;

/// Write single coil (0x05).
pub fn handle_write_single_coil(slave: &Slave, request: &[u8]) -> Result<Vec<u8>, ExceptionCode> {
    if request.len() < 8 {
        return Err(ExceptionCode::IllegalDataValue);
    }
    let address = read_u16(request, 2);
    let value = read_u16(request, 4);
    let on = match value {
        COIL_ON => true,
        COIL_OFF => false,
        _ => return Err(ExceptionCode::IllegalDataValue),
    };

    slave.registers.write().coils.insert(address, on);

    // Echo the request (minus its CRC) and recompute the CRC rather than
    // reusing the one the peer sent: correct even if upstream framing is
    // ever relaxed to not require a pre-validated CRC by this point.
    let mut response = request[..request.len() - 2].to_vec();
    append_crc(&mut response);
    Ok(response)
}
