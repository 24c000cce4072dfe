use super::read_u16;
use crate::protocol::modbus::crc::append_crc;
use crate::protocol::modbus::exception::ExceptionCode;
use crate::protocol::modbus::store::Slave;

/// Write single register (0x06). No value-range restriction.
pub fn handle_write_single_register(slave: &Slave, request: &[u8]) -> Result<Vec<u8>, ExceptionCode> {
    if request.len() < 8 {
        return Err(ExceptionCode::IllegalDataValue);
    }
    let address = read_u16(request, 2);
    let value = read_u16(request, 4);

    slave.registers.write().holding_registers.insert(address, value);

    let mut response = request[..request.len() - 2].to_vec();
    append_crc(&mut response);
    Ok(response)
}
