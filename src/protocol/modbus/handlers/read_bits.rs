use super::{pack_bits, read_u16};
use crate::protocol::modbus::crc::append_crc;
use crate::protocol::modbus::exception::ExceptionCode;
use crate::protocol::modbus::store::Slave;

const MIN_QUANTITY: u16 = 1;
const MAX_QUANTITY: u16 = 2000;

fn handle(
    slave: &Slave,
    function_code: u8,
    request: &[u8],
    read_bit: impl Fn(&crate::protocol::modbus::store::SlaveRegisters, u16) -> bool,
) -> Result<Vec<u8>, ExceptionCode> {
    if request.len() < 8 {
        return Err(ExceptionCode::IllegalDataValue);
    }
    let start_address = read_u16(request, 2);
    let quantity = read_u16(request, 4);
    if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&quantity) {
        return Err(ExceptionCode::IllegalDataValue);
    }

    let regs = slave.registers.read();
    let values: Vec<bool> = (0..quantity)
        .map(|i| read_bit(&regs, start_address.wrapping_add(i)))
        .collect();
    drop(regs);

    let packed = pack_bits(&values);
    let mut response = vec![slave.id, function_code, packed.len() as u8];
    response.extend(packed);
    append_crc(&mut response);
    Ok(response)
}

/// Read coils (0x01).
pub fn handle_read_coils(slave: &Slave, request: &[u8]) -> Result<Vec<u8>, ExceptionCode> {
    handle(slave, 0x01, request, |regs, addr| regs.coil(addr))
}

/// Read discrete inputs (0x02).
pub fn handle_read_discrete_inputs(slave: &Slave, request: &[u8]) -> Result<Vec<u8>, ExceptionCode> {
    handle(slave, 0x02, request, |regs, addr| regs.discrete(addr))
}
