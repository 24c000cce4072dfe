use super::read_u16;
use crate::protocol::modbus::crc::append_crc;
use crate::protocol::modbus::exception::ExceptionCode;
use crate::protocol::modbus::store::Slave;

const MIN_QUANTITY: u16 = 1;
const MAX_QUANTITY: u16 = 125;

fn handle(
    slave: &Slave,
    function_code: u8,
    request: &[u8],
    read_word: impl Fn(&crate::protocol::modbus::store::SlaveRegisters, u16) -> u16,
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
    let mut response = vec![slave.id, function_code, (quantity * 2) as u8];
    for i in 0..quantity {
        let value = read_word(&regs, start_address.wrapping_add(i));
        response.extend(value.to_be_bytes());
    }
    drop(regs);
    append_crc(&mut response);
    Ok(response)
}

/// Read holding registers (0x03).
pub fn handle_read_holding_registers(slave: &Slave, request: &[u8]) -> Result<Vec<u8>, ExceptionCode> {
    handle(slave, 0x03, request, |regs, addr| regs.holding(addr))
}

/// Read input registers (0x04).
pub fn handle_read_input_registers(slave: &Slave, request: &[u8]) -> Result<Vec<u8>, ExceptionCode> {
    handle(slave, 0x04, request, |regs, addr| regs.input(addr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::modbus::store::{RegisterKind, SlaveStore};

    #[test]
    fn matches_spec_scenario_one() {
        let store = SlaveStore::new(10);
        store.add(Slave::new(1, "a", "")).unwrap();
        store.update(1, RegisterKind::Holding, 2014, 0x3F80).unwrap();
        let slave = store.get(1).unwrap();
        let request = [0x01, 0x03, 0x07, 0xDE, 0x00, 0x02, 0x24, 0x0A];
        let response = handle_read_holding_registers(&slave, &request).unwrap();
        assert_eq!(
            response,
            vec![0x01, 0x03, 0x04, 0x3F, 0x80, 0x00, 0x00, 0xF7, 0xCF]
        );
    }

    #[test]
    fn quantity_126_is_illegal() {
        let store = SlaveStore::new(10);
        store.add(Slave::new(1, "a", "")).unwrap();
        let slave = store.get(1).unwrap();
        let mut request = vec![0x01, 0x03, 0x00, 0x00];
        request.extend(126u16.to_be_bytes());
        request.extend([0, 0]);
        assert_eq!(
            handle_read_holding_registers(&slave, &request),
            Err(ExceptionCode::IllegalDataValue)
        );
    }

    #[test]
    fn quantity_125_succeeds() {
        let store = SlaveStore::new(10);
        store.add(Slave::new(1, "a", "")).unwrap();
        let slave = store.get(1).unwrap();
        let mut request = vec![0x01, 0x04, 0x00, 0x00];
        request.extend(125u16.to_be_bytes());
        request.extend([0, 0]);
        let response = handle_read_input_registers(&slave, &request).unwrap();
        assert_eq!(response[2], 250);
    }
}
