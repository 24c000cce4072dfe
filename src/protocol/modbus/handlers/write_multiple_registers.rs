use super::read_u16;
use crate::protocol::modbus::crc::append_crc;
use crate::protocol::modbus::exception::ExceptionCode;
use crate::protocol::modbus::store::Slave;

const MIN_QUANTITY: u16 = 1;
const MAX_QUANTITY: u16 = 123;

/// Write multiple registers (0x10).
pub fn handle_write_multiple_registers(slave: &Slave, request: &[u8]) -> Result<Vec<u8>, ExceptionCode> {
    if request.len() < 9 {
        return Err(ExceptionCode::IllegalDataValue);
    }
    let start_address = read_u16(request, 2);
    let quantity = read_u16(request, 4);
    let byte_count = request[6] as usize;

    if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&quantity) || byte_count != quantity as usize * 2 {
        return Err(ExceptionCode::IllegalDataValue);
    }
    if request.len() < 7 + byte_count {
        return Err(ExceptionCode::IllegalDataValue);
    }

    let register_data = &request[7..7 + byte_count];
    let mut regs = slave.registers.write();
    for i in 0..quantity as usize {
        let value = (register_data[i * 2] as u16) << 8 | register_data[i * 2 + 1] as u16;
        regs.holding_registers
            .insert(start_address.wrapping_add(i as u16), value);
    }
    drop(regs);

    let mut response = vec![slave.id, 0x10];
    response.extend(&request[2..6]);
    append_crc(&mut response);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::modbus::store::SlaveStore;

    #[test]
    fn writes_registers_and_echoes_header() {
        let store = SlaveStore::new(10);
        store.add(Slave::new(1, "a", "")).unwrap();
        let slave = store.get(1).unwrap();
        let request = [
            0x01, 0x10, 0x00, 0x00, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x00, 0x14, 0, 0,
        ];
        let response = handle_write_multiple_registers(&slave, &request).unwrap();
        assert_eq!(&response[..6], &[0x01, 0x10, 0x00, 0x00, 0x00, 0x02]);
        let regs = slave.registers.read();
        assert_eq!(regs.holding(0), 10);
        assert_eq!(regs.holding(1), 20);
    }

    #[test]
    fn byte_count_inconsistent_with_quantity_is_illegal() {
        let store = SlaveStore::new(10);
        store.add(Slave::new(1, "a", "")).unwrap();
        let slave = store.get(1).unwrap();
        let request = [0x01, 0x10, 0x00, 0x00, 0x00, 0x02, 0x03, 0, 0, 0, 0];
        assert_eq!(
            handle_write_multiple_registers(&slave, &request),
            Err(ExceptionCode::IllegalDataValue)
        );
    }
}
