use super::read_u16;
use crate::protocol::modbus::crc::append_crc;
use crate::protocol::modbus::exception::ExceptionCode;
use crate::protocol::modbus::store::Slave;

const MIN_QUANTITY: u16 = 1;
const MAX_QUANTITY: u16 = 1968;

/// Write multiple coils (0x0F).
pub fn handle_write_multiple_coils(slave: &Slave, request: &[u8]) -> Result<Vec<u8>, ExceptionCode> {
    if request.len() < 9 {
        return Err(ExceptionCode::IllegalDataValue);
    }
    let start_address = read_u16(request, 2);
    let quantity = read_u16(request, 4);
    let byte_count = request[6] as usize;
    let expected_byte_count = ((quantity as usize) + 7) / 8;

    if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&quantity) || byte_count != expected_byte_count {
        return Err(ExceptionCode::IllegalDataValue);
    }
    if request.len() < 7 + byte_count {
        return Err(ExceptionCode::IllegalDataValue);
    }

    let coil_data = &request[7..7 + byte_count];
    let mut regs = slave.registers.write();
    for i in 0..quantity {
        let byte_idx = (i / 8) as usize;
        let bit_idx = i % 8;
        let value = coil_data[byte_idx] & (1 << bit_idx) != 0;
        regs.coils.insert(start_address.wrapping_add(i), value);
    }
    drop(regs);

    let mut response = vec![slave.id, 0x0F];
    response.extend(&request[2..6]);
    append_crc(&mut response);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::modbus::store::SlaveStore;

    #[test]
    fn writes_bits_and_echoes_header() {
        let store = SlaveStore::new(10);
        store.add(Slave::new(1, "a", "")).unwrap();
        let slave = store.get(1).unwrap();
        // start=0, qty=3, byte_count=1, data=0b101
        let request = [0x01, 0x0F, 0x00, 0x00, 0x00, 0x03, 0x01, 0b0000_0101, 0, 0];
        let response = handle_write_multiple_coils(&slave, &request).unwrap();
        assert_eq!(&response[..6], &[0x01, 0x0F, 0x00, 0x00, 0x00, 0x03]);
        let regs = slave.registers.read();
        assert!(regs.coil(0));
        assert!(!regs.coil(1));
        assert!(regs.coil(2));
    }

    #[test]
    fn byte_count_mismatch_is_illegal() {
        let store = SlaveStore::new(10);
        store.add(Slave::new(1, "a", "")).unwrap();
        let slave = store.get(1).unwrap();
        let request = [0x01, 0x0F, 0x00, 0x00, 0x00, 0x03, 0x02, 0x00, 0x00, 0, 0];
        assert_eq!(
            handle_write_multiple_coils(&slave, &request),
            Err(ExceptionCode::IllegalDataValue)
        );
    }

    #[test]
    fn quantity_over_max_is_illegal() {
        let store = SlaveStore::new(10);
        store.add(Slave::new(1, "a", "")).unwrap();
        let slave = store.get(1).unwrap();
        let mut request = vec![0x01, 0x0F, 0x00, 0x00];
        request.extend(1969u16.to_be_bytes());
        request.push(247); // ceil(1969/8)
        request.extend(vec![0u8; 247]);
        request.extend([0, 0]);
        assert_eq!(
            handle_write_multiple_coils(&slave, &request),
            Err(ExceptionCode::IllegalDataValue)
        );
    }
}
