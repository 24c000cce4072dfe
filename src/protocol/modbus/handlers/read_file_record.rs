use super::read_u16;
use crate::protocol::modbus::crc::append_crc;
use crate::protocol::modbus::exception::ExceptionCode;
use crate::protocol::modbus::store::Slave;

const EXPECTED_BYTE_COUNT: u8 = 7;
const EXPECTED_REFERENCE_TYPE: u8 = 6;

/// Read file record (0x14). `request` is the raw frame: slave_id, 0x14,
/// byte_count, reference_type, file_number(2), record_number(2),
/// record_length(2), crc(2).
pub fn handle_read_file_record(slave: &Slave, request: &[u8]) -> Result<Vec<u8>, ExceptionCode> {
    if request.len() < 12 {
        return Err(ExceptionCode::IllegalDataValue);
    }
    let byte_count = request[2];
    let reference_type = request[3];
    if byte_count != EXPECTED_BYTE_COUNT || reference_type != EXPECTED_REFERENCE_TYPE {
        return Err(ExceptionCode::IllegalDataValue);
    }

    let file_number = read_u16(request, 4);
    let record_number = read_u16(request, 6);
    let record_length = read_u16(request, 8);
    let wanted_len = record_length as usize * 2;

    // Presence, not the normalized length, decides which response shape is
    // sent: a record present but shorter/longer than `record_length` still
    // gets the data-bearing shape, while an absent record gets the empty
    // shape even when `record_length > 0` pads a would-be zero buffer.
    let regs = slave.registers.read();
    let present = regs.file_records.contains_key(&(file_number, record_number));
    let data = present.then(|| {
        let mut data = regs.file_record(file_number, record_number).to_vec();
        data.resize(wanted_len, 0);
        data
    });
    drop(regs);

    let mut response = vec![slave.id, 0x14];
    match data {
        None => {
            response.push(2); // response_data_length
            response.push(1); // file_response_length
            response.push(reference_type);
        }
        Some(data) => {
            let file_response_length = data.len() + 1;
            let response_data_length = file_response_length + 1;
            response.push(response_data_length as u8);
            response.push(file_response_length as u8);
            response.push(reference_type);
            response.extend(data);
        }
    }
    append_crc(&mut response);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::modbus::store::SlaveStore;

    #[test]
    fn matches_spec_scenario_five() {
        let store = SlaveStore::new(10);
        store.add(Slave::new(1, "a", "")).unwrap();
        store.set_file_record(1, 1, 0, b"ABCD".to_vec());
        let slave = store.get(1).unwrap();
        // file 1, record 0, record_length 4 (-> 8 bytes)
        let request = [
            0x01, 0x14, 0x07, 0x06, 0x00, 0x01, 0x00, 0x00, 0x00, 0x04, 0, 0,
        ];
        let response = handle_read_file_record(&slave, &request).unwrap();
        assert_eq!(
            &response[..12],
            &[0x01, 0x14, 0x0A, 0x09, 0x06, 0x41, 0x42, 0x43, 0x44, 0x00, 0x00, 0x00]
        );
        assert_eq!(response[12], 0x00);
    }

    #[test]
    fn matches_spec_scenario_six_absent_record() {
        let store = SlaveStore::new(10);
        store.add(Slave::new(1, "a", "")).unwrap();
        let slave = store.get(1).unwrap();
        let request = [
            0x01, 0x14, 0x07, 0x06, 0x00, 0x01, 0x00, 0x00, 0x00, 0x04, 0, 0,
        ];
        let response = handle_read_file_record(&slave, &request).unwrap();
        assert_eq!(&response[..5], &[0x01, 0x14, 0x02, 0x01, 0x06]);
        assert_eq!(response.len(), 7); // no data bytes, just the 2-byte CRC tail
    }

    #[test]
    fn truncates_oversized_stored_data() {
        let store = SlaveStore::new(10);
        store.add(Slave::new(1, "a", "")).unwrap();
        store.set_file_record(1, 1, 0, b"TOOLONGDATA".to_vec());
        let slave = store.get(1).unwrap();
        let request = [
            0x01, 0x14, 0x07, 0x06, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0, 0,
        ];
        let response = handle_read_file_record(&slave, &request).unwrap();
        assert_eq!(&response[5..9], b"TOOL");
    }

    #[test]
    fn wrong_byte_count_is_illegal() {
        let store = SlaveStore::new(10);
        store.add(Slave::new(1, "a", "")).unwrap();
        let slave = store.get(1).unwrap();
        let request = [
            0x01, 0x14, 0x08, 0x06, 0x00, 0x01, 0x00, 0x00, 0x00, 0x04, 0, 0,
        ];
        assert_eq!(
            handle_read_file_record(&slave, &request),
            Err(ExceptionCode::IllegalDataValue)
        );
    }

    #[test]
    fn wrong_reference_type_is_illegal() {
        let store = SlaveStore::new(10);
        store.add(Slave::new(1, "a", "")).unwrap();
        let slave = store.get(1).unwrap();
        let request = [
            0x01, 0x14, 0x07, 0x05, 0x00, 0x01, 0x00, 0x00, 0x00, 0x04, 0, 0,
        ];
        assert_eq!(
            handle_read_file_record(&slave, &request),
            Err(ExceptionCode::IllegalDataValue)
        );
    }
}
