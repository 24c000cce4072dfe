//! The reference slave seeded by `--add-example-slave`, used for manual
//! testing against a loopback or virtual serial pair.

use crate::protocol::modbus::{Slave, SlaveStore};

pub fn add_example_slave(store: &SlaveStore) -> Result<(), crate::error::StoreError> {
    let slave = Slave::new(
        1,
        "Example Industrial Device",
        "Simulated industrial device for testing",
    );

    {
        let mut regs = slave.registers.write();
        regs.holding_registers.insert(2014, 16256);
        regs.holding_registers.insert(2015, 17095);
        regs.holding_registers.insert(2016, 1000);
        regs.holding_registers.insert(2017, 2500);
        regs.holding_registers.insert(2018, 750);

        regs.input_registers.insert(3001, 25);
        regs.input_registers.insert(3002, 1013);
        regs.input_registers.insert(3003, 60);

        regs.coils.insert(1, true);
        regs.coils.insert(2, false);
        regs.coils.insert(3, true);

        regs.discrete_inputs.insert(10001, true);
        regs.discrete_inputs.insert(10002, false);
        regs.discrete_inputs.insert(10003, true);

        regs.file_records.insert(
            (1, 0),
            b"INDUSTRIAL_DEVICE_V1.0\0\0\0\0\0\0\0\0".to_vec(),
        );
        regs.file_records.insert(
            (1, 1),
            b"SERIAL_12345678\0\0\0\0\0\0\0\0\0\0\0\0".to_vec(),
        );
        regs.file_records.insert(
            (1, 2),
            b"CONFIG_DATA_HERE\0\0\0\0\0\0\0\0\0\0\0\0".to_vec(),
        );
    }

    store.add(slave)
}
