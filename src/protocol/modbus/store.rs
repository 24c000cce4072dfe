//! The in-memory, multi-slave data model: four sparse register spaces plus a
//! file-record space per slave, each behind its own lock so that reads and
//! writes to distinct slaves never contend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::StoreError;

/// One of the four addressable register kinds reachable via administrative
/// `update` calls (bypassing the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    Holding,
    Input,
    Coil,
    Discrete,
}

/// Per-slave counters. Kept as atomics so a concurrent snapshot never tears
/// a single field, even though the whole set isn't updated atomically.
#[derive(Debug, Default)]
pub struct Statistics {
    pub total_requests: AtomicU64,
    pub successful: AtomicU64,
    pub failed: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub bytes_received: AtomicU64,
    pub last_request_unix_secs: AtomicU64,
}

impl Statistics {
    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful: self.successful.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            last_request_unix_secs: self.last_request_unix_secs.load(Ordering::Relaxed),
        }
    }

    fn mark_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.last_request_unix_secs
            .store(chrono::Utc::now().timestamp() as u64, Ordering::Relaxed);
    }

    fn mark_success(&self, response_len: usize) {
        self.successful.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent
            .fetch_add(response_len as u64, Ordering::Relaxed);
    }

    fn mark_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    fn add_bytes_received(&self, n: usize) {
        self.bytes_received.fetch_add(n as u64, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsSnapshot {
    pub total_requests: u64,
    pub successful: u64,
    pub failed: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub last_request_unix_secs: u64,
}

/// The five sub-stores owned by one emulated slave, each a sparse map so
/// that "absent" and "present with value zero/false" stay distinguishable.
#[derive(Debug, Default)]
pub struct SlaveRegisters {
    pub holding_registers: HashMap<u16, u16>,
    pub input_registers: HashMap<u16, u16>,
    pub coils: HashMap<u16, bool>,
    pub discrete_inputs: HashMap<u16, bool>,
    pub file_records: HashMap<(u16, u16), Vec<u8>>,
}

impl SlaveRegisters {
    pub fn holding(&self, addr: u16) -> u16 {
        self.holding_registers.get(&addr).copied().unwrap_or(0)
    }

    pub fn input(&self, addr: u16) -> u16 {
        self.input_registers.get(&addr).copied().unwrap_or(0)
    }

    pub fn coil(&self, addr: u16) -> bool {
        self.coils.get(&addr).copied().unwrap_or(false)
    }

    pub fn discrete(&self, addr: u16) -> bool {
        self.discrete_inputs.get(&addr).copied().unwrap_or(false)
    }

    pub fn file_record(&self, file_number: u16, record_number: u16) -> &[u8] {
        self.file_records
            .get(&(file_number, record_number))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// A configured emulated device: identity plus its registers and counters.
pub struct Slave {
    pub id: u8,
    pub name: String,
    pub description: String,
    pub registers: RwLock<SlaveRegisters>,
    pub stats: Statistics,
}

impl Slave {
    pub fn new(id: u8, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            registers: RwLock::new(SlaveRegisters::default()),
            stats: Statistics::default(),
        }
    }
}

/// A point-in-time copy of a slave's registers and statistics, returned by
/// the administrative `get_slave_data` query interface.
#[derive(Debug, Clone)]
pub struct SlaveSnapshot {
    pub slave_id: u8,
    pub name: String,
    pub description: String,
    pub holding_registers: HashMap<u16, u16>,
    pub input_registers: HashMap<u16, u16>,
    pub coils: HashMap<u16, bool>,
    pub discrete_inputs: HashMap<u16, bool>,
    pub statistics: StatisticsSnapshot,
}

/// The concurrent mapping from slave id to slave. Distinct slaves can be
/// read and written concurrently; the map itself is locked only while the
/// slave set is being changed, not while a single slave's registers are
/// being accessed.
pub struct SlaveStore {
    max_slaves: usize,
    slaves: RwLock<HashMap<u8, Arc<Slave>>>,
}

impl SlaveStore {
    pub fn new(max_slaves: usize) -> Self {
        Self {
            max_slaves,
            slaves: RwLock::new(HashMap::new()),
        }
    }

    pub fn add(&self, slave: Slave) -> Result<(), StoreError> {
        if slave.id == 0 {
            return Err(StoreError::InvalidSlaveId(slave.id));
        }
        let mut slaves = self.slaves.write();
        if slaves.contains_key(&slave.id) {
            return Err(StoreError::IdInUse(slave.id));
        }
        if slaves.len() >= self.max_slaves {
            return Err(StoreError::CapacityExceeded(self.max_slaves));
        }
        slaves.insert(slave.id, Arc::new(slave));
        Ok(())
    }

    pub fn remove(&self, id: u8) {
        self.slaves.write().remove(&id);
    }

    pub fn get(&self, id: u8) -> Option<Arc<Slave>> {
        self.slaves.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.slaves.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<u8> {
        let mut ids: Vec<u8> = self.slaves.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Administrative write, bypassing the wire.
    pub fn update(
        &self,
        id: u8,
        kind: RegisterKind,
        addr: u16,
        value: u16,
    ) -> Result<(), StoreError> {
        let slave = self.get(id).ok_or(StoreError::UnknownSlave(id))?;
        let mut regs = slave.registers.write();
        match kind {
            RegisterKind::Holding => {
                regs.holding_registers.insert(addr, value);
            }
            RegisterKind::Input => {
                regs.input_registers.insert(addr, value);
            }
            RegisterKind::Coil => {
                regs.coils.insert(addr, value != 0);
            }
            RegisterKind::Discrete => {
                regs.discrete_inputs.insert(addr, value != 0);
            }
        }
        Ok(())
    }

    pub fn set_file_record(&self, id: u8, file_number: u16, record_number: u16, data: Vec<u8>) {
        if let Some(slave) = self.get(id) {
            slave
                .registers
                .write()
                .file_records
                .insert((file_number, record_number), data);
        }
    }

    pub fn snapshot(&self, id: u8) -> Option<SlaveSnapshot> {
        let slave = self.get(id)?;
        let regs = slave.registers.read();
        Some(SlaveSnapshot {
            slave_id: slave.id,
            name: slave.name.clone(),
            description: slave.description.clone(),
            holding_registers: regs.holding_registers.clone(),
            input_registers: regs.input_registers.clone(),
            coils: regs.coils.clone(),
            discrete_inputs: regs.discrete_inputs.clone(),
            statistics: slave.stats.snapshot(),
        })
    }

    pub fn record_request_received(&self, id: u8, bytes: usize) {
        if let Some(slave) = self.get(id) {
            slave.stats.mark_request();
            slave.stats.add_bytes_received(bytes);
        }
    }

    pub fn record_success(&self, id: u8, response_len: usize) {
        if let Some(slave) = self.get(id) {
            slave.stats.mark_success(response_len);
        }
    }

    pub fn record_failure(&self, id: u8) {
        if let Some(slave) = self.get(id) {
            slave.stats.mark_failure();
        }
    }

    /// A response was dispatched successfully but then failed to reach the
    /// wire (partial write, port error). Reclassifies that request as
    /// failed rather than double-counting it, so `total_requests ==
    /// successful + failed` keeps holding. Callers must only invoke this
    /// for a response that was already recorded via [`Self::record_success`]
    /// — an exception reply was recorded against `failed` already and has
    /// no `successful` count to take back.
    pub fn record_write_failure(&self, id: u8) {
        if let Some(slave) = self.get(id) {
            slave.stats.successful.fetch_sub(1, Ordering::Relaxed);
            slave.stats.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}
