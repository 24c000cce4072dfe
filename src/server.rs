//! Thread orchestration: one reader thread, a fixed worker pool, a shared
//! writer lane through the same locked transport, and a stats-reporting
//! thread. Shutdown is cooperative via an `is_running` flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::Config;
use crate::error::TransportError;
use crate::protocol::modbus::{is_exception_response, read_modbus_frame, Dispatcher, SlaveStore};
use crate::protocol::serial::SerialTransport;

const WORK_QUEUE_CAPACITY: usize = 100;
const WORKER_COUNT: usize = 4;
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Server {
    store: Arc<SlaveStore>,
    dispatcher: Arc<Dispatcher>,
    transport: Arc<Mutex<SerialTransport>>,
    running: Arc<AtomicBool>,
    stats_interval: Duration,
}

impl Server {
    pub fn new(config: &Config, store: Arc<SlaveStore>) -> Result<Self, TransportError> {
        let transport = SerialTransport::open(config.serial.clone())?;
        Ok(Self {
            dispatcher: Arc::new(Dispatcher::new(Arc::clone(&store))),
            store,
            transport: Arc::new(Mutex::new(transport)),
            running: Arc::new(AtomicBool::new(true)),
            stats_interval: Duration::from_secs(config.server.stats_interval),
        })
    }

    pub fn running_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Runs the reader, worker pool, and stats thread until `running` is
    /// cleared (by a signal handler or the caller), then joins everything
    /// with a bounded timeout.
    pub fn run(self) {
        let (work_tx, work_rx) = flume::bounded::<Vec<u8>>(WORK_QUEUE_CAPACITY);

        let reader = {
            let transport = Arc::clone(&self.transport);
            let running = Arc::clone(&self.running);
            let store = Arc::clone(&self.store);
            thread::spawn(move || reader_loop(transport, running, store, work_tx))
        };

        let mut workers = Vec::with_capacity(WORKER_COUNT);
        for id in 0..WORKER_COUNT {
            let work_rx = work_rx.clone();
            let dispatcher = Arc::clone(&self.dispatcher);
            let transport = Arc::clone(&self.transport);
            let store = Arc::clone(&self.store);
            workers.push(thread::spawn(move || worker_loop(id, work_rx, dispatcher, transport, store)));
        }
        drop(work_rx);

        let stats = {
            let store = Arc::clone(&self.store);
            let running = Arc::clone(&self.running);
            let interval = self.stats_interval;
            thread::spawn(move || stats_loop(store, running, interval))
        };

        join_with_timeout("reader", reader, JOIN_TIMEOUT);
        for (id, worker) in workers.into_iter().enumerate() {
            join_with_timeout(&format!("worker-{id}"), worker, JOIN_TIMEOUT);
        }
        join_with_timeout("stats", stats, JOIN_TIMEOUT);
    }
}

fn reader_loop(
    transport: Arc<Mutex<SerialTransport>>,
    running: Arc<AtomicBool>,
    store: Arc<SlaveStore>,
    work_tx: flume::Sender<Vec<u8>>,
) {
    while running.load(Ordering::Relaxed) {
        let frame = {
            let mut guard = transport.lock().expect("transport mutex poisoned");
            read_modbus_frame(&mut *guard)
        };

        match frame {
            Ok(Some(frame)) => {
                let slave_id = frame[0];
                if work_tx.try_send(frame).is_err() {
                    log::warn!("work queue full, dropping frame from slave {slave_id}");
                    store.record_failure(slave_id);
                }
            }
            Ok(None) => {
                // idle bus, short read, or unsupported-function resync: nothing to do
            }
            Err(err) => {
                log::error!("serial read error, reconnecting: {err}");
                let mut guard = transport.lock().expect("transport mutex poisoned");
                if let Err(reconnect_err) = guard.reconnect() {
                    log::error!("reconnect failed: {reconnect_err}");
                    thread::sleep(Duration::from_secs(1));
                }
            }
        }
    }
    log::info!("reader thread exiting");
}

fn worker_loop(
    id: usize,
    work_rx: flume::Receiver<Vec<u8>>,
    dispatcher: Arc<Dispatcher>,
    transport: Arc<Mutex<SerialTransport>>,
    store: Arc<SlaveStore>,
) {
    while let Ok(frame) = work_rx.recv() {
        let slave_id = frame[0];
        if let Some(response) = dispatcher.handle(&frame) {
            let mut guard = transport.lock().expect("transport mutex poisoned");
            if let Err(err) = guard.write_frame(&response) {
                log::error!("worker-{id}: failed to write response to slave {slave_id}: {err}");
                // Exception replies were already counted against `failed` by
                // the dispatcher, never `successful`; reclassifying one here
                // would underflow `successful` and double-count `failed`.
                if !is_exception_response(&response) {
                    store.record_write_failure(slave_id);
                }
            }
        }
    }
    log::info!("worker-{id} thread exiting");
}

fn stats_loop(store: Arc<SlaveStore>, running: Arc<AtomicBool>, interval: Duration) {
    while running.load(Ordering::Relaxed) {
        thread::sleep(interval);
        if !running.load(Ordering::Relaxed) {
            break;
        }
        for id in store.ids() {
            if let Some(snapshot) = store.snapshot(id) {
                let s = snapshot.statistics;
                log::info!(
                    "slave {id} ({}): requests={} ok={} failed={} bytes_in={} bytes_out={}",
                    snapshot.name,
                    s.total_requests,
                    s.successful,
                    s.failed,
                    s.bytes_received,
                    s.bytes_sent
                );
            }
        }
    }
    log::info!("stats thread exiting");
}

fn join_with_timeout(label: &str, handle: JoinHandle<()>, timeout: Duration) {
    let (done_tx, done_rx) = flume::bounded::<()>(1);
    let proxy = thread::spawn(move || {
        let _ = handle.join();
        let _ = done_tx.send(());
    });
    if done_rx.recv_timeout(timeout).is_err() {
        log::warn!("{label} thread did not exit within {timeout:?}, abandoning");
    }
    let _ = proxy.join();
}
