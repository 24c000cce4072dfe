//! Periodic process resource sampling. Purely observational: it logs
//! warnings past configured thresholds and never touches server state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sysinfo::{get_current_pid, PidExt, ProcessExt, System, SystemExt};

const MEMORY_CEILING_MB: u64 = 500;
const CPU_CEILING_PERCENT: f32 = 80.0;

pub struct PerformanceMonitorConfig {
    pub memory_check_interval: Duration,
    pub cpu_check_interval: Duration,
}

/// Spawn the memory- and CPU-sampling threads. Returns their join handles;
/// both exit once `running` is cleared.
pub fn spawn(config: PerformanceMonitorConfig, running: Arc<AtomicBool>) -> Vec<thread::JoinHandle<()>> {
    let memory_running = Arc::clone(&running);
    let memory_handle = thread::spawn(move || sample_loop(config.memory_check_interval, memory_running, check_memory));

    let cpu_running = running;
    let cpu_handle = thread::spawn(move || sample_loop(config.cpu_check_interval, cpu_running, check_cpu));

    vec![memory_handle, cpu_handle]
}

fn sample_loop(interval: Duration, running: Arc<AtomicBool>, check: fn(&mut System, sysinfo::Pid)) {
    let Ok(pid) = get_current_pid() else {
        log::warn!("performance monitor: could not determine own process id, disabling");
        return;
    };
    let mut system = System::new();
    while running.load(Ordering::Relaxed) {
        system.refresh_process(pid);
        check(&mut system, pid);
        thread::sleep(interval);
    }
}

fn check_memory(system: &mut System, pid: sysinfo::Pid) {
    match system.process(pid) {
        Some(process) => {
            let memory_mb = process.memory() / 1024 / 1024;
            if memory_mb > MEMORY_CEILING_MB {
                log::warn!("memory usage {memory_mb} MB exceeds ceiling of {MEMORY_CEILING_MB} MB");
            }
        }
        None => log::warn!("performance monitor: failed to sample memory for pid {pid}"),
    }
}

fn check_cpu(system: &mut System, pid: sysinfo::Pid) {
    match system.process(pid) {
        Some(process) => {
            let cpu_percent = process.cpu_usage();
            if cpu_percent > CPU_CEILING_PERCENT {
                log::warn!("cpu usage {cpu_percent:.1}% exceeds ceiling of {CPU_CEILING_PERCENT:.1}%");
            }
        }
        None => log::warn!("performance monitor: failed to sample cpu for pid {pid}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_produces_two_handles_that_exit_promptly() {
        let running = Arc::new(AtomicBool::new(true));
        let handles = spawn(
            PerformanceMonitorConfig {
                memory_check_interval: Duration::from_millis(10),
                cpu_check_interval: Duration::from_millis(10),
            },
            Arc::clone(&running),
        );
        assert_eq!(handles.len(), 2);
        thread::sleep(Duration::from_millis(30));
        running.store(false, Ordering::Relaxed);
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
