use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};

use modbus_rtu_server::config::{Config, DEFAULT_CONFIG_PATH};
use modbus_rtu_server::example_slave::add_example_slave;
use modbus_rtu_server::logging;
use modbus_rtu_server::monitoring::{self, PerformanceMonitorConfig};
use modbus_rtu_server::protocol::modbus::SlaveStore;
use modbus_rtu_server::server::Server;

fn parse_args() -> clap::ArgMatches {
    Command::new("modbus-rtu-server")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Multi-slave Modbus RTU server engine over a single serial line.")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to the JSON configuration file")
                .default_value(DEFAULT_CONFIG_PATH),
        )
        .arg(
            Arg::new("add-example-slave")
                .long("add-example-slave")
                .help("Seed the store with the reference slave used for manual testing")
                .action(ArgAction::SetTrue),
        )
        .get_matches()
}

fn main() -> Result<()> {
    let matches = parse_args();
    let config_path = matches
        .get_one::<String>("config")
        .expect("has a default value");

    let config = Config::load_or_create(config_path)
        .with_context(|| format!("failed to load configuration from {config_path}"))?;

    let log_level = logging::parse_level(&config.server.log_level);
    logging::init(log_level, std::path::Path::new(&config.server.log_file))
        .context("failed to initialize logging")?;

    log::info!("Modbus RTU server starting (config: {config_path})");

    let store = Arc::new(SlaveStore::new(config.server.max_slaves));
    if matches.get_flag("add-example-slave") {
        add_example_slave(&store).context("failed to seed example slave")?;
        log::info!("seeded example slave (id 1)");
    }

    let server = Server::new(&config, Arc::clone(&store))
        .map_err(|err| {
            log::error!("failed to open serial port: {err}");
            err
        })
        .context("failed to open serial port")?;

    let running = server.running_handle();
    install_signal_handlers(Arc::clone(&running)).context("failed to install signal handlers")?;

    monitoring::spawn(
        PerformanceMonitorConfig {
            memory_check_interval: std::time::Duration::from_secs(config.performance.memory_check_interval),
            cpu_check_interval: std::time::Duration::from_secs(config.performance.cpu_check_interval),
        },
        Arc::clone(&running),
    );

    log::info!("server running, press Ctrl+C to stop");
    server.run();
    log::info!("server stopped");
    Ok(())
}

/// Wires SIGINT (via `ctrlc`) and SIGTERM (via `signal-hook`) to clear
/// `running`. `signal-hook`'s flag primitive only ever sets a flag to
/// `true`, so SIGTERM is observed through a separate "term requested" flag
/// watched by a small bridging thread rather than `running` directly.
fn install_signal_handlers(running: Arc<std::sync::atomic::AtomicBool>) -> Result<()> {
    let ctrlc_running = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("received SIGINT, shutting down");
        ctrlc_running.store(false, Ordering::Relaxed);
    })
    .context("failed to register SIGINT handler")?;

    let term_requested = Arc::new(std::sync::atomic::AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&term_requested))
        .context("failed to register SIGTERM handler")?;

    std::thread::spawn(move || {
        while running.load(Ordering::Relaxed) {
            if term_requested.load(Ordering::Relaxed) {
                log::info!("received SIGTERM, shutting down");
                running.store(false, Ordering::Relaxed);
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(200));
        }
    });

    Ok(())
}
