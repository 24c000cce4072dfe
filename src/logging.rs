//! Logging setup: level-filtered, mirrored to stdout and a size-rotated file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use env_logger::{Builder, Target};
use log::LevelFilter;

const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;
const BACKUP_COUNT: u32 = 5;

/// Maps the configuration's level name (DEBUG/INFO/WARNING/ERROR/CRITICAL)
/// onto the five levels `log` understands; CRITICAL has no direct
/// equivalent and maps to Error.
pub fn parse_level(name: &str) -> LevelFilter {
    match name.to_ascii_uppercase().as_str() {
        "DEBUG" => LevelFilter::Debug,
        "WARNING" | "WARN" => LevelFilter::Warn,
        "ERROR" | "CRITICAL" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

/// A writer that mirrors every write to stdout and to a log file, rotating
/// the file by renaming `path`, `path.1`, ... `path.{BACKUP_COUNT-1}` once
/// `path` exceeds [`MAX_LOG_BYTES`].
struct RotatingDualWriter {
    path: PathBuf,
    file: File,
    written: u64,
}

impl RotatingDualWriter {
    fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(Self {
            path: path.to_path_buf(),
            file,
            written,
        })
    }

    fn rotate(&mut self) -> io::Result<()> {
        for i in (1..BACKUP_COUNT).rev() {
            let src = self.backup_path(i);
            let dst = self.backup_path(i + 1);
            if src.exists() {
                let _ = fs::rename(&src, &dst);
            }
        }
        let _ = fs::rename(&self.path, self.backup_path(1));
        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.written = 0;
        Ok(())
    }

    fn backup_path(&self, index: u32) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }
}

impl Write for RotatingDualWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written + buf.len() as u64 > MAX_LOG_BYTES {
            self.rotate()?;
        }
        self.file.write_all(buf)?;
        self.written += buf.len() as u64;
        io::stdout().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        io::stdout().flush()
    }
}

/// A `Write` impl that serializes access to a shared writer; `env_logger`
/// requires `Target::Pipe` to own a `Send`-able writer it can call from
/// whichever thread logs.
struct SharedWriter(Mutex<RotatingDualWriter>);

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log writer mutex poisoned").write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().expect("log writer mutex poisoned").flush()
    }
}

pub fn init(level: LevelFilter, log_file: &Path) -> io::Result<()> {
    let writer = RotatingDualWriter::open(log_file)?;
    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(SharedWriter(Mutex::new(writer)))))
        .filter_level(level)
        .parse_default_env()
        .init();

    log::info!("logging initialized at level {level}, writing to {}", log_file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level_maps_all_five_names() {
        assert_eq!(parse_level("DEBUG"), LevelFilter::Debug);
        assert_eq!(parse_level("info"), LevelFilter::Info);
        assert_eq!(parse_level("WARNING"), LevelFilter::Warn);
        assert_eq!(parse_level("ERROR"), LevelFilter::Error);
        assert_eq!(parse_level("CRITICAL"), LevelFilter::Error);
        assert_eq!(parse_level("nonsense"), LevelFilter::Info);
    }

    #[test]
    fn rotating_writer_creates_parent_dirs() {
        let dir = std::env::temp_dir().join(format!(
            "modbus-rtu-server-log-test-{:?}",
            std::thread::current().id()
        ));
        let path = dir.join("nested").join("server.log");
        let mut writer = RotatingDualWriter::open(&path).unwrap();
        writer.write_all(b"hello\n").unwrap();
        assert!(path.exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rotating_writer_rotates_past_the_size_ceiling() {
        let dir = std::env::temp_dir().join(format!(
            "modbus-rtu-server-log-test-rotate-{:?}",
            std::thread::current().id()
        ));
        let path = dir.join("server.log");
        let mut writer = RotatingDualWriter::open(&path).unwrap();
        writer.written = MAX_LOG_BYTES;
        writer.write_all(b"triggers rotation\n").unwrap();
        assert!(writer.backup_path(1).exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
