//! Tracing setup for Trendpress binaries.
//!
//! Every run writes to a size-rotated file under `~/.trendpress/logs` and
//! mirrors warnings (or everything, with `verbose`) to stderr so stdout stays
//! clean for `--json` output.

use anyhow::{anyhow, Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str =
    "trendpress=info,trendpress_jobs=info,trendpress_vetting=info,trendpress_guard=info";
const MAX_LOG_FILES: usize = 5;
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Logging options chosen by the caller.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Mirror the full file filter to stderr instead of warnings only.
    pub verbose: bool,
}

/// Install the global subscriber. Call once per process.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let log_dir = ensure_logs_dir().context("Failed to ensure log directory")?;
    let file_writer = SharedRollingWriter::new(log_dir, config.app_name)
        .context("Failed to initialize rolling log writer")?;

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_filter = if config.verbose {
        file_filter.clone()
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter),
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(())
}

/// Trendpress home directory: `$TRENDPRESS_HOME` or `~/.trendpress`.
pub fn trendpress_home() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var("TRENDPRESS_HOME") {
        return Ok(PathBuf::from(override_path));
    }
    dirs::home_dir()
        .map(|home| home.join(".trendpress"))
        .ok_or_else(|| anyhow!("Could not determine home directory; set TRENDPRESS_HOME"))
}

pub fn logs_dir() -> Result<PathBuf> {
    Ok(trendpress_home()?.join("logs"))
}

/// Create the logs directory if needed and return it.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir()?;
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

/// Appends to `<dir>/<name>.log`, shifting it to `<name>.log.1..N` once it
/// grows past `max_size`.
struct RollingFile {
    dir: PathBuf,
    base_name: String,
    max_files: usize,
    max_size: u64,
    file: Option<File>,
    written: u64,
}

impl RollingFile {
    fn open(dir: &Path, base_name: &str, max_files: usize, max_size: u64) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let mut rolling = Self {
            dir: dir.to_path_buf(),
            base_name: sanitize_name(base_name),
            max_files: max_files.max(1),
            max_size,
            file: None,
            written: 0,
        };
        rolling.reopen()?;
        if rolling.written > rolling.max_size {
            rolling.roll()?;
        }
        Ok(rolling)
    }

    fn active_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.base_name))
    }

    fn archive_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.log.{}", self.base_name, index))
    }

    fn reopen(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.active_path())?;
        self.written = file.metadata()?.len();
        self.file = Some(file);
        Ok(())
    }

    fn roll(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }

        let keep = self.max_files.saturating_sub(1);
        if keep > 0 {
            let oldest = self.archive_path(keep);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for idx in (1..keep).rev() {
                let src = self.archive_path(idx);
                if src.exists() {
                    fs::rename(&src, self.archive_path(idx + 1))?;
                }
            }
            let active = self.active_path();
            if active.exists() {
                fs::rename(active, self.archive_path(1))?;
            }
        } else {
            // Single-file mode: truncate in place.
            File::create(self.active_path())?;
        }

        self.reopen()
    }
}

impl Write for RollingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_size {
            self.roll()?;
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file unavailable"))?;
        let n = file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

#[derive(Clone)]
struct SharedRollingWriter {
    inner: Arc<Mutex<RollingFile>>,
}

impl SharedRollingWriter {
    fn new(dir: PathBuf, app_name: &str) -> Result<Self> {
        let rolling = RollingFile::open(&dir, app_name, MAX_LOG_FILES, MAX_LOG_FILE_SIZE)
            .with_context(|| format!("Failed to open log file for {}", app_name))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(rolling)),
        })
    }
}

struct SharedRollingGuard {
    inner: Arc<Mutex<RollingFile>>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedRollingWriter {
    type Writer = SharedRollingGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedRollingGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Write for SharedRollingGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?
            .flush()
    }
}

fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "trendpress".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sanitize_replaces_path_characters() {
        assert_eq!(sanitize_name("trend/press cli"), "trend_press_cli");
        assert_eq!(sanitize_name(""), "trendpress");
    }

    #[test]
    fn rolls_when_size_exceeded() {
        let temp = TempDir::new().unwrap();
        let mut file = RollingFile::open(temp.path(), "app", 3, 16).unwrap();

        file.write_all(b"0123456789").unwrap();
        file.write_all(b"abcdefghij").unwrap();
        file.write_all(b"KLMNOPQRST").unwrap();
        file.flush().unwrap();

        assert!(temp.path().join("app.log").exists());
        assert!(temp.path().join("app.log.1").exists());
        assert!(temp.path().join("app.log.2").exists());
        assert!(!temp.path().join("app.log.3").exists());

        let active = fs::read_to_string(temp.path().join("app.log")).unwrap();
        assert_eq!(active, "KLMNOPQRST");
        let newest_archive = fs::read_to_string(temp.path().join("app.log.1")).unwrap();
        assert_eq!(newest_archive, "abcdefghij");
    }

    #[test]
    fn reopen_appends_to_existing_file() {
        let temp = TempDir::new().unwrap();
        {
            let mut file = RollingFile::open(temp.path(), "app", 2, 1024).unwrap();
            file.write_all(b"first\n").unwrap();
        }
        let mut file = RollingFile::open(temp.path(), "app", 2, 1024).unwrap();
        file.write_all(b"second\n").unwrap();
        file.flush().unwrap();

        let content = fs::read_to_string(temp.path().join("app.log")).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }
}
