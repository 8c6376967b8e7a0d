use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Environment variable holding the log filter, e.g. `MINTER_LOG=debug`
pub const LOG_FILTER_ENV: &str = "MINTER_LOG";

/// Initializes logging.
/// - Logs always go to stdout, filtered by MINTER_LOG (default `info`).
/// - If `log_dir` is set, logs are also written to `<log_dir>/log_<YYYY-MM-DD_HH-MM-SS>.txt`,
///   whose path is returned.
/// - Only the first call installs a subscriber; later calls are no-ops returning `None`,
///   so tests can call it freely.
pub fn init_logging(log_dir: Option<&Path>) -> io::Result<Option<PathBuf>> {
    if LOGGING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(None);
    }

    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false);

    let (file_layer, log_path) = match log_dir {
        Some(dir) => {
            let path = log_file_path(dir);
            fs::create_dir_all(dir)?;
            let file = File::create(&path)?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    // a subscriber installed elsewhere (e.g. by a test harness) wins
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();

    Ok(log_path)
}

/// `<dir>/log_<local timestamp>.txt`
pub fn log_file_path(dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    dir.join(format!("log_{}.txt", stamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_path() {
        let path = log_file_path(Path::new("logs"));
        assert_eq!(path.parent(), Some(Path::new("logs")));
        let name = path.file_name().and_then(|n| n.to_str()).unwrap();
        assert!(name.starts_with("log_"));
        assert!(name.ends_with(".txt"));
        // log_YYYY-MM-DD_HH-MM-SS.txt
        assert_eq!(name.len(), "log_2024-01-01_00-00-00.txt".len());
    }

    #[test]
    fn test_init_logging_once() {
        let dir = tempfile::tempdir().unwrap();
        let first = init_logging(Some(dir.path())).unwrap();
        let path = first.expect("First initialization should create a log file");
        assert!(path.exists());
        tracing::info!("written to the log file");

        assert_eq!(init_logging(Some(dir.path())).unwrap(), None);
    }
}
