pub mod config;
pub mod inference;
pub mod mcp_client;
pub mod mcp_server;
pub mod planner;
pub mod repl;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use config::LoggingConfig;

/// Number of rotated log files kept next to the active one.
const LOG_ROTATIONS: u32 = 3;

/// Return the platform-standard data directory for netbuddy.
///
/// - macOS: `~/Library/Application Support/netbuddy/`
/// - Windows: `{FOLDERID_RoamingAppData}\netbuddy\`
/// - Linux: `$XDG_DATA_HOME/netbuddy/` (fallback `~/.local/share/...`)
///
/// Falls back to `~/.netbuddy/` only if none of the above can be resolved.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("netbuddy");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".netbuddy")
}

/// Where a configured log file lives. Relative paths are placed under
/// [`data_dir`].
pub fn resolve_log_path(file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        data_dir().join(file)
    }
}

/// Initialize the tracing subscriber.
///
/// Logs go to stderr unless `logging.file` is set, in which case the file is
/// rotated (keeps the last 3) and written through a line-flushing writer.
/// Never writes to stdout: the tool host uses stdout for protocol frames.
/// `RUST_LOG` overrides `logging.filter`.
pub fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("netbuddy=info,warn"));

    let log_path = logging.file.as_deref().map(resolve_log_path);

    let (writer, ansi) = match &log_path {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            rotate_log_file(path, LOG_ROTATIONS);
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            (BoxMakeWriter::new(FlushingWriter::new(file)), false)
        }
        None => (
            BoxMakeWriter::new(std::io::stderr),
            std::io::stderr().is_terminal(),
        ),
    };

    let builder = fmt::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true);

    let installed = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        log_file = ?log_path,
        pid = std::process::id(),
        "tracing initialized"
    );
    Ok(())
}

/// Rotate log files: `x.log` → `x.log.1` → `.2` → … → `.{keep}`.
///
/// Oldest file beyond `keep` is deleted. Missing files in the chain are skipped.
fn rotate_log_file(base_path: &Path, keep: u32) {
    let oldest = format!("{}.{keep}", base_path.display());
    let _ = std::fs::remove_file(&oldest);

    for i in (1..keep).rev() {
        let from = format!("{}.{i}", base_path.display());
        let to = format!("{}.{}", base_path.display(), i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    if base_path.exists() {
        let to = format!("{}.1", base_path.display());
        let _ = std::fs::rename(base_path, &to);
    }
}

/// A file writer that flushes after every write so log lines survive a crash.
#[derive(Clone)]
struct FlushingWriter {
    file: std::sync::Arc<std::sync::Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: std::sync::Arc::new(std::sync::Mutex::new(file)),
        }
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        let n = std::io::Write::write(&mut *f, buf)?;
        std::io::Write::flush(&mut *f)?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        std::io::Write::flush(&mut *f)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
