//! Process-wide logger setup for binaries embedding the editor.
//!
//! # Responsibility
//! - Start one `flexi_logger` backend, writing to stderr or to rotated files.
//! - Record panics as `event=panic_captured` lines before the default hook runs.
//!
//! # Invariants
//! - The library itself never starts a logger; callers opt in through
//!   [`init_logging`].
//! - A second call with the same level and destination is a no-op; any
//!   other second call fails without touching the running logger.
//! - Setup errors are returned as text, never raised as panics.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Once;

const LOG_FILE_BASENAME: &str = "pbxedit";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEPT_LOG_FILES: usize = 5;
const PANIC_SUMMARY_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: Once = Once::new();

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    Stderr,
    /// Rotated `pbxedit*.log` files inside this absolute directory.
    Files(PathBuf),
}

impl LogDestination {
    /// `Stderr` for `None`; otherwise the trimmed directory, which must be
    /// absolute.
    pub fn from_dir(log_dir: Option<&str>) -> Result<Self, String> {
        let Some(raw) = log_dir else {
            return Ok(Self::Stderr);
        };
        let dir = raw.trim();
        if dir.is_empty() {
            return Err("log directory cannot be empty".to_string());
        }
        if !Path::new(dir).is_absolute() {
            return Err(format!("log directory must be absolute, got `{dir}`"));
        }
        Ok(Self::Files(PathBuf::from(dir)))
    }

    pub fn dir(&self) -> Option<&Path> {
        match self {
            Self::Stderr => None,
            Self::Files(dir) => Some(dir),
        }
    }
}

impl Display for LogDestination {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stderr => f.write_str("stderr"),
            Self::Files(dir) => write!(f, "{}", dir.display()),
        }
    }
}

struct ActiveLogger {
    level: LevelFilter,
    destination: LogDestination,
    _handle: LoggerHandle,
}

/// Starts logging at `level` (`trace` to `error`, `warning` accepted) to
/// `log_dir`, or to stderr when `log_dir` is `None`.
///
/// # Errors
/// - Unknown level, or a blank or relative `log_dir`.
/// - Logging already running with a different level or destination.
/// - The directory cannot be created or the backend fails to start.
pub fn init_logging(level: &str, log_dir: Option<&str>) -> Result<(), String> {
    let level = parse_level(level)?;
    let destination = LogDestination::from_dir(log_dir)?;

    let active = ACTIVE.get_or_try_init(|| -> Result<ActiveLogger, String> {
        let handle = start_backend(level, &destination)?;
        install_panic_hook();
        info!(
            "event=logging_start module=core status=ok level={} destination={} os={} version={}",
            level_name(level),
            destination,
            std::env::consts::OS,
            env!("CARGO_PKG_VERSION")
        );
        Ok(ActiveLogger {
            level,
            destination: destination.clone(),
            _handle: handle,
        })
    })?;

    if active.destination != destination {
        return Err(format!(
            "logger already writes to `{}`; cannot move it to `{destination}`",
            active.destination
        ));
    }
    if active.level != level {
        return Err(format!(
            "logger already runs at `{}`; cannot change it to `{}`",
            level_name(active.level),
            level_name(level)
        ));
    }
    Ok(())
}

/// `(level, log_dir)` of the running logger; `log_dir` is `None` for stderr.
pub fn logging_status() -> Option<(&'static str, Option<PathBuf>)> {
    ACTIVE.get().map(|active| {
        (
            level_name(active.level),
            active.destination.dir().map(Path::to_path_buf),
        )
    })
}

/// Level used when the caller names none.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_backend(level: LevelFilter, destination: &LogDestination) -> Result<LoggerHandle, String> {
    let logger = Logger::try_with_str(level_name(level))
        .map_err(|err| format!("logger rejected level `{}`: {err}", level_name(level)))?;
    let started = match destination {
        LogDestination::Stderr => logger.log_to_stderr().start(),
        LogDestination::Files(dir) => {
            std::fs::create_dir_all(dir)
                .map_err(|err| format!("cannot create log directory `{}`: {err}", dir.display()))?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEPT_LOG_FILES),
                )
                .append()
                .write_mode(WriteMode::BufferAndFlush)
                .format_for_files(flexi_logger::detailed_format)
                .start()
        }
    };
    started.map_err(|err| format!("logger backend failed to start: {err}"))
}

fn parse_level(level: &str) -> Result<LevelFilter, String> {
    let wanted = level.trim();
    let wanted = if wanted.eq_ignore_ascii_case("warning") {
        "warn"
    } else {
        wanted
    };
    match LevelFilter::from_str(wanted) {
        Ok(LevelFilter::Off) | Err(_) => Err(format!(
            "unknown log level `{}`; use trace, debug, info, warn or error",
            level.trim()
        )),
        Ok(filter) => Ok(filter),
    }
}

fn level_name(level: LevelFilter) -> &'static str {
    match level {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let chained = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map_or_else(|| "unknown".to_string(), |at| format!("{}:{}", at.file(), at.line()));
            let payload = info
                .payload()
                .downcast_ref::<&str>()
                .map(|text| (*text).to_string())
                .or_else(|| info.payload().downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "<non-string payload>".to_string());
            error!(
                "event=panic_captured module=core status=error location={location} payload={}",
                one_line(&payload, PANIC_SUMMARY_CHARS)
            );
            chained(info);
        }));
    });
}

/// Joins lines with spaces and cuts the text at `limit` chars, marking the cut.
pub(crate) fn one_line(text: &str, limit: usize) -> String {
    let flat = text.replace(['\r', '\n'], " ");
    match flat.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, one_line, parse_level, LogDestination};
    use log::LevelFilter;
    use std::path::PathBuf;

    #[test]
    fn levels_are_case_insensitive_and_accept_warning() {
        assert_eq!(parse_level("DEBUG"), Ok(LevelFilter::Debug));
        assert_eq!(parse_level(" warning "), Ok(LevelFilter::Warn));
        assert!(parse_level("off").unwrap_err().contains("unknown log level"));
        assert!(parse_level("loud").is_err());
    }

    #[test]
    fn destination_requires_absolute_non_blank_dir() {
        assert_eq!(LogDestination::from_dir(None), Ok(LogDestination::Stderr));
        assert!(LogDestination::from_dir(Some("logs")).unwrap_err().contains("absolute"));
        assert!(LogDestination::from_dir(Some(" ")).unwrap_err().contains("empty"));
        let dir = std::env::temp_dir();
        assert_eq!(
            LogDestination::from_dir(dir.to_str()),
            Ok(LogDestination::Files(PathBuf::from(dir.to_str().unwrap())))
        );
    }

    #[test]
    fn one_line_flattens_and_cuts() {
        assert_eq!(one_line("a\nb\rc", 10), "a b c");
        assert_eq!(one_line("abcdef", 3), "abc...");
    }

    #[test]
    fn second_init_must_match_first() {
        let dir = tempfile::tempdir().unwrap();
        let dir_text = dir.path().to_str().unwrap().to_string();

        init_logging("info", Some(&dir_text)).unwrap();
        init_logging("INFO", Some(&dir_text)).unwrap();

        assert!(init_logging("debug", Some(&dir_text))
            .unwrap_err()
            .contains("cannot change"));
        assert!(init_logging("info", None).unwrap_err().contains("cannot move"));

        let (level, active_dir) = logging_status().unwrap();
        assert_eq!(level, "info");
        assert_eq!(active_dir.as_deref(), Some(dir.path()));
    }
}
