use std::{
    fs::File,
    io::{self, IsTerminal},
    path::Path,
    sync::Mutex,
};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter,
    fmt::{format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Local wall-clock timestamps with millisecond precision and UTC offset.
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(
        &self,
        w: &mut Writer<'_>,
    ) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

// --- Setup ---

/// Parses a bare level ("warn", "debug") or any EnvFilter directive.
fn directive_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level).with_context(|| format!("invalid log level '{level}'"))
}

fn open_log_file(path: &Path) -> Result<File> {
    File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file '{}'", path.display()))
}

/// Stderr layer plus an optional plain-text file layer, both under `filter`.
fn build_subscriber(
    filter: EnvFilter,
    ansi: bool,
    file: Option<File>,
) -> impl Subscriber + Send + Sync + 'static {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_timer(LocalTime)
        .with_writer(io::stderr)
        .with_ansi(ansi);

    let file_layer = file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_timer(LocalTime)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
}

/// Initializes logging. Call once at startup.
///
/// - Stderr: colored when attached to a terminal, so command output on
///   stdout stays pipeable.
/// - File: appended to when `file` is given. The directory must exist.
/// - Level: `level` unless the RUST_LOG env var is set.
pub fn init_logging(
    level: &str,
    file: Option<&Path>,
) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => directive_filter(level)?,
    };
    let file = file.map(open_log_file).transpose()?;

    build_subscriber(filter, io::stderr().is_terminal(), file)
        .try_init()
        .context("logging already initialized")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tracing::{debug, info};

    use super::*;

    #[test]
    fn bare_levels_and_directives_parse() {
        assert!(directive_filter("warn").is_ok());
        assert!(directive_filter("info,payroll_core=debug").is_ok());
    }

    #[test]
    fn unknown_level_is_rejected() {
        let err = directive_filter("payroll_core=loud").unwrap_err();

        assert!(format!("{err}").contains("payroll_core=loud"));
    }

    #[test]
    fn file_layer_receives_filtered_records() {
        let path =
            std::env::temp_dir().join(format!("payroll-cli-log-{}.log", std::process::id()));
        fs::remove_file(&path).ok();
        let file = open_log_file(&path).unwrap();
        let subscriber = build_subscriber(directive_filter("info").unwrap(), false, Some(file));

        tracing::subscriber::with_default(subscriber, || {
            info!(entry_id = 7, "Created pay entry");
            debug!("below the configured level");
        });

        let contents = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();
        assert!(contents.contains("Created pay entry"), "{contents}");
        assert!(contents.contains("entry_id=7"), "{contents}");
        assert!(contents.contains(" INFO "), "{contents}");
        assert!(!contents.contains("below the configured level"));
        assert!(!contents.contains('\x1b'));
    }

    #[test]
    fn local_timestamp_carries_offset() {
        let mut out = String::new();

        LocalTime.format_time(&mut Writer::new(&mut out)).unwrap();

        let stamp = chrono::DateTime::parse_from_str(&out, "%Y-%m-%dT%H:%M:%S%.3f%:z").unwrap();
        assert_eq!(stamp.offset(), Local::now().offset());
    }

    #[test]
    fn missing_log_directory_is_an_error() {
        let path = std::env::temp_dir()
            .join("payroll-cli-no-such-dir")
            .join("payroll.log");

        assert!(open_log_file(&path).is_err());
    }
}
