//! Logging setup for the gateway
//!
//! Console output uses the bracketed `timestamp [LEVEL] message` format. When
//! file logging is enabled a daily rolling file `<dir>/fcugw/fcugw.log.<date>`
//! is written through a non-blocking appender, as text or JSON lines.
//! `RUST_LOG` overrides the configured level.

use crate::config::LoggingConfig;
use std::sync::{Mutex, OnceLock};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    reload,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Service name used for the log subdirectory and default filter
pub const SERVICE_NAME: &str = "fcugw";

fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Event formatter: `2025-12-02T00:50:44.809123Z [INFO] message`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m",
                Level::DEBUG => "\x1b[34m",
                Level::INFO => "\x1b[32m",
                Level::WARN => "\x1b[33m",
                Level::ERROR => "\x1b[31m",
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

// Keeps the non-blocking file writer alive for the process lifetime
static GUARDS: OnceLock<Mutex<Vec<WorkerGuard>>> = OnceLock::new();

type FilterHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;
static FILTER_HANDLE: OnceLock<FilterHandle> = OnceLock::new();
static CURRENT_FILTER: OnceLock<Mutex<String>> = OnceLock::new();

/// Filter directive: `RUST_LOG` if set, else `<level>,fcugw=debug` style
pub fn filter_directive(level: &str) -> String {
    match std::env::var("RUST_LOG") {
        Ok(env) if !env.trim().is_empty() => env,
        _ => {
            let level = level.trim().to_lowercase();
            if level == "debug" || level == "trace" {
                level
            } else {
                format!("{},{}=debug,fcu_protocol=info", level, SERVICE_NAME)
            }
        },
    }
}

/// Install the global subscriber
pub fn init_logging(
    config: &LoggingConfig,
    level_override: Option<&str>,
    ansi: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let directive = filter_directive(level_override.unwrap_or(&config.level));
    let env_filter = EnvFilter::try_new(&directive)?;
    let (reload_filter, reload_handle) = reload::Layer::new(env_filter);
    let _ = FILTER_HANDLE.set(reload_handle);
    let _ = CURRENT_FILTER.set(Mutex::new(directive));

    let console_layer = fmt::layer()
        .with_ansi(ansi)
        .event_format(BracketedLevelFormat)
        .boxed();

    let file_layer = if config.file {
        let log_dir = config.dir.join(SERVICE_NAME);
        std::fs::create_dir_all(&log_dir)?;
        let appender = tracing_appender::rolling::daily(&log_dir, format!("{}.log", SERVICE_NAME));
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        let guards = GUARDS.get_or_init(|| Mutex::new(Vec::new()));
        match guards.lock() {
            Ok(mut slot) => slot.push(guard),
            Err(poisoned) => poisoned.into_inner().push(guard),
        }

        let layer = if config.json {
            fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_level(true)
                .with_target(true)
                .boxed()
        } else {
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .event_format(BracketedLevelFormat)
                .boxed()
        };
        Some(layer)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(reload_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!("Logging: {} @ {:?}", SERVICE_NAME, config.dir);
    Ok(())
}

/// Replace the active filter at runtime
pub fn set_log_level(level: &str) -> Result<(), String> {
    let handle = FILTER_HANDLE
        .get()
        .ok_or("Logging not initialized with reload support")?;

    let new_filter =
        EnvFilter::try_new(level).map_err(|e| format!("Invalid log level '{}': {}", level, e))?;
    handle
        .reload(new_filter)
        .map_err(|e| format!("Failed to reload log filter: {}", e))?;

    if let Some(current) = CURRENT_FILTER.get() {
        if let Ok(mut guard) = current.lock() {
            *guard = level.to_string();
        }
    }
    tracing::info!("Log level changed to: {}", level);
    Ok(())
}

/// Active filter directive, or "unknown" before initialization
pub fn get_log_level() -> String {
    CURRENT_FILTER
        .get()
        .and_then(|m| m.lock().ok())
        .map(|guard| guard.clone())
        .unwrap_or_else(|| "unknown".to_string())
}
