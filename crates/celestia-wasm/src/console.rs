//! `tracing` output to the browser console.
//!
//! Events are formatted by `tracing_subscriber::fmt` and written to the
//! `console` method matching their level, so browser devtools filtering by
//! level keeps working. The filter sits behind a reload layer so the level
//! can be changed after startup.

use std::io;
use std::sync::OnceLock;

use tracing::{Level, Metadata, Subscriber};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{Registry, fmt, reload};
use wasm_bindgen::JsValue;

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static LOG_CONTROL: OnceLock<LogControl> = OnceLock::new();

/// Console method an event is written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleMethod {
    Error,
    Warn,
    Info,
    Debug,
    Log,
}

impl ConsoleMethod {
    pub fn for_level(level: Level) -> Self {
        match level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO => Self::Info,
            Level::DEBUG => Self::Debug,
            _ => Self::Log,
        }
    }

    fn write(self, line: &str) {
        let value = JsValue::from_str(line);
        match self {
            Self::Error => web_sys::console::error_1(&value),
            Self::Warn => web_sys::console::warn_1(&value),
            Self::Info => web_sys::console::info_1(&value),
            Self::Debug => web_sys::console::debug_1(&value),
            Self::Log => web_sys::console::log_1(&value),
        }
    }
}

/// [`MakeWriter`] handing out one [`ConsoleWriter`] per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleMakeWriter;

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter::new(ConsoleMethod::Log)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter::new(ConsoleMethod::for_level(*meta.level()))
    }
}

/// Buffers one formatted event and writes it to the console when dropped.
#[derive(Debug)]
pub struct ConsoleWriter {
    method: ConsoleMethod,
    buffer: Vec<u8>,
}

impl ConsoleWriter {
    fn new(method: ConsoleMethod) -> Self {
        Self {
            method,
            buffer: Vec::new(),
        }
    }
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let text = String::from_utf8_lossy(&self.buffer);
        let line = text.trim_end();
        if !line.is_empty() {
            self.method.write(line);
        }
    }
}

/// Parse a level name (`info`, `debug`, ...) or a directive list such as
/// `celestia=debug,warn`. Bare words that are not level names are rejected.
pub fn parse_filter(spec: &str) -> Option<EnvFilter> {
    let spec = spec.trim();
    if let Ok(level) = spec.parse::<LevelFilter>() {
        return Some(EnvFilter::default().add_directive(level.into()));
    }
    if spec.contains('=') {
        return EnvFilter::try_new(spec).ok();
    }
    None
}

/// Handle to the installed filter.
#[derive(Debug, Clone)]
pub struct LogControl {
    handle: FilterHandle,
}

impl LogControl {
    /// Swap in a new filter. Returns `false` if `spec` does not parse or the
    /// subscriber is gone.
    pub fn set(&self, spec: &str) -> bool {
        let Some(filter) = parse_filter(spec) else {
            return false;
        };
        self.handle.modify(|current| *current = filter).is_ok()
    }
}

/// Console subscriber with a reloadable filter, writing through `writer`.
pub fn subscriber<W>(filter: EnvFilter, writer: W) -> (impl Subscriber + Send + Sync + 'static, LogControl)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let (filter, handle) = reload::Layer::new(filter);
    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .without_time()
            .with_target(false),
    );
    (subscriber, LogControl { handle })
}

/// Install the console subscriber. Returns `false` if a global subscriber
/// was already set.
pub fn init_logging(spec: &str) -> bool {
    let filter = parse_filter(spec)
        .unwrap_or_else(|| EnvFilter::default().add_directive(LevelFilter::INFO.into()));
    let (subscriber, control) = subscriber(filter, ConsoleMakeWriter);
    if subscriber.try_init().is_err() {
        return false;
    }
    let _ = LOG_CONTROL.set(control);
    true
}

/// Change the console filter, installing the subscriber if needed.
pub fn set_level(spec: &str) -> bool {
    match LOG_CONTROL.get() {
        Some(control) => control.set(spec),
        None => parse_filter(spec).is_some() && init_logging(spec),
    }
}
