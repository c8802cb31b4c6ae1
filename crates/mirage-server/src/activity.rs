//! Activity log: route registration at startup and one outcome block per request.
//!
//! Logging happens in two phases. [`StartupLogger`] buffers lines while routes are
//! bound and is consumed by [`StartupLogger::flush`], which writes the block to the
//! sink and hands back the [`RuntimeLogger`] used while serving.

use std::sync::Arc;
use tracing::info;

// ANSI color codes
pub(crate) const GREEN: &str = "\x1b[32m";
pub(crate) const YELLOW: &str = "\x1b[33m";
pub(crate) const CYAN: &str = "\x1b[36m";
pub(crate) const BOLD: &str = "\x1b[1m";
pub(crate) const RESET: &str = "\x1b[0m";

/// Destination for activity blocks.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Sink that forwards each block to `tracing`.
pub fn tracing_sink() -> LogSink {
    Arc::new(|block: &str| info!(target: "mirage::activity", "{}", block.trim_end()))
}

/// Buffers lines until binding is complete.
#[derive(Debug, Default)]
pub struct StartupLogger {
    lines: Vec<String>,
}

impl StartupLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Write the buffered block once and switch to request logging.
    pub fn flush(self, sink: Option<LogSink>) -> RuntimeLogger {
        if let Some(ref sink) = sink {
            if !self.lines.is_empty() {
                sink(&self.lines.join("\n"));
            }
        }
        RuntimeLogger { sink }
    }
}

/// Logger used after startup. `None` sink means silent.
#[derive(Clone, Default)]
pub struct RuntimeLogger {
    sink: Option<LogSink>,
}

impl RuntimeLogger {
    pub fn silent() -> Self {
        Self { sink: None }
    }

    pub fn is_silent(&self) -> bool {
        self.sink.is_none()
    }

    /// Emit a standalone block (e.g. the endpoint banner).
    pub fn log(&self, block: &str) {
        if let Some(ref sink) = self.sink {
            sink(block);
        }
    }

    /// Start the log block for one request.
    pub fn begin(&self, url: &str) -> RequestLog {
        let mut lines = Vec::with_capacity(2);
        if self.sink.is_some() {
            lines.push(format!("  {YELLOW}{url}{RESET}"));
        }
        RequestLog {
            sink: self.sink.clone(),
            lines,
        }
    }
}

/// Lines for one request, written to the sink in a single call.
pub struct RequestLog {
    sink: Option<LogSink>,
    lines: Vec<String>,
}

impl RequestLog {
    pub fn outcome(&mut self, method: &str, status: u16) {
        if self.sink.is_some() {
            self.lines.push(format!("    {CYAN}{method}{RESET} -> {status}"));
        }
    }

    pub fn flush(self) {
        if let Some(ref sink) = self.sink {
            sink(&self.lines.join("\n"));
        }
    }
}

impl std::fmt::Debug for RuntimeLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeLogger")
            .field("silent", &self.is_silent())
            .finish()
    }
}

/// Collecting sink for tests.
#[cfg(test)]
pub(crate) fn capture() -> (LogSink, Arc<parking_lot::Mutex<Vec<String>>>) {
    let blocks = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink_blocks = Arc::clone(&blocks);
    let sink: LogSink = Arc::new(move |block: &str| sink_blocks.lock().push(block.to_string()));
    (sink, blocks)
}
