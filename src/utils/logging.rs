use super::error::UtilsError;
use log::{error, LevelFilter};
use simplelog::{Config, WriteLogger};
use std::fs::File;
use std::io::{Error, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

/// A redirectable logging target. The `log` facade writes into whatever
/// writer is currently attached; with no writer attached messages are
/// dropped. Redirection and restore are explicit so a sink can splice the
/// buffered run log into its own output during finalization.
#[derive(Clone)]
pub struct LogSink {
    target: Arc<Mutex<Option<Box<dyn Write + Send>>>>,
}

impl LogSink {
    pub fn new() -> LogSink {
        LogSink {
            target: Arc::new(Mutex::new(None)),
        }
    }

    /// Attach a writer, returning whatever was attached before
    pub fn redirect(&self, writer: Box<dyn Write + Send>) -> Option<Box<dyn Write + Send>> {
        match self.target.lock() {
            Ok(mut target) => target.replace(writer),
            Err(_) => None,
        }
    }

    /// Detach the current writer, leaving the sink silent
    pub fn detach(&self) -> Option<Box<dyn Write + Send>> {
        match self.target.lock() {
            Ok(mut target) => target.take(),
            Err(_) => None,
        }
    }

    /// Put a previously detached writer back
    pub fn restore(&self, previous: Option<Box<dyn Write + Send>>) {
        if let Ok(mut target) = self.target.lock() {
            *target = previous;
        }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        LogSink::new()
    }
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        if let Ok(mut target) = self.target.lock() {
            if let Some(writer) = target.as_mut() {
                return writer.write(buf);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Error> {
        if let Ok(mut target) = self.target.lock() {
            if let Some(writer) = target.as_mut() {
                return writer.flush();
            }
        }
        Ok(())
    }
}

static COLLECTOR_SINK: OnceLock<LogSink> = OnceLock::new();

/// Register the collector's log sink with the logging facade. The first call
/// decides the level, later calls return the existing sink
pub fn init_logging(logging: &Option<String>) -> &'static LogSink {
    let level = log_level(logging);
    COLLECTOR_SINK.get_or_init(|| {
        let sink = LogSink::new();
        let _ = WriteLogger::init(level, Config::default(), sink.clone());
        sink
    })
}

/// The process-wide collector log sink
pub fn collector_log_sink() -> &'static LogSink {
    init_logging(&None)
}

/// Logging level based on `Output` configuration
fn log_level(logging: &Option<String>) -> LevelFilter {
    if let Some(log_level) = logging {
        match log_level.to_lowercase().as_str() {
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            _ => LevelFilter::Warn,
        }
    } else {
        LevelFilter::Warn
    }
}

/// Create the log file a directory sink redirects into
pub(crate) fn create_log_file(path: &Path) -> Result<File, UtilsError> {
    let output_result = File::create(path);
    match output_result {
        Ok(result) => Ok(result),
        Err(err) => {
            error!("[logging] Failed to create log file at {path:?}. Error: {err:?}");
            Err(UtilsError::LogFile)
        }
    }
}
