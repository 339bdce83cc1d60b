//! Append-only audit log.
//!
//! Every classified command attempt and every session-level event becomes one
//! timestamped line in a process-wide sink. Records are never mutated or
//! deleted; the sink is opened for append on first write and closed with the
//! process.
//!
//! Record lines follow the fixed format
//! `[YYYY-MM-DD HH:MM:SS] <STATUS> en <device>: <subject> -> <detail>` with
//! `STATUS` one of `OK`, `ERROR`, `EXCEPCIÓN`. Run and device brackets are
//! free-form marker lines. A whole line is written under one lock acquisition,
//! so concurrent writers never interleave within a record.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Status tag of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    /// Command applied, or session event completed normally.
    Ok,
    /// Command rejected by the device, or session could not be established.
    Error,
    /// Transport-level fault while talking to the device.
    Exception,
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            LogStatus::Ok => "OK",
            LogStatus::Error => "ERROR",
            LogStatus::Exception => "EXCEPCIÓN",
        };
        f.write_str(tag)
    }
}

/// One audit record: a command attempt or a session-level event.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub status: LogStatus,
    /// Device address the record refers to.
    pub device: String,
    /// The command, or a session marker such as `conexión`.
    pub subject: String,
    /// Device response, error text, or event description.
    pub detail: String,
}

impl LogRecord {
    /// Creates a record stamped with the current local time.
    pub fn new(status: LogStatus, device: &str, subject: &str, detail: &str) -> Self {
        Self {
            timestamp: Local::now(),
            status,
            device: device.to_string(),
            subject: subject.to_string(),
            detail: detail.to_string(),
        }
    }

    /// Renders the record as its single log line (without trailing newline).
    pub fn render(&self) -> String {
        format!(
            "[{}] {} en {}: {} -> {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.status,
            self.device,
            flatten(&self.subject),
            flatten(&self.detail),
        )
    }
}

/// Collapses line breaks so a record always occupies exactly one line.
fn flatten(text: &str) -> String {
    if text.contains(['\r', '\n']) {
        text.replace("\r\n", " ").replace(['\r', '\n'], " ")
    } else {
        text.to_string()
    }
}

/// Cloneable handle to the process-wide append-only log sink.
///
/// All clones share one sink; appends are serialized through a mutex so one
/// record is always one uninterrupted line, including under concurrent
/// writers.
#[derive(Clone)]
pub struct EventLog {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl EventLog {
    /// Opens `path` for append (creating it if needed).
    pub fn to_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::to_writer(file))
    }

    /// Wraps any writer as the log sink.
    pub fn to_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// A sink that discards everything.
    pub fn sink_to_null() -> Self {
        Self::to_writer(io::sink())
    }

    /// Appends one record as one line.
    pub fn append(&self, record: &LogRecord) -> Result<(), EngineError> {
        self.write_line(&record.render())
    }

    /// Convenience: build and append a record in one call.
    pub fn record(
        &self,
        status: LogStatus,
        device: &str,
        subject: &str,
        detail: &str,
    ) -> Result<(), EngineError> {
        self.append(&LogRecord::new(status, device, subject, detail))
    }

    /// Appends a free-form timestamped marker line (run/device brackets).
    pub fn marker(&self, text: &str) -> Result<(), EngineError> {
        let line = format!(
            "[{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            flatten(text)
        );
        self.write_line(&line)
    }

    fn write_line(&self, line: &str) -> Result<(), EngineError> {
        let mut guard = self
            .sink
            .lock()
            .map_err(|err| io::Error::other(format!("log sink lock poisoned: {err}")))?;
        writeln!(guard, "{line}")?;
        guard.flush()?;
        Ok(())
    }
}
