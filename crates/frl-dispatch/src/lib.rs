// SPDX-License-Identifier: MIT OR Apache-2.0
//! The single point where an unhandled [`ErrorRecord`] becomes an outward
//! response.
//!
//! A [`DispatchPipeline`] runs a fixed linear stage sequence per record:
//! classify → log-or-suppress → assign-status → render → emit.  Logging is
//! always attempted before rendering so a rendering failure can never
//! suppress the audit trail, and a failing log sink is downgraded to a
//! best-effort diagnostic write instead of aborting the dispatch.
//!
//! The pipeline is an explicitly constructed value injected at whatever
//! boundary needs it; there is no process-global handler and no mutable
//! state across invocations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use frl_core::{ErrorContext, ErrorKind, ErrorRecord};
use frl_render::{ChannelTag, GENERIC_FALLBACK, Projection, RendererRegistry, Response};
use frl_taxonomy::TaxonomyRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// LogEntry
// ---------------------------------------------------------------------------

/// Structured log record written for a loggable dispatch.
///
/// Carries the full internal view: kind, code, diagnostic message, context,
/// and cause chain summary.  This is the only place internal detail leaves
/// the record besides explicitly trusted channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Failure kind.
    pub kind: ErrorKind,
    /// Stable numeric code.
    pub code: u32,
    /// Internal diagnostic message.
    pub message: String,
    /// Structured context.
    pub context: ErrorContext,
    /// Cause chain summary, immediate cause first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cause_summary: Vec<String>,
}

impl LogEntry {
    /// Snapshot a record into its log form.
    #[must_use]
    pub fn from_record(record: &ErrorRecord) -> Self {
        Self {
            kind: record.kind().clone(),
            code: record.code(),
            message: record.message().to_string(),
            context: record.context().clone(),
            cause_summary: record.cause_summary(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.kind, self.code, self.message)?;
        if !self.cause_summary.is_empty() {
            write!(f, " (caused by: {})", self.cause_summary.join(" <- "))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LogSink
// ---------------------------------------------------------------------------

/// Failure of the logging collaborator.
///
/// Absorbed by the pipeline's log stage; never escalated to the caller.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The sink's transport failed.
    #[error("log sink I/O failure")]
    Io(#[from] std::io::Error),

    /// The sink refused the write.
    #[error("log sink unavailable: {reason}")]
    Unavailable {
        /// Human-readable refusal detail.
        reason: String,
    },
}

/// Destination for structured log entries.
///
/// Implementations must make concurrent writes safe; the pipeline performs
/// exactly one write call per loggable dispatch and adds no locking of its
/// own.
pub trait LogSink: Send + Sync {
    /// Write one entry.
    fn write(&self, entry: &LogEntry) -> Result<(), SinkError>;
}

/// Sink emitting entries through `tracing::error!`; never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, entry: &LogEntry) -> Result<(), SinkError> {
        tracing::error!(
            target: "frl.sink",
            kind = %entry.kind,
            code = entry.code,
            message = %entry.message,
            context = ?entry.context,
            cause = ?entry.cause_summary,
            "error dispatched"
        );
        Ok(())
    }
}

/// In-memory capture sink for tests and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries written so far.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.inner.lock().expect("memory sink lock poisoned").clone()
    }

    /// Number of entries written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("memory sink lock poisoned").len()
    }

    /// Whether nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all captured entries.
    pub fn clear(&self) {
        self.inner.lock().expect("memory sink lock poisoned").clear();
    }
}

impl LogSink for MemorySink {
    fn write(&self, entry: &LogEntry) -> Result<(), SinkError> {
        self.inner
            .lock()
            .expect("memory sink lock poisoned")
            .push(entry.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Pipeline stage tags emitted as structured trace events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// The record entered the pipeline.
    Received,
    /// Capabilities were resolved.
    Classified,
    /// The record was written to the log sink.
    Logged,
    /// The record's kind is not loggable; no sink call was made.
    Suppressed,
    /// The resolved status was attached to the response metadata.
    StatusAssigned,
    /// The channel's renderer produced the body.
    Rendered,
    /// The response was handed back to the caller.
    Emitted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::Classified => "classified",
            Self::Logged => "logged",
            Self::Suppressed => "suppressed",
            Self::StatusAssigned => "status_assigned",
            Self::Rendered => "rendered",
            Self::Emitted => "emitted",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// DispatchPipeline
// ---------------------------------------------------------------------------

/// Ordered handler sequence consuming each record exactly once.
///
/// Holds only read-only registries and the shared sink, so independent
/// dispatches can run concurrently.  Re-dispatch of a record is impossible:
/// [`dispatch`](Self::dispatch) takes the record by value.
pub struct DispatchPipeline {
    taxonomy: Arc<TaxonomyRegistry>,
    renderers: RendererRegistry,
    sink: Box<dyn LogSink>,
    generic_fallback: String,
}

impl DispatchPipeline {
    /// Assemble a pipeline from its collaborators.
    #[must_use]
    pub fn new(
        taxonomy: Arc<TaxonomyRegistry>,
        renderers: RendererRegistry,
        sink: impl LogSink + 'static,
    ) -> Self {
        Self {
            taxonomy,
            renderers,
            sink: Box::new(sink),
            generic_fallback: GENERIC_FALLBACK.to_string(),
        }
    }

    /// Replace the generic message used when a kind has no public message.
    #[must_use]
    pub fn with_generic_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.generic_fallback = fallback.into();
        self
    }

    /// The taxonomy this pipeline classifies against.
    #[must_use]
    pub fn taxonomy(&self) -> &Arc<TaxonomyRegistry> {
        &self.taxonomy
    }

    /// Turn one unhandled record into a response for `channel`.
    ///
    /// Stage order is fixed: classification, then the log decision, then
    /// status assignment, then rendering.  The record is consumed; derived
    /// values (status, body) are produced as new values, never written back.
    #[must_use]
    pub fn dispatch(&self, record: ErrorRecord, channel: &ChannelTag) -> Response {
        debug!(target: "frl.pipeline", stage = %Stage::Received, kind = %record.kind(), channel = %channel, "dispatch");

        let caps = self.taxonomy.resolve(&record);
        debug!(
            target: "frl.pipeline",
            stage = %Stage::Classified,
            loggable = caps.loggable,
            status = caps.http_status.as_u16(),
            "dispatch"
        );

        if caps.loggable {
            let entry = LogEntry::from_record(&record);
            match self.sink.write(&entry) {
                Ok(()) => {
                    debug!(target: "frl.pipeline", stage = %Stage::Logged, code = entry.code, "dispatch");
                }
                Err(err) => {
                    // Best-effort fallback write; the audit trail survives on
                    // the local diagnostic stream and the dispatch proceeds.
                    warn!(
                        target: "frl.pipeline",
                        sink_error = %err,
                        entry = %entry,
                        "log sink failed; entry diverted to diagnostic stream"
                    );
                }
            }
        } else {
            debug!(target: "frl.pipeline", stage = %Stage::Suppressed, "dispatch");
        }

        debug!(target: "frl.pipeline", stage = %Stage::StatusAssigned, status = caps.http_status.as_u16(), "dispatch");

        let projection = if self.renderers.is_trusted(channel) {
            Projection::trusted(&record, &caps, &self.generic_fallback)
        } else {
            Projection::sanitized(&record, &caps, &self.generic_fallback)
        };
        let response = self.renderers.render(channel, &projection);
        debug!(target: "frl.pipeline", stage = %Stage::Rendered, content_type = response.content_type, "dispatch");

        debug!(target: "frl.pipeline", stage = %Stage::Emitted, status = response.status.as_u16(), "dispatch");
        response
    }
}

impl fmt::Debug for DispatchPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchPipeline")
            .field("taxonomy", &self.taxonomy)
            .field("renderers", &self.renderers)
            .field("generic_fallback", &self.generic_fallback)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
