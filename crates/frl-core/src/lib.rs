// SPDX-License-Identifier: MIT OR Apache-2.0
//! Core failure value types for Fault Relay.
//!
//! An [`ErrorRecord`] is the immutable value representing one failure
//! occurrence: a typed [`ErrorKind`], a stable numeric code, an internal
//! diagnostic message, structured key-value context, and an optional
//! [`Cause`] chain.  Records are built once (usually through the factory in
//! `frl-taxonomy`), travel up the call chain by ownership, and are consumed
//! exactly once by the dispatch pipeline.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Identifier naming exactly one conceptual failure cause.
///
/// Kinds are compared, ordered, and hashed by value.  A kind must never be
/// reused to mean two unrelated conditions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorKind(String);

/// Name of the reserved sentinel kind for failures nothing registered.
pub const UNKNOWN_KIND: &str = "unknown";

/// Numeric code reserved for the unknown sentinel; never registrable.
pub const UNKNOWN_CODE: u32 = 0;

impl ErrorKind {
    /// Create a kind from its identifier string.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The sentinel kind used when a failure could not be classified.
    ///
    /// A plain value compared by value; no singleton, no static state.
    #[must_use]
    pub fn unknown() -> Self {
        Self(UNKNOWN_KIND.to_string())
    }

    /// Whether this is the unknown sentinel.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_KIND
    }

    /// The identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ErrorKind {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ErrorKind {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ErrorContext
// ---------------------------------------------------------------------------

/// Kind-specific key-value payload of a record, fixed at construction.
///
/// Backed by a `BTreeMap` so iteration and serialisation are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorContext(BTreeMap<String, serde_json::Value>);

impl ErrorContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key-value pair, consuming and returning the context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if serialisation
    /// fails, the entry is silently skipped.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.0.insert(key.into(), v);
        }
        self
    }

    /// Look up a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Whether the context holds an entry for `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the context is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }
}

impl FromIterator<(String, serde_json::Value)> for ErrorContext {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// CapabilityOverrides
// ---------------------------------------------------------------------------

/// Per-instance capability overrides, set only during construction.
///
/// Each field, when present, takes precedence over the taxonomy defaults for
/// the record's kind when capabilities are resolved.
#[derive(Debug, Clone, Default)]
pub struct CapabilityOverrides {
    /// Override the kind's log decision.
    pub loggable: Option<bool>,
    /// Override the kind's status code (e.g. a dynamic upstream status).
    pub http_status: Option<StatusCode>,
    /// Override the kind's public-facing message.
    pub public_message: Option<String>,
}

impl CapabilityOverrides {
    /// Whether no override is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loggable.is_none() && self.http_status.is_none() && self.public_message.is_none()
    }
}

// ---------------------------------------------------------------------------
// Cause
// ---------------------------------------------------------------------------

/// A lower-level failure wrapped by a record.
///
/// Either another [`ErrorRecord`] or an opaque foreign error.  Ownership of
/// the boxed value makes every chain finite and acyclic by construction.
pub enum Cause {
    /// A prior record from this subsystem.
    Record(Box<ErrorRecord>),
    /// An opaque external failure (I/O, driver, library error).
    Opaque(Box<dyn std::error::Error + Send + Sync>),
}

impl Cause {
    /// Wrap a record as a cause.
    #[must_use]
    pub fn record(record: ErrorRecord) -> Self {
        Self::Record(Box::new(record))
    }

    /// Wrap any foreign error as an opaque cause.
    #[must_use]
    pub fn opaque(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Opaque(Box::new(err))
    }

    /// View the cause as a standard error.
    #[must_use]
    pub fn as_error(&self) -> &(dyn std::error::Error + 'static) {
        match self {
            Self::Record(r) => r.as_ref(),
            Self::Opaque(e) => e.as_ref() as &(dyn std::error::Error + 'static),
        }
    }

    /// One-line description used in log entries and trusted projections.
    #[must_use]
    pub fn summary_line(&self) -> String {
        match self {
            Self::Record(r) => format!("{} [{}]: {}", r.kind(), r.code(), r.message()),
            Self::Opaque(e) => e.to_string(),
        }
    }
}

impl From<ErrorRecord> for Cause {
    fn from(record: ErrorRecord) -> Self {
        Self::record(record)
    }
}

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record(r) => f.debug_tuple("Record").field(r).finish(),
            Self::Opaque(e) => f.debug_tuple("Opaque").field(&e.to_string()).finish(),
        }
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary_line())
    }
}

// ---------------------------------------------------------------------------
// ErrorRecord
// ---------------------------------------------------------------------------

/// Immutable value representing one failure occurrence.
///
/// Fields are private; the record exposes read accessors plus consuming
/// builder methods for the construction phase.  Once a record leaves its
/// constructor there is no way to mutate it, and `dispatch` consumes it by
/// value, so every record is rendered at most once.
///
/// # Builder usage
///
/// ```
/// use frl_core::{Cause, ErrorKind, ErrorRecord};
///
/// let timeout = std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out");
/// let record = ErrorRecord::new(ErrorKind::new("DatabaseUnavailable"), 1503, "primary down")
///     .with_context("pool", "main")
///     .with_cause(Cause::opaque(timeout));
/// assert_eq!(record.code(), 1503);
/// ```
pub struct ErrorRecord {
    kind: ErrorKind,
    message: String,
    code: u32,
    context: ErrorContext,
    cause: Option<Cause>,
    overrides: CapabilityOverrides,
}

impl ErrorRecord {
    /// Create a record with the given kind, stable code, and internal
    /// diagnostic message.
    ///
    /// This is the low-level constructor; the validated path is the factory
    /// in `frl-taxonomy`, which stamps the registered code and checks
    /// required context fields.
    #[must_use]
    pub fn new(kind: ErrorKind, code: u32, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code,
            context: ErrorContext::new(),
            cause: None,
            overrides: CapabilityOverrides::default(),
        }
    }

    /// Attach a single context entry.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.context = self.context.with(key, value);
        self
    }

    /// Replace the whole context map.
    #[must_use]
    pub fn with_context_map(mut self, context: ErrorContext) -> Self {
        self.context = context;
        self
    }

    /// Attach the wrapped lower-level failure, preserved verbatim.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<Cause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Override the status code for this instance only.
    #[must_use]
    pub fn with_status_override(mut self, status: StatusCode) -> Self {
        self.overrides.http_status = Some(status);
        self
    }

    /// Override the log decision for this instance only.
    #[must_use]
    pub fn with_loggable_override(mut self, loggable: bool) -> Self {
        self.overrides.loggable = Some(loggable);
        self
    }

    /// Override the public-facing message for this instance only.
    #[must_use]
    pub fn with_public_message_override(mut self, message: impl Into<String>) -> Self {
        self.overrides.public_message = Some(message.into());
        self
    }

    /// The failure kind.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The internal diagnostic message (may contain sensitive detail).
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The stable numeric code, unique per kind.
    #[must_use]
    pub fn code(&self) -> u32 {
        self.code
    }

    /// The structured context fixed at construction.
    #[must_use]
    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    /// The wrapped cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    /// Per-instance capability overrides.
    #[must_use]
    pub fn overrides(&self) -> &CapabilityOverrides {
        &self.overrides
    }

    /// Iterate the cause chain from the immediate cause to the root.
    #[must_use]
    pub fn cause_chain(&self) -> CauseChain<'_> {
        CauseChain {
            next: self.cause.as_ref(),
        }
    }

    /// The deepest cause in the chain, if any.
    #[must_use]
    pub fn root_cause(&self) -> Option<&Cause> {
        self.cause_chain().last()
    }

    /// One line per chain element, immediate cause first.
    #[must_use]
    pub fn cause_summary(&self) -> Vec<String> {
        self.cause_chain().map(Cause::summary_line).collect()
    }
}

impl fmt::Debug for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("ErrorRecord");
        d.field("kind", &self.kind);
        d.field("code", &self.code);
        d.field("message", &self.message);
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        if let Some(ref cause) = self.cause {
            d.field("cause", &cause.summary_line());
        }
        if !self.overrides.is_empty() {
            d.field("overrides", &self.overrides);
        }
        d.finish()
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.kind, self.code, self.message)?;
        if !self.context.is_empty() {
            // Deterministic output thanks to BTreeMap.
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ErrorRecord {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(Cause::as_error)
    }
}

/// Iterator over a record's cause chain, immediate cause first.
///
/// Terminates because every link is owned: a chain can only be as deep as
/// the wrapping calls that built it.
pub struct CauseChain<'a> {
    next: Option<&'a Cause>,
}

impl<'a> Iterator for CauseChain<'a> {
    type Item = &'a Cause;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = match current {
            Cause::Record(r) => r.cause(),
            Cause::Opaque(_) => None,
        };
        Some(current)
    }
}

// ---------------------------------------------------------------------------
// ErrorRecordDto
// ---------------------------------------------------------------------------

/// Serialisable snapshot of an [`ErrorRecord`].
///
/// The cause chain is flattened to its summary lines; opaque causes survive
/// only as their display strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecordDto {
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
    pub cause_chain: Vec<String>,
}

impl From<&ErrorRecord> for ErrorRecordDto {
    fn from(record: &ErrorRecord) -> Self {
        Self {
            kind: record.kind().clone(),
            code: record.code(),
            message: record.message().to_string(),
            context: record.context().clone(),
            cause_chain: record.cause_summary(),
        }
    }
}

impl From<ErrorRecordDto> for ErrorRecord {
    fn from(dto: ErrorRecordDto) -> Self {
        // The live cause chain is lost in DTO form; only summaries remain.
        ErrorRecord::new(dto.kind, dto.code, dto.message).with_context_map(dto.context)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
