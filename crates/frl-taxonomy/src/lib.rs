// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error taxonomy registry and capability resolution for Fault Relay.
//!
//! The [`TaxonomyRegistry`] is the static catalog mapping each
//! [`ErrorKind`] to its default [`Capabilities`] (log decision, status code,
//! public-message policy) and to the context fields the factory requires.
//! It is assembled once at startup through [`TaxonomyBuilder`] and read-only
//! afterwards; lookups for unregistered kinds fail closed to conservative
//! defaults instead of erroring.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use frl_core::{ErrorKind, ErrorRecord, UNKNOWN_CODE};
use http::StatusCode;
use std::collections::BTreeMap;
use std::fmt;

mod factory;

pub use factory::{ConstructionError, ErrorFactory};

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Effective capabilities of a kind, queried by value.
///
/// A capability descriptor replaces type-identity tests: handlers ask
/// "is this loggable?" and "which status?" instead of probing marker traits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether a dispatched record of this kind is written to the log sink.
    pub loggable: bool,
    /// Status code attached to the outgoing response.
    pub http_status: StatusCode,
    /// Message safe to show untrusted channels; `None` means the generic
    /// fallback is used instead of the internal diagnostic.
    pub public_message: Option<String>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::fail_closed()
    }
}

impl Capabilities {
    /// The conservative defaults used for any unregistered kind:
    /// loggable, 500, no public message.
    #[must_use]
    pub fn fail_closed() -> Self {
        Self {
            loggable: true,
            http_status: StatusCode::INTERNAL_SERVER_ERROR,
            public_message: None,
        }
    }

    /// The public message, or `fallback` when none is registered.
    #[must_use]
    pub fn public_message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.public_message.as_deref().unwrap_or(fallback)
    }
}

// ---------------------------------------------------------------------------
// KindSpec
// ---------------------------------------------------------------------------

/// Registration entry for one error kind.
///
/// Carries the stable code, the default internal diagnostic (`summary`), the
/// context fields the factory must see, and the capability defaults.
///
/// ```
/// use frl_taxonomy::KindSpec;
/// use http::StatusCode;
///
/// let spec = KindSpec::new("UserNotFound", 1404)
///     .summary("user lookup failed")
///     .status(StatusCode::NOT_FOUND)
///     .loggable(false)
///     .public_message("User not found")
///     .requires(["user_id"]);
/// assert_eq!(spec.code(), 1404);
/// ```
#[derive(Debug, Clone)]
pub struct KindSpec {
    kind: ErrorKind,
    code: u32,
    summary: String,
    required_context: Vec<String>,
    capabilities: Capabilities,
}

impl KindSpec {
    /// Start a spec for `kind` with stable numeric `code`.
    ///
    /// Defaults: summary = the kind name, no required context, capabilities
    /// = [`Capabilities::fail_closed`].
    #[must_use]
    pub fn new(kind: impl Into<ErrorKind>, code: u32) -> Self {
        let kind = kind.into();
        let summary = kind.as_str().to_string();
        Self {
            kind,
            code,
            summary,
            required_context: Vec::new(),
            capabilities: Capabilities::fail_closed(),
        }
    }

    /// Set the default internal diagnostic message for records of this kind.
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Set the status code attached to responses for this kind.
    #[must_use]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.capabilities.http_status = status;
        self
    }

    /// Set whether records of this kind are logged on dispatch.
    #[must_use]
    pub fn loggable(mut self, loggable: bool) -> Self {
        self.capabilities.loggable = loggable;
        self
    }

    /// Set the message untrusted channels are allowed to see.
    #[must_use]
    pub fn public_message(mut self, message: impl Into<String>) -> Self {
        self.capabilities.public_message = Some(message.into());
        self
    }

    /// Declare context fields the factory must validate as present.
    #[must_use]
    pub fn requires<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_context = fields.into_iter().map(Into::into).collect();
        self
    }

    /// The kind this spec registers.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The stable numeric code.
    #[must_use]
    pub fn code(&self) -> u32 {
        self.code
    }

    /// The default internal diagnostic message.
    #[must_use]
    pub fn summary_text(&self) -> &str {
        &self.summary
    }

    /// Context fields required at factory time.
    #[must_use]
    pub fn required_context(&self) -> &[String] {
        &self.required_context
    }

    /// The capability defaults for this kind.
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }
}

// ---------------------------------------------------------------------------
// TaxonomyError
// ---------------------------------------------------------------------------

/// Startup-time registration failures.
///
/// Registration conflicts abort startup loudly; silently overwriting an
/// entry would let one kind mean two unrelated conditions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaxonomyError {
    /// The kind was already registered.
    #[error("kind '{kind}' registered twice")]
    DuplicateKind {
        /// The conflicting kind.
        kind: ErrorKind,
    },

    /// The numeric code is already taken by another kind.
    #[error("code {code} for kind '{kind}' already registered by '{existing}'")]
    DuplicateCode {
        /// The conflicting code.
        code: u32,
        /// The kind attempting to register.
        kind: ErrorKind,
        /// The kind that holds the code.
        existing: ErrorKind,
    },

    /// Code 0 belongs to the unknown sentinel and cannot be registered.
    #[error("kind '{kind}' uses reserved code {code}", code = UNKNOWN_CODE)]
    ReservedCode {
        /// The kind attempting to register.
        kind: ErrorKind,
    },

    /// A kind name must be non-empty.
    #[error("kind name must not be empty")]
    EmptyKind,
}

// ---------------------------------------------------------------------------
// TaxonomyBuilder / TaxonomyRegistry
// ---------------------------------------------------------------------------

/// Builder assembling a [`TaxonomyRegistry`] at process start.
#[derive(Debug, Default)]
pub struct TaxonomyBuilder {
    specs: BTreeMap<ErrorKind, KindSpec>,
    codes: BTreeMap<u32, ErrorKind>,
}

impl TaxonomyBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one kind, failing on any conflict.
    pub fn register(mut self, spec: KindSpec) -> Result<Self, TaxonomyError> {
        if spec.kind().as_str().is_empty() {
            return Err(TaxonomyError::EmptyKind);
        }
        if spec.code() == UNKNOWN_CODE {
            return Err(TaxonomyError::ReservedCode {
                kind: spec.kind().clone(),
            });
        }
        if self.specs.contains_key(spec.kind()) {
            return Err(TaxonomyError::DuplicateKind {
                kind: spec.kind().clone(),
            });
        }
        if let Some(existing) = self.codes.get(&spec.code()) {
            return Err(TaxonomyError::DuplicateCode {
                code: spec.code(),
                kind: spec.kind().clone(),
                existing: existing.clone(),
            });
        }
        self.codes.insert(spec.code(), spec.kind().clone());
        self.specs.insert(spec.kind().clone(), spec);
        Ok(self)
    }

    /// Finish registration; the registry is immutable from here on.
    #[must_use]
    pub fn build(self) -> TaxonomyRegistry {
        TaxonomyRegistry { specs: self.specs }
    }
}

/// Read-only catalog of registered kinds.
///
/// Safe for unsynchronised concurrent reads; share via `Arc`.
#[derive(Debug)]
pub struct TaxonomyRegistry {
    specs: BTreeMap<ErrorKind, KindSpec>,
}

impl TaxonomyRegistry {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> TaxonomyBuilder {
        TaxonomyBuilder::new()
    }

    /// Look up the registration entry for `kind`.
    #[must_use]
    pub fn lookup(&self, kind: &ErrorKind) -> Option<&KindSpec> {
        self.specs.get(kind)
    }

    /// Capability defaults for `kind`.
    ///
    /// Unregistered kinds fail closed to [`Capabilities::fail_closed`], so
    /// an unanticipated kind is still handled safely.
    #[must_use]
    pub fn capabilities(&self, kind: &ErrorKind) -> Capabilities {
        self.specs
            .get(kind)
            .map(|spec| spec.capabilities().clone())
            .unwrap_or_else(Capabilities::fail_closed)
    }

    /// Effective capabilities of one record: per-instance overrides merged
    /// over the kind defaults.
    ///
    /// Pure read; safe to call repeatedly and concurrently.
    #[must_use]
    pub fn resolve(&self, record: &ErrorRecord) -> Capabilities {
        let mut caps = self.capabilities(record.kind());
        let overrides = record.overrides();
        if let Some(loggable) = overrides.loggable {
            caps.loggable = loggable;
        }
        if let Some(status) = overrides.http_status {
            caps.http_status = status;
        }
        if let Some(ref message) = overrides.public_message {
            caps.public_message = Some(message.clone());
        }
        caps
    }

    /// Iterate all registered specs in kind order.
    pub fn kinds(&self) -> impl Iterator<Item = &KindSpec> {
        self.specs.values()
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether no kind is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl fmt::Display for TaxonomyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "taxonomy of {} kinds", self.specs.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
