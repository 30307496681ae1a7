// SPDX-License-Identifier: MIT OR Apache-2.0
//! Validated construction of [`ErrorRecord`]s from registered kinds.

use crate::TaxonomyRegistry;
use frl_core::{Cause, ErrorContext, ErrorKind, ErrorRecord, UNKNOWN_CODE};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// ConstructionError
// ---------------------------------------------------------------------------

/// A caller bug at record-construction time.
///
/// These never reach users: a missing required field or an unregistered
/// kind means the call site is wrong, and the typed `Result` keeps that
/// loud in tests without taking the process down at a boundary that
/// prefers to map it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstructionError {
    /// The kind has no taxonomy entry, so the factory cannot validate or
    /// stamp a code for it.
    #[error("kind '{kind}' is not registered in the taxonomy")]
    UnregisteredKind {
        /// The kind that was requested.
        kind: ErrorKind,
    },

    /// A context field declared as required for the kind is absent.
    #[error("required context field '{field}' is missing for kind '{kind}'")]
    MissingContextField {
        /// The kind being constructed.
        kind: ErrorKind,
        /// The missing field name.
        field: String,
    },
}

// ---------------------------------------------------------------------------
// ErrorFactory
// ---------------------------------------------------------------------------

/// Parameterized factory building well-formed records for registered kinds.
///
/// One factory keyed by kind replaces a static constructor per error type:
/// the per-kind required-field descriptor lives in the taxonomy entry and is
/// enforced here, so a record returned from [`create`](Self::create) is
/// always fully populated.  Construction never logs or renders.
#[derive(Debug, Clone)]
pub struct ErrorFactory {
    registry: Arc<TaxonomyRegistry>,
}

impl ErrorFactory {
    /// Create a factory over a built registry.
    #[must_use]
    pub fn new(registry: Arc<TaxonomyRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this factory validates against.
    #[must_use]
    pub fn registry(&self) -> &Arc<TaxonomyRegistry> {
        &self.registry
    }

    /// Build a record of `kind` with the registered summary as its internal
    /// message.
    ///
    /// Fails if the kind is unregistered or any required context field is
    /// missing; on success the record carries the registered code and the
    /// full context.
    pub fn create(
        &self,
        kind: &ErrorKind,
        context: ErrorContext,
    ) -> Result<ErrorRecord, ConstructionError> {
        self.build(kind, None, context, None)
    }

    /// Like [`create`](Self::create), with a caller-supplied internal
    /// diagnostic instead of the registered summary.
    pub fn create_with_message(
        &self,
        kind: &ErrorKind,
        message: impl Into<String>,
        context: ErrorContext,
    ) -> Result<ErrorRecord, ConstructionError> {
        self.build(kind, Some(message.into()), context, None)
    }

    /// Build a record of `kind` wrapping a lower-level failure.
    ///
    /// The cause is attached verbatim so diagnostics can later walk the
    /// chain to the root.
    pub fn wrap(
        &self,
        kind: &ErrorKind,
        cause: impl Into<Cause>,
        context: ErrorContext,
    ) -> Result<ErrorRecord, ConstructionError> {
        self.build(kind, None, context, Some(cause.into()))
    }

    /// Like [`wrap`](Self::wrap), with a caller-supplied internal diagnostic.
    pub fn wrap_with_message(
        &self,
        kind: &ErrorKind,
        message: impl Into<String>,
        cause: impl Into<Cause>,
        context: ErrorContext,
    ) -> Result<ErrorRecord, ConstructionError> {
        self.build(kind, Some(message.into()), context, Some(cause.into()))
    }

    /// Build the sentinel record for a failure nothing classified.
    ///
    /// Uses [`ErrorKind::unknown`] and the reserved code 0; capability
    /// resolution will fail closed for it.  No validation applies.
    #[must_use]
    pub fn unclassified(
        &self,
        message: impl Into<String>,
        cause: Option<Cause>,
    ) -> ErrorRecord {
        let record = ErrorRecord::new(ErrorKind::unknown(), UNKNOWN_CODE, message);
        match cause {
            Some(cause) => record.with_cause(cause),
            None => record,
        }
    }

    fn build(
        &self,
        kind: &ErrorKind,
        message: Option<String>,
        context: ErrorContext,
        cause: Option<Cause>,
    ) -> Result<ErrorRecord, ConstructionError> {
        let spec = self
            .registry
            .lookup(kind)
            .ok_or_else(|| ConstructionError::UnregisteredKind { kind: kind.clone() })?;

        for field in spec.required_context() {
            if !context.contains_key(field) {
                return Err(ConstructionError::MissingContextField {
                    kind: kind.clone(),
                    field: field.clone(),
                });
            }
        }

        let message = message.unwrap_or_else(|| spec.summary_text().to_string());
        let mut record =
            ErrorRecord::new(kind.clone(), spec.code(), message).with_context_map(context);
        if let Some(cause) = cause {
            record = record.with_cause(cause);
        }
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KindSpec;
    use http::StatusCode;
    use std::io;

    fn factory() -> ErrorFactory {
        let registry = TaxonomyRegistry::builder()
            .register(
                KindSpec::new("UserNotFound", 1404)
                    .summary("user lookup failed")
                    .status(StatusCode::NOT_FOUND)
                    .loggable(false)
                    .public_message("User not found")
                    .requires(["user_id"]),
            )
            .unwrap()
            .register(
                KindSpec::new("DatabaseUnavailable", 1503)
                    .summary("database unreachable")
                    .status(StatusCode::SERVICE_UNAVAILABLE),
            )
            .unwrap()
            .register(
                KindSpec::new("InvalidEmail", 1400)
                    .status(StatusCode::BAD_REQUEST)
                    .requires(["email", "rule"]),
            )
            .unwrap()
            .build();
        ErrorFactory::new(Arc::new(registry))
    }

    // ---- create -----------------------------------------------------------

    #[test]
    fn create_round_trips_kind_and_context() {
        let f = factory();
        let ctx = ErrorContext::new().with("user_id", "42");
        let record = f.create(&ErrorKind::new("UserNotFound"), ctx.clone()).unwrap();
        assert_eq!(record.kind(), &ErrorKind::new("UserNotFound"));
        assert_eq!(record.code(), 1404);
        assert_eq!(record.message(), "user lookup failed");
        assert_eq!(record.context(), &ctx);
        assert!(record.cause().is_none());
    }

    #[test]
    fn create_allows_extra_context_fields() {
        let f = factory();
        let ctx = ErrorContext::new()
            .with("user_id", "42")
            .with("tenant", "acme");
        let record = f.create(&ErrorKind::new("UserNotFound"), ctx).unwrap();
        assert_eq!(record.context().len(), 2);
    }

    #[test]
    fn create_missing_required_field_fails() {
        let f = factory();
        let err = f
            .create(&ErrorKind::new("UserNotFound"), ErrorContext::new())
            .unwrap_err();
        assert_eq!(
            err,
            ConstructionError::MissingContextField {
                kind: ErrorKind::new("UserNotFound"),
                field: "user_id".into(),
            }
        );
    }

    #[test]
    fn create_reports_first_missing_field_in_declaration_order() {
        let f = factory();
        let ctx = ErrorContext::new().with("rule", "rfc5322");
        let err = f.create(&ErrorKind::new("InvalidEmail"), ctx).unwrap_err();
        assert_eq!(
            err,
            ConstructionError::MissingContextField {
                kind: ErrorKind::new("InvalidEmail"),
                field: "email".into(),
            }
        );
    }

    #[test]
    fn create_unregistered_kind_fails() {
        let f = factory();
        let err = f
            .create(&ErrorKind::new("NotAThing"), ErrorContext::new())
            .unwrap_err();
        assert_eq!(
            err,
            ConstructionError::UnregisteredKind {
                kind: ErrorKind::new("NotAThing")
            }
        );
    }

    #[test]
    fn create_with_message_overrides_summary() {
        let f = factory();
        let record = f
            .create_with_message(
                &ErrorKind::new("DatabaseUnavailable"),
                "primary and replica both down",
                ErrorContext::new(),
            )
            .unwrap();
        assert_eq!(record.message(), "primary and replica both down");
        assert_eq!(record.code(), 1503);
    }

    // ---- wrap -------------------------------------------------------------

    #[test]
    fn wrap_preserves_cause_verbatim() {
        let f = factory();
        let timeout = io::Error::new(io::ErrorKind::TimedOut, "connect timed out");
        let record = f
            .wrap(
                &ErrorKind::new("DatabaseUnavailable"),
                Cause::opaque(timeout),
                ErrorContext::new().with("pool", "main"),
            )
            .unwrap();
        let cause = record.cause().expect("cause attached");
        assert_eq!(cause.summary_line(), "connect timed out");
    }

    #[test]
    fn wrap_record_cause_builds_a_chain() {
        let f = factory();
        let inner = f
            .create(
                &ErrorKind::new("UserNotFound"),
                ErrorContext::new().with("user_id", "42"),
            )
            .unwrap();
        let outer = f
            .wrap(&ErrorKind::new("DatabaseUnavailable"), inner, ErrorContext::new())
            .unwrap();
        assert_eq!(outer.cause_summary(), vec!["UserNotFound [1404]: user lookup failed"]);
    }

    #[test]
    fn wrap_validates_required_fields_too() {
        let f = factory();
        let err = f
            .wrap(
                &ErrorKind::new("UserNotFound"),
                Cause::opaque(io::Error::other("x")),
                ErrorContext::new(),
            )
            .unwrap_err();
        assert!(matches!(err, ConstructionError::MissingContextField { .. }));
    }

    #[test]
    fn wrap_with_message_sets_both() {
        let f = factory();
        let record = f
            .wrap_with_message(
                &ErrorKind::new("DatabaseUnavailable"),
                "pool exhausted",
                Cause::opaque(io::Error::other("no conn")),
                ErrorContext::new(),
            )
            .unwrap();
        assert_eq!(record.message(), "pool exhausted");
        assert!(record.cause().is_some());
    }

    // ---- unclassified -----------------------------------------------------

    #[test]
    fn unclassified_uses_sentinel_kind_and_code() {
        let f = factory();
        let record = f.unclassified("something odd", None);
        assert!(record.kind().is_unknown());
        assert_eq!(record.code(), UNKNOWN_CODE);
        assert!(record.cause().is_none());
    }

    #[test]
    fn unclassified_with_cause() {
        let f = factory();
        let record = f.unclassified("odd", Some(Cause::opaque(io::Error::other("why"))));
        assert_eq!(record.cause_summary(), vec!["why"]);
    }

    // ---- no side effects --------------------------------------------------

    #[test]
    fn factory_is_cloneable_and_shares_the_registry() {
        let f = factory();
        let g = f.clone();
        assert_eq!(Arc::strong_count(f.registry()), Arc::strong_count(g.registry()));
        assert_eq!(f.registry().len(), 3);
    }
}
