// SPDX-License-Identifier: MIT OR Apache-2.0
//! Declarative taxonomy configuration for Fault Relay.
//!
//! A [`TaxonomyConfig`] describes the error kinds an application registers
//! at startup (codes, statuses, log decisions, public messages, and
//! required context fields) in TOML:
//!
//! ```toml
//! generic_fallback = "Something went wrong"
//!
//! [kinds.UserNotFound]
//! code = 1404
//! status = 404
//! loggable = false
//! public_message = "User not found"
//! summary = "user lookup failed"
//! required_context = ["user_id"]
//! ```
//!
//! [`build_registry`] funnels a validated config into the
//! [`TaxonomyBuilder`](frl_taxonomy::TaxonomyBuilder); there is no runtime
//! mutation surface afterwards.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use frl_taxonomy::{KindSpec, TaxonomyError, TaxonomyRegistry};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found or unreadable.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },

    /// Registration conflict surfaced by the taxonomy builder.
    #[error("taxonomy registration failed")]
    Registry(#[from] TaxonomyError),
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A client-facing status has no public message, so untrusted channels
    /// will only ever see the generic fallback.
    MissingPublicMessage {
        /// Kind name.
        kind: String,
        /// Configured status code.
        status: u16,
    },
    /// A server-side failure kind is configured not to log.
    SuppressedServerError {
        /// Kind name.
        kind: String,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::MissingPublicMessage { kind, status } => {
                write!(
                    f,
                    "kind '{kind}' maps to client status {status} but has no public_message"
                )
            }
            ConfigWarning::SuppressedServerError { kind } => {
                write!(f, "kind '{kind}' is a server error but loggable = false")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Top-level taxonomy configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TaxonomyConfig {
    /// Generic message for kinds without a public message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_fallback: Option<String>,

    /// Kind entries keyed by kind name.
    #[serde(default)]
    pub kinds: BTreeMap<String, KindEntry>,
}

/// Configuration for a single error kind.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct KindEntry {
    /// Stable numeric code, unique across the config; 0 is reserved.
    pub code: u32,

    /// Status code attached to responses (defaults to 500).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Whether dispatches of this kind are logged (defaults to true).
    #[serde(default = "default_loggable")]
    pub loggable: bool,

    /// Message untrusted channels are allowed to see.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_message: Option<String>,

    /// Default internal diagnostic message (defaults to the kind name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Context fields the factory must validate as present.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_context: Vec<String>,
}

fn default_loggable() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`TaxonomyConfig`] from a TOML file.
pub fn load_config(path: &Path) -> Result<TaxonomyConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.display().to_string(),
    })?;
    parse_toml(&content)
}

/// Parse a TOML string into a [`TaxonomyConfig`].
pub fn parse_toml(content: &str) -> Result<TaxonomyConfig, ConfigError> {
    toml::from_str::<TaxonomyConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (reserved or duplicate codes, out-of-range statuses, empty
/// names) come back as a [`ConfigError::ValidationError`]; soft issues come
/// back as warnings.
pub fn validate_config(config: &TaxonomyConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();
    let mut codes: BTreeMap<u32, &str> = BTreeMap::new();

    for (name, entry) in &config.kinds {
        if name.is_empty() {
            errors.push("kind name must not be empty".into());
        }

        if entry.code == 0 {
            errors.push(format!("kind '{name}': code 0 is reserved"));
        } else if let Some(existing) = codes.insert(entry.code, name.as_str()) {
            errors.push(format!(
                "kind '{name}': code {} already used by '{existing}'",
                entry.code
            ));
        }

        let status = entry.status.unwrap_or(500);
        // StatusCode::from_u16 accepts up to 999; only 100-599 are real.
        match StatusCode::from_u16(status) {
            Ok(code) if status < 600 => {
                if code.is_client_error() && entry.public_message.is_none() {
                    warnings.push(ConfigWarning::MissingPublicMessage {
                        kind: name.clone(),
                        status,
                    });
                }
                if code.is_server_error() && !entry.loggable {
                    warnings.push(ConfigWarning::SuppressedServerError { kind: name.clone() });
                }
            }
            _ => errors.push(format!("kind '{name}': invalid status {status}")),
        }

        for field in &entry.required_context {
            if field.is_empty() {
                errors.push(format!("kind '{name}': empty required_context entry"));
            }
        }
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

// ---------------------------------------------------------------------------
// Registry construction
// ---------------------------------------------------------------------------

/// Build an immutable [`TaxonomyRegistry`] from a configuration.
///
/// Runs [`validate_config`] first, discarding advisory warnings (surface
/// them separately at startup if wanted), then registers every kind.
pub fn build_registry(config: &TaxonomyConfig) -> Result<TaxonomyRegistry, ConfigError> {
    validate_config(config)?;

    let mut builder = TaxonomyRegistry::builder();
    for (name, entry) in &config.kinds {
        let status = entry.status.unwrap_or(500);
        let status = StatusCode::from_u16(status).map_err(|_| ConfigError::ValidationError {
            reasons: vec![format!("kind '{name}': invalid status {status}")],
        })?;

        let mut spec = KindSpec::new(name.as_str(), entry.code)
            .status(status)
            .loggable(entry.loggable)
            .requires(entry.required_context.iter().cloned());
        if let Some(ref summary) = entry.summary {
            spec = spec.summary(summary.clone());
        }
        if let Some(ref message) = entry.public_message {
            spec = spec.public_message(message.clone());
        }
        builder = builder.register(spec)?;
    }
    Ok(builder.build())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
