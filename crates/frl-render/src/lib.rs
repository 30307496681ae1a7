// SPDX-License-Identifier: MIT OR Apache-2.0
//! Channel-aware rendering of dispatched failures.
//!
//! A [`Projection`] is the sanitized view of a record that a renderer is
//! allowed to see; the [`RendererRegistry`] maps a [`ChannelTag`] to the
//! renderer producing the final [`Response`] body and content type.  Unknown
//! channels fail closed to a plain-text renderer with no trusted detail.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use frl_core::{ErrorContext, ErrorKind, ErrorRecord};
use frl_taxonomy::Capabilities;
use http::StatusCode;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

mod renderers;

pub use renderers::{HtmlRenderer, JsonRenderer, TextRenderer};

/// Message shown on untrusted channels when a kind has no public message.
pub const GENERIC_FALLBACK: &str = "An internal error occurred";

// ---------------------------------------------------------------------------
// ChannelTag
// ---------------------------------------------------------------------------

/// The class of client consuming a response.
///
/// Supplied by the external request layer; this crate never detects
/// channels itself.  Unrecognised tags parse as [`ChannelTag::Custom`] and
/// render through the registry fallback.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChannelTag {
    /// Programmatic API or AJAX client expecting JSON.
    Api,
    /// Command-line invocation expecting plain text.
    Cli,
    /// Interactive browser expecting a rendered page.
    Browser,
    /// Application-defined extension channel.
    Custom(String),
}

impl ChannelTag {
    /// The canonical tag string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Api => "api",
            Self::Cli => "cli",
            Self::Browser => "browser",
            Self::Custom(name) => name,
        }
    }
}

impl From<&str> for ChannelTag {
    fn from(tag: &str) -> Self {
        match tag {
            // AJAX clients consume the same JSON rendering as the API.
            "api" | "ajax" => Self::Api,
            "cli" => Self::Cli,
            "browser" => Self::Browser,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl std::str::FromStr for ChannelTag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for ChannelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ChannelTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ChannelTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        if tag.is_empty() {
            return Err(D::Error::custom("channel tag must not be empty"));
        }
        Ok(Self::from(tag.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Internal detail released only to explicitly trusted channels.
#[derive(Debug, Clone, PartialEq)]
pub struct TrustedDetail {
    /// The record's internal diagnostic message.
    pub internal_message: String,
    /// The record's full context.
    pub context: ErrorContext,
    /// Cause chain summary, immediate cause first.
    pub cause_summary: Vec<String>,
}

/// What a renderer is allowed to see of a dispatched record.
///
/// `message` is always channel-safe: the kind's public message or the
/// generic fallback.  `detail` is populated only when the channel was
/// registered as trusted; the raw record never reaches a renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// Failure kind.
    pub kind: ErrorKind,
    /// Stable numeric code for client-side matching.
    pub code: u32,
    /// Channel-safe message.
    pub message: String,
    /// Status attached to the response.
    pub status: StatusCode,
    /// Internal detail, trusted channels only.
    pub detail: Option<TrustedDetail>,
}

impl Projection {
    /// Project a record for an untrusted channel.
    #[must_use]
    pub fn sanitized(record: &ErrorRecord, caps: &Capabilities, fallback: &str) -> Self {
        Self {
            kind: record.kind().clone(),
            code: record.code(),
            message: caps.public_message_or(fallback).to_string(),
            status: caps.http_status,
            detail: None,
        }
    }

    /// Project a record for an explicitly trusted channel.
    ///
    /// The public message stays in `message`; the internal diagnostic,
    /// context, and cause chain ride along in `detail`.
    #[must_use]
    pub fn trusted(record: &ErrorRecord, caps: &Capabilities, fallback: &str) -> Self {
        Self {
            detail: Some(TrustedDetail {
                internal_message: record.message().to_string(),
                context: record.context().clone(),
                cause_summary: record.cause_summary(),
            }),
            ..Self::sanitized(record, caps, fallback)
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// The rendered outcome handed back to the request layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code resolved by the dispatch pipeline.
    pub status: StatusCode,
    /// Content signature of the body.
    pub content_type: &'static str,
    /// Final response body.
    pub body: String,
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Produces a response body and content type from a projection.
pub trait Renderer: Send + Sync {
    /// Content type of the bodies this renderer produces.
    fn content_type(&self) -> &'static str;

    /// Render the projection into the final response.
    fn render(&self, projection: &Projection) -> Response;
}

// ---------------------------------------------------------------------------
// RendererRegistry
// ---------------------------------------------------------------------------

struct RendererEntry {
    renderer: Box<dyn Renderer>,
    trusted: bool,
}

/// Channel-keyed set of renderers, immutable after construction.
///
/// Unknown channels fall back to a plain-text, untrusted renderer rather
/// than erroring.
pub struct RendererRegistry {
    entries: BTreeMap<ChannelTag, RendererEntry>,
    fallback: RendererEntry,
}

impl RendererRegistry {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> RendererRegistryBuilder {
        RendererRegistryBuilder::default()
    }

    /// The standard wiring: `api` → JSON, `browser` → HTML (both untrusted),
    /// `cli` → plain text (trusted).
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::builder()
            .register(ChannelTag::Api, JsonRenderer)
            .register(ChannelTag::Browser, HtmlRenderer)
            .register_trusted(ChannelTag::Cli, TextRenderer)
            .build()
    }

    /// Whether `channel` was registered as trusted.
    ///
    /// Unknown channels are never trusted.
    #[must_use]
    pub fn is_trusted(&self, channel: &ChannelTag) -> bool {
        self.entries.get(channel).is_some_and(|e| e.trusted)
    }

    /// Render through the channel's renderer, or the fallback for unknown
    /// channels.
    #[must_use]
    pub fn render(&self, channel: &ChannelTag, projection: &Projection) -> Response {
        let entry = self.entries.get(channel).unwrap_or(&self.fallback);
        entry.renderer.render(projection)
    }

    /// Iterate the registered channel tags in order.
    pub fn channels(&self) -> impl Iterator<Item = &ChannelTag> {
        self.entries.keys()
    }
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels: Vec<&str> = self.entries.keys().map(ChannelTag::as_str).collect();
        f.debug_struct("RendererRegistry")
            .field("channels", &channels)
            .finish_non_exhaustive()
    }
}

/// Builder for [`RendererRegistry`].
#[derive(Default)]
pub struct RendererRegistryBuilder {
    entries: BTreeMap<ChannelTag, RendererEntry>,
    fallback: Option<RendererEntry>,
}

impl RendererRegistryBuilder {
    /// Register an untrusted renderer for `channel`.
    ///
    /// Later registrations for the same tag replace earlier ones; the
    /// renderer set is an application wiring concern, not a taxonomy.
    #[must_use]
    pub fn register(mut self, channel: ChannelTag, renderer: impl Renderer + 'static) -> Self {
        self.entries.insert(
            channel,
            RendererEntry {
                renderer: Box::new(renderer),
                trusted: false,
            },
        );
        self
    }

    /// Register a renderer for an explicitly trusted channel (e.g. an
    /// internal command-line or debug channel).
    #[must_use]
    pub fn register_trusted(
        mut self,
        channel: ChannelTag,
        renderer: impl Renderer + 'static,
    ) -> Self {
        self.entries.insert(
            channel,
            RendererEntry {
                renderer: Box::new(renderer),
                trusted: true,
            },
        );
        self
    }

    /// Replace the fallback renderer used for unknown channels.
    ///
    /// The fallback is always untrusted.
    #[must_use]
    pub fn fallback(mut self, renderer: impl Renderer + 'static) -> Self {
        self.fallback = Some(RendererEntry {
            renderer: Box::new(renderer),
            trusted: false,
        });
        self
    }

    /// Finish the registry.
    #[must_use]
    pub fn build(self) -> RendererRegistry {
        RendererRegistry {
            entries: self.entries,
            fallback: self.fallback.unwrap_or_else(|| RendererEntry {
                renderer: Box::new(TextRenderer),
                trusted: false,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
