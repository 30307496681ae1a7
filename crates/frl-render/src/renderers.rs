// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in renderers for the standard channels.

use crate::{Projection, Renderer, Response};
use std::fmt::Write as _;

// ---------------------------------------------------------------------------
// JsonRenderer
// ---------------------------------------------------------------------------

/// Renders the projection as a compact JSON object for API/AJAX clients.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn render(&self, projection: &Projection) -> Response {
        let mut error = serde_json::json!({
            "kind": projection.kind.as_str(),
            "code": projection.code,
            "message": &projection.message,
        });
        if let Some(ref detail) = projection.detail {
            error["detail"] = serde_json::json!({
                "message": &detail.internal_message,
                "context": &detail.context,
                "cause_chain": &detail.cause_summary,
            });
        }
        let body = serde_json::json!({
            "error": error,
            "status": projection.status.as_u16(),
        });
        Response {
            status: projection.status,
            content_type: self.content_type(),
            body: body.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// TextRenderer
// ---------------------------------------------------------------------------

/// Renders the projection as plain text for command-line invocations.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn render(&self, projection: &Projection) -> Response {
        let mut body = format!(
            "error[{}] {}: {}\n",
            projection.code, projection.kind, projection.message
        );
        if let Some(ref detail) = projection.detail {
            let _ = writeln!(body, "  internal: {}", detail.internal_message);
            for (key, value) in detail.context.iter() {
                let _ = writeln!(body, "  context.{key}: {value}");
            }
            for line in &detail.cause_summary {
                let _ = writeln!(body, "  cause: {line}");
            }
        }
        Response {
            status: projection.status,
            content_type: self.content_type(),
            body,
        }
    }
}

// ---------------------------------------------------------------------------
// HtmlRenderer
// ---------------------------------------------------------------------------

/// Renders the projection as a minimal self-contained error page.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn content_type(&self) -> &'static str {
        "text/html; charset=utf-8"
    }

    fn render(&self, projection: &Projection) -> Response {
        let title = html_escape(&projection.status.to_string());
        let message = html_escape(&projection.message);
        let kind = html_escape(projection.kind.as_str());

        let mut body = format!(
            "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
             <body>\n<h1>{title}</h1>\n<p>{message}</p>\n\
             <p class=\"error-ref\">{kind} ({code})</p>\n",
            code = projection.code,
        );
        if let Some(ref detail) = projection.detail {
            let _ = writeln!(
                body,
                "<pre class=\"error-detail\">{}</pre>",
                html_escape(&detail.internal_message)
            );
        }
        body.push_str("</body>\n</html>\n");

        Response {
            status: projection.status,
            content_type: self.content_type(),
            body,
        }
    }
}

/// Escape the five HTML-significant characters.
fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
