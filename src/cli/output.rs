//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::BuildError;
use serde::Serialize;

/// One-line message, followed by the remote URL when one is known.
pub fn map_error(e: &BuildError) -> String {
    match e.remote_url() {
        Some(url) => format!("Error: {}\n  See: {}", e, url),
        None => format!("Error: {}", e),
    }
}

#[derive(Serialize)]
struct ErrorOutput<'a> {
    kind: crate::error::ErrorKind,
    message: String,
    remote_url: Option<&'a str>,
}

/// Machine-readable form of [`map_error`].
pub fn map_error_json(e: &BuildError) -> String {
    let out = ErrorOutput {
        kind: e.kind(),
        message: e.to_string(),
        remote_url: e.remote_url(),
    };
    serde_json::to_string(&out).unwrap_or_else(|_| map_error(e))
}
