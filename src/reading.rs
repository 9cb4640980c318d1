//! Orientation reading wire type
//!
//! A reading is a JSON object with numeric `x`, `y`, `z` fields (degrees).
//! Numbers are kept as [`serde_json::Number`] so an integer stays an integer
//! and a float keeps its value when the reading is re-encoded. Any extra
//! fields the publisher sends ride along untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Longest raw payload excerpt kept for diagnostics
const PREVIEW_LIMIT: usize = 256;

/// One orientation sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Rotation around the x axis
    pub x: Number,
    /// Rotation around the y axis
    pub y: Number,
    /// Rotation around the z axis
    pub z: Number,
    /// Fields beyond the three axes, passed through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An inbound frame that could not be parsed as a [`Reading`]
///
/// Carries a truncated excerpt of the offending payload for diagnostics.
#[derive(Error, Debug)]
pub enum MalformedPayload {
    /// Not JSON, not an object, or missing a numeric axis
    #[error("malformed payload: {source}")]
    Invalid {
        #[source]
        source: serde_json::Error,
        raw: String,
    },
    /// Larger than the relay accepts for a single reading
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize, raw: String },
}

impl MalformedPayload {
    /// Truncated excerpt of the rejected payload
    pub fn raw(&self) -> &str {
        match self {
            MalformedPayload::Invalid { raw, .. } | MalformedPayload::TooLarge { raw, .. } => raw,
        }
    }

    /// Line/column of the parse failure as reported by the decoder
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            MalformedPayload::Invalid { source, .. } => Some((source.line(), source.column())),
            MalformedPayload::TooLarge { .. } => None,
        }
    }

    fn invalid(source: serde_json::Error, raw: &[u8]) -> Self {
        MalformedPayload::Invalid {
            source,
            raw: preview(raw),
        }
    }
}

impl Reading {
    /// Parse a reading from a text frame
    pub fn from_json(text: &str) -> Result<Self, MalformedPayload> {
        serde_json::from_str(text).map_err(|e| MalformedPayload::invalid(e, text.as_bytes()))
    }

    /// Parse a reading from raw bytes (binary frames)
    ///
    /// Rejects input that is not UTF-8.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MalformedPayload> {
        serde_json::from_slice(bytes).map_err(|e| MalformedPayload::invalid(e, bytes))
    }

    /// Parse a frame no larger than `limit` bytes
    ///
    /// Oversized frames are rejected before any decoding.
    pub fn from_frame(bytes: &[u8], limit: usize) -> Result<Self, MalformedPayload> {
        if bytes.len() > limit {
            return Err(MalformedPayload::TooLarge {
                size: bytes.len(),
                limit,
                raw: preview(bytes),
            });
        }
        Self::from_slice(bytes)
    }

    /// Encode the reading back to its JSON text form
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// The three axes as `f64`, in degrees
    ///
    /// Returns `None` if a value does not fit an `f64`.
    pub fn axes(&self) -> Option<(f64, f64, f64)> {
        Some((self.x.as_f64()?, self.y.as_f64()?, self.z.as_f64()?))
    }
}

/// Lossy, truncated excerpt of a raw payload for log output
fn preview(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    if text.chars().count() <= PREVIEW_LIMIT {
        return text.into_owned();
    }
    let mut cut: String = text.chars().take(PREVIEW_LIMIT).collect();
    cut.push_str("...");
    cut
}
