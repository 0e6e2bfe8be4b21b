//! Error types for scenewire.

use thiserror::Error;

use crate::meta::FieldKind;

/// Main error type for all codec and correlation-layer operations.
#[derive(Debug, Error)]
pub enum WireError {
    /// Binary read past the end of the buffer.
    #[error("buffer underrun: needed {needed} more bytes, {remaining} available")]
    Underrun { needed: usize, remaining: usize },

    /// A field kind the active codec cannot represent (e.g. a struct-typed
    /// map key on the binary wire).
    #[error("unsupported field kind {kind:?} for {context}")]
    UnsupportedField {
        kind: FieldKind,
        context: &'static str,
    },

    /// Declared type tag not found in the metadata registry.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// Enum value that resolves to neither a declared integer value nor a
    /// declared symbolic name.
    #[error("unknown value {value:?} for enum {enum_name}")]
    UnknownEnumValue {
        enum_name: &'static str,
        value: String,
    },

    /// Required field absent from the input.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// Input bytes/text received but structurally invalid for the declared
    /// shape.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// JSON parse error from the textual wire format.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level failure, passed through opaquely.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type alias using WireError.
pub type Result<T> = std::result::Result<T, WireError>;
