//! Error types for scoped settings access.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the settings layer.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// World scope requested while no world is active. Surfaced immediately,
    /// never retried.
    #[error("world scope requested outside an active game session")]
    ScopeUnavailable,

    /// A property selector that does not name a settable member.
    #[error("`{property}` is not a settable member of `{type_name}`")]
    InvalidSelector {
        type_name: &'static str,
        property: String,
    },

    /// An index outside the current bounds of a list member.
    #[error("index {index} is out of range for `{type_name}.{property}`")]
    IndexOutOfRange {
        type_name: &'static str,
        property: String,
        index: usize,
    },

    /// A stored field value could not be decoded into its declared type.
    #[error("invalid value for `{type_name}.{field}`")]
    FieldDecode {
        type_name: &'static str,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A section image could not be serialized.
    #[error("failed to encode settings section `{section}`")]
    Serialization {
        section: String,
        #[source]
        source: serde_json::Error,
    },

    /// A stored section is not the JSON object shape the store writes.
    #[error("settings section `{0}` is not a JSON object")]
    MalformedSection(String),

    /// An on-disk settings file is not valid JSON.
    #[error("malformed settings file `{path}`")]
    MalformedFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("settings I/O failed")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Patch(#[from] modkit_core::PatchError),
}
