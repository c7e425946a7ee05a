//! Error types for the simulation core
//!
//! Tick faults are always recovered by the frame loop; collaborator faults
//! are logged at the call site. Nothing here is meant to reach the host.

use thiserror::Error;

/// A transient fault raised while advancing one tick
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// A position or velocity became NaN/infinite
    #[error("non-finite {field} on {entity}")]
    NonFinite {
        entity: &'static str,
        field: &'static str,
    },

    /// A panic caught at the tick failure boundary
    #[error("tick panicked: {0}")]
    Panicked(String),

    /// Internal bookkeeping no longer holds
    #[error("invalid simulation state: {0}")]
    InvalidState(String),
}

/// A failure reported by a render/audio/UI collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("render failed: {0}")]
    Render(String),

    #[error("audio failed: {0}")]
    Audio(String),

    #[error("overlay failed: {0}")]
    Overlay(String),
}

/// Settings could not be read or parsed
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
