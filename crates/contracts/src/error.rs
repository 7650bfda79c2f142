//! Layered error definitions
//!
//! Categorized by source: config / model / detector / engine / channel

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum TrackError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Setup Errors =====
    /// Model description unreadable at startup (fatal)
    #[error("model load error for '{path}': {message}")]
    ModelLoad { path: String, message: String },

    // ===== Detector Errors =====
    /// Pattern detector failure
    #[error("detector error: {message}")]
    Detector { message: String },

    // ===== Engine Errors =====
    /// Tracking-phase payload requested outside the tracking phase
    ///
    /// This is a programming error on the caller's side, not a recoverable
    /// runtime condition.
    #[error("tracking state unavailable: engine is in phase {phase}")]
    NotTracking { phase: i8 },

    // ===== Channel Errors =====
    /// Output channel has shut down
    #[error("channel '{channel}' closed: {message}")]
    ChannelClosed { channel: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl TrackError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create model load error
    pub fn model_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create detector error
    pub fn detector(message: impl Into<String>) -> Self {
        Self::Detector {
            message: message.into(),
        }
    }

    /// Create channel-closed error
    pub fn channel_closed(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ChannelClosed {
            channel: channel.into(),
            message: message.into(),
        }
    }
}
