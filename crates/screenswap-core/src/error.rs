// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Screenswap.

use thiserror::Error;

/// Top-level error type for all Screenswap operations.
#[derive(Debug, Error)]
pub enum ScreenswapError {
    // -- Detection / geometry --
    #[error("green-screen detection failed: {0}")]
    DetectionFailed(String),

    #[error("invalid corner geometry: {0}")]
    InvalidGeometry(String),

    // -- Input --
    #[error("unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    #[error("invalid parameter `{name}`: {detail}")]
    InvalidParameter { name: String, detail: String },

    // -- Output --
    #[error("image encoding failed: {0}")]
    Encode(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScreenswapError {
    /// Shorthand for an [`ScreenswapError::InvalidParameter`].
    pub fn invalid_parameter(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            detail: detail.into(),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScreenswapError>;
