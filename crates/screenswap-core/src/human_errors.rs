// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The category drives the process exit code so scripted callers can branch.

use crate::error::ScreenswapError;

/// Broad class of an error from the caller's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No usable green screen, or the corners describe a degenerate shape.
    Geometry,
    /// The input bytes are not a decodable image.
    UnsupportedFormat,
    /// A file could not be read or written.
    Io,
    /// A parameter or configuration value is out of range or malformed.
    InvalidInput,
}

impl ErrorCategory {
    /// Process exit code for this category. 0 is reserved for success.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::InvalidInput => 1,
            Self::Geometry => 2,
            Self::UnsupportedFormat => 3,
            Self::Io => 4,
        }
    }
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    pub category: ErrorCategory,
}

/// Convert a `ScreenswapError` into a `HumanError`.
pub fn humanize_error(err: &ScreenswapError) -> HumanError {
    match err {
        ScreenswapError::DetectionFailed(detail) => HumanError {
            message: "We couldn't find a green screen in this photo.".into(),
            suggestion: format!(
                "Make sure the green area is clearly visible and evenly lit, widen the hue range, or place the corners manually. ({detail})"
            ),
            category: ErrorCategory::Geometry,
        },

        ScreenswapError::InvalidGeometry(detail) => HumanError {
            message: "The screen corners don't form a usable shape.".into(),
            suggestion: format!(
                "Drag the corners so they outline the screen in order: top-left, top-right, bottom-right, bottom-left. ({detail})"
            ),
            category: ErrorCategory::Geometry,
        },

        ScreenswapError::UnsupportedImageFormat(_) => HumanError {
            message: "This file isn't an image we can read.".into(),
            suggestion: "Try saving it as a PNG or JPEG first.".into(),
            category: ErrorCategory::UnsupportedFormat,
        },

        ScreenswapError::InvalidParameter { name, detail } => HumanError {
            message: format!("The `{name}` setting isn't valid."),
            suggestion: format!("Adjust it and try again. ({detail})"),
            category: ErrorCategory::InvalidInput,
        },

        ScreenswapError::Encode(_) => HumanError {
            message: "The finished image couldn't be saved in that format.".into(),
            suggestion: "Try writing a .png file instead.".into(),
            category: ErrorCategory::Io,
        },

        ScreenswapError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "The file couldn't be found.".into(),
                suggestion: "Check the path and try again.".into(),
                category: ErrorCategory::Io,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "We don't have permission to use that file.".into(),
                suggestion: "Check the file permissions, or choose a different output folder.".into(),
                category: ErrorCategory::Io,
            },
            _ => HumanError {
                message: "There was a problem reading or writing a file.".into(),
                suggestion: "Try again. If this keeps happening, your disk may be full.".into(),
                category: ErrorCategory::Io,
            },
        },

        ScreenswapError::Serialization(detail) => HumanError {
            message: "The settings or corner data couldn't be read.".into(),
            suggestion: format!("Check the JSON syntax and try again. ({detail})"),
            category: ErrorCategory::InvalidInput,
        },
    }
}
