// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Pagewerk.

use thiserror::Error;

/// Top-level error type for all Pagewerk operations.
#[derive(Debug, Error)]
pub enum PagewerkError {
    // -- Caller input --
    #[error("malformed page range {expression:?}: {reason}")]
    MalformedRange { expression: String, reason: String },

    #[error("operation would produce a document with no pages")]
    EmptyResult,

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("document is not readable: {0}")]
    UnreadableDocument(String),

    #[error("file not found: {0}")]
    NotFound(String),

    // -- External collaborators --
    #[error("conversion tool unavailable: {0}")]
    ConversionUnavailable(String),

    #[error("conversion timed out after {seconds}s: {tool}")]
    ConversionTimeout { tool: String, seconds: u64 },

    #[error("conversion failed: {0}")]
    ConversionFailed(String),

    #[error("operation not supported: {0}")]
    UnsupportedOperation(String),

    // -- Document processing --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Who is responsible for an error, from the caller's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself is wrong; retrying it unchanged fails again.
    Caller,
    /// A collaborator (office suite, rasteriser, OCR engine) is missing,
    /// failed, or ran out of time.
    Environment,
    /// Anything else.
    Internal,
}

impl PagewerkError {
    /// Shorthand for [`PagewerkError::MalformedRange`].
    pub fn malformed_range(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRange {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`PagewerkError::InvalidParameter`].
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Classify the error so callers can tell input mistakes apart from
    /// environment problems.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MalformedRange { .. }
            | Self::EmptyResult
            | Self::InvalidParameter { .. }
            | Self::UnreadableDocument(_)
            | Self::NotFound(_) => ErrorClass::Caller,

            Self::ConversionUnavailable(_)
            | Self::ConversionTimeout { .. }
            | Self::ConversionFailed(_)
            | Self::UnsupportedOperation(_) => ErrorClass::Environment,

            Self::PdfError(_) | Self::Io(_) | Self::Serialization(_) => ErrorClass::Internal,
        }
    }

    /// Stable machine-readable kind, used as the `error` field of API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRange { .. } => "malformed_range",
            Self::EmptyResult => "empty_result",
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::UnreadableDocument(_) => "unreadable_document",
            Self::NotFound(_) => "not_found",
            Self::ConversionUnavailable(_) => "conversion_unavailable",
            Self::ConversionTimeout { .. } => "conversion_timeout",
            Self::ConversionFailed(_) => "conversion_failed",
            Self::UnsupportedOperation(_) => "unsupported_operation",
            Self::PdfError(_) => "pdf_error",
            Self::Io(_) => "io_error",
            Self::Serialization(_) => "serialization_error",
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PagewerkError>;
