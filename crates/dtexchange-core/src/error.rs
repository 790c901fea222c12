// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the ad bridge.

use thiserror::Error;

use crate::types::{AdKind, LoadErrorCode};

/// Top-level error type for all bridge operations.
#[derive(Debug, Error)]
pub enum DtxError {
    // -- Caller-facing (returned synchronously) --
    #[error("{0} is required")]
    MissingArgument(&'static str),

    #[error("no foreground presentation context is bound")]
    NoPresentationContext,

    #[error("{0} ad is not ready to show")]
    NotReady(AdKind),

    #[error("ad SDK has not been initialized")]
    NotInitialized,

    #[error("failed to build native ad object: {0}")]
    BuildFailure(String),

    // -- Vendor runtime outcomes (delivered on the event stream) --
    #[error("{kind} ad failed to load: {code}")]
    LoadFailure { kind: AdKind, code: LoadErrorCode },

    #[error("ad failed to display: {0}")]
    ShowFailure(String),

    // -- Method routing --
    #[error("method not implemented: {0}")]
    NotImplemented(String),

    #[error("invalid method arguments: {0}")]
    InvalidArguments(String),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("ad SDK not available on this platform")]
    PlatformUnavailable,

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// How an error reaches the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Returned as a typed failure from the triggering call.
    Returned,
    /// Never returned; normalized into an outbound event.
    Streamed,
}

impl DtxError {
    /// Stable error code reported across the method channel.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingArgument(_) => "MISSING_ARG",
            Self::NoPresentationContext => "NO_ACTIVITY",
            Self::NotReady(_) => "NOT_READY",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::BuildFailure(_) => "BUILD_ERROR",
            Self::LoadFailure { .. } => "LOAD_FAILED",
            Self::ShowFailure(_) => "SHOW_FAILED",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
            Self::InvalidArguments(_) => "INVALID_ARGS",
            Self::PlatformUnavailable => "PLATFORM_UNAVAILABLE",
            Self::Bridge(_) | Self::Io(_) | Self::Serialization(_) | Self::Config(_) => {
                "BRIDGE_ERROR"
            }
        }
    }

    pub fn delivery(&self) -> Delivery {
        match self {
            Self::LoadFailure { .. } | Self::ShowFailure(_) => Delivery::Streamed,
            _ => Delivery::Returned,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DtxError>;
