// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the ad-lifecycle bridge.

use serde::{Deserialize, Serialize};

use crate::error::{DtxError, Result};

/// The kind of ad unit a slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdKind {
    Rewarded,
    Interstitial,
    Banner,
}

impl AdKind {
    /// Value of the `adType` key in outbound event payloads.
    pub fn ad_type(&self) -> &'static str {
        match self {
            Self::Rewarded => "rewarded",
            Self::Interstitial => "interstitial",
            Self::Banner => "banner",
        }
    }

    /// Whether units of this kind are presented full screen.
    pub fn is_fullscreen(&self) -> bool {
        !matches!(self, Self::Banner)
    }
}

impl std::fmt::Display for AdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.ad_type())
    }
}

/// Vendor-assigned placement identifier. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SpotId(String);

impl SpotId {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(DtxError::MissingArgument("spotId"));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SpotId {
    type Error = DtxError;

    fn try_from(raw: String) -> Result<Self> {
        Self::new(raw)
    }
}

impl From<SpotId> for String {
    fn from(id: SpotId) -> Self {
        id.0
    }
}

impl std::fmt::Display for SpotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Application credential handed to the vendor's process-wide initializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppId(String);

impl AppId {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(DtxError::MissingArgument("appId"));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier the host embedding system assigns to a banner view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId(pub i64);

impl std::fmt::Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a single ad unit instance.
///
/// `Dismissed`, `Failed` and `LoadFailed` are terminal. A new load never
/// transitions an instance; it replaces it with a fresh one in `Loading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Idle,
    Loading,
    Loaded,
    Showing,
    Dismissed,
    Failed,
    LoadFailed,
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Dismissed | Self::Failed | Self::LoadFailed)
    }

    /// Whether `next` is a legal step for the same instance. `Loaded` to
    /// `Failed` is a bound banner failing to render.
    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Idle, Loading)
                | (Loading, Loaded)
                | (Loading, LoadFailed)
                | (Loaded, Showing)
                | (Loaded, Failed)
                | (Showing, Dismissed)
                | (Showing, Failed)
        )
    }
}

/// Process-wide vendor SDK initialization state, as tracked by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitState {
    NotInitialized,
    Initializing,
    Ready,
    Failed,
}

impl InitState {
    /// Loads are accepted once initialization has at least been requested.
    pub fn accepts_loads(&self) -> bool {
        matches!(self, Self::Initializing | Self::Ready)
    }
}

/// Error codes reported by the vendor when an ad request fails.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LoadErrorCode {
    NoFill,
    ConnectionError,
    LoadTimeout,
    ServerInvalidResponse,
    ServerInternalError,
    SdkInternalError,
    SpotDisabled,
    UnsupportedSpot,
    InvalidInput,
    ConfigurationMismatch,
    ConfigurationNoSuchSpot,
    NonSecureContentDetected,
    NativeAdsNotSupportedForOs,
    Cancelled,
    Unspecified,
    /// A code this bridge does not know by name, passed through verbatim.
    Other(String),
}

impl LoadErrorCode {
    /// Vendor spelling used in the `errorCode` payload.
    pub fn as_str(&self) -> &str {
        match self {
            Self::NoFill => "NO_FILL",
            Self::ConnectionError => "CONNECTION_ERROR",
            Self::LoadTimeout => "LOAD_TIMEOUT",
            Self::ServerInvalidResponse => "SERVER_INVALID_RESPONSE",
            Self::ServerInternalError => "SERVER_INTERNAL_ERROR",
            Self::SdkInternalError => "SDK_INTERNAL_ERROR",
            Self::SpotDisabled => "SPOT_DISABLED",
            Self::UnsupportedSpot => "UNSUPPORTED_SPOT",
            Self::InvalidInput => "INVALID_INPUT",
            Self::ConfigurationMismatch => "ERROR_CONFIGURATION_MISMATCH",
            Self::ConfigurationNoSuchSpot => "ERROR_CONFIGURATION_NO_SUCH_SPOT",
            Self::NonSecureContentDetected => "NON_SECURE_CONTENT_DETECTED",
            Self::NativeAdsNotSupportedForOs => "NATIVE_ADS_NOT_SUPPORTED_FOR_OS",
            Self::Cancelled => "CANCELLED",
            Self::Unspecified => "UNSPECIFIED",
            Self::Other(raw) => raw,
        }
    }

    /// Parse the vendor's code name. Unknown names are kept as `Other`.
    pub fn from_vendor(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "NO_FILL" => Self::NoFill,
            "CONNECTION_ERROR" => Self::ConnectionError,
            "LOAD_TIMEOUT" => Self::LoadTimeout,
            "SERVER_INVALID_RESPONSE" => Self::ServerInvalidResponse,
            "SERVER_INTERNAL_ERROR" => Self::ServerInternalError,
            "SDK_INTERNAL_ERROR" => Self::SdkInternalError,
            "SPOT_DISABLED" => Self::SpotDisabled,
            "UNSUPPORTED_SPOT" => Self::UnsupportedSpot,
            "INVALID_INPUT" => Self::InvalidInput,
            "ERROR_CONFIGURATION_MISMATCH" => Self::ConfigurationMismatch,
            "ERROR_CONFIGURATION_NO_SUCH_SPOT" => Self::ConfigurationNoSuchSpot,
            "NON_SECURE_CONTENT_DETECTED" => Self::NonSecureContentDetected,
            "NATIVE_ADS_NOT_SUPPORTED_FOR_OS" => Self::NativeAdsNotSupportedForOs,
            "CANCELLED" => Self::Cancelled,
            "UNSPECIFIED" | "" => Self::Unspecified,
            _ => Self::Other(raw.trim().to_string()),
        }
    }
}

impl From<String> for LoadErrorCode {
    fn from(raw: String) -> Self {
        Self::from_vendor(&raw)
    }
}

impl From<LoadErrorCode> for String {
    fn from(code: LoadErrorCode) -> Self {
        code.as_str().to_string()
    }
}

impl std::fmt::Display for LoadErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rectangle a banner surface occupies, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Frame {
    /// Standard 320x50 banner slot.
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 320.0,
            height: 50.0,
        }
    }
}

/// The view a banner is drawn into. Owned by the banner for its whole
/// embedded lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSurface {
    pub view_id: ViewId,
    pub frame: Frame,
}

/// Opaque handle to the foreground presentation target (an Activity on
/// Android, the top-most view controller on iOS).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PresentationContext {
    /// Host-defined identifier, used only for logging.
    pub name: String,
}

impl PresentationContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
