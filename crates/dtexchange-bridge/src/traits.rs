// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the vendor ad SDK.
//
// The coordinator never talks to the vendor library directly. A binding
// implements `AdSdk` (process-wide entry point) and `AdSpot` (one ad request
// and the unit controller attached to it), and reports every callback through
// the `CallbackSink` it was given.

use std::time::Duration;

use dtexchange_core::config::VendorLogLevel;
use dtexchange_core::error::Result;
use dtexchange_core::types::{AppId, PresentationContext, RenderSurface, SpotId};

use crate::events::CallbackSink;

/// Which unit controller an ad spot is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// Fullscreen controller; `rewarded` also wires the reward callback.
    Fullscreen { rewarded: bool },
    /// View controller that draws into an embedded surface.
    Inline,
}

/// Everything a binding needs to build one native ad request.
#[derive(Debug, Clone, PartialEq)]
pub struct AdRequest {
    pub spot_id: SpotId,
    pub unit: UnitKind,
    /// Vendor-side request timeout.
    pub timeout: Duration,
    pub mute_video: bool,
}

/// Process-wide vendor entry point.
pub trait AdSdk: Send + Sync {
    /// Human-readable name (e.g. "IASDKCore 8.3", "Inneractive Android").
    fn sdk_name(&self) -> &str;

    /// Apply the vendor's own log verbosity.
    fn set_log_level(&self, level: VendorLogLevel);

    /// Start the one-time initializer. Must return without waiting for
    /// completion; the result arrives as `VendorEvent::InitCompleted` on
    /// `sink`. Calling it again after success is harmless.
    fn initialize(&self, app_id: &AppId, sink: CallbackSink) -> Result<()>;

    /// Build an ad spot with its unit and content controllers registered.
    /// Construction problems are `DtxError::BuildFailure`.
    fn create_spot(&self, request: AdRequest, sink: CallbackSink) -> Result<Box<dyn AdSpot>>;
}

/// One native ad spot. Exclusively owned by a coordinator slot.
pub trait AdSpot: Send {
    fn request(&self) -> &AdRequest;

    /// Issue the ad request. Returns once dispatched; the outcome arrives as
    /// `RequestSucceeded` or `RequestFailed`.
    fn fetch(&mut self) -> Result<()>;

    /// Vendor readiness: a fill is loaded and its controller is active.
    fn is_ready(&self) -> bool;

    /// Present a fullscreen unit over `context`.
    fn show_fullscreen(&mut self, context: &PresentationContext) -> Result<()>;

    /// Draw an inline unit into `surface`.
    fn bind_view(&mut self, surface: &RenderSurface) -> Result<()>;

    /// Release native resources. Must tolerate repeated calls.
    fn destroy(&mut self);
}

/// Supplies the foreground presentation context, if any.
pub trait PresentationHost: Send + Sync {
    fn current_presentation_context(&self) -> Option<PresentationContext>;
}
