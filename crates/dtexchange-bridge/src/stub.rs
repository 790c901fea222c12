// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub SDK for desktop/CI builds where the vendor library is unavailable.
//
// Every operation returns `PlatformUnavailable`; no callback is ever raised.

use dtexchange_core::config::VendorLogLevel;
use dtexchange_core::error::{DtxError, Result};
use dtexchange_core::types::AppId;

use crate::events::CallbackSink;
use crate::traits::{AdRequest, AdSdk, AdSpot};

/// No-op SDK returned on platforms without a native binding.
pub struct StubSdk;

impl AdSdk for StubSdk {
    fn sdk_name(&self) -> &str {
        "Desktop (stub)"
    }

    fn set_log_level(&self, _level: VendorLogLevel) {}

    fn initialize(&self, _app_id: &AppId, _sink: CallbackSink) -> Result<()> {
        tracing::warn!("AdSdk::initialize called on stub SDK");
        Err(DtxError::PlatformUnavailable)
    }

    fn create_spot(&self, request: AdRequest, _sink: CallbackSink) -> Result<Box<dyn AdSpot>> {
        tracing::warn!(spot = %request.spot_id, "AdSdk::create_spot called on stub SDK");
        Err(DtxError::PlatformUnavailable)
    }
}
