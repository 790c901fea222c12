// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DtxError, Result};

/// Verbosity requested from the vendor SDK's own logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorLogLevel {
    Verbose,
    Debug,
    Info,
    Warn,
    Error,
    None,
}

/// Settings for one coordinator instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Timeout handed to every vendor ad request, in seconds (default 15).
    /// The coordinator itself never times out or retries.
    pub request_timeout_secs: u64,
    /// Log level applied to the vendor SDK before initialization.
    pub vendor_log_level: VendorLogLevel,
    /// Name the host registers its method channel under. The coordinator
    /// never reads it; the host's channel registration does.
    pub method_channel: String,
    /// Name the host registers its event channel under, and forwards the
    /// coordinator's `EventReceiver` to.
    pub event_channel: String,
    /// Platform view type under which banners are registered. Checked by
    /// the platform-view factory.
    pub banner_view_type: String,
    /// Forward banner load/impression/click results to the event stream.
    pub banner_events: bool,
    /// Mute video creatives on fullscreen units.
    pub mute_video: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 15,
            vendor_log_level: VendorLogLevel::Verbose,
            method_channel: "dt_exchange_sdk".into(),
            event_channel: "dt_exchange_sdk_events".into(),
            banner_view_type: "dt_exchange_banner_view".into(),
            banner_events: false,
            mute_video: false,
        }
    }
}

impl BridgeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Read a JSON config file. Missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        info!(path = %path.display(), "bridge config loaded");
        Ok(config)
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        debug!(path = %path.as_ref().display(), "bridge config saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(DtxError::Config("request_timeout_secs must be positive".into()));
        }
        if self.method_channel.is_empty() || self.event_channel.is_empty() {
            return Err(DtxError::Config("channel names must not be empty".into()));
        }
        if self.method_channel == self.event_channel {
            return Err(DtxError::Config(
                "method and event channels must differ".into(),
            ));
        }
        Ok(())
    }
}
