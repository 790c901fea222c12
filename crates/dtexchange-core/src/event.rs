// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outbound event schema consumed by the host application.
//
// Every event is a flat record: `{"type": "<name>", ...payload}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Delivery, DtxError};
use crate::types::{AdKind, LoadErrorCode, ViewId};

/// The `type` field of an outbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "onInitialized")]
    Initialized,
    #[serde(rename = "onAdLoaded")]
    AdLoaded,
    #[serde(rename = "onAdLoadFailed")]
    AdLoadFailed,
    #[serde(rename = "onAdImpression")]
    AdImpression,
    #[serde(rename = "onAdClicked")]
    AdClicked,
    #[serde(rename = "onAdDismissed")]
    AdDismissed,
    #[serde(rename = "onAdShowFailed")]
    AdShowFailed,
    #[serde(rename = "onAdRewarded")]
    AdRewarded,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialized => "onInitialized",
            Self::AdLoaded => "onAdLoaded",
            Self::AdLoadFailed => "onAdLoadFailed",
            Self::AdImpression => "onAdImpression",
            Self::AdClicked => "onAdClicked",
            Self::AdDismissed => "onAdDismissed",
            Self::AdShowFailed => "onAdShowFailed",
            Self::AdRewarded => "onAdRewarded",
        }
    }

    /// Ends a display: exactly one of these follows a successful show.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AdDismissed | Self::AdShowFailed)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized event on the outbound stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl OutboundEvent {
    fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            payload: Map::new(),
        }
    }

    fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    pub fn initialized(status: impl Into<String>) -> Self {
        Self::new(EventType::Initialized).with("status", status.into())
    }

    pub fn ad_loaded(kind: AdKind) -> Self {
        Self::new(EventType::AdLoaded).with("adType", kind.ad_type())
    }

    pub fn ad_load_failed(kind: AdKind, code: &LoadErrorCode) -> Self {
        Self::new(EventType::AdLoadFailed)
            .with("adType", kind.ad_type())
            .with("errorCode", code.as_str())
    }

    pub fn ad_impression() -> Self {
        Self::new(EventType::AdImpression)
    }

    pub fn ad_clicked() -> Self {
        Self::new(EventType::AdClicked)
    }

    pub fn ad_dismissed() -> Self {
        Self::new(EventType::AdDismissed)
    }

    pub fn ad_show_failed(error: impl Into<String>) -> Self {
        Self::new(EventType::AdShowFailed).with("error", error.into())
    }

    pub fn ad_rewarded() -> Self {
        Self::new(EventType::AdRewarded)
    }

    /// The event a streamed error is delivered as. `None` for errors that
    /// are returned to the caller instead.
    pub fn from_failure(err: &DtxError) -> Option<Self> {
        if err.delivery() != Delivery::Streamed {
            return None;
        }
        match err {
            DtxError::LoadFailure { kind, code } => Some(Self::ad_load_failed(*kind, code)),
            DtxError::ShowFailure(error) => Some(Self::ad_show_failed(error.clone())),
            _ => None,
        }
    }

    /// Tag a banner event with its view and ad type.
    pub fn for_banner(self, view_id: ViewId) -> Self {
        self.with("adType", AdKind::Banner.ad_type())
            .with("viewId", view_id.0)
    }

    /// String payload value, if present.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Flat JSON record as delivered to the host.
    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(self.payload.len() + 1);
        map.insert("type".into(), Value::from(self.event_type.as_str()));
        for (k, v) in &self.payload {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }
}
