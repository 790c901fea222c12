// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Serializable point-in-time view of a coordinator, for diagnostics.

use chrono::{DateTime, Utc};
use serde::Serialize;

use dtexchange_core::types::{AdKind, InitState, LifecycleState, SpotId, ViewId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitSnapshot {
    pub kind: AdKind,
    pub spot_id: SpotId,
    pub state: LifecycleState,
    pub generation: u64,
    /// Vendor readiness of the owned spot.
    pub ready: bool,
    pub rewarded: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BannerSnapshot {
    pub view_id: ViewId,
    pub spot_id: SpotId,
    pub state: LifecycleState,
    pub generation: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinatorSnapshot {
    pub init_state: InitState,
    /// Fullscreen slots, ordered by ad type.
    pub units: Vec<UnitSnapshot>,
    /// Live banners, ordered by view id.
    pub banners: Vec<BannerSnapshot>,
    /// Callbacks dropped because their handle had been superseded or released.
    pub stale_callbacks: u64,
    pub subscribed: bool,
    pub taken_at: DateTime<Utc>,
}

impl CoordinatorSnapshot {
    pub fn unit(&self, kind: AdKind) -> Option<&UnitSnapshot> {
        self.units.iter().find(|u| u.kind == kind)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
