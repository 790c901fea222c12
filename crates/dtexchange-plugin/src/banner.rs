// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Embedded banner views.
//
// The host creates a platform view with a creation-parameter map; the view
// immediately loads its banner and draws into its own surface once filled.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use dtexchange_core::error::{DtxError, Result};
use dtexchange_core::types::{Frame, LifecycleState, RenderSurface, ViewId};

use crate::coordinator::AdCoordinator;

/// Creation parameters of a banner platform view.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerParams {
    #[serde(default)]
    pub spot_id: String,
    #[serde(default)]
    pub frame: Option<Frame>,
}

impl BannerParams {
    pub fn new(spot_id: impl Into<String>) -> Self {
        Self {
            spot_id: spot_id.into(),
            frame: None,
        }
    }

    /// Parse the creation arguments. `null` counts as an empty map.
    pub fn from_creation_args(args: &Value) -> Result<Self> {
        if args.is_null() {
            return Ok(Self::new(""));
        }
        Self::deserialize(args).map_err(|e| DtxError::InvalidArguments(e.to_string()))
    }
}

/// A live banner view. Dropping it does not release the ad; call `dispose`.
#[derive(Clone)]
pub struct BannerView {
    coordinator: AdCoordinator,
    surface: RenderSurface,
}

impl BannerView {
    pub fn view_id(&self) -> ViewId {
        self.surface.view_id
    }

    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    pub fn lifecycle(&self) -> Option<LifecycleState> {
        self.coordinator.banner_lifecycle(self.surface.view_id)
    }

    /// Release the banner. Safe to call more than once.
    pub fn dispose(&self) -> bool {
        self.coordinator.dispose_banner(self.surface.view_id)
    }
}

impl std::fmt::Debug for BannerView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BannerView")
            .field("surface", &self.surface)
            .finish_non_exhaustive()
    }
}

impl AdCoordinator {
    /// Create a banner view and start loading it.
    pub fn create_banner(&self, view_id: ViewId, params: BannerParams) -> Result<BannerView> {
        let surface = RenderSurface {
            view_id,
            frame: params.frame.unwrap_or_default(),
        };
        self.open_banner(&params.spot_id, surface.clone())?;
        Ok(BannerView {
            coordinator: self.clone(),
            surface,
        })
    }

    /// Platform-view factory entry point: checks the view type, then
    /// behaves like `create_banner`.
    pub fn create_platform_view(&self, view_type: &str, view_id: i64, args: &Value) -> Result<BannerView> {
        if view_type != self.config().banner_view_type {
            warn!(view_type, expected = %self.config().banner_view_type, "unknown platform view type");
            return Err(DtxError::NotImplemented(format!("platform view {view_type}")));
        }
        let params = BannerParams::from_creation_args(args)?;
        debug!(view_id, spot = %params.spot_id, "creating banner view");
        self.create_banner(ViewId(view_id), params)
    }
}
