// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The scripted session. Host calls go through the method router; vendor
// callbacks are raised from a separate thread, the way a native SDK would.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{info, warn};

use dtexchange_bridge::host::ActivityBinding;
use dtexchange_bridge::simulated::{SimulatedSdk, SimulatedSpotHandle};
use dtexchange_core::error::{DtxError, Result};
use dtexchange_core::event::{EventType, OutboundEvent};
use dtexchange_core::types::{LifecycleState, LoadErrorCode, PresentationContext, ViewId};
use dtexchange_plugin::{AdCoordinator, EventReceiver, MethodCall, handle_method_call};

const APP_ID: &str = "102960";
const REWARDED_SPOT: &str = "150943";
const INTERSTITIAL_SPOT: &str = "150942";
const BANNER_SPOT: &str = "150944";

const EVENT_WAIT: Duration = Duration::from_secs(2);

pub struct Session {
    coordinator: AdCoordinator,
    sdk: SimulatedSdk,
    host: Arc<ActivityBinding>,
    events: EventReceiver,
}

impl Session {
    pub fn new(
        coordinator: AdCoordinator,
        sdk: SimulatedSdk,
        host: Arc<ActivityBinding>,
        events: EventReceiver,
    ) -> Self {
        Self {
            coordinator,
            sdk,
            host,
            events,
        }
    }

    pub async fn play(mut self) -> Result<()> {
        self.initialize().await?;
        self.rewarded().await?;
        self.interstitial().await?;
        self.banner().await?;
        info!("scripted session complete");
        Ok(())
    }

    async fn initialize(&mut self) -> Result<()> {
        self.call("initialize", json!({ "appId": APP_ID }))?;
        let sdk = self.sdk.clone();
        vendor(move || {
            sdk.complete_init(true, None);
        })?;
        self.expect(EventType::Initialized).await?;
        Ok(())
    }

    async fn rewarded(&mut self) -> Result<()> {
        self.call_fails("showRewardedVideo", Value::Null, "NOT_READY")?;

        self.call("loadRewardedVideo", json!({ "spotId": REWARDED_SPOT }))?;
        let spot = self.spot(REWARDED_SPOT)?;
        vendor({
            let spot = spot.clone();
            move || {
                spot.fill();
            }
        })?;
        self.expect(EventType::AdLoaded).await?;

        self.call("showRewardedVideo", Value::Null)?;
        vendor(move || {
            spot.impression();
            spot.complete_video();
            spot.dismiss();
        })?;
        self.expect(EventType::AdImpression).await?;
        self.expect(EventType::AdRewarded).await?;
        self.expect(EventType::AdDismissed).await?;

        self.call_fails("showRewardedVideo", Value::Null, "NOT_READY")?;
        Ok(())
    }

    /// Two loads back to back: the first request's late fill is discarded
    /// and only the second request's outcome is reported.
    async fn interstitial(&mut self) -> Result<()> {
        self.call("loadInterstitial", json!({ "spotId": INTERSTITIAL_SPOT }))?;
        let first = self.spot(INTERSTITIAL_SPOT)?;
        self.call("loadInterstitial", json!({ "spotId": INTERSTITIAL_SPOT }))?;
        let second = self.spot(INTERSTITIAL_SPOT)?;

        vendor(move || {
            first.fill();
            second.fail(LoadErrorCode::NoFill);
        })?;
        let failed = self.expect(EventType::AdLoadFailed).await?;
        info!(error_code = ?failed.field("errorCode"), "interstitial not filled");

        self.host.detach();
        self.call_fails("showInterstitial", Value::Null, "NO_ACTIVITY")?;
        self.host.attach(PresentationContext::new("DemoActivity"));
        self.call_fails("showInterstitial", Value::Null, "NOT_READY")?;
        Ok(())
    }

    async fn banner(&mut self) -> Result<()> {
        let view_type = self.coordinator.config().banner_view_type.clone();
        let forwarded = self.coordinator.config().banner_events;
        let view = self
            .coordinator
            .create_platform_view(&view_type, 1, &json!({ "spotId": BANNER_SPOT }))?;

        let spot = self.spot(BANNER_SPOT)?;
        vendor({
            let spot = spot.clone();
            move || {
                spot.fill();
                spot.impression();
            }
        })?;

        if forwarded {
            self.expect(EventType::AdLoaded).await?;
            self.expect(EventType::AdImpression).await?;
        } else {
            let coordinator = self.coordinator.clone();
            wait_until(|| coordinator.banner_lifecycle(ViewId(1)) == Some(LifecycleState::Loaded)).await?;
        }
        info!(view_id = %view.view_id(), bound = ?spot.bound_to(), "banner on screen");

        view.dispose();
        if view.dispose() {
            return Err(DtxError::Bridge("second dispose released a banner".into()));
        }
        Ok(())
    }

    // -- Helpers --------------------------------------------------------------

    fn call(&self, method: &str, arguments: Value) -> Result<()> {
        handle_method_call(&self.coordinator, &MethodCall::new(method, arguments))
            .map(|_| info!(method, "call ok"))
            .map_err(|e| DtxError::Bridge(format!("{method} failed: {e}")))
    }

    fn call_fails(&self, method: &str, arguments: Value, code: &str) -> Result<()> {
        match handle_method_call(&self.coordinator, &MethodCall::new(method, arguments)) {
            Err(e) if e.code == code => {
                info!(method, code, "call refused as expected");
                Ok(())
            }
            Err(e) => Err(DtxError::Bridge(format!("{method}: expected {code}, got {e}"))),
            Ok(_) => Err(DtxError::Bridge(format!("{method}: expected {code}, got success"))),
        }
    }

    fn spot(&self, spot_id: &str) -> Result<SimulatedSpotHandle> {
        self.sdk
            .spot(spot_id)
            .ok_or_else(|| DtxError::Bridge(format!("no ad spot was built for {spot_id}")))
    }

    /// Wait for the next outbound event, print it, and check its type.
    async fn expect(&mut self, expected: EventType) -> Result<OutboundEvent> {
        let event = tokio::time::timeout(EVENT_WAIT, self.events.recv())
            .await
            .map_err(|_| DtxError::Bridge(format!("timed out waiting for {expected}")))?
            .ok_or_else(|| DtxError::Bridge("event stream closed".into()))?;

        println!("{}", serde_json::to_string(&event.to_value())?);
        if event.event_type != expected {
            warn!(got = %event.event_type, %expected, "unexpected event");
            return Err(DtxError::Bridge(format!(
                "expected {expected}, got {}",
                event.event_type
            )));
        }
        Ok(event)
    }
}

/// Run `f` on its own thread, standing in for a vendor callback thread.
fn vendor(f: impl FnOnce() + Send + 'static) -> Result<()> {
    std::thread::spawn(f)
        .join()
        .map_err(|_| DtxError::Bridge("vendor thread panicked".into()))
}

async fn wait_until(mut done: impl FnMut() -> bool) -> Result<()> {
    let poll = async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(EVENT_WAIT, poll)
        .await
        .map_err(|_| DtxError::Bridge("timed out waiting for banner".into()))
}
