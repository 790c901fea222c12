// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process SDK whose callbacks are fired on demand.
//
// Used by the coordinator tests and the demo binary. Callbacks can be fired
// from any thread, and keep flowing for spots that have already been
// destroyed, the same way a real vendor request that was in flight can still
// complete after its spot is torn down.

use std::sync::{Arc, Mutex};

use dtexchange_core::config::VendorLogLevel;
use dtexchange_core::error::{DtxError, Result};
use dtexchange_core::types::{AppId, LoadErrorCode, PresentationContext, RenderSurface, ViewId};
use tracing::debug;

use crate::events::{CallbackSink, VendorEvent};
use crate::traits::{AdRequest, AdSdk, AdSpot, UnitKind};

#[derive(Debug, Default)]
struct SimState {
    log_level: Option<VendorLogLevel>,
    init_calls: u32,
    init_sink: Option<CallbackSink>,
    initialized: bool,
    fail_next_build: Option<String>,
    fail_next_bind: Option<String>,
    spots: Vec<Arc<Mutex<SpotRecord>>>,
}

#[derive(Debug)]
struct SpotRecord {
    request: AdRequest,
    sink: CallbackSink,
    fetches: u32,
    ready: bool,
    destroyed: bool,
    shown_on: Vec<String>,
    bound_to: Option<ViewId>,
}

/// Scriptable stand-in for the vendor SDK.
#[derive(Debug, Clone, Default)]
pub struct SimulatedSdk {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedSdk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create_spot` fail with `BuildFailure(reason)`.
    pub fn fail_next_build(&self, reason: impl Into<String>) {
        self.lock().fail_next_build = Some(reason.into());
    }

    /// Make the next `bind_view` on any spot fail with `Bridge(reason)`.
    pub fn fail_next_bind(&self, reason: impl Into<String>) {
        self.lock().fail_next_bind = Some(reason.into());
    }

    /// Fire the pending initializer callback.
    pub fn complete_init(&self, success: bool, message: Option<&str>) -> bool {
        let sink = {
            let mut state = self.lock();
            if success {
                state.initialized = true;
            }
            state.init_sink.clone()
        };
        match sink {
            Some(sink) => sink.deliver(VendorEvent::InitCompleted {
                success,
                message: message.map(str::to_string),
            }),
            None => false,
        }
    }

    pub fn init_calls(&self) -> u32 {
        self.lock().init_calls
    }

    pub fn log_level(&self) -> Option<VendorLogLevel> {
        self.lock().log_level
    }

    /// Most recently created spot for `spot_id`.
    pub fn spot(&self, spot_id: &str) -> Option<SimulatedSpotHandle> {
        self.lock()
            .spots
            .iter()
            .rev()
            .find(|s| s.lock().expect("spot lock poisoned").request.spot_id.as_str() == spot_id)
            .cloned()
            .map(|record| SimulatedSpotHandle { record })
    }

    /// Every spot created so far, oldest first.
    pub fn spots(&self) -> Vec<SimulatedSpotHandle> {
        self.lock()
            .spots
            .iter()
            .cloned()
            .map(|record| SimulatedSpotHandle { record })
            .collect()
    }

    /// Spots that have not been destroyed.
    pub fn live_spots(&self) -> usize {
        self.lock()
            .spots
            .iter()
            .filter(|s| !s.lock().expect("spot lock poisoned").destroyed)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().expect("simulated sdk lock poisoned")
    }
}

impl AdSdk for SimulatedSdk {
    fn sdk_name(&self) -> &str {
        "Simulated"
    }

    fn set_log_level(&self, level: VendorLogLevel) {
        self.lock().log_level = Some(level);
    }

    fn initialize(&self, app_id: &AppId, sink: CallbackSink) -> Result<()> {
        let mut state = self.lock();
        state.init_calls += 1;
        debug!(
            %app_id,
            generation = sink.tag().generation,
            calls = state.init_calls,
            initialized = state.initialized,
            "simulated init requested"
        );
        state.init_sink = Some(sink);
        Ok(())
    }

    fn create_spot(&self, request: AdRequest, sink: CallbackSink) -> Result<Box<dyn AdSpot>> {
        let mut state = self.lock();
        if let Some(reason) = state.fail_next_build.take() {
            return Err(DtxError::BuildFailure(reason));
        }
        debug!(spot = %request.spot_id, slot = %sink.tag().slot, "simulated spot built");
        let record = Arc::new(Mutex::new(SpotRecord {
            request: request.clone(),
            sink,
            fetches: 0,
            ready: false,
            destroyed: false,
            shown_on: Vec::new(),
            bound_to: None,
        }));
        state.spots.push(Arc::clone(&record));
        Ok(Box::new(SimulatedSpot {
            request,
            record,
            sdk: Arc::clone(&self.state),
        }))
    }
}

/// The `AdSpot` the coordinator owns.
struct SimulatedSpot {
    request: AdRequest,
    record: Arc<Mutex<SpotRecord>>,
    sdk: Arc<Mutex<SimState>>,
}

impl SimulatedSpot {
    fn record(&self) -> std::sync::MutexGuard<'_, SpotRecord> {
        self.record.lock().expect("spot lock poisoned")
    }
}

impl AdSpot for SimulatedSpot {
    fn request(&self) -> &AdRequest {
        &self.request
    }

    fn fetch(&mut self) -> Result<()> {
        let mut record = self.record();
        if record.destroyed {
            return Err(DtxError::Bridge("fetch on destroyed spot".into()));
        }
        record.fetches += 1;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        let record = self.record();
        record.ready && !record.destroyed
    }

    fn show_fullscreen(&mut self, context: &PresentationContext) -> Result<()> {
        let mut record = self.record();
        if !matches!(record.request.unit, UnitKind::Fullscreen { .. }) {
            return Err(DtxError::Bridge("inline spot cannot be shown fullscreen".into()));
        }
        if !record.ready || record.destroyed {
            return Err(DtxError::Bridge("spot is not ready".into()));
        }
        record.ready = false;
        record.shown_on.push(context.name.clone());
        Ok(())
    }

    fn bind_view(&mut self, surface: &RenderSurface) -> Result<()> {
        let injected = self
            .sdk
            .lock()
            .expect("simulated sdk lock poisoned")
            .fail_next_bind
            .take();
        if let Some(reason) = injected {
            return Err(DtxError::Bridge(reason));
        }
        let mut record = self.record();
        if record.request.unit != UnitKind::Inline {
            return Err(DtxError::Bridge("fullscreen spot cannot be bound to a view".into()));
        }
        if record.destroyed {
            return Err(DtxError::Bridge("spot is destroyed".into()));
        }
        record.bound_to = Some(surface.view_id);
        Ok(())
    }

    fn destroy(&mut self) {
        let mut record = self.record();
        record.destroyed = true;
        record.ready = false;
    }
}

/// Test-side view of one simulated spot: inspect it and fire its callbacks.
#[derive(Debug, Clone)]
pub struct SimulatedSpotHandle {
    record: Arc<Mutex<SpotRecord>>,
}

impl SimulatedSpotHandle {
    fn record(&self) -> std::sync::MutexGuard<'_, SpotRecord> {
        self.record.lock().expect("spot lock poisoned")
    }

    fn fire(&self, event: VendorEvent) -> bool {
        // Clone the sink out so delivery never happens under the spot lock.
        let sink = self.record().sink.clone();
        sink.deliver(event)
    }

    pub fn request(&self) -> AdRequest {
        self.record().request.clone()
    }

    pub fn fetches(&self) -> u32 {
        self.record().fetches
    }

    pub fn is_destroyed(&self) -> bool {
        self.record().destroyed
    }

    pub fn times_shown(&self) -> usize {
        self.record().shown_on.len()
    }

    pub fn bound_to(&self) -> Option<ViewId> {
        self.record().bound_to
    }

    /// Report a fill. Marks the spot ready unless it was destroyed.
    pub fn fill(&self) -> bool {
        {
            let mut record = self.record();
            if !record.destroyed {
                record.ready = true;
            }
        }
        self.fire(VendorEvent::RequestSucceeded)
    }

    pub fn fail(&self, code: LoadErrorCode) -> bool {
        self.fire(VendorEvent::RequestFailed {
            code,
            message: None,
        })
    }

    pub fn impression(&self) -> bool {
        self.fire(VendorEvent::Impression)
    }

    pub fn click(&self) -> bool {
        self.fire(VendorEvent::Clicked)
    }

    pub fn complete_video(&self) -> bool {
        self.fire(VendorEvent::RewardCompleted)
    }

    pub fn dismiss(&self) -> bool {
        self.fire(VendorEvent::Dismissed)
    }

    pub fn display_error(&self, message: &str) -> bool {
        self.fire(VendorEvent::DisplayError {
            message: message.to_string(),
        })
    }
}
