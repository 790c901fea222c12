// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ad unit lifecycle coordinator.
//
// Owns one slot per fullscreen kind plus one per live banner view. Each slot
// holds the native ad spot exclusively; starting a new load destroys the old
// spot before a new one is built. Every spot's callbacks are tagged with the
// slot generation at construction time, so callbacks from a superseded or
// disposed spot are recognised and dropped by the dispatcher.
//
// Vendor callbacks may be raised on any thread. They only ever enter the
// callback channel; the coordinator state is touched, and outbound events
// emitted, solely by whoever drives the dispatcher (`pump` or `run`), which
// keeps emission on one thread and in arrival order.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use dtexchange_bridge::events::{CallbackSink, CallbackTag, SlotKey, TaggedEvent, VendorEvent, callback_channel};
use dtexchange_bridge::traits::{AdRequest, AdSdk, AdSpot, PresentationHost, UnitKind};
use dtexchange_core::config::BridgeConfig;
use dtexchange_core::error::{DtxError, Result};
use dtexchange_core::event::OutboundEvent;
use dtexchange_core::types::{AdKind, AppId, InitState, LifecycleState, RenderSurface, SpotId, ViewId};

use crate::normalize::{Step, UnitStatus, normalize};
use crate::snapshot::{BannerSnapshot, CoordinatorSnapshot, UnitSnapshot};
use crate::stream::{EventReceiver, EventStream};

/// One ad unit instance and the native spot it owns.
pub(crate) struct UnitSlot {
    pub(crate) spot_id: SpotId,
    pub(crate) generation: u64,
    pub(crate) status: UnitStatus,
    pub(crate) handle: Option<Box<dyn AdSpot>>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl UnitSlot {
    fn loading(spot_id: SpotId, generation: u64, handle: Box<dyn AdSpot>) -> Self {
        Self {
            spot_id,
            generation,
            status: UnitStatus::loading(),
            handle: Some(handle),
            updated_at: Utc::now(),
        }
    }

    fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.destroy();
        }
    }

    fn is_ready(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.is_ready())
    }
}

pub(crate) struct BannerSlot {
    pub(crate) unit: UnitSlot,
    pub(crate) surface: RenderSurface,
}

struct CoordinatorState {
    init: InitState,
    init_generation: u64,
    /// Monotonic across all slots, so a recycled view id never reuses one.
    next_generation: u64,
    fullscreen: HashMap<AdKind, UnitSlot>,
    banners: BTreeMap<ViewId, BannerSlot>,
    stale_callbacks: u64,
}

impl CoordinatorState {
    fn new() -> Self {
        Self {
            init: InitState::NotInitialized,
            init_generation: 0,
            next_generation: 0,
            fullscreen: HashMap::new(),
            banners: BTreeMap::new(),
            stale_callbacks: 0,
        }
    }

    fn bump(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn is_current(&self, tag: &CallbackTag) -> bool {
        match tag.slot {
            SlotKey::Sdk => tag.generation == self.init_generation,
            SlotKey::Fullscreen(kind) => self
                .fullscreen
                .get(&kind)
                .is_some_and(|s| s.generation == tag.generation),
            SlotKey::Banner(view_id) => self
                .banners
                .get(&view_id)
                .is_some_and(|b| b.unit.generation == tag.generation),
        }
    }
}

struct Inner {
    sdk: Arc<dyn AdSdk>,
    host: Arc<dyn PresentationHost>,
    config: BridgeConfig,
    state: Mutex<CoordinatorState>,
    stream: EventStream,
    callbacks_tx: UnboundedSender<TaggedEvent>,
    callbacks_rx: tokio::sync::Mutex<UnboundedReceiver<TaggedEvent>>,
    shutdown: watch::Sender<bool>,
}

/// The bridge between host method calls and the vendor ad SDK.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct AdCoordinator {
    inner: Arc<Inner>,
}

impl AdCoordinator {
    pub fn new(
        sdk: Arc<dyn AdSdk>,
        host: Arc<dyn PresentationHost>,
        config: BridgeConfig,
    ) -> Self {
        let (callbacks_tx, callbacks_rx) = callback_channel();
        let (shutdown, _) = watch::channel(false);
        info!(sdk = sdk.sdk_name(), "ad coordinator created");
        Self {
            inner: Arc::new(Inner {
                sdk,
                host,
                config,
                state: Mutex::new(CoordinatorState::new()),
                stream: EventStream::new(),
                callbacks_tx,
                callbacks_rx: tokio::sync::Mutex::new(callbacks_rx),
                shutdown,
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    // -- Event stream ---------------------------------------------------------

    /// Listen to outbound events. Replaces any earlier subscriber.
    pub fn subscribe(&self) -> EventReceiver {
        self.inner.stream.subscribe()
    }

    pub fn cancel_subscription(&self) {
        self.inner.stream.cancel();
    }

    // -- Initialization -------------------------------------------------------

    /// Kick off the vendor's process-wide initialization.
    ///
    /// Returns as soon as the request is handed to the SDK; `onInitialized`
    /// follows on the event stream.
    #[instrument(skip(self))]
    pub fn initialize(&self, app_id: &str) -> Result<()> {
        let app_id = AppId::new(app_id)?;
        let mut state = self.state();
        let previous = state.init;
        let generation = state.bump();

        self.inner.sdk.set_log_level(self.inner.config.vendor_log_level);
        let sink = self.sink(SlotKey::Sdk, generation);
        // A refused request leaves any earlier in-flight init current.
        if let Err(e) = self.inner.sdk.initialize(&app_id, sink) {
            warn!(error = %e, "SDK initialization could not be started");
            return Err(e);
        }

        // Callbacks are applied under this lock, so none can be judged
        // against the old generation in between.
        state.init_generation = generation;
        if previous != InitState::Ready {
            state.init = InitState::Initializing;
        }
        info!(previous = ?previous, generation, "SDK initialization requested");
        Ok(())
    }

    pub fn init_state(&self) -> InitState {
        self.state().init
    }

    // -- Fullscreen units -----------------------------------------------------

    pub fn load_rewarded(&self, spot_id: &str) -> Result<()> {
        self.load_fullscreen(AdKind::Rewarded, spot_id)
    }

    pub fn load_interstitial(&self, spot_id: &str) -> Result<()> {
        self.load_fullscreen(AdKind::Interstitial, spot_id)
    }

    pub fn show_rewarded(&self) -> Result<()> {
        self.show_fullscreen(AdKind::Rewarded)
    }

    pub fn show_interstitial(&self) -> Result<()> {
        self.show_fullscreen(AdKind::Interstitial)
    }

    /// Current lifecycle state of a fullscreen slot (`Idle` if never loaded).
    pub fn lifecycle(&self, kind: AdKind) -> LifecycleState {
        self.state()
            .fullscreen
            .get(&kind)
            .map(|s| s.status.state)
            .unwrap_or(LifecycleState::Idle)
    }

    #[instrument(skip(self), fields(kind = %kind))]
    fn load_fullscreen(&self, kind: AdKind, spot_id: &str) -> Result<()> {
        let spot_id = SpotId::new(spot_id)?;
        let mut state = self.state();
        if !state.init.accepts_loads() {
            return Err(DtxError::NotInitialized);
        }

        if let Some(mut old) = state.fullscreen.remove(&kind) {
            old.release();
            debug!(spot = %old.spot_id, generation = old.generation, "previous spot destroyed");
        }

        let generation = state.bump();
        let request = self.request(
            spot_id.clone(),
            UnitKind::Fullscreen {
                rewarded: kind == AdKind::Rewarded,
            },
        );
        let sink = self.sink(SlotKey::Fullscreen(kind), generation);
        let handle = self.build_and_fetch(request, sink)?;

        state
            .fullscreen
            .insert(kind, UnitSlot::loading(spot_id.clone(), generation, handle));
        info!(spot = %spot_id, generation, "ad request dispatched");
        Ok(())
    }

    #[instrument(skip(self), fields(kind = %kind))]
    fn show_fullscreen(&self, kind: AdKind) -> Result<()> {
        let context = self
            .inner
            .host
            .current_presentation_context()
            .ok_or(DtxError::NoPresentationContext)?;

        let mut state = self.state();
        let slot = state
            .fullscreen
            .get_mut(&kind)
            .ok_or(DtxError::NotReady(kind))?;
        if slot.status.state != LifecycleState::Loaded || !slot.is_ready() {
            debug!(state = ?slot.status.state, "show refused");
            return Err(DtxError::NotReady(kind));
        }

        let handle = slot.handle.as_mut().ok_or(DtxError::NotReady(kind))?;
        handle.show_fullscreen(&context)?;
        slot.status.state = LifecycleState::Showing;
        slot.updated_at = Utc::now();
        info!(spot = %slot.spot_id, context = %context.name, "ad presented");
        Ok(())
    }

    // -- Banners --------------------------------------------------------------

    /// Create a banner slot bound to `surface` and start loading it. A view id
    /// that is still live is disposed first.
    #[instrument(skip(self, surface), fields(view_id = %surface.view_id))]
    pub(crate) fn open_banner(&self, spot_id: &str, surface: RenderSurface) -> Result<()> {
        let spot_id = SpotId::new(spot_id)?;
        let view_id = surface.view_id;
        let mut state = self.state();
        if !state.init.accepts_loads() {
            return Err(DtxError::NotInitialized);
        }

        if let Some(mut old) = state.banners.remove(&view_id) {
            old.unit.release();
            debug!(spot = %old.unit.spot_id, "replaced banner disposed");
        }

        let generation = state.bump();
        let request = self.request(spot_id.clone(), UnitKind::Inline);
        let sink = self.sink(SlotKey::Banner(view_id), generation);
        let handle = self.build_and_fetch(request, sink)?;

        state.banners.insert(
            view_id,
            BannerSlot {
                unit: UnitSlot::loading(spot_id.clone(), generation, handle),
                surface,
            },
        );
        info!(spot = %spot_id, generation, "banner request dispatched");
        Ok(())
    }

    /// Release a banner's native spot. Returns `false` if there was nothing
    /// to release; calling it again is a no-op.
    #[instrument(skip(self))]
    pub fn dispose_banner(&self, view_id: ViewId) -> bool {
        let removed = self.state().banners.remove(&view_id);
        match removed {
            Some(mut banner) => {
                banner.unit.release();
                info!(spot = %banner.unit.spot_id, "banner disposed");
                true
            }
            None => {
                debug!("banner already disposed");
                false
            }
        }
    }

    pub fn banner_lifecycle(&self, view_id: ViewId) -> Option<LifecycleState> {
        self.state().banners.get(&view_id).map(|b| b.unit.status.state)
    }

    // -- Dispatcher -----------------------------------------------------------

    /// Drain and apply every pending vendor callback on the calling thread.
    ///
    /// Returns the number of callbacks processed; `0` if the async dispatcher
    /// (`run`) currently owns the callback channel.
    pub fn pump(&self) -> usize {
        let Ok(mut rx) = self.inner.callbacks_rx.try_lock() else {
            return 0;
        };
        let mut processed = 0;
        while let Ok(tagged) = rx.try_recv() {
            self.apply(tagged);
            processed += 1;
        }
        processed
    }

    /// Apply vendor callbacks as they arrive until `shutdown` is called.
    /// Shutdown is permanent; a later `run` returns after draining.
    pub async fn run(&self) {
        let mut rx = self.inner.callbacks_rx.lock().await;
        let mut shutdown = self.inner.shutdown.subscribe();
        info!("callback dispatcher running");

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                next = rx.recv() => match next {
                    Some(tagged) => self.apply(tagged),
                    None => break,
                },
            }
        }

        while let Ok(tagged) = rx.try_recv() {
            self.apply(tagged);
        }
        info!("callback dispatcher stopped");
    }

    /// Ask a running `run` loop to finish.
    pub fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);
    }

    fn apply(&self, tagged: TaggedEvent) {
        let TaggedEvent { tag, event } = tagged;
        let emit = {
            let mut guard = self.state();
            let state = &mut *guard;
            if !state.is_current(&tag) {
                state.stale_callbacks += 1;
                debug!(slot = %tag.slot, generation = tag.generation, event = event.name(), "stale callback dropped");
                return;
            }

            match tag.slot {
                SlotKey::Sdk => apply_init(state, &event),
                SlotKey::Fullscreen(kind) => match state.fullscreen.get_mut(&kind) {
                    Some(slot) => apply_unit(kind, slot, &event),
                    None => None,
                },
                SlotKey::Banner(view_id) => match state.banners.get_mut(&view_id) {
                    Some(banner) => apply_banner(banner, &event, self.inner.config.banner_events),
                    None => None,
                },
            }
        };

        if let Some(event) = emit {
            self.inner.stream.emit(event);
        }
    }

    // -- Diagnostics ----------------------------------------------------------

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        let state = self.state();
        let mut units: Vec<UnitSnapshot> = state
            .fullscreen
            .iter()
            .map(|(kind, slot)| UnitSnapshot {
                kind: *kind,
                spot_id: slot.spot_id.clone(),
                state: slot.status.state,
                generation: slot.generation,
                ready: slot.is_ready(),
                rewarded: slot.status.rewarded,
                updated_at: slot.updated_at,
            })
            .collect();
        units.sort_by_key(|u| u.kind.ad_type());

        let banners = state
            .banners
            .iter()
            .map(|(view_id, banner)| BannerSnapshot {
                view_id: *view_id,
                spot_id: banner.unit.spot_id.clone(),
                state: banner.unit.status.state,
                generation: banner.unit.generation,
                updated_at: banner.unit.updated_at,
            })
            .collect();

        CoordinatorSnapshot {
            init_state: state.init,
            units,
            banners,
            stale_callbacks: state.stale_callbacks,
            subscribed: self.inner.stream.has_subscriber(),
            taken_at: Utc::now(),
        }
    }

    // -- Helpers --------------------------------------------------------------

    fn state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.inner.state.lock().expect("coordinator state lock poisoned")
    }

    fn sink(&self, slot: SlotKey, generation: u64) -> CallbackSink {
        CallbackSink::new(CallbackTag { slot, generation }, self.inner.callbacks_tx.clone())
    }

    fn request(&self, spot_id: SpotId, unit: UnitKind) -> AdRequest {
        AdRequest {
            spot_id,
            unit,
            timeout: self.inner.config.request_timeout(),
            mute_video: self.inner.config.mute_video,
        }
    }

    fn build_and_fetch(&self, request: AdRequest, sink: CallbackSink) -> Result<Box<dyn AdSpot>> {
        let spot = request.spot_id.clone();
        let mut handle = self.inner.sdk.create_spot(request, sink).inspect_err(|e| {
            warn!(%spot, error = %e, "ad spot construction failed");
        })?;
        if let Err(e) = handle.fetch() {
            handle.destroy();
            warn!(%spot, error = %e, "ad request could not be issued");
            return Err(match e {
                DtxError::BuildFailure(_) => e,
                other => DtxError::BuildFailure(other.to_string()),
            });
        }
        Ok(handle)
    }
}

fn apply_init(state: &mut CoordinatorState, event: &VendorEvent) -> Option<OutboundEvent> {
    let VendorEvent::InitCompleted { success, message } = event else {
        debug!(event = event.name(), "non-init callback on SDK slot ignored");
        return None;
    };
    if *success {
        state.init = InitState::Ready;
        info!("SDK initialized");
        Some(OutboundEvent::initialized("Success"))
    } else {
        state.init = InitState::Failed;
        let reason = message.as_deref().unwrap_or("Unknown");
        warn!(reason, "SDK initialization failed");
        Some(OutboundEvent::initialized(format!("Failed: {reason}")))
    }
}

fn apply_unit(kind: AdKind, slot: &mut UnitSlot, event: &VendorEvent) -> Option<OutboundEvent> {
    match normalize(kind, slot.status, event) {
        Step::Apply { next, emit } => {
            debug_assert!(
                next.state == slot.status.state || slot.status.state.can_transition_to(next.state),
                "illegal {kind} transition {:?} -> {:?}",
                slot.status.state,
                next.state
            );
            if next.state != slot.status.state {
                info!(kind = %kind, spot = %slot.spot_id, from = ?slot.status.state, to = ?next.state, "ad lifecycle transition");
            }
            slot.status = next;
            slot.updated_at = Utc::now();
            emit
        }
        Step::Ignore(reason) => {
            debug!(kind = %kind, event = event.name(), state = ?slot.status.state, reason, "callback ignored");
            None
        }
    }
}

fn apply_banner(banner: &mut BannerSlot, event: &VendorEvent, forward: bool) -> Option<OutboundEvent> {
    let view_id = banner.surface.view_id;
    let before = banner.unit.status.state;
    let mut emit = apply_unit(AdKind::Banner, &mut banner.unit, event);

    // Binding into the surface is the banner's show.
    if before == LifecycleState::Loading && banner.unit.status.state == LifecycleState::Loaded {
        let bound = match banner.unit.handle.as_mut() {
            Some(handle) => handle.bind_view(&banner.surface),
            None => Err(DtxError::Bridge("banner has no native spot".into())),
        };
        if let Err(e) = bound {
            warn!(%view_id, error = %e, "banner could not be bound to its surface");
            debug_assert!(banner.unit.status.state.can_transition_to(LifecycleState::Failed));
            banner.unit.status.state = LifecycleState::Failed;
            banner.unit.updated_at = Utc::now();
            emit = OutboundEvent::from_failure(&DtxError::ShowFailure(e.to_string()));
        } else {
            info!(%view_id, spot = %banner.unit.spot_id, "banner bound");
        }
    }

    if forward {
        emit.map(|e| e.for_banner(view_id))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use dtexchange_bridge::host::ActivityBinding;
    use dtexchange_bridge::simulated::SimulatedSdk;
    use dtexchange_core::config::VendorLogLevel;
    use dtexchange_core::event::EventType;
    use dtexchange_core::types::{Frame, LoadErrorCode, PresentationContext};

    use super::*;

    struct Harness {
        sdk: SimulatedSdk,
        host: Arc<ActivityBinding>,
        coordinator: AdCoordinator,
        events: EventReceiver,
    }

    impl Harness {
        fn with_config(config: BridgeConfig) -> Self {
            let sdk = SimulatedSdk::new();
            let host = Arc::new(ActivityBinding::attached(PresentationContext::new("MainActivity")));
            let coordinator = AdCoordinator::new(Arc::new(sdk.clone()), host.clone(), config);
            let events = coordinator.subscribe();
            Self {
                sdk,
                host,
                coordinator,
                events,
            }
        }

        fn new() -> Self {
            Self::with_config(BridgeConfig::default())
        }

        /// Initialized and subscribed, with the init event already consumed.
        fn ready() -> Self {
            let mut h = Self::new();
            h.coordinator.initialize("app-123").unwrap();
            h.sdk.complete_init(true, None);
            h.coordinator.pump();
            h.drain();
            h
        }

        fn drain(&mut self) -> Vec<OutboundEvent> {
            self.coordinator.pump();
            std::iter::from_fn(|| self.events.try_recv().ok()).collect()
        }

        fn types(&mut self) -> Vec<EventType> {
            self.drain().into_iter().map(|e| e.event_type).collect()
        }

        fn surface(view_id: i64) -> RenderSurface {
            RenderSurface {
                view_id: ViewId(view_id),
                frame: Frame::default(),
            }
        }
    }

    #[test]
    fn initialize_emits_status_when_vendor_completes() {
        let mut h = Harness::new();
        h.coordinator.initialize("app-123").unwrap();
        assert_eq!(h.coordinator.init_state(), InitState::Initializing);
        assert_eq!(h.sdk.log_level(), Some(VendorLogLevel::Verbose));
        assert!(h.drain().is_empty());

        h.sdk.complete_init(true, None);
        let events = h.drain();
        assert_eq!(events, vec![OutboundEvent::initialized("Success")]);
        assert_eq!(h.coordinator.init_state(), InitState::Ready);
    }

    #[test]
    fn failed_initialization_reports_reason() {
        let mut h = Harness::new();
        h.coordinator.initialize("app-123").unwrap();
        h.sdk.complete_init(false, Some("invalid app id"));
        let events = h.drain();
        assert_eq!(events[0].field("status"), Some("Failed: invalid app id"));
        assert_eq!(h.coordinator.init_state(), InitState::Failed);
        assert!(matches!(
            h.coordinator.load_rewarded("spot"),
            Err(DtxError::NotInitialized)
        ));
    }

    #[test]
    fn reinitializing_when_ready_stays_ready() {
        let h = Harness::ready();
        h.coordinator.initialize("app-123").unwrap();
        assert_eq!(h.coordinator.init_state(), InitState::Ready);
        assert_eq!(h.sdk.init_calls(), 2);
    }

    #[test]
    fn empty_arguments_fail_synchronously_without_events() {
        let mut h = Harness::new();
        assert!(matches!(
            h.coordinator.initialize(""),
            Err(DtxError::MissingArgument("appId"))
        ));
        assert_eq!(h.sdk.init_calls(), 0);

        let mut h2 = Harness::ready();
        assert!(matches!(
            h2.coordinator.load_rewarded(""),
            Err(DtxError::MissingArgument("spotId"))
        ));
        assert!(matches!(
            h2.coordinator.load_interstitial(""),
            Err(DtxError::MissingArgument("spotId"))
        ));
        assert!(h.drain().is_empty());
        assert!(h2.drain().is_empty());
        assert!(h2.sdk.spots().is_empty());
    }

    #[test]
    fn load_before_initialize_is_refused() {
        let h = Harness::new();
        assert!(matches!(
            h.coordinator.load_interstitial("spot"),
            Err(DtxError::NotInitialized)
        ));
    }

    #[test]
    fn loads_accepted_while_initializing() {
        let h = Harness::new();
        h.coordinator.initialize("app").unwrap();
        h.coordinator.load_rewarded("spot-1").unwrap();
        assert_eq!(h.coordinator.lifecycle(AdKind::Rewarded), LifecycleState::Loading);
    }

    #[test]
    fn show_before_load_is_not_ready() {
        let h = Harness::ready();
        assert!(matches!(
            h.coordinator.show_rewarded(),
            Err(DtxError::NotReady(AdKind::Rewarded))
        ));
        assert!(matches!(
            h.coordinator.show_interstitial(),
            Err(DtxError::NotReady(AdKind::Interstitial))
        ));
    }

    #[test]
    fn show_while_loading_fails_fast() {
        let h = Harness::ready();
        h.coordinator.load_interstitial("spot-1").unwrap();
        assert!(matches!(
            h.coordinator.show_interstitial(),
            Err(DtxError::NotReady(AdKind::Interstitial))
        ));
        assert_eq!(h.sdk.spot("spot-1").unwrap().times_shown(), 0);
    }

    #[test]
    fn load_request_carries_config() {
        let h = Harness::with_config(BridgeConfig {
            request_timeout_secs: 20,
            mute_video: true,
            ..Default::default()
        });
        h.coordinator.initialize("app").unwrap();
        h.coordinator.load_rewarded("spot-r").unwrap();

        let spot = h.sdk.spot("spot-r").unwrap();
        let request = spot.request();
        assert_eq!(request.timeout, std::time::Duration::from_secs(20));
        assert!(request.mute_video);
        assert_eq!(request.unit, UnitKind::Fullscreen { rewarded: true });
        assert_eq!(spot.fetches(), 1);
    }

    #[test]
    fn superseded_load_is_discarded() {
        let mut h = Harness::ready();
        h.coordinator.load_rewarded("spot-A").unwrap();
        h.coordinator.load_rewarded("spot-B").unwrap();

        let a = h.sdk.spot("spot-A").unwrap();
        let b = h.sdk.spot("spot-B").unwrap();
        assert!(a.is_destroyed());
        assert_eq!(h.sdk.live_spots(), 1);

        // The old request completes late, then the new one fails.
        a.fill();
        b.fail(LoadErrorCode::NoFill);

        let events = h.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::AdLoadFailed);
        assert_eq!(events[0].field("errorCode"), Some("NO_FILL"));
        assert_eq!(h.coordinator.lifecycle(AdKind::Rewarded), LifecycleState::LoadFailed);
        assert_eq!(h.coordinator.snapshot().stale_callbacks, 1);

        // The late fill did not make the new slot showable.
        assert!(matches!(h.coordinator.show_rewarded(), Err(DtxError::NotReady(_))));
    }

    #[test]
    fn kinds_do_not_supersede_each_other() {
        let mut h = Harness::ready();
        h.coordinator.load_rewarded("spot-R").unwrap();
        h.coordinator.load_interstitial("spot-I").unwrap();
        h.sdk.spot("spot-R").unwrap().fill();
        h.sdk.spot("spot-I").unwrap().fill();

        let events = h.drain();
        let ad_types: Vec<_> = events.iter().filter_map(|e| e.field("adType")).collect();
        assert_eq!(ad_types, ["rewarded", "interstitial"]);
        assert_eq!(h.sdk.live_spots(), 2);
    }

    #[test]
    fn rewarded_display_sequence() {
        let mut h = Harness::ready();
        h.coordinator.load_rewarded("spot-1").unwrap();
        let spot = h.sdk.spot("spot-1").unwrap();
        spot.fill();
        assert_eq!(h.types(), vec![EventType::AdLoaded]);
        assert_eq!(h.coordinator.lifecycle(AdKind::Rewarded), LifecycleState::Loaded);

        h.coordinator.show_rewarded().unwrap();
        assert_eq!(h.coordinator.lifecycle(AdKind::Rewarded), LifecycleState::Showing);

        spot.impression();
        spot.click();
        spot.complete_video();
        spot.complete_video();
        spot.dismiss();
        spot.display_error("late");
        spot.click();

        assert_eq!(
            h.types(),
            vec![
                EventType::AdImpression,
                EventType::AdClicked,
                EventType::AdRewarded,
                EventType::AdDismissed,
            ]
        );
        assert_eq!(h.coordinator.lifecycle(AdKind::Rewarded), LifecycleState::Dismissed);
    }

    #[test]
    fn interstitial_never_rewards() {
        let mut h = Harness::ready();
        h.coordinator.load_interstitial("spot-1").unwrap();
        let spot = h.sdk.spot("spot-1").unwrap();
        spot.fill();
        h.drain();
        h.coordinator.show_interstitial().unwrap();
        spot.complete_video();
        spot.display_error("VIDEO_PLAYER_ERROR");

        let events = h.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::AdShowFailed);
        assert_eq!(events[0].field("error"), Some("VIDEO_PLAYER_ERROR"));
        assert_eq!(h.coordinator.lifecycle(AdKind::Interstitial), LifecycleState::Failed);
    }

    #[test]
    fn consumed_unit_cannot_be_shown_again() {
        let mut h = Harness::ready();
        h.coordinator.load_interstitial("spot-1").unwrap();
        h.sdk.spot("spot-1").unwrap().fill();
        h.drain();
        h.coordinator.show_interstitial().unwrap();

        // Second show while the first is still on screen.
        assert!(matches!(h.coordinator.show_interstitial(), Err(DtxError::NotReady(_))));

        h.sdk.spot("spot-1").unwrap().dismiss();
        h.drain();
        assert!(matches!(h.coordinator.show_interstitial(), Err(DtxError::NotReady(_))));
        assert_eq!(h.sdk.spot("spot-1").unwrap().times_shown(), 1);
    }

    #[test]
    fn no_presentation_context_wins_over_load_state() {
        let mut h = Harness::ready();
        h.host.detach();
        assert!(matches!(
            h.coordinator.show_interstitial(),
            Err(DtxError::NoPresentationContext)
        ));

        h.coordinator.load_interstitial("spot-1").unwrap();
        h.sdk.spot("spot-1").unwrap().fill();
        h.drain();
        assert!(matches!(
            h.coordinator.show_interstitial(),
            Err(DtxError::NoPresentationContext)
        ));
        assert_eq!(h.coordinator.lifecycle(AdKind::Interstitial), LifecycleState::Loaded);

        h.host.attach(PresentationContext::new("MainActivity"));
        h.coordinator.show_interstitial().unwrap();
    }

    #[test]
    fn build_failure_is_returned_and_slot_left_empty() {
        let mut h = Harness::ready();
        h.coordinator.load_rewarded("spot-1").unwrap();
        h.sdk.fail_next_build("unit controller unavailable");

        let err = h.coordinator.load_rewarded("spot-2").unwrap_err();
        assert!(matches!(err, DtxError::BuildFailure(_)));
        assert_eq!(err.code(), "BUILD_ERROR");
        assert_eq!(h.coordinator.lifecycle(AdKind::Rewarded), LifecycleState::Idle);
        assert!(h.sdk.spot("spot-1").unwrap().is_destroyed());

        h.sdk.spot("spot-1").unwrap().fill();
        assert!(h.drain().is_empty());
    }

    #[test]
    fn load_failure_is_terminal_until_reload() {
        let mut h = Harness::ready();
        h.coordinator.load_interstitial("spot-1").unwrap();
        h.sdk.spot("spot-1").unwrap().fail(LoadErrorCode::ConnectionError);
        assert_eq!(h.types(), vec![EventType::AdLoadFailed]);
        assert_eq!(h.sdk.spots().len(), 1);

        h.coordinator.load_interstitial("spot-1").unwrap();
        assert_eq!(h.sdk.spots().len(), 2);
        h.sdk.spot("spot-1").unwrap().fill();
        assert_eq!(h.types(), vec![EventType::AdLoaded]);
    }

    #[test]
    fn callbacks_from_other_threads_arrive_in_order() {
        let mut h = Harness::ready();
        h.coordinator.load_rewarded("spot-1").unwrap();
        let spot = h.sdk.spot("spot-1").unwrap();
        spot.fill();
        h.drain();
        h.coordinator.show_rewarded().unwrap();

        let worker = std::thread::spawn(move || {
            spot.impression();
            spot.complete_video();
            spot.dismiss();
        });
        worker.join().unwrap();

        assert_eq!(
            h.types(),
            vec![EventType::AdImpression, EventType::AdRewarded, EventType::AdDismissed]
        );
    }

    #[test]
    fn banner_binds_on_fill_without_events_by_default() {
        let mut h = Harness::ready();
        h.coordinator.open_banner("banner-spot", Harness::surface(3)).unwrap();
        assert_eq!(h.coordinator.banner_lifecycle(ViewId(3)), Some(LifecycleState::Loading));

        let spot = h.sdk.spot("banner-spot").unwrap();
        assert_eq!(spot.request().unit, UnitKind::Inline);
        spot.fill();
        spot.impression();
        assert!(h.drain().is_empty());
        assert_eq!(spot.bound_to(), Some(ViewId(3)));
        assert_eq!(h.coordinator.banner_lifecycle(ViewId(3)), Some(LifecycleState::Loaded));
    }

    #[test]
    fn banner_events_forwarded_when_enabled() {
        let mut h = Harness::with_config(BridgeConfig {
            banner_events: true,
            ..Default::default()
        });
        h.coordinator.initialize("app").unwrap();
        h.coordinator.open_banner("banner-spot", Harness::surface(9)).unwrap();
        let spot = h.sdk.spot("banner-spot").unwrap();
        spot.fill();
        spot.click();

        let events = h.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::AdLoaded);
        assert_eq!(events[0].field("adType"), Some("banner"));
        assert_eq!(events[0].payload.get("viewId"), Some(&serde_json::json!(9)));
        assert_eq!(events[1].event_type, EventType::AdClicked);
    }

    #[test]
    fn dispose_twice_is_a_no_op() {
        let mut h = Harness::ready();
        h.coordinator.open_banner("banner-spot", Harness::surface(1)).unwrap();
        let spot = h.sdk.spot("banner-spot").unwrap();

        assert!(h.coordinator.dispose_banner(ViewId(1)));
        assert!(!h.coordinator.dispose_banner(ViewId(1)));
        assert!(spot.is_destroyed());
        assert_eq!(h.coordinator.banner_lifecycle(ViewId(1)), None);

        // A load that completes after disposal changes nothing.
        spot.fill();
        assert!(h.drain().is_empty());
        assert_eq!(spot.bound_to(), None);
    }

    #[test]
    fn reopening_a_view_replaces_the_banner() {
        let h = Harness::ready();
        h.coordinator.open_banner("first", Harness::surface(5)).unwrap();
        h.coordinator.open_banner("second", Harness::surface(5)).unwrap();
        assert!(h.sdk.spot("first").unwrap().is_destroyed());

        h.sdk.spot("first").unwrap().fill();
        h.coordinator.pump();
        assert_eq!(h.coordinator.banner_lifecycle(ViewId(5)), Some(LifecycleState::Loading));
        assert_eq!(h.coordinator.snapshot().stale_callbacks, 1);
    }

    /// Accepts the first `initialize` and refuses every later one.
    struct RefusesReinit {
        inner: SimulatedSdk,
        calls: std::sync::atomic::AtomicU32,
    }

    impl AdSdk for RefusesReinit {
        fn sdk_name(&self) -> &str {
            "refuses-reinit"
        }

        fn set_log_level(&self, level: VendorLogLevel) {
            self.inner.set_log_level(level);
        }

        fn initialize(&self, app_id: &AppId, sink: CallbackSink) -> Result<()> {
            if self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) > 0 {
                return Err(DtxError::Bridge("busy".into()));
            }
            self.inner.initialize(app_id, sink)
        }

        fn create_spot(&self, request: AdRequest, sink: CallbackSink) -> Result<Box<dyn AdSpot>> {
            self.inner.create_spot(request, sink)
        }
    }

    #[test]
    fn refused_reinitialize_keeps_pending_init_current() {
        let sim = SimulatedSdk::new();
        let coordinator = AdCoordinator::new(
            Arc::new(RefusesReinit {
                inner: sim.clone(),
                calls: std::sync::atomic::AtomicU32::new(0),
            }),
            Arc::new(ActivityBinding::new()),
            BridgeConfig::default(),
        );
        let mut events = coordinator.subscribe();

        coordinator.initialize("app").unwrap();
        assert!(matches!(coordinator.initialize("app"), Err(DtxError::Bridge(_))));
        assert_eq!(coordinator.init_state(), InitState::Initializing);

        // The first request completes after the second was refused.
        sim.complete_init(true, None);
        assert_eq!(coordinator.pump(), 1);
        assert_eq!(coordinator.init_state(), InitState::Ready);
        assert_eq!(events.try_recv().unwrap(), OutboundEvent::initialized("Success"));
        assert_eq!(coordinator.snapshot().stale_callbacks, 0);
    }

    #[test]
    fn banner_bind_failure_fails_the_banner() {
        let mut h = Harness::with_config(BridgeConfig {
            banner_events: true,
            ..Default::default()
        });
        h.coordinator.initialize("app").unwrap();
        h.coordinator.open_banner("banner-spot", Harness::surface(4)).unwrap();
        h.sdk.fail_next_bind("surface detached");

        let spot = h.sdk.spot("banner-spot").unwrap();
        spot.fill();
        spot.impression();

        let events = h.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::AdShowFailed);
        assert_eq!(events[0].field("adType"), Some("banner"));
        assert_eq!(events[0].payload.get("viewId"), Some(&serde_json::json!(4)));
        assert_eq!(
            events[0].field("error"),
            Some("platform bridge error: surface detached")
        );
        assert_eq!(h.coordinator.banner_lifecycle(ViewId(4)), Some(LifecycleState::Failed));
        assert_eq!(spot.bound_to(), None);
    }

    #[test]
    fn bound_banner_display_error_is_terminal() {
        let mut h = Harness::with_config(BridgeConfig {
            banner_events: true,
            ..Default::default()
        });
        h.coordinator.initialize("app").unwrap();
        h.coordinator.open_banner("banner-spot", Harness::surface(6)).unwrap();
        let spot = h.sdk.spot("banner-spot").unwrap();
        spot.fill();
        spot.display_error("render failed");
        spot.click();

        let events = h.drain();
        let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(types, vec![EventType::AdLoaded, EventType::AdShowFailed]);
        assert_eq!(events[1].field("error"), Some("render failed"));
        assert_eq!(events[1].payload.get("viewId"), Some(&serde_json::json!(6)));
        assert_eq!(h.coordinator.banner_lifecycle(ViewId(6)), Some(LifecycleState::Failed));
    }

    #[cfg(not(any(target_os = "ios", target_os = "android")))]
    #[test]
    fn stub_sdk_reports_platform_unavailable() {
        let coordinator = AdCoordinator::new(
            dtexchange_bridge::default_sdk(),
            Arc::new(ActivityBinding::new()),
            BridgeConfig::default(),
        );
        assert!(matches!(
            coordinator.initialize("app"),
            Err(DtxError::PlatformUnavailable)
        ));
        assert_eq!(coordinator.init_state(), InitState::NotInitialized);
    }

    #[test]
    fn snapshot_reflects_slots() {
        let h = Harness::ready();
        h.coordinator.load_rewarded("spot-r").unwrap();
        h.coordinator.load_interstitial("spot-i").unwrap();
        h.sdk.spot("spot-i").unwrap().fill();
        h.coordinator.open_banner("spot-b", Harness::surface(2)).unwrap();
        h.coordinator.pump();

        let snap = h.coordinator.snapshot();
        assert_eq!(snap.init_state, InitState::Ready);
        assert!(snap.subscribed);
        assert_eq!(snap.units.len(), 2);
        assert_eq!(snap.units[0].kind, AdKind::Interstitial);
        assert!(snap.units[0].ready);
        assert_eq!(snap.units[1].state, LifecycleState::Loading);
        assert_eq!(snap.banners.len(), 1);
        assert_eq!(snap.banners[0].view_id, ViewId(2));
    }

    #[test]
    fn unsubscribed_events_are_dropped() {
        let mut h = Harness::ready();
        h.coordinator.cancel_subscription();
        h.coordinator.load_rewarded("spot-1").unwrap();
        h.sdk.spot("spot-1").unwrap().fill();
        assert_eq!(h.coordinator.pump(), 1);

        let mut fresh = h.coordinator.subscribe();
        assert!(fresh.try_recv().is_err());
        assert!(h.drain().is_empty());
        assert_eq!(h.coordinator.lifecycle(AdKind::Rewarded), LifecycleState::Loaded);
    }

    #[tokio::test]
    async fn run_loop_dispatches_until_shutdown() {
        let sdk = SimulatedSdk::new();
        let coordinator = AdCoordinator::new(
            Arc::new(sdk.clone()),
            Arc::new(ActivityBinding::attached(PresentationContext::new("root"))),
            BridgeConfig::default(),
        );
        let mut events = coordinator.subscribe();
        let dispatcher = {
            let c = coordinator.clone();
            tokio::spawn(async move { c.run().await })
        };

        coordinator.initialize("app").unwrap();
        sdk.complete_init(true, None);
        let first = events.recv().await.unwrap();
        assert_eq!(first.event_type, EventType::Initialized);

        coordinator.load_interstitial("spot").unwrap();
        let spot = sdk.spot("spot").unwrap();
        std::thread::spawn(move || spot.fill()).join().unwrap();
        let loaded = events.recv().await.unwrap();
        assert_eq!(loaded.event_type, EventType::AdLoaded);

        // While `run` owns the channel, `pump` backs off.
        assert_eq!(coordinator.pump(), 0);

        coordinator.shutdown();
        dispatcher.await.unwrap();
    }
}
