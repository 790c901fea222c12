// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Vendor callback → lifecycle transition + outbound event.
//
// Pure mapping, no I/O. The dispatcher feeds it the current status of the
// slot a callback belongs to and applies whatever it returns.

use dtexchange_bridge::events::VendorEvent;
use dtexchange_core::error::DtxError;
use dtexchange_core::event::OutboundEvent;
use dtexchange_core::types::{AdKind, LifecycleState};

/// What the dispatcher tracks per ad unit instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitStatus {
    pub state: LifecycleState,
    /// The reward event has already been emitted for this display.
    pub rewarded: bool,
}

impl UnitStatus {
    pub fn loading() -> Self {
        Self {
            state: LifecycleState::Loading,
            rewarded: false,
        }
    }

    fn with_state(self, state: LifecycleState) -> Self {
        Self { state, ..self }
    }
}

/// Result of feeding one callback through the mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Apply {
        next: UnitStatus,
        emit: Option<OutboundEvent>,
    },
    /// Callback does not apply in the current state.
    Ignore(&'static str),
}

fn apply(next: UnitStatus, emit: OutboundEvent) -> Step {
    Step::Apply {
        next,
        emit: Some(emit),
    }
}

/// Vendor failures travel as streamed errors.
fn fail(next: UnitStatus, err: DtxError) -> Step {
    Step::Apply {
        next,
        emit: OutboundEvent::from_failure(&err),
    }
}

pub fn normalize(kind: AdKind, status: UnitStatus, event: &VendorEvent) -> Step {
    use LifecycleState::*;

    if status.state.is_terminal() {
        return Step::Ignore("instance already finished");
    }

    match event {
        VendorEvent::RequestSucceeded => match status.state {
            Loading => apply(status.with_state(Loaded), OutboundEvent::ad_loaded(kind)),
            _ => Step::Ignore("fill outside of loading"),
        },
        VendorEvent::RequestFailed { code, .. } => match status.state {
            Loading => fail(
                status.with_state(LoadFailed),
                DtxError::LoadFailure {
                    kind,
                    code: code.clone(),
                },
            ),
            _ => Step::Ignore("load failure outside of loading"),
        },
        VendorEvent::Impression if is_displaying(kind, status.state) => {
            apply(status, OutboundEvent::ad_impression())
        }
        VendorEvent::Clicked if is_displaying(kind, status.state) => {
            apply(status, OutboundEvent::ad_clicked())
        }
        VendorEvent::Impression | VendorEvent::Clicked => Step::Ignore("unit is not on screen"),
        VendorEvent::RewardCompleted => {
            if kind != AdKind::Rewarded {
                Step::Ignore("reward on non-rewarded unit")
            } else if status.state != Showing {
                Step::Ignore("reward outside of display")
            } else if status.rewarded {
                Step::Ignore("reward already granted")
            } else {
                apply(
                    UnitStatus {
                        rewarded: true,
                        ..status
                    },
                    OutboundEvent::ad_rewarded(),
                )
            }
        }
        VendorEvent::Dismissed => match (kind.is_fullscreen(), status.state) {
            (true, Showing) => apply(status.with_state(Dismissed), OutboundEvent::ad_dismissed()),
            _ => Step::Ignore("dismiss outside of display"),
        },
        VendorEvent::DisplayError { message } => match (kind.is_fullscreen(), status.state) {
            (true, Showing) | (false, Loaded) => fail(
                status.with_state(Failed),
                DtxError::ShowFailure(message.clone()),
            ),
            _ => Step::Ignore("display error outside of display"),
        },
        VendorEvent::InitCompleted { .. } => Step::Ignore("init callback on an ad slot"),
        VendorEvent::WillOpenExternalApp
        | VendorEvent::WillCloseInternalBrowser
        | VendorEvent::VideoProgress { .. }
        | VendorEvent::VideoInterrupted { .. }
        | VendorEvent::Expanded
        | VendorEvent::Resized
        | VendorEvent::Collapsed => Step::Ignore("informational"),
    }
}

/// Fullscreen units are on screen while `Showing`; a bound banner is on
/// screen from the moment it is `Loaded`.
fn is_displaying(kind: AdKind, state: LifecycleState) -> bool {
    if kind.is_fullscreen() {
        state == LifecycleState::Showing
    } else {
        state == LifecycleState::Loaded
    }
}
