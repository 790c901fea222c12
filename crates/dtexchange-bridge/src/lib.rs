// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! DT Exchange: vendor ad SDK collaborator abstractions.
//!
//! Defines the traits a native binding (Inneractive on Android, IASDKCore on
//! iOS) implements, the single `VendorEvent` union its callbacks are folded
//! into, and two in-tree implementations: a stub for desktop/CI builds and a
//! scriptable simulation for tests and demos.

pub mod events;
pub mod host;
pub mod simulated;
#[cfg(not(any(target_os = "ios", target_os = "android")))]
pub mod stub;
pub mod traits;

pub use events::{CallbackSink, CallbackTag, SlotKey, TaggedEvent, VendorEvent, callback_channel};
pub use host::ActivityBinding;
pub use simulated::{SimulatedSdk, SimulatedSpotHandle};
#[cfg(not(any(target_os = "ios", target_os = "android")))]
pub use stub::StubSdk;
pub use traits::{AdRequest, AdSdk, AdSpot, PresentationHost, UnitKind};

/// The SDK to use when the host has not injected a native binding.
///
/// Desktop and CI builds have no vendor library, so every call reports
/// `PlatformUnavailable`.
#[cfg(not(any(target_os = "ios", target_os = "android")))]
pub fn default_sdk() -> std::sync::Arc<dyn AdSdk> {
    std::sync::Arc::new(stub::StubSdk)
}
