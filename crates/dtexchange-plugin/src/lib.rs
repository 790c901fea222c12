// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! DT Exchange: ad unit lifecycle coordinator.
//!
//! Turns host method calls into vendor SDK calls and folds vendor callbacks,
//! from whatever thread raises them, into one ordered stream of normalized
//! events. Callbacks from superseded or disposed ad spots are dropped.

pub mod banner;
pub mod coordinator;
pub mod method;
pub mod normalize;
pub mod snapshot;
pub mod stream;

pub use banner::{BannerParams, BannerView};
pub use coordinator::AdCoordinator;
pub use method::{MethodCall, MethodError, handle_method_call};
pub use snapshot::{BannerSnapshot, CoordinatorSnapshot, UnitSnapshot};
pub use stream::{EventReceiver, EventStream};
