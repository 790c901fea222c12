// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DT Exchange bridge: core types, outbound event schema, errors and
// configuration shared across all crates.

pub mod config;
pub mod error;
pub mod event;
pub mod types;

pub use config::{BridgeConfig, VendorLogLevel};
pub use error::{Delivery, DtxError};
pub use event::{EventType, OutboundEvent};
pub use types::*;
