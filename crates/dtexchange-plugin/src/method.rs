// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host method-call routing.
//
// The host framework sends `{method, arguments}` over the method channel.
// Every call either returns `true` or a `{code, message}` failure; load and
// show outcomes arrive later on the event stream.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use dtexchange_core::error::DtxError;

use crate::coordinator::AdCoordinator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// Failure reported back across the method channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodError {
    pub code: String,
    pub message: String,
}

impl From<DtxError> for MethodError {
    fn from(err: DtxError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for MethodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for MethodError {}

/// String argument `key`, or `""` when absent or null. Emptiness is
/// rejected downstream as a missing argument.
fn string_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str, DtxError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(""),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(DtxError::InvalidArguments(format!(
            "{key} must be a string, got {other}"
        ))),
    }
}

fn route(coordinator: &AdCoordinator, call: &MethodCall) -> dtexchange_core::error::Result<()> {
    let args = &call.arguments;
    match call.method.as_str() {
        "initialize" => coordinator.initialize(string_arg(args, "appId")?),
        "loadRewardedVideo" => coordinator.load_rewarded(string_arg(args, "spotId")?),
        "showRewardedVideo" => coordinator.show_rewarded(),
        "loadInterstitial" => coordinator.load_interstitial(string_arg(args, "spotId")?),
        "showInterstitial" => coordinator.show_interstitial(),
        other => Err(DtxError::NotImplemented(other.to_string())),
    }
}

#[instrument(skip_all, fields(method = %call.method))]
pub fn handle_method_call(coordinator: &AdCoordinator, call: &MethodCall) -> Result<Value, MethodError> {
    match route(coordinator, call) {
        Ok(()) => {
            debug!("method call succeeded");
            Ok(json!(true))
        }
        Err(e) => {
            warn!(code = e.code(), error = %e, "method call failed");
            Err(e.into())
        }
    }
}
