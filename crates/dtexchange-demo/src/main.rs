// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DT Exchange bridge demo.
//
// Drives one scripted ad session through the method router against the
// simulated SDK and prints every outbound event as a JSON line on stdout.
// Logs go to stderr. An optional first argument names a JSON config file.

mod script;

use std::sync::Arc;

use dtexchange_bridge::host::ActivityBinding;
use dtexchange_bridge::simulated::SimulatedSdk;
use dtexchange_core::config::BridgeConfig;
use dtexchange_core::error::Result;
use dtexchange_core::types::{AdKind, PresentationContext};
use dtexchange_plugin::AdCoordinator;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        error!(code = e.code(), "demo session failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };
    info!(
        method_channel = %config.method_channel,
        event_channel = %config.event_channel,
        banner_events = config.banner_events,
        "DT Exchange demo starting"
    );

    let sdk = SimulatedSdk::new();
    let host = Arc::new(ActivityBinding::attached(PresentationContext::new("DemoActivity")));
    let coordinator = AdCoordinator::new(Arc::new(sdk.clone()), host.clone(), config);

    let events = coordinator.subscribe();
    let dispatcher = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.run().await })
    };

    let outcome = script::Session::new(coordinator.clone(), sdk, host, events)
        .play()
        .await;

    coordinator.shutdown();
    if let Err(e) = dispatcher.await {
        error!("dispatcher task panicked: {e}");
    }

    let snapshot = coordinator.snapshot();
    info!(
        init = ?snapshot.init_state,
        rewarded = ?snapshot.unit(AdKind::Rewarded).map(|u| u.state),
        interstitial = ?snapshot.unit(AdKind::Interstitial).map(|u| u.state),
        stale_callbacks = snapshot.stale_callbacks,
        "session finished"
    );
    eprintln!("{}", snapshot.to_json()?);
    outcome
}
