// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Foreground presentation context tracking.
//
// The host embedding layer attaches and detaches the foreground context as
// its activity / view-controller lifecycle changes (including configuration
// changes, which detach and reattach).

use std::sync::Mutex;

use dtexchange_core::types::PresentationContext;
use tracing::debug;

use crate::traits::PresentationHost;

/// `PresentationHost` backed by an explicitly attached context.
#[derive(Debug, Default)]
pub struct ActivityBinding {
    current: Mutex<Option<PresentationContext>>,
}

impl ActivityBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// A binding that starts attached to `context`.
    pub fn attached(context: PresentationContext) -> Self {
        Self {
            current: Mutex::new(Some(context)),
        }
    }

    pub fn attach(&self, context: PresentationContext) {
        debug!(context = %context.name, "presentation context attached");
        *self.current.lock().expect("activity lock poisoned") = Some(context);
    }

    pub fn detach(&self) {
        if self.current.lock().expect("activity lock poisoned").take().is_some() {
            debug!("presentation context detached");
        }
    }
}

impl PresentationHost for ActivityBinding {
    fn current_presentation_context(&self) -> Option<PresentationContext> {
        self.current.lock().expect("activity lock poisoned").clone()
    }
}
