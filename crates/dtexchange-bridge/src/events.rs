// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Vendor callback union and the tagged sink vendor bindings deliver into.
//
// The vendor library spreads its callbacks over several delegate/listener
// protocols (request, unit, fullscreen events, view events, video content,
// reward). Bindings fold all of them into `VendorEvent` and push them through
// a `CallbackSink`, which stamps each event with the slot and generation of
// the handle that produced it.

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use dtexchange_core::types::{AdKind, LoadErrorCode, ViewId};

/// Which coordinator slot a callback belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKey {
    /// Process-wide SDK initialization.
    Sdk,
    /// The single rewarded or interstitial slot.
    Fullscreen(AdKind),
    /// One embedded banner view.
    Banner(ViewId),
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sdk => f.write_str("sdk"),
            Self::Fullscreen(kind) => write!(f, "{kind}"),
            Self::Banner(view_id) => write!(f, "banner#{view_id}"),
        }
    }
}

/// Identifies the handle a callback came from. A slot's generation is bumped
/// every time its handle is replaced or released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackTag {
    pub slot: SlotKey,
    pub generation: u64,
}

/// Every callback the vendor SDK can raise, across all delegate shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum VendorEvent {
    /// Process-wide initializer finished.
    InitCompleted { success: bool, message: Option<String> },
    /// Request listener: a fill was obtained.
    RequestSucceeded,
    /// Request listener: no fill, network error or timeout.
    RequestFailed { code: LoadErrorCode, message: Option<String> },
    Impression,
    Clicked,
    WillOpenExternalApp,
    WillCloseInternalBrowser,
    /// The unit entered an error state while presenting.
    DisplayError { message: String },
    Dismissed,
    /// Video content reached the reward-eligible point.
    RewardCompleted,
    VideoProgress { current_secs: f64, total_secs: f64 },
    VideoInterrupted { message: String },
    Expanded,
    Resized,
    Collapsed,
}

impl VendorEvent {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitCompleted { .. } => "init_completed",
            Self::RequestSucceeded => "request_succeeded",
            Self::RequestFailed { .. } => "request_failed",
            Self::Impression => "impression",
            Self::Clicked => "clicked",
            Self::WillOpenExternalApp => "will_open_external_app",
            Self::WillCloseInternalBrowser => "will_close_internal_browser",
            Self::DisplayError { .. } => "display_error",
            Self::Dismissed => "dismissed",
            Self::RewardCompleted => "reward_completed",
            Self::VideoProgress { .. } => "video_progress",
            Self::VideoInterrupted { .. } => "video_interrupted",
            Self::Expanded => "expanded",
            Self::Resized => "resized",
            Self::Collapsed => "collapsed",
        }
    }
}

/// A vendor callback together with the handle it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedEvent {
    pub tag: CallbackTag,
    pub event: VendorEvent,
}

/// Cloneable, thread-safe delivery point handed to vendor bindings.
///
/// Delivery never blocks and may happen from any thread; ordering per sender
/// is preserved by the underlying channel.
#[derive(Debug, Clone)]
pub struct CallbackSink {
    tag: CallbackTag,
    tx: UnboundedSender<TaggedEvent>,
}

impl CallbackSink {
    pub fn new(tag: CallbackTag, tx: UnboundedSender<TaggedEvent>) -> Self {
        Self { tag, tx }
    }

    pub fn tag(&self) -> CallbackTag {
        self.tag
    }

    /// Push a callback. Returns `false` once the dispatcher is gone.
    pub fn deliver(&self, event: VendorEvent) -> bool {
        let name = event.name();
        let sent = self
            .tx
            .send(TaggedEvent {
                tag: self.tag,
                event,
            })
            .is_ok();
        if !sent {
            tracing::debug!(slot = %self.tag.slot, event = name, "dispatcher closed, callback dropped");
        }
        sent
    }
}

/// Create the channel every sink of one coordinator feeds.
pub fn callback_channel() -> (UnboundedSender<TaggedEvent>, UnboundedReceiver<TaggedEvent>) {
    unbounded_channel()
}
