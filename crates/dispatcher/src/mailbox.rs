//! FrameMailbox - single-slot, latest-frame-wins handoff
//!
//! The capture worker publishes from a plain thread; the dispatcher awaits on
//! the async side. Publishing never blocks and never fails: an unread frame is
//! simply replaced by the newer one.

use std::sync::Arc;

use contracts::RenderedFrame;
use tokio::sync::watch;

/// Create a connected publisher/subscriber pair
pub fn frame_mailbox() -> (FramePublisher, FrameSubscriber) {
    let (tx, rx) = watch::channel(None);
    (FramePublisher { tx }, FrameSubscriber { rx })
}

/// Producer half, owned by the capture worker
#[derive(Debug)]
pub struct FramePublisher {
    tx: watch::Sender<Option<Arc<RenderedFrame>>>,
}

impl FramePublisher {
    /// Replace the slot content; works with or without a subscriber
    pub fn publish(&self, frame: RenderedFrame) {
        self.tx.send_replace(Some(Arc::new(frame)));
    }

    /// Whether a subscriber is still attached
    pub fn has_subscriber(&self) -> bool {
        self.tx.receiver_count() > 0
    }
}

/// Consumer half
#[derive(Debug, Clone)]
pub struct FrameSubscriber {
    rx: watch::Receiver<Option<Arc<RenderedFrame>>>,
}

impl FrameSubscriber {
    /// Wait for a frame newer than the last one returned
    ///
    /// Returns `None` once the publisher is gone and the last frame was seen.
    pub async fn next(&mut self) -> Option<Arc<RenderedFrame>> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(frame) = self.rx.borrow_and_update().clone() {
                return Some(frame);
            }
        }
    }

    /// Most recent frame, seen or not
    pub fn latest(&self) -> Option<Arc<RenderedFrame>> {
        self.rx.borrow().clone()
    }
}
