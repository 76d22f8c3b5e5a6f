//! Events produced by the engine and the notification value that drives it.

use crate::keyboard::KeyEvent;
use crate::mouse::MousePacket;

/// Everything the engine hands to its consumer, dispatched by pattern
/// matching rather than by bit-testing an opaque origin mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Mouse(MousePacket),
}

/// A hardware wakeup delivered by the external notification channel.
///
/// The bitmask carries one bit per subscribed hook; the engine tests it
/// against each session's [`crate::session::HookId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub bitmask: u32,
}

impl Notification {
    pub fn new(bitmask: u32) -> Self {
        Self { bitmask }
    }
}
