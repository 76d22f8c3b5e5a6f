//! The notification-driven pump tying the pieces together.
//!
//! An external blocking receive (out of scope here) wakes the caller with a
//! [`Notification`]; the engine tests the bitmask against its sessions'
//! hooks, drains one byte per signalled device, routes it to the scancode
//! decoder or the packet framer, and hands back whatever events that
//! produced. All outbound traffic (LEDs, sample rates, mode switches) goes
//! through the [`Controller`] handle.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Result;
use crate::event::{InputEvent, Notification};
use crate::io::{Controller, PortIo, RetryPolicy};
use crate::keyboard::ScancodeDecoder;
use crate::mouse::{PacketFramer, ProtocolMode};
use crate::session::{DeviceSession, InterruptBus, PeripheralKind};

/// Protocol engine for the two devices behind one controller.
///
/// Single logical thread of control: decoder and framer state is only ever
/// advanced by the thread holding the engine, and all operations execute
/// synchronously with bounded retry delays as the only suspension points.
pub struct Engine<P: PortIo, B: InterruptBus> {
    controller: Rc<RefCell<Controller<P>>>,
    bus: Rc<RefCell<B>>,
    decoder: ScancodeDecoder,
    framer: PacketFramer,
    keyboard: Option<DeviceSession<P, B>>,
    mouse: Option<DeviceSession<P, B>>,
}

impl<P: PortIo, B: InterruptBus> Engine<P, B> {
    pub fn new(ports: P, bus: B) -> Self {
        Self::with_policy(ports, bus, RetryPolicy::default())
    }

    pub fn with_policy(ports: P, bus: B, policy: RetryPolicy) -> Self {
        Self {
            controller: Rc::new(RefCell::new(Controller::with_policy(ports, policy))),
            bus: Rc::new(RefCell::new(bus)),
            decoder: ScancodeDecoder::new(),
            framer: PacketFramer::new(ProtocolMode::Basic),
            keyboard: None,
            mouse: None,
        }
    }

    /// Shared handle for issuing outbound commands (LEDs, sample rate, mode
    /// switches) and for session-independent controller access.
    pub fn controller(&self) -> Rc<RefCell<Controller<P>>> {
        Rc::clone(&self.controller)
    }

    /// Shared handle to the notification system the sessions register with.
    pub fn bus(&self) -> Rc<RefCell<B>> {
        Rc::clone(&self.bus)
    }

    /// Subscribes the keyboard and starts a fresh decode stream.
    pub fn open_keyboard(&mut self) -> Result<()> {
        let session = DeviceSession::subscribe(
            Rc::clone(&self.controller),
            Rc::clone(&self.bus),
            PeripheralKind::Keyboard,
        )?;
        self.decoder.reset();
        self.keyboard = Some(session);
        Ok(())
    }

    /// Subscribes the mouse, enables data reporting, and starts a framer in
    /// the given (previously negotiated) mode.
    ///
    /// The first byte after subscribing is discarded before framing begins;
    /// a stale acknowledgement or break code from session startup is
    /// sometimes still queued.
    pub fn open_mouse(&mut self, mode: ProtocolMode) -> Result<()> {
        let mut session = DeviceSession::subscribe(
            Rc::clone(&self.controller),
            Rc::clone(&self.bus),
            PeripheralKind::Mouse,
        )?;
        session.enable_scanning()?;
        self.framer = PacketFramer::new(mode);
        self.framer.discard_next();
        self.mouse = Some(session);
        Ok(())
    }

    /// Tears the keyboard session down, recovering the controller and
    /// clearing decoder state so a trailing extended prefix cannot leak into
    /// a later session.
    pub fn close_keyboard(&mut self) {
        if let Some(mut session) = self.keyboard.take() {
            session.reset();
        }
        self.decoder.reset();
    }

    /// Tears the mouse session down and resets framing.
    pub fn close_mouse(&mut self) {
        if let Some(mut session) = self.mouse.take() {
            session.reset();
        }
        self.framer.reset();
    }

    pub fn keyboard_session(&mut self) -> Option<&mut DeviceSession<P, B>> {
        self.keyboard.as_mut()
    }

    pub fn mouse_session(&mut self) -> Option<&mut DeviceSession<P, B>> {
        self.mouse.as_mut()
    }

    /// Handles one hardware wakeup.
    ///
    /// Reads one byte per signalled device, in keyboard-then-mouse order,
    /// and returns the events produced — possibly none for a prefix byte,
    /// a partial packet, or discarded garbage. Errors surface to the caller,
    /// who is expected to close the affected session (which runs recovery).
    pub fn handle_notification(&mut self, notification: Notification) -> Result<Vec<InputEvent>> {
        let mut events = Vec::new();

        let kbd_signalled = self
            .keyboard
            .as_ref()
            .and_then(|s| s.hook())
            .is_some_and(|hook| hook.matches(notification.bitmask));
        if kbd_signalled {
            // Validated read: a scancode with a parity/timeout flag must not
            // reach the decoder.
            let byte = self.controller.borrow_mut().read_byte()?;
            if let Some(event) = self.decoder.feed(byte) {
                events.push(InputEvent::Key(event));
            }
        }

        let mouse_signalled = self
            .mouse
            .as_ref()
            .and_then(|s| s.hook())
            .is_some_and(|hook| hook.matches(notification.bitmask));
        if mouse_signalled {
            // Straight data-port read; the framer's sync heuristic owns
            // garbage handling on this path.
            let byte = self.controller.borrow_mut().read_data()?;
            if let Some(packet) = self.framer.feed(byte) {
                events.push(InputEvent::Mouse(packet));
            }
        }

        Ok(events)
    }
}
