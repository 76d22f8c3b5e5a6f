//! Device session management: hook ownership and the recovery path.
//!
//! A session owns a device's interrupt hook for the lifetime of whatever
//! needs hardware events, and knows how to put the controller back into a
//! known-good state afterwards. Recovery is strictly best-effort: it runs in
//! an already-degraded context, so sub-steps that fail are logged and
//! skipped rather than escalated.

use std::cell::RefCell;
use std::rc::Rc;

use crate::command::CommandTarget;
use crate::error::Result;
use crate::io::{Controller, PortIo};
use crate::regs;

/// Which physical device a session speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeripheralKind {
    Keyboard,
    Mouse,
}

impl PeripheralKind {
    /// Interrupt line the device is wired to.
    pub fn irq_line(self) -> u8 {
        match self {
            PeripheralKind::Keyboard => 1,
            PeripheralKind::Mouse => 12,
        }
    }

    /// Caller-assigned bit position in the notification bitmask.
    pub fn hook_bit(self) -> u8 {
        match self {
            PeripheralKind::Keyboard => 1,
            PeripheralKind::Mouse => 2,
        }
    }

    pub fn command_target(self) -> CommandTarget {
        match self {
            PeripheralKind::Keyboard => CommandTarget::Keyboard,
            PeripheralKind::Mouse => CommandTarget::Mouse,
        }
    }
}

/// Granted subscription: interrupt line plus notification bit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookId {
    pub line: u8,
    pub bit: u8,
}

impl HookId {
    /// Tests a notification bitmask for this hook's bit.
    pub fn matches(&self, bitmask: u32) -> bool {
        bitmask & (1u32 << self.bit) != 0
    }
}

/// The external notification system the engine registers hooks with.
///
/// `exclusive` subscriptions must be granted exclusively or not at all:
/// falling back silently to shared delivery would let another handler
/// intercept bytes mid-transaction.
pub trait InterruptBus {
    fn subscribe(&mut self, line: u8, bit: u8, exclusive: bool) -> Result<HookId>;
    fn unsubscribe(&mut self, hook: HookId) -> Result<()>;
}

/// Exclusive ownership of one device's interrupt hook, plus the bookkeeping
/// needed to undo protocol-motivated state changes on teardown.
///
/// Dropping a session runs [`DeviceSession::reset`] if the caller has not,
/// so the hook is released deterministically on every exit path.
#[derive(Debug)]
pub struct DeviceSession<P: PortIo, B: InterruptBus> {
    kind: PeripheralKind,
    hook: Option<HookId>,
    scanning_disabled: bool,
    config_modified: bool,
    controller: Rc<RefCell<Controller<P>>>,
    bus: Rc<RefCell<B>>,
}

impl<P: PortIo, B: InterruptBus> DeviceSession<P, B> {
    /// Registers exclusive ownership of the device's interrupt line.
    pub fn subscribe(
        controller: Rc<RefCell<Controller<P>>>,
        bus: Rc<RefCell<B>>,
        kind: PeripheralKind,
    ) -> Result<Self> {
        let hook = bus
            .borrow_mut()
            .subscribe(kind.irq_line(), kind.hook_bit(), true)?;
        Ok(Self {
            kind,
            hook: Some(hook),
            scanning_disabled: false,
            config_modified: false,
            controller,
            bus,
        })
    }

    pub fn kind(&self) -> PeripheralKind {
        self.kind
    }

    /// The granted hook. `None` only after a completed `reset()`.
    pub fn hook(&self) -> Option<HookId> {
        self.hook
    }

    /// Disables scanning (keyboard) / data reporting (mouse) for protocol
    /// purposes, remembering to undo it on reset.
    pub fn disable_scanning(&mut self) -> Result<()> {
        self.controller
            .borrow_mut()
            .send_command(regs::DISABLE_SCANNING, self.kind.command_target())?;
        self.scanning_disabled = true;
        Ok(())
    }

    /// Re-enables scanning/reporting, clearing the reset obligation.
    pub fn enable_scanning(&mut self) -> Result<()> {
        self.controller
            .borrow_mut()
            .send_command(regs::ENABLE_SCANNING, self.kind.command_target())?;
        self.scanning_disabled = false;
        Ok(())
    }

    /// Writes the controller configuration byte, remembering that it must be
    /// restored on reset. Keyboard sessions only; the config byte gates
    /// first-port interrupt delivery.
    pub fn write_config(&mut self, value: u8) -> Result<()> {
        self.controller.borrow_mut().write_config_byte(value)?;
        self.config_modified = true;
        Ok(())
    }

    /// Restores the controller to a known-good state.
    ///
    /// Safe to call any number of times; the first call consumes the
    /// obligations, so a second call performs status reads at most. Never
    /// fails: each sub-step retries up to the I/O policy's budget and then
    /// moves on.
    pub fn reset(&mut self) {
        let attempts = self.controller.borrow().policy().attempts;

        if self.scanning_disabled {
            self.scanning_disabled = false;
            let target = self.kind.command_target();
            let mut ctrl = self.controller.borrow_mut();
            for _ in 0..attempts {
                match ctrl.send_command(regs::ENABLE_SCANNING, target) {
                    Ok(()) => break,
                    Err(err) => log::warn!("reset: re-enable scanning failed: {err}"),
                }
            }
        }

        if self.config_modified {
            self.config_modified = false;
            let mut ctrl = self.controller.borrow_mut();
            // Put the config byte back to something sane: whatever is there
            // now, with first-port interrupts forced on.
            for _ in 0..attempts {
                let current = match ctrl.read_config_byte() {
                    Ok(byte) => byte,
                    Err(err) => {
                        log::warn!("reset: config read failed: {err}");
                        continue;
                    }
                };
                match ctrl.write_config_byte(current | regs::CONFIG_FIRST_PORT_INTERRUPT) {
                    Ok(()) => break,
                    Err(err) => log::warn!("reset: config restore failed: {err}"),
                }
            }
        }

        if let Some(hook) = self.hook.take() {
            let mut bus = self.bus.borrow_mut();
            for _ in 0..attempts {
                match bus.unsubscribe(hook) {
                    Ok(()) => break,
                    Err(err) => log::warn!("reset: unsubscribe failed: {err}"),
                }
            }
        }

        // Flush leftover output so the next consumer of the controller does
        // not inherit stale bytes.
        self.controller.borrow_mut().discard();
    }
}

impl<P: PortIo, B: InterruptBus> Drop for DeviceSession<P, B> {
    fn drop(&mut self) {
        if self.hook.is_some() || self.scanning_disabled || self.config_modified {
            self.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_bitmask_test_uses_bit_position() {
        let hook = HookId { line: 12, bit: 2 };
        assert!(hook.matches(0b0100));
        assert!(hook.matches(0b0110));
        assert!(!hook.matches(0b0010));
    }

    #[test]
    fn kinds_map_to_the_documented_lines_and_bits() {
        assert_eq!(PeripheralKind::Keyboard.irq_line(), 1);
        assert_eq!(PeripheralKind::Keyboard.hook_bit(), 1);
        assert_eq!(PeripheralKind::Mouse.irq_line(), 12);
        assert_eq!(PeripheralKind::Mouse.hook_bit(), 2);
    }
}
