#![forbid(unsafe_code)]

//! Simulated i8042 controller, device models, and interrupt bus for testing
//! the protocol engine without hardware.
//!
//! The controller model keeps a single output-buffer queue shared by both
//! devices, routes data-port writes to the keyboard or (behind the 0xD4
//! prefix) the mouse, and lets tests inject raw bytes, status error bits,
//! and input-buffer busy periods. [`SimHandle`] is the cloneable handle that
//! implements the engine's `PortIo` seam while the test keeps a borrow path
//! to the scripted state.

mod interrupt_bus;
mod keyboard;
mod mouse;

pub use interrupt_bus::SimInterruptBus;
pub use keyboard::SimKeyboard;
pub use mouse::SimMouse;

use std::cell::{Ref, RefCell, RefMut};
use std::collections::VecDeque;
use std::rc::Rc;

use ps2_protocol::regs::{self, Status};
use ps2_protocol::{Error, PortIo, Result};

#[derive(Debug, Clone, Copy)]
enum Expecting {
    ConfigByte,
    MouseByte,
}

/// The controller model: status/data registers plus the two device models.
#[derive(Debug)]
pub struct SimController {
    pub keyboard: SimKeyboard,
    pub mouse: SimMouse,
    /// Controller configuration byte; 0x45 matches the usual post-boot state.
    pub config: u8,
    /// Every value written through the WRITE_CONFIG sub-command.
    pub config_writes: Vec<u8>,
    out: VecDeque<u8>,
    pending_error: u8,
    input_busy: u32,
    fail_status_reads: u32,
    expecting: Option<Expecting>,
}

impl SimController {
    pub fn new() -> Self {
        Self {
            keyboard: SimKeyboard::new(),
            mouse: SimMouse::new(),
            config: 0x45,
            config_writes: Vec::new(),
            out: VecDeque::new(),
            pending_error: 0,
            input_busy: 0,
            fail_status_reads: 0,
            expecting: None,
        }
    }

    /// Queues raw bytes in the output buffer, as a device stream would.
    pub fn push_output(&mut self, bytes: &[u8]) {
        self.out.extend(bytes);
    }

    /// Scancode stream injection (alias of [`Self::push_output`], named for
    /// test readability).
    pub fn inject_scancodes(&mut self, bytes: &[u8]) {
        self.push_output(bytes);
    }

    /// Mouse packet byte injection.
    pub fn inject_mouse_bytes(&mut self, bytes: &[u8]) {
        self.push_output(bytes);
    }

    /// Flags the next queued byte with the given status error bits
    /// (parity/timeout); the bits clear once the byte is read.
    pub fn inject_status_error(&mut self, bits: Status) {
        self.pending_error = bits.bits();
    }

    /// Reports the input buffer busy for the next `reads` status reads.
    pub fn hold_input_busy(&mut self, reads: u32) {
        self.input_busy = reads;
    }

    /// Fails the next `reads` status-register reads at the port level.
    pub fn fail_status_reads(&mut self, reads: u32) {
        self.fail_status_reads = reads;
    }

    pub fn output_len(&self) -> usize {
        self.out.len()
    }

    fn status(&mut self) -> Result<u8> {
        if self.fail_status_reads > 0 {
            self.fail_status_reads -= 1;
            return Err(Error::Port {
                port: regs::STATUS_PORT,
            });
        }
        let mut status = 0u8;
        if !self.out.is_empty() {
            status |= Status::OUTPUT_FULL.bits();
            status |= self.pending_error;
        }
        if self.input_busy > 0 {
            self.input_busy -= 1;
            status |= Status::INPUT_FULL.bits();
        }
        Ok(status)
    }

    fn read_data(&mut self) -> u8 {
        self.pending_error = 0;
        // An empty buffer reads back stale zero, as real hardware would.
        self.out.pop_front().unwrap_or(0)
    }

    fn write_command(&mut self, command: u8) {
        match command {
            regs::READ_CONFIG => self.out.push_back(self.config),
            regs::WRITE_CONFIG => self.expecting = Some(Expecting::ConfigByte),
            regs::WRITE_SECOND_PORT => self.expecting = Some(Expecting::MouseByte),
            regs::ENABLE_FIRST_PORT | regs::DISABLE_FIRST_PORT => {}
            other => log::debug!("sim: unhandled controller command {other:#04x}"),
        }
    }

    fn write_data(&mut self, value: u8) {
        match self.expecting.take() {
            Some(Expecting::ConfigByte) => {
                self.config = value;
                self.config_writes.push(value);
            }
            Some(Expecting::MouseByte) => {
                let mut out = std::mem::take(&mut self.out);
                self.mouse.receive(value, &mut out);
                self.out = out;
            }
            None => {
                let mut out = std::mem::take(&mut self.out);
                self.keyboard.receive(value, &mut out);
                self.out = out;
            }
        }
    }
}

impl Default for SimController {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle over a shared [`SimController`], implementing the
/// engine's port-I/O seam while tests keep access to the scripted state.
#[derive(Debug, Clone, Default)]
pub struct SimHandle {
    inner: Rc<RefCell<SimController>>,
}

impl SimHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sim(&self) -> RefMut<'_, SimController> {
        self.inner.borrow_mut()
    }

    pub fn sim_ref(&self) -> Ref<'_, SimController> {
        self.inner.borrow()
    }
}

impl PortIo for SimHandle {
    fn read(&mut self, port: u16) -> Result<u8> {
        match port {
            regs::STATUS_PORT => self.inner.borrow_mut().status(),
            regs::DATA_PORT => Ok(self.inner.borrow_mut().read_data()),
            _ => Err(Error::Port { port }),
        }
    }

    fn write(&mut self, port: u16, value: u8) -> Result<()> {
        match port {
            regs::COMMAND_PORT => {
                self.inner.borrow_mut().write_command(value);
                Ok(())
            }
            regs::DATA_PORT => {
                self.inner.borrow_mut().write_data(value);
                Ok(())
            }
            _ => Err(Error::Port { port }),
        }
    }
}
