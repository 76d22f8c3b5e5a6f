//! Raw byte I/O against the controller's status and data registers.
//!
//! Everything above this module funnels through [`Controller`], which owns
//! the single retry/settle discipline for the shared, half-duplex chip. The
//! actual port accesses go through the [`PortIo`] seam so the engine runs
//! identically against real hardware bindings and the simulator.

use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::regs::{self, Status};

/// Port-mapped I/O seam between the engine and the platform.
///
/// Implementations must not buffer: a `read` of [`regs::STATUS_PORT`] has to
/// reflect the controller state at call time, since the write path decides
/// per-attempt whether to drain a stray byte before touching the input
/// buffer.
pub trait PortIo {
    fn read(&mut self, port: u16) -> Result<u8>;
    fn write(&mut self, port: u16, value: u8) -> Result<()>;
}

impl<T: PortIo + ?Sized> PortIo for &mut T {
    fn read(&mut self, port: u16) -> Result<u8> {
        (**self).read(port)
    }

    fn write(&mut self, port: u16, value: u8) -> Result<()> {
        (**self).write(port, value)
    }
}

/// Retry budget and settle delay for controller accesses.
///
/// The controller needs a fixed pause after accepting a byte before it is
/// ready for the next access; the original driver used 20ms and three
/// attempts. Tests inject [`RetryPolicy::instant`] so retry-exhaustion paths
/// run without real delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub settle: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            settle: Duration::from_millis(20),
        }
    }
}

impl RetryPolicy {
    /// Same attempt budget as the default, zero delay.
    pub fn instant() -> Self {
        Self {
            settle: Duration::ZERO,
            ..Self::default()
        }
    }

    fn pause(&self) {
        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
    }
}

/// Which writable register a byte is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Data,
    Command,
}

impl Register {
    fn port(self) -> u16 {
        match self {
            Register::Data => regs::DATA_PORT,
            Register::Command => regs::COMMAND_PORT,
        }
    }
}

/// The controller I/O primitive: bounded-retry reads and writes with the
/// settle delay the chip's timing requires.
#[derive(Debug)]
pub struct Controller<P> {
    ports: P,
    policy: RetryPolicy,
}

impl<P: PortIo> Controller<P> {
    pub fn new(ports: P) -> Self {
        Self::with_policy(ports, RetryPolicy::default())
    }

    pub fn with_policy(ports: P, policy: RetryPolicy) -> Self {
        Self { ports, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    fn status(&mut self) -> Result<Status> {
        let raw = self.ports.read(regs::STATUS_PORT)?;
        Ok(Status::from_bits_retain(raw))
    }

    /// Writes one byte to the data port or the command register.
    ///
    /// Per attempt: if the output buffer unexpectedly holds data, one byte is
    /// drained first. The chip is shared between both devices, so a write can
    /// race an unsolicited byte (a scancode arriving while a mouse command is
    /// in flight); leaving it queued would poison a later response read.
    pub fn write_byte(&mut self, register: Register, value: u8) -> Result<()> {
        let attempts = self.policy.attempts;
        for _ in 0..attempts {
            let status = match self.status() {
                Ok(status) => status,
                Err(err) => {
                    log::warn!("write_byte: status read failed: {err}");
                    self.policy.pause();
                    continue;
                }
            };

            if status.contains(Status::OUTPUT_FULL) {
                match self.ports.read(regs::DATA_PORT) {
                    Ok(stray) => log::trace!("write_byte: drained stray byte {stray:#04x}"),
                    Err(err) => log::warn!("write_byte: stray drain failed: {err}"),
                }
            }

            if !status.contains(Status::INPUT_FULL) {
                self.ports.write(register.port(), value)?;
                // Settle even on success; the caller may issue the next
                // access immediately.
                self.policy.pause();
                return Ok(());
            }

            self.policy.pause();
        }

        log::warn!("write_byte: controller busy, giving up after {attempts} attempts");
        Err(Error::WriteTimedOut { attempts })
    }

    /// Reads one validated byte from the output buffer.
    ///
    /// A byte flagged with a parity or timeout error fails immediately
    /// without consuming an attempt on a re-read; an empty buffer is retried
    /// up to the budget.
    pub fn read_byte(&mut self) -> Result<u8> {
        let attempts = self.policy.attempts;
        for _ in 0..attempts {
            let status = match self.status() {
                Ok(status) => status,
                Err(err) => {
                    log::warn!("read_byte: status read failed: {err}");
                    self.policy.pause();
                    continue;
                }
            };

            if status.contains(Status::OUTPUT_FULL) {
                let byte = self.ports.read(regs::DATA_PORT)?;
                if status.intersects(Status::INTEGRITY_ERRORS) {
                    log::warn!(
                        "read_byte: parity/timeout error, status {:#04x}",
                        status.bits()
                    );
                    return Err(Error::DataIntegrity {
                        status: status.bits(),
                    });
                }
                self.policy.pause();
                return Ok(byte);
            }

            self.policy.pause();
        }

        Err(Error::ReadTimedOut { attempts })
    }

    /// Single unvalidated data-port read, for interrupt context where the
    /// notification already guarantees a byte is waiting.
    pub fn read_data(&mut self) -> Result<u8> {
        self.ports.read(regs::DATA_PORT)
    }

    /// Best-effort drain of whatever is sitting in the output buffer.
    ///
    /// Used during recovery; every failure is tolerated, since recovery runs
    /// in an already-degraded context and must not get stuck.
    pub fn discard(&mut self) {
        for _ in 0..self.policy.attempts {
            match self.status() {
                Ok(status) if status.contains(Status::OUTPUT_FULL) => {
                    if let Err(err) = self.ports.read(regs::DATA_PORT) {
                        log::warn!("discard: data read failed: {err}");
                    }
                }
                Ok(_) => {}
                Err(err) => log::warn!("discard: status read failed: {err}"),
            }
            self.policy.pause();
        }
    }
}
