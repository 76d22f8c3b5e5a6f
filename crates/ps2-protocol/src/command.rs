//! Command/response transactions on top of the I/O primitive.
//!
//! Keyboard commands go straight to the data port; mouse commands are
//! prefixed with a controller-level "write to second port" byte; controller
//! register commands go to 0x64 and, for write sub-commands, produce no
//! acknowledgement byte at all. The resend loop is bounded by the same
//! attempt budget as the I/O layer, so a device stuck answering RESEND
//! surfaces a hard failure instead of spinning forever.

use crate::error::{Error, Result};
use crate::io::{Controller, PortIo, Register};
use crate::mouse::ProtocolMode;
use crate::regs;

/// Destination of a device command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandTarget {
    /// First PS/2 port, via the data port directly.
    Keyboard,
    /// Second PS/2 port, via the 0xD4 prefix.
    Mouse,
}

/// Mouse configuration reported by `STATUS_REQUEST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseConfig {
    pub remote_mode: bool,
    pub reporting_enabled: bool,
    pub scaling_2to1: bool,
    pub resolution: u8,
    pub sample_rate: u8,
}

impl<P: PortIo> Controller<P> {
    /// Sends a command byte to a device and waits for its acknowledgement.
    ///
    /// RESEND repeats the whole write/read cycle (for the mouse, a FAIL
    /// response counts as a resend request too). Any other non-ACK response
    /// fails the transaction. No state persists between calls beyond the
    /// hardware's.
    pub fn send_command(&mut self, command: u8, target: CommandTarget) -> Result<()> {
        let attempts = self.policy().attempts;
        for _ in 0..attempts {
            if target == CommandTarget::Mouse {
                self.write_byte(Register::Command, regs::WRITE_SECOND_PORT)?;
            }
            self.write_byte(Register::Data, command)?;

            let response = self.read_byte()?;
            match response {
                regs::ACK => return Ok(()),
                regs::RESEND => {
                    log::debug!("send_command: resend requested for {command:#04x}");
                }
                regs::FAIL if target == CommandTarget::Mouse => {
                    log::debug!("send_command: mouse reported failure for {command:#04x}, resending");
                }
                other => return Err(Error::UnexpectedResponse { response: other }),
            }
        }
        Err(Error::RetriesExhausted { attempts })
    }

    /// Reads the controller configuration byte.
    pub fn read_config_byte(&mut self) -> Result<u8> {
        self.write_byte(Register::Command, regs::READ_CONFIG)?;
        self.read_byte()
    }

    /// Writes the controller configuration byte.
    ///
    /// The write sub-command is not acknowledged; the argument byte follows
    /// on the data port and the transaction is complete once it is accepted.
    pub fn write_config_byte(&mut self, value: u8) -> Result<()> {
        self.write_byte(Register::Command, regs::WRITE_CONFIG)?;
        self.write_byte(Register::Data, value)
    }

    /// Sets the keyboard LED state (low three bits of `leds`).
    pub fn set_leds(&mut self, leds: u8) -> Result<()> {
        self.send_command(regs::SET_LEDS, CommandTarget::Keyboard)?;
        self.send_command(leds & 0x07, CommandTarget::Keyboard)
    }

    /// Sets the mouse sample rate.
    pub fn set_sample_rate(&mut self, rate: u8) -> Result<()> {
        self.send_command(regs::SET_SAMPLE_RATE, CommandTarget::Mouse)?;
        self.send_command(rate, CommandTarget::Mouse)
    }

    /// Reads the device id of the addressed device.
    pub fn read_device_id(&mut self, target: CommandTarget) -> Result<u8> {
        self.send_command(regs::READ_DEVICE_ID, target)?;
        self.read_byte()
    }

    /// Requests the mouse status triple {config flags, resolution, sample rate}.
    pub fn request_status(&mut self) -> Result<MouseConfig> {
        self.send_command(regs::STATUS_REQUEST, CommandTarget::Mouse)?;
        let flags = self.read_byte()?;
        let resolution = self.read_byte()?;
        let sample_rate = self.read_byte()?;
        Ok(MouseConfig {
            remote_mode: flags & regs::MOUSE_CFG_REMOTE_MODE != 0,
            reporting_enabled: flags & regs::MOUSE_CFG_REPORTING != 0,
            scaling_2to1: flags & regs::MOUSE_CFG_SCALING_2TO1 != 0,
            resolution,
            sample_rate,
        })
    }

    /// Runs the sample-rate sequence 200/100/80 that unlocks the scroll
    /// wheel (4-byte packets) on devices that support it, and reports the
    /// mode the device ended up in.
    pub fn negotiate_scroll_wheel(&mut self) -> Result<ProtocolMode> {
        for rate in [regs::SAMPLE_200, regs::SAMPLE_100, regs::SAMPLE_80] {
            self.set_sample_rate(rate)?;
        }
        let id = self.read_device_id(CommandTarget::Mouse)?;
        Ok(ProtocolMode::from_device_id(id))
    }

    /// Extends [`Self::negotiate_scroll_wheel`] with the 200/200/80 sequence
    /// that additionally unlocks the 4th/5th buttons, then restores a
    /// 100-samples/s rate.
    pub fn negotiate_extra_buttons(&mut self) -> Result<ProtocolMode> {
        let mode = self.negotiate_scroll_wheel()?;
        if mode != ProtocolMode::ScrollWheel {
            return Ok(mode);
        }
        for rate in [regs::SAMPLE_200, regs::SAMPLE_200, regs::SAMPLE_80] {
            self.set_sample_rate(rate)?;
        }
        let id = self.read_device_id(CommandTarget::Mouse)?;
        self.set_sample_rate(regs::SAMPLE_100)?;
        Ok(ProtocolMode::from_device_id(id))
    }
}
