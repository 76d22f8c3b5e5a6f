//! Register layout and wire constants for the i8042 controller and the
//! PS/2 devices behind it.
//!
//! The controller decodes two port addresses: reads from 0x64 return the
//! status register, writes to 0x64 go to the command register, and 0x60 is
//! the data port in both directions.

use bitflags::bitflags;

/// Status register (read) and command register (write).
pub const STATUS_PORT: u16 = 0x64;
pub const COMMAND_PORT: u16 = 0x64;
/// Data port, read/write.
pub const DATA_PORT: u16 = 0x60;

bitflags! {
    /// Controller status register. Read fresh on every I/O attempt; the
    /// engine never caches a status value across attempts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        /// A byte is waiting in the output buffer.
        const OUTPUT_FULL = 1 << 0;
        /// The input buffer is occupied; the controller is not ready for a write.
        const INPUT_FULL = 1 << 1;
        /// Self-test passed.
        const SYSTEM = 1 << 2;
        /// Last write went to the command register rather than the data port.
        const COMMAND_DATA = 1 << 3;
        /// Transmission timed out on the serial link.
        const TIMEOUT_ERROR = 1 << 6;
        /// Parity error on the serial link.
        const PARITY_ERROR = 1 << 7;
    }
}

impl Status {
    /// Either of the bits that mark the received byte as electrically unreliable.
    pub const INTEGRITY_ERRORS: Status = Status::TIMEOUT_ERROR.union(Status::PARITY_ERROR);
}

// Controller commands, written to 0x64.
pub const READ_CONFIG: u8 = 0x20;
pub const WRITE_CONFIG: u8 = 0x60;
pub const DISABLE_FIRST_PORT: u8 = 0xAD;
pub const ENABLE_FIRST_PORT: u8 = 0xAE;
/// The next byte written to the data port is routed to the second PS/2 port.
pub const WRITE_SECOND_PORT: u8 = 0xD4;

/// Config byte bit 0: the controller raises IRQ1 for first-port output.
pub const CONFIG_FIRST_PORT_INTERRUPT: u8 = 1 << 0;

// Device commands, written to 0x60. 0xF4/0xF5 mean "enable/disable
// scanning" to the keyboard and "enable/disable data reporting" to the
// mouse; the byte values are shared.
pub const ENABLE_SCANNING: u8 = 0xF4;
pub const DISABLE_SCANNING: u8 = 0xF5;
pub const SET_LEDS: u8 = 0xED;
pub const STATUS_REQUEST: u8 = 0xE9;
pub const SET_STREAM_MODE: u8 = 0xEA;
pub const SET_REMOTE_MODE: u8 = 0xF0;
pub const READ_DATA: u8 = 0xEB;
pub const SET_SAMPLE_RATE: u8 = 0xF3;
pub const READ_DEVICE_ID: u8 = 0xF2;
pub const SET_DEFAULTS: u8 = 0xF6;

// Device responses, shared vocabulary between keyboard and mouse.
pub const ACK: u8 = 0xFA;
pub const RESEND: u8 = 0xFE;
pub const FAIL: u8 = 0xFC;

// Scancode layout.
/// Prefix of a two-byte scancode sequence.
pub const EXTENDED_PREFIX: u8 = 0xE0;
/// Bit 7 distinguishes break (set) from make (clear).
pub const BREAK_BIT: u8 = 1 << 7;
/// Set-1 make code for Escape.
pub const ESC_MAKE: u8 = 0x01;

// Mouse packet byte 0.
pub const MOUSE_LEFT: u8 = 1 << 0;
pub const MOUSE_RIGHT: u8 = 1 << 1;
pub const MOUSE_MIDDLE: u8 = 1 << 2;
/// Always set in byte 0 of a well-formed packet; the only framing anchor.
pub const MOUSE_SYNC: u8 = 1 << 3;
pub const MOUSE_X_SIGN: u8 = 1 << 4;
pub const MOUSE_Y_SIGN: u8 = 1 << 5;
pub const MOUSE_X_OVERFLOW: u8 = 1 << 6;
pub const MOUSE_Y_OVERFLOW: u8 = 1 << 7;

// Mouse packet byte 3 (present only after extended negotiation).
/// Two's-complement scroll delta nibble.
pub const MOUSE_SCROLL_MASK: u8 = 0x0F;
pub const MOUSE_BUTTON_4: u8 = 1 << 4;
pub const MOUSE_BUTTON_5: u8 = 1 << 5;

// Mouse config flags (first byte of the STATUS_REQUEST reply).
pub const MOUSE_CFG_REMOTE_MODE: u8 = 1 << 6;
pub const MOUSE_CFG_REPORTING: u8 = 1 << 5;
pub const MOUSE_CFG_SCALING_2TO1: u8 = 1 << 4;

// Sample rates used by the extended-protocol negotiation sequences.
pub const SAMPLE_200: u8 = 200;
pub const SAMPLE_100: u8 = 100;
pub const SAMPLE_80: u8 = 80;

// Device ids reported after negotiation.
pub const DEVICE_ID_BASIC: u8 = 0;
pub const DEVICE_ID_SCROLL: u8 = 3;
pub const DEVICE_ID_FIVE_BUTTON: u8 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_mask_covers_both_link_errors() {
        assert!(Status::INTEGRITY_ERRORS.contains(Status::PARITY_ERROR));
        assert!(Status::INTEGRITY_ERRORS.contains(Status::TIMEOUT_ERROR));
        assert!(!Status::INTEGRITY_ERRORS.contains(Status::OUTPUT_FULL));
    }

    #[test]
    fn data_and_command_ports_follow_the_i8042_layout() {
        assert_eq!(DATA_PORT, 0x60);
        assert_eq!(STATUS_PORT, 0x64);
        assert_eq!(COMMAND_PORT, STATUS_PORT);
    }
}
