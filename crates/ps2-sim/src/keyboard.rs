use std::collections::VecDeque;

use ps2_protocol::regs;

#[derive(Debug, Clone, Copy)]
enum ExpectingData {
    LedState,
}

/// Scripted PS/2 keyboard model.
///
/// Replies to the command set with ACK by default; tests can script a run of
/// RESEND responses to exercise the command layer's retry loop. Every
/// write/read cycle the host performs lands one entry in
/// [`SimKeyboard::received`], so tests can count cycles exactly.
#[derive(Debug, Default)]
pub struct SimKeyboard {
    pub scanning_enabled: bool,
    pub leds: u8,
    /// Every byte the device was handed, including data bytes and resent
    /// commands.
    pub received: Vec<u8>,
    resend_remaining: u32,
    always_resend: bool,
    expecting: Option<ExpectingData>,
}

impl SimKeyboard {
    pub fn new() -> Self {
        Self {
            scanning_enabled: true,
            ..Self::default()
        }
    }

    /// Answers the next `times` bytes with RESEND before going back to ACK.
    pub fn script_resend(&mut self, times: u32) {
        self.resend_remaining = times;
    }

    /// Answers every byte with RESEND, forever.
    pub fn always_resend(&mut self) {
        self.always_resend = true;
    }

    pub(crate) fn receive(&mut self, byte: u8, out: &mut VecDeque<u8>) {
        self.received.push(byte);

        if self.always_resend {
            out.push_back(regs::RESEND);
            return;
        }
        if self.resend_remaining > 0 {
            self.resend_remaining -= 1;
            out.push_back(regs::RESEND);
            return;
        }

        if let Some(expecting) = self.expecting.take() {
            match expecting {
                ExpectingData::LedState => self.leds = byte & 0x07,
            }
            out.push_back(regs::ACK);
            return;
        }

        match byte {
            regs::ENABLE_SCANNING => {
                self.scanning_enabled = true;
                out.push_back(regs::ACK);
            }
            regs::DISABLE_SCANNING => {
                self.scanning_enabled = false;
                out.push_back(regs::ACK);
            }
            regs::SET_LEDS => {
                self.expecting = Some(ExpectingData::LedState);
                out.push_back(regs::ACK);
            }
            regs::SET_DEFAULTS => {
                self.scanning_enabled = true;
                self.leds = 0;
                out.push_back(regs::ACK);
            }
            _ => {
                // Unsupported commands are still acknowledged.
                out.push_back(regs::ACK);
            }
        }
    }
}
