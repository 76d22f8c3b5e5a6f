use std::collections::VecDeque;

use ps2_protocol::regs;

#[derive(Debug, Clone, Copy)]
enum ExpectingData {
    SampleRate,
}

/// Scripted PS/2 mouse model.
///
/// Tracks reporting/mode/sample-rate state, implements the sample-rate magic
/// sequences that move the device id from 0 to 3 (scroll wheel) and on to 4
/// (extra buttons), and supports the same resend scripting as the keyboard
/// model plus a one-shot FAIL response.
#[derive(Debug, Default)]
pub struct SimMouse {
    pub reporting_enabled: bool,
    pub remote_mode: bool,
    pub sample_rate: u8,
    pub device_id: u8,
    pub received: Vec<u8>,
    recent_rates: Vec<u8>,
    resend_remaining: u32,
    always_resend: bool,
    fail_next: bool,
    expecting: Option<ExpectingData>,
}

impl SimMouse {
    pub fn new() -> Self {
        Self {
            sample_rate: 100,
            ..Self::default()
        }
    }

    pub fn script_resend(&mut self, times: u32) {
        self.resend_remaining = times;
    }

    pub fn always_resend(&mut self) {
        self.always_resend = true;
    }

    /// Answers the next byte with FAIL; the command layer treats it as a
    /// resend request on the mouse path.
    pub fn fail_once(&mut self) {
        self.fail_next = true;
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
        if self.fail_next {
            self.fail_next = false;
            out.push_back(regs::FAIL);
            return;
        }

        if let Some(expecting) = self.expecting.take() {
            match expecting {
                ExpectingData::SampleRate => self.set_rate(byte),
            }
            out.push_back(regs::ACK);
            return;
        }

        match byte {
            regs::ENABLE_SCANNING => {
                self.reporting_enabled = true;
                out.push_back(regs::ACK);
            }
            regs::DISABLE_SCANNING => {
                self.reporting_enabled = false;
                out.push_back(regs::ACK);
            }
            regs::SET_SAMPLE_RATE => {
                self.expecting = Some(ExpectingData::SampleRate);
                out.push_back(regs::ACK);
            }
            regs::READ_DEVICE_ID => {
                out.push_back(regs::ACK);
                out.push_back(self.device_id);
            }
            regs::STATUS_REQUEST => {
                let mut flags = 0u8;
                if self.remote_mode {
                    flags |= regs::MOUSE_CFG_REMOTE_MODE;
                }
                if self.reporting_enabled {
                    flags |= regs::MOUSE_CFG_REPORTING;
                }
                out.push_back(regs::ACK);
                out.push_back(flags);
                out.push_back(0x02); // resolution
                out.push_back(self.sample_rate);
            }
            regs::SET_REMOTE_MODE => {
                self.remote_mode = true;
                out.push_back(regs::ACK);
            }
            regs::SET_STREAM_MODE => {
                self.remote_mode = false;
                out.push_back(regs::ACK);
            }
            regs::SET_DEFAULTS => {
                self.reporting_enabled = false;
                self.remote_mode = false;
                self.sample_rate = 100;
                self.recent_rates.clear();
                out.push_back(regs::ACK);
            }
            _ => {
                out.push_back(regs::ACK);
            }
        }
    }

    fn set_rate(&mut self, rate: u8) {
        self.sample_rate = rate;
        self.recent_rates.push(rate);
        let n = self.recent_rates.len();
        if n < 3 {
            return;
        }
        let last3 = &self.recent_rates[n - 3..];
        if self.device_id == regs::DEVICE_ID_BASIC
            && last3 == [regs::SAMPLE_200, regs::SAMPLE_100, regs::SAMPLE_80]
        {
            self.device_id = regs::DEVICE_ID_SCROLL;
        } else if self.device_id == regs::DEVICE_ID_SCROLL
            && last3 == [regs::SAMPLE_200, regs::SAMPLE_200, regs::SAMPLE_80]
        {
            self.device_id = regs::DEVICE_ID_FIVE_BUTTON;
        }
    }
}
