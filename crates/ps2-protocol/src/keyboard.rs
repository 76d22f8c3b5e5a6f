//! Scancode decoding: reassembles 1- and 2-byte set-1 scancodes into key
//! events.

use crate::regs;

/// Key transition direction, from bit 7 of the scancode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Make,
    Break,
}

/// A decoded key transition.
///
/// `code` is the scancode with the break bit cleared; `extended` marks codes
/// that arrived behind the 0xE0 prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: u8,
    pub extended: bool,
    pub direction: KeyDirection,
}

impl KeyEvent {
    /// The Escape break code, the conventional stop signal for a receive loop.
    pub fn is_escape_break(&self) -> bool {
        !self.extended && self.code == regs::ESC_MAKE && self.direction == KeyDirection::Break
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    Normal,
    ExtendedPending,
}

/// Two-state scancode decoder.
///
/// The 0xE0 prefix itself never reaches the consumer; it arms the decoder
/// for exactly one following byte, which is then emitted as an extended
/// event. State belongs to one logical keyboard stream and must only be
/// advanced by the thread holding the active session.
#[derive(Debug)]
pub struct ScancodeDecoder {
    state: DecoderState,
}

impl ScancodeDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Normal,
        }
    }

    /// Consumes one raw byte, producing at most one event.
    pub fn feed(&mut self, byte: u8) -> Option<KeyEvent> {
        match self.state {
            DecoderState::Normal if byte == regs::EXTENDED_PREFIX => {
                self.state = DecoderState::ExtendedPending;
                None
            }
            DecoderState::Normal => Some(Self::event(byte, false)),
            DecoderState::ExtendedPending => {
                self.state = DecoderState::Normal;
                Some(Self::event(byte, true))
            }
        }
    }

    /// Forces the decoder back to `Normal`. Called on session teardown so a
    /// stray trailing prefix byte cannot corrupt the next session's stream.
    pub fn reset(&mut self) {
        self.state = DecoderState::Normal;
    }

    fn event(byte: u8, extended: bool) -> KeyEvent {
        let direction = if byte & regs::BREAK_BIT != 0 {
            KeyDirection::Break
        } else {
            KeyDirection::Make
        };
        KeyEvent {
            code: byte & !regs::BREAK_BIT,
            extended,
            direction,
        }
    }
}

impl Default for ScancodeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_make_and_break() {
        let mut d = ScancodeDecoder::new();
        assert_eq!(
            d.feed(0x1E),
            Some(KeyEvent {
                code: 0x1E,
                extended: false,
                direction: KeyDirection::Make
            })
        );
        assert_eq!(
            d.feed(0x9E),
            Some(KeyEvent {
                code: 0x1E,
                extended: false,
                direction: KeyDirection::Break
            })
        );
    }

    #[test]
    fn prefix_emits_nothing_and_arms_exactly_one_byte() {
        let mut d = ScancodeDecoder::new();
        assert_eq!(d.feed(0xE0), None);
        assert_eq!(
            d.feed(0x9C),
            Some(KeyEvent {
                code: 0x1C,
                extended: true,
                direction: KeyDirection::Break
            })
        );
        // Next byte is back to plain.
        assert_eq!(
            d.feed(0x1C),
            Some(KeyEvent {
                code: 0x1C,
                extended: false,
                direction: KeyDirection::Make
            })
        );
    }

    #[test]
    fn reset_clears_a_pending_prefix() {
        let mut d = ScancodeDecoder::new();
        assert_eq!(d.feed(0xE0), None);
        d.reset();
        let ev = d.feed(0x48).unwrap();
        assert!(!ev.extended, "prefix must not survive a reset");
    }

    #[test]
    fn escape_break_is_recognized() {
        let mut d = ScancodeDecoder::new();
        let ev = d.feed(0x81).unwrap();
        assert!(ev.is_escape_break());
        assert!(!d.feed(0x01).unwrap().is_escape_break());
    }
}
