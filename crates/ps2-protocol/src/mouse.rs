//! Mouse packet parsing and stream framing.
//!
//! The device emits a continuous byte stream with no explicit framing; the
//! sync bit in byte 0 is the only anchor. The framer both acquires lock on
//! the first sync-bit byte it sees and relinquishes it whenever the current
//! byte-0 candidate loses the bit, so it recovers from interleaved garbage
//! (stray keyboard bytes were observed on real hardware) without caller
//! involvement.

use crate::regs;

/// Reporting protocol negotiated with the device, which fixes the packet size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolMode {
    /// 3-byte packets: buttons + X/Y deltas.
    Basic,
    /// 4-byte packets with a scroll nibble (device id 3).
    ScrollWheel,
    /// 4-byte packets with scroll nibble and 4th/5th buttons (device id 4).
    FiveButton,
}

impl ProtocolMode {
    pub fn packet_len(self) -> usize {
        match self {
            ProtocolMode::Basic => 3,
            ProtocolMode::ScrollWheel | ProtocolMode::FiveButton => 4,
        }
    }

    /// Maps the id reported by `READ_DEVICE_ID` after negotiation.
    pub fn from_device_id(id: u8) -> Self {
        match id {
            regs::DEVICE_ID_SCROLL => ProtocolMode::ScrollWheel,
            regs::DEVICE_ID_FIVE_BUTTON => ProtocolMode::FiveButton,
            _ => ProtocolMode::Basic,
        }
    }
}

/// A reassembled motion packet.
///
/// `dx`/`dy` carry the sign bits already applied to the magnitude bytes.
/// `wheel` and the extra buttons are only meaningful when the packet came
/// from a 4-byte mode; they decode to zero/false otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MousePacket {
    pub left: bool,
    pub middle: bool,
    pub right: bool,
    pub dx: i16,
    pub dy: i16,
    pub x_overflow: bool,
    pub y_overflow: bool,
    pub wheel: i8,
    pub fourth_button: bool,
    pub fifth_button: bool,
}

impl MousePacket {
    /// Decodes 3 or 4 raw bytes. Byte 0 is assumed to carry the sync bit;
    /// the framer guarantees that for every packet it emits.
    pub fn parse(bytes: &[u8]) -> Self {
        let b0 = bytes[0];
        let dx = Self::delta(bytes[1], b0 & regs::MOUSE_X_SIGN != 0);
        let dy = Self::delta(bytes[2], b0 & regs::MOUSE_Y_SIGN != 0);

        let (wheel, fourth, fifth) = match bytes.get(3) {
            Some(&b3) => (
                Self::scroll(b3),
                b3 & regs::MOUSE_BUTTON_4 != 0,
                b3 & regs::MOUSE_BUTTON_5 != 0,
            ),
            None => (0, false, false),
        };

        Self {
            left: b0 & regs::MOUSE_LEFT != 0,
            middle: b0 & regs::MOUSE_MIDDLE != 0,
            right: b0 & regs::MOUSE_RIGHT != 0,
            dx,
            dy,
            x_overflow: b0 & regs::MOUSE_X_OVERFLOW != 0,
            y_overflow: b0 & regs::MOUSE_Y_OVERFLOW != 0,
            wheel,
            fourth_button: fourth,
            fifth_button: fifth,
        }
    }

    pub fn overflowed(&self) -> bool {
        self.x_overflow || self.y_overflow
    }

    // Magnitude byte plus sign bit: a negative delta is stored as the two's
    // complement of its magnitude, so negate within eight bits.
    fn delta(magnitude: u8, negative: bool) -> i16 {
        if negative {
            -i16::from(magnitude.wrapping_neg())
        } else {
            i16::from(magnitude)
        }
    }

    // Byte 3's low nibble is a two's-complement scroll delta.
    fn scroll(b3: u8) -> i8 {
        let nibble = b3 & regs::MOUSE_SCROLL_MASK;
        if nibble >= 0x08 {
            nibble as i8 - 0x10
        } else {
            nibble as i8
        }
    }
}

/// Reassembles fixed-size packets from the unframed byte stream.
///
/// Lock state: starts unlocked; the first byte seen with the sync bit set is
/// taken as a true packet start (discarding anything partially accumulated
/// before it); lock is dropped whenever the byte at position 0 lacks the
/// sync bit. Complete packets whose overflow bits are set are discarded
/// silently, with the framer staying locked.
#[derive(Debug)]
pub struct PacketFramer {
    mode: ProtocolMode,
    buf: [u8; 4],
    index: usize,
    locked: bool,
    discard_next: bool,
}

impl PacketFramer {
    pub fn new(mode: ProtocolMode) -> Self {
        Self {
            mode,
            buf: [0; 4],
            index: 0,
            locked: false,
            discard_next: false,
        }
    }

    pub fn mode(&self) -> ProtocolMode {
        self.mode
    }

    /// Arms a one-byte discard before framing (re)starts.
    ///
    /// The first byte after subscribing is dropped by convention: a stale
    /// acknowledgement or break code left over from session startup is
    /// sometimes still queued and would otherwise be eaten by the sync
    /// heuristic as a bogus packet start.
    pub fn discard_next(&mut self) {
        self.discard_next = true;
    }

    /// Consumes one raw byte, producing at most one packet.
    pub fn feed(&mut self, byte: u8) -> Option<MousePacket> {
        if self.discard_next {
            self.discard_next = false;
            log::trace!("framer: discarding stale post-subscribe byte {byte:#04x}");
            return None;
        }

        let len = self.mode.packet_len();
        if self.index == len {
            self.index = 0;
        }
        self.buf[self.index] = byte;
        self.index += 1;

        // Resynchronization: the first sync-bit byte seen while unlocked is
        // assumed to be a true byte 0.
        if byte & regs::MOUSE_SYNC != 0 && !self.locked {
            self.buf[0] = byte;
            self.index = 1;
            self.locked = true;
        }

        if self.buf[0] & regs::MOUSE_SYNC == 0 {
            self.locked = false;
        }

        if self.index == len && self.locked {
            let packet = MousePacket::parse(&self.buf[..len]);
            if packet.overflowed() {
                log::debug!("framer: dropping packet with overflow bits set");
                return None;
            }
            return Some(packet);
        }
        None
    }

    /// Returns to unlocked, index 0. The negotiated mode is kept.
    pub fn reset(&mut self) {
        self.index = 0;
        self.locked = false;
        self.discard_next = false;
        self.buf = [0; 4];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(f: &mut PacketFramer, bytes: &[u8]) -> Vec<MousePacket> {
        bytes.iter().filter_map(|&b| f.feed(b)).collect()
    }

    #[test]
    fn clean_stream_emits_one_packet() {
        let mut f = PacketFramer::new(ProtocolMode::Basic);
        let packets = feed_all(&mut f, &[0x08, 0x05, 0x03]);
        assert_eq!(packets.len(), 1);
        let p = packets[0];
        assert!(!p.left && !p.middle && !p.right);
        assert_eq!((p.dx, p.dy), (5, 3));
    }

    #[test]
    fn garbage_before_packet_is_skipped() {
        let mut f = PacketFramer::new(ProtocolMode::Basic);
        let packets = feed_all(&mut f, &[0x00, 0x08, 0x05, 0x03]);
        assert_eq!(packets.len(), 1);
        assert_eq!((packets[0].dx, packets[0].dy), (5, 3));
    }

    #[test]
    fn negative_deltas_are_sign_extended() {
        let mut f = PacketFramer::new(ProtocolMode::Basic);
        // X sign + Y sign set, magnitudes stored as two's complement.
        let packets = feed_all(&mut f, &[0x38, 0xFB, 0xFE]);
        assert_eq!((packets[0].dx, packets[0].dy), (-5, -2));
    }

    #[test]
    fn overflow_packet_is_dropped_but_lock_is_kept() {
        let mut f = PacketFramer::new(ProtocolMode::Basic);
        let packets = feed_all(&mut f, &[0x48, 0xFF, 0x00, 0x08, 0x01, 0x01]);
        // First packet has X overflow; only the second is delivered.
        assert_eq!(packets.len(), 1);
        assert_eq!((packets[0].dx, packets[0].dy), (1, 1));
    }

    #[test]
    fn sync_loss_at_byte_zero_unlocks() {
        let mut f = PacketFramer::new(ProtocolMode::Basic);
        let first = feed_all(&mut f, &[0x08, 0x05, 0x03]);
        assert_eq!(first.len(), 1);
        // Next byte-0 candidate lacks the sync bit: no packet may be built
        // from it, and framing resumes at the next sync byte.
        let rest = feed_all(&mut f, &[0x04, 0x01, 0x02, 0x09, 0x02, 0x07]);
        assert_eq!(rest.len(), 1);
        assert!(rest[0].left);
        assert_eq!((rest[0].dx, rest[0].dy), (2, 7));
    }

    #[test]
    fn four_byte_mode_decodes_scroll_and_extra_buttons() {
        let mut f = PacketFramer::new(ProtocolMode::FiveButton);
        let packets = feed_all(&mut f, &[0x08, 0x01, 0x00, 0x1F]);
        assert_eq!(packets.len(), 1);
        let p = packets[0];
        assert_eq!(p.wheel, -1); // nibble 0xF
        assert!(p.fourth_button);
        assert!(!p.fifth_button);
    }

    #[test]
    fn armed_discard_consumes_exactly_one_byte() {
        let mut f = PacketFramer::new(ProtocolMode::Basic);
        f.discard_next();
        // 0xFA is a stale ACK; it carries the sync bit and would have locked
        // the framer at the wrong offset.
        let packets = feed_all(&mut f, &[0xFA, 0x08, 0x05, 0x03]);
        assert_eq!(packets.len(), 1);
        assert_eq!((packets[0].dx, packets[0].dy), (5, 3));
    }

    #[test]
    fn zero_magnitude_with_sign_bit_decodes_to_zero() {
        let p = MousePacket::parse(&[0x38, 0x00, 0x00]);
        assert_eq!((p.dx, p.dy), (0, 0));
    }
}
