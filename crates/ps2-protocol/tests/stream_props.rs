//! Property tests for the two stream reassemblers: arbitrary byte streams
//! must never produce a malformed event, and well-formed streams must never
//! lose one.

use proptest::prelude::*;

use ps2_protocol::regs;
use ps2_protocol::{MousePacket, PacketFramer, ProtocolMode, ScancodeDecoder};

/// Byte-0 candidate with the sync bit forced on and overflow bits forced off.
fn clean_header(raw: u8) -> u8 {
    (raw | regs::MOUSE_SYNC) & !(regs::MOUSE_X_OVERFLOW | regs::MOUSE_Y_OVERFLOW)
}

fn clean_packet_strategy() -> impl Strategy<Value = [u8; 3]> {
    (any::<u8>(), any::<u8>(), any::<u8>())
        .prop_map(|(b0, b1, b2)| [clean_header(b0), b1, b2])
}

/// Bytes guaranteed to never look like a packet start.
fn garbage_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>().prop_map(|b| b & !regs::MOUSE_SYNC), 0..8)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prefix_emits_nothing_then_exactly_one_extended_event(byte in any::<u8>()) {
        let mut decoder = ScancodeDecoder::new();
        prop_assert!(decoder.feed(regs::EXTENDED_PREFIX).is_none());
        let event = decoder.feed(byte);
        prop_assert!(event.is_some_and(|ev| ev.extended));
    }

    #[test]
    fn decoded_codes_never_carry_the_break_bit(stream in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut decoder = ScancodeDecoder::new();
        for byte in stream {
            if let Some(event) = decoder.feed(byte) {
                prop_assert_eq!(event.code & regs::BREAK_BIT, 0);
            }
        }
    }

    #[test]
    fn every_non_prefix_byte_decodes_to_one_event(stream in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut decoder = ScancodeDecoder::new();
        let mut events = 0usize;
        let mut armed = false;
        let mut expected = 0usize;
        for &byte in &stream {
            // Reference count: a prefix in normal state is silent, anything
            // else produces exactly one event.
            if !armed && byte == regs::EXTENDED_PREFIX {
                armed = true;
            } else {
                armed = false;
                expected += 1;
            }
            if decoder.feed(byte).is_some() {
                events += 1;
            }
        }
        prop_assert_eq!(events, expected);
    }

    #[test]
    fn arbitrary_streams_never_emit_overflowed_packets(
        stream in prop::collection::vec(any::<u8>(), 0..128),
    ) {
        let mut framer = PacketFramer::new(ProtocolMode::Basic);
        for byte in stream {
            if let Some(packet) = framer.feed(byte) {
                prop_assert!(!packet.overflowed());
                prop_assert!(packet.dx.abs() <= 255 && packet.dy.abs() <= 255);
            }
        }
    }

    #[test]
    fn clean_packet_runs_are_delivered_losslessly(
        packets in prop::collection::vec(clean_packet_strategy(), 1..16),
    ) {
        let mut framer = PacketFramer::new(ProtocolMode::Basic);
        let mut delivered = 0usize;
        for packet in &packets {
            for &byte in packet {
                if framer.feed(byte).is_some() {
                    delivered += 1;
                }
            }
        }
        prop_assert_eq!(delivered, packets.len());
    }

    #[test]
    fn leading_garbage_costs_no_packets(
        garbage in garbage_strategy(),
        packets in prop::collection::vec(clean_packet_strategy(), 1..8),
    ) {
        let mut framer = PacketFramer::new(ProtocolMode::Basic);
        for byte in garbage {
            prop_assert!(framer.feed(byte).is_none(), "garbage must not frame");
        }
        let mut delivered = 0usize;
        for packet in &packets {
            for &byte in packet {
                if framer.feed(byte).is_some() {
                    delivered += 1;
                }
            }
        }
        prop_assert_eq!(delivered, packets.len());
    }

    #[test]
    fn delta_decoding_matches_the_twos_complement_reference(
        header in any::<u8>(),
        mag_x in any::<u8>(),
        mag_y in any::<u8>(),
    ) {
        let b0 = clean_header(header);
        let packet = MousePacket::parse(&[b0, mag_x, mag_y]);

        let reference = |mag: u8, sign: bool| -> i16 {
            match (sign, mag) {
                (false, _) => i16::from(mag),
                (true, 0) => 0,
                (true, _) => i16::from(mag) - 256,
            }
        };
        prop_assert_eq!(packet.dx, reference(mag_x, b0 & regs::MOUSE_X_SIGN != 0));
        prop_assert_eq!(packet.dy, reference(mag_y, b0 & regs::MOUSE_Y_SIGN != 0));
    }
}
