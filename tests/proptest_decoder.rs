//! Property-based tests for input report decoding and stick normalisation.

use joycon_motion::protocol::{
    self, FULL_STICK_MAX, REPORT_ID_FULL, REPORT_ID_SIMPLE, SIMPLE_REPORT_MIN_LEN,
};
use joycon_motion::{decode, normalize_stick, Buttons, DecodedFrame, JoyconError, Transport};
use proptest::prelude::*;

fn arb_transport() -> impl Strategy<Value = Transport> {
    prop_oneof![Just(Transport::Bluetooth), Just(Transport::Usb)]
}

/// Expected `[up, right, down, left]` for every simple-mode hat code.
const SIMPLE_DPAD_TRUTH: [[bool; 4]; 16] = [
    [true, false, false, false],
    [true, true, false, false],
    [false, true, false, false],
    [false, true, true, false],
    [false, false, true, false],
    [false, false, true, true],
    [false, false, false, true],
    [true, false, false, true],
    [false; 4],
    [false; 4],
    [false; 4],
    [false; 4],
    [false; 4],
    [false; 4],
    [false; 4],
    [false; 4],
];

/// Expected `[up, right, down, left]` for every full-mode direction nibble.
const FULL_DPAD_TRUTH: [[bool; 4]; 16] = [
    [false; 4],                  // 0x0
    [false, false, true, false], // 0x1 down
    [true, false, false, false], // 0x2 up
    [false; 4],                  // 0x3
    [false, true, false, false], // 0x4 right
    [false, true, true, false],  // 0x5 right + down
    [true, true, false, false],  // 0x6 up + right
    [false; 4],                  // 0x7
    [false, false, false, true], // 0x8 left
    [false, false, true, true],  // 0x9 down + left
    [true, false, false, true],  // 0xA up + left
    [false; 4],                  // 0xB
    [false; 4],                  // 0xC
    [false; 4],                  // 0xD
    [false; 4],                  // 0xE
    [false; 4],                  // 0xF
];

fn dpad_of(frame: &DecodedFrame) -> [bool; 4] {
    let s = frame.buttons().expect("frame has buttons").state();
    [s.dpad_up, s.dpad_right, s.dpad_down, s.dpad_left]
}

#[test]
fn simple_dpad_matches_truth_table() {
    for code in 0u8..16 {
        let mut data = [0u8; 12];
        data[0] = REPORT_ID_SIMPLE;
        // High nibble of byte 3 must not leak into the hat code.
        data[3] = 0xF0 | code;
        let frame = decode(&data, Transport::Bluetooth).unwrap();
        assert_eq!(dpad_of(&frame), SIMPLE_DPAD_TRUTH[code as usize], "code {code}");
    }
}

#[test]
fn full_dpad_matches_truth_table() {
    for code in 0u8..16 {
        let mut data = [0u8; 25];
        data[0] = REPORT_ID_FULL;
        data[5] = code;
        let frame = decode(&data, Transport::Bluetooth).unwrap();
        assert_eq!(dpad_of(&frame), FULL_DPAD_TRUTH[code as usize], "code {code:#x}");
        // Direction codes never set the left shoulder bits.
        let buttons = frame.buttons().unwrap().buttons();
        assert!(!buttons.intersects(Buttons::L | Buttons::ZL));
    }
}

#[test]
fn face_button_nibbles_match_layouts() {
    for nibble in 0u8..16 {
        let simple = protocol::simple_buttons([nibble, 0, 8]);
        assert_eq!(simple.contains(Buttons::B), nibble & 0x01 != 0);
        assert_eq!(simple.contains(Buttons::A), nibble & 0x02 != 0);
        assert_eq!(simple.contains(Buttons::Y), nibble & 0x04 != 0);
        assert_eq!(simple.contains(Buttons::X), nibble & 0x08 != 0);

        let full = protocol::full_buttons([nibble, 0, 0]);
        assert_eq!(full.contains(Buttons::Y), nibble & 0x01 != 0);
        assert_eq!(full.contains(Buttons::X), nibble & 0x02 != 0);
        assert_eq!(full.contains(Buttons::B), nibble & 0x04 != 0);
        assert_eq!(full.contains(Buttons::A), nibble & 0x08 != 0);
    }
}

#[test]
fn shoulder_nibbles_match_layouts() {
    for nibble in 0u8..16 {
        let high = nibble << 4;
        let simple = protocol::simple_buttons([high, 0, 8]);
        assert_eq!(simple.contains(Buttons::L), high & 0x10 != 0);
        assert_eq!(simple.contains(Buttons::R), high & 0x20 != 0);
        assert_eq!(simple.contains(Buttons::ZL), high & 0x40 != 0);
        assert_eq!(simple.contains(Buttons::ZR), high & 0x80 != 0);

        let full = protocol::full_buttons([high, 0, high]);
        assert_eq!(full.contains(Buttons::R), high & 0x40 != 0);
        assert_eq!(full.contains(Buttons::ZR), high & 0x80 != 0);
        assert_eq!(full.contains(Buttons::L), high & 0x40 != 0);
        assert_eq!(full.contains(Buttons::ZL), high & 0x80 != 0);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Decoding never panics, whatever the bytes.
    #[test]
    fn prop_decode_never_panics(
        data in proptest::collection::vec(any::<u8>(), 0..80),
        transport in arb_transport(),
    ) {
        let _ = decode(&data, transport);
    }

    /// Decoded reports keep the id they were dispatched on.
    #[test]
    fn prop_known_ids_decode_when_long_enough(
        mut data in proptest::collection::vec(any::<u8>(), 35..80),
        full in any::<bool>(),
        transport in arb_transport(),
    ) {
        data[0] = if full { REPORT_ID_FULL } else { REPORT_ID_SIMPLE };
        let frame = decode(&data, transport).map_err(|e| TestCaseError::fail(format!("{e:?}")))?;
        match frame {
            DecodedFrame::Full { sticks, .. } => {
                prop_assert!(full);
                prop_assert_eq!(sticks.stick_max, FULL_STICK_MAX);
                for v in sticks.raw() {
                    prop_assert!(v <= FULL_STICK_MAX);
                }
            }
            DecodedFrame::Simple { sticks, .. } => {
                prop_assert!(!full);
                prop_assert_eq!(sticks.stick_max, 0xFFFF);
            }
            DecodedFrame::Unknown { .. } => prop_assert!(false, "known id decoded as unknown"),
        }
    }

    /// Buffers shorter than the layout are rejected.
    #[test]
    fn prop_short_buffers_rejected(
        full in any::<bool>(),
        transport in arb_transport(),
        fill in any::<u8>(),
        seed in any::<usize>(),
    ) {
        let id = if full { REPORT_ID_FULL } else { REPORT_ID_SIMPLE };
        let min = if full { transport.imu_offset() + 12 } else { SIMPLE_REPORT_MIN_LEN };
        let cut = 1 + seed % (min - 1);
        let mut data = vec![fill; cut];
        data[0] = id;
        let is_malformed = matches!(
            decode(&data, transport),
            Err(JoyconError::MalformedReport { .. })
        );
        prop_assert!(is_malformed);
    }

    /// Ids other than 0x30 and 0x3F are passed through as unknown.
    #[test]
    fn prop_other_ids_unknown(
        id in any::<u8>().prop_filter("decoded id", |id| *id != REPORT_ID_FULL && *id != REPORT_ID_SIMPLE),
        rest in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let mut data = vec![id];
        data.extend(rest);
        prop_assert_eq!(
            decode(&data, Transport::Bluetooth).ok(),
            Some(DecodedFrame::Unknown { report_id: id })
        );
    }

    /// The same raw bytes always decode to the same flags.
    #[test]
    fn prop_button_flags_are_pure(raw in any::<[u8; 3]>()) {
        prop_assert_eq!(protocol::simple_buttons(raw), protocol::simple_buttons(raw));
        prop_assert_eq!(protocol::full_buttons(raw), protocol::full_buttons(raw));
    }

    /// Normalised values stay in [-1, 1] for raw values within range.
    #[test]
    fn prop_normalize_range(max in 1u16..=u16::MAX, frac in 0.0f64..=1.0) {
        let raw = (max as f64 * frac).round() as u16;
        let n = normalize_stick(raw, max);
        prop_assert!((-1.0..=1.0).contains(&n), "normalize({raw}, {max}) = {n}");
    }

    /// The midpoint maps to zero, up to half a step for odd maxima.
    #[test]
    fn prop_normalize_center(max in 2u16..=u16::MAX) {
        let n = normalize_stick(max / 2, max);
        let half_step = 1.0 / (max as f32 / 2.0);
        prop_assert!(n.abs() <= half_step, "normalize({}, {max}) = {n}", max / 2);
    }
}

#[test]
fn normalize_extremes_12_bit() {
    let lsb = 1.0 / 2047.5;
    assert!((normalize_stick(0, 0x0FFF) + 1.0).abs() <= lsb);
    assert!((normalize_stick(0x0FFF, 0x0FFF) - 1.0).abs() <= lsb);
    assert_eq!(normalize_stick(0x8000, 0), normalize_stick(0x8000, 1));
}
