use crate::types::{
    ButtonFrame, Buttons, DecodedFrame, ImuSample, ReportMode, StickFrame, Transport,
};
use crate::{JoyconError, Result};

// -- USB identifiers --
pub const VID_NINTENDO: u16 = 0x057E;
pub const PID_JOYCON_LEFT: u16 = 0x2006;
pub const PID_JOYCON_RIGHT: u16 = 0x2007;
pub const PID_PRO_CONTROLLER: u16 = 0x2009;
pub const PID_CHARGING_GRIP: u16 = 0x200E;

// -- Input report ids --
pub const REPORT_ID_SUBCOMMAND_REPLY: u8 = 0x21;
pub const REPORT_ID_FULL: u8 = 0x30;
pub const REPORT_ID_FULL_NFC_IR: u8 = 0x31;
pub const REPORT_ID_SIMPLE: u8 = 0x3F;

// -- Input report geometry --
pub const SIMPLE_REPORT_MIN_LEN: usize = 12;
pub const IMU_OFFSET_BLUETOOTH: usize = 13;
/// Extra bytes a wired connection inserts before the IMU block.
pub const USB_IMU_EXTRA_OFFSET: usize = 10;
/// accel x/y/z then gyro pitch/yaw/roll, 6 x i16 LE.
pub const IMU_SAMPLE_LEN: usize = 12;
pub const SIMPLE_STICK_MAX: u16 = 0xFFFF;
pub const FULL_STICK_MAX: u16 = 0x0FFF;

// -- Output reports --
pub const OUTPUT_REPORT_ID_SUBCOMMAND: u8 = 0x01;
pub const OUTPUT_REPORT_SIZE: usize = 49;
/// Neutral rumble for both motors, sent with every subcommand.
pub const NEUTRAL_RUMBLE: [u8; 8] = [0x00, 0x01, 0x40, 0x40, 0x00, 0x01, 0x40, 0x40];
/// Rumble-only output report: `[0x10, counter, left x4, right x4]`.
pub const OUTPUT_REPORT_ID_RUMBLE: u8 = 0x10;
pub const RUMBLE_REPORT_SIZE: usize = 10;
/// Per-motor rumble data for a fixed low buzz.
pub const RUMBLE_ON: [u8; 4] = [0x00, 0x10, 0x40, 0x40];

// -- Subcommand ids --
pub const SUBCMD_SET_INPUT_MODE: u8 = 0x03;
pub const SUBCMD_SET_PLAYER_LIGHTS: u8 = 0x30;
pub const SUBCMD_ENABLE_IMU: u8 = 0x40;
pub const SUBCMD_ENABLE_VIBRATION: u8 = 0x48;

/// Simple mode main byte: face buttons low nibble, shoulders high nibble.
const SIMPLE_MAIN_BITS: [(u8, Buttons); 8] = [
    (0x01, Buttons::B),
    (0x02, Buttons::A),
    (0x04, Buttons::Y),
    (0x08, Buttons::X),
    (0x10, Buttons::L),
    (0x20, Buttons::R),
    (0x40, Buttons::ZL),
    (0x80, Buttons::ZR),
];

/// Full mode byte 3: face buttons low nibble, right shoulders high nibble.
const FULL_MAIN_BITS: [(u8, Buttons); 6] = [
    (0x01, Buttons::Y),
    (0x02, Buttons::X),
    (0x04, Buttons::B),
    (0x08, Buttons::A),
    (0x40, Buttons::R),
    (0x80, Buttons::ZR),
];

/// Full mode byte 5 high nibble: left shoulders.
const FULL_LEFT_SHOULDER_BITS: [(u8, Buttons); 2] = [(0x40, Buttons::L), (0x80, Buttons::ZL)];

fn flags_from_bits(byte: u8, table: &[(u8, Buttons)]) -> Buttons {
    table
        .iter()
        .filter(|(mask, _)| byte & mask == *mask)
        .fold(Buttons::empty(), |acc, (_, flag)| acc | *flag)
}

/// Simple mode hat code: 0 = up, then clockwise in eighth turns.
pub fn simple_dpad(code: u8) -> Buttons {
    match code & 0x0F {
        0 => Buttons::DPAD_UP,
        1 => Buttons::DPAD_UP | Buttons::DPAD_RIGHT,
        2 => Buttons::DPAD_RIGHT,
        3 => Buttons::DPAD_RIGHT | Buttons::DPAD_DOWN,
        4 => Buttons::DPAD_DOWN,
        5 => Buttons::DPAD_DOWN | Buttons::DPAD_LEFT,
        6 => Buttons::DPAD_LEFT,
        7 => Buttons::DPAD_LEFT | Buttons::DPAD_UP,
        _ => Buttons::empty(),
    }
}

/// Full mode direction code from the low nibble of byte 5.
pub fn full_dpad(code: u8) -> Buttons {
    match code & 0x0F {
        0x2 => Buttons::DPAD_UP,
        0x6 => Buttons::DPAD_UP | Buttons::DPAD_RIGHT,
        0x4 => Buttons::DPAD_RIGHT,
        0x5 => Buttons::DPAD_RIGHT | Buttons::DPAD_DOWN,
        0x1 => Buttons::DPAD_DOWN,
        0x9 => Buttons::DPAD_DOWN | Buttons::DPAD_LEFT,
        0x8 => Buttons::DPAD_LEFT,
        0xA => Buttons::DPAD_UP | Buttons::DPAD_LEFT,
        _ => Buttons::empty(),
    }
}

/// Secondary byte: each nibble holds at most one button, matched by equality.
fn secondary_buttons(byte: u8, low: [Buttons; 4]) -> Buttons {
    let low = match byte & 0x0F {
        0x01 => low[0],
        0x02 => low[1],
        0x04 => low[2],
        0x08 => low[3],
        _ => Buttons::empty(),
    };
    let high = match byte & 0xF0 {
        0x10 => Buttons::HOME,
        0x20 => Buttons::CAPTURE,
        _ => Buttons::empty(),
    };
    low | high
}

/// Decode `[main, secondary, dpad]` from a simple (0x3F) report.
pub fn simple_buttons(raw: [u8; 3]) -> Buttons {
    flags_from_bits(raw[0], &SIMPLE_MAIN_BITS)
        | secondary_buttons(
            raw[1],
            [Buttons::MINUS, Buttons::PLUS, Buttons::LEFT_STICK, Buttons::RIGHT_STICK],
        )
        | simple_dpad(raw[2])
}

/// Decode `[byte3, byte4, byte5]` from a full (0x30) report.
pub fn full_buttons(raw: [u8; 3]) -> Buttons {
    flags_from_bits(raw[0], &FULL_MAIN_BITS)
        | secondary_buttons(
            raw[1],
            [Buttons::MINUS, Buttons::PLUS, Buttons::RIGHT_STICK, Buttons::LEFT_STICK],
        )
        | flags_from_bits(raw[2], &FULL_LEFT_SHOULDER_BITS)
        | full_dpad(raw[2])
}

/// Map a raw stick value to roughly [-1, 1] around the middle of `stick_max`.
/// A zero `stick_max` is treated as 1.
pub fn normalize_stick(raw: u16, stick_max: u16) -> f32 {
    let max = stick_max.max(1) as f32;
    let center = max / 2.0;
    let span = center.max(1.0);
    (raw as f32 - center) / span
}

/// Minimum buffer length for a report id, or `None` if the id is not decoded.
pub fn min_report_len(report_id: u8, transport: Transport) -> Option<usize> {
    match report_id {
        REPORT_ID_SIMPLE => Some(SIMPLE_REPORT_MIN_LEN),
        REPORT_ID_FULL => Some(transport.imu_offset() + IMU_SAMPLE_LEN),
        _ => None,
    }
}

fn read_u16_le(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn read_i16_le(data: &[u8], at: usize) -> i32 {
    i16::from_le_bytes([data[at], data[at + 1]]) as i32
}

/// Unpack two 12-bit values from three bytes: `x = b0 | (b1 & 0xF) << 8`,
/// `y = b1 >> 4 | b2 << 4`.
pub fn unpack_stick12(bytes: [u8; 3]) -> (u16, u16) {
    let x = (bytes[1] as u16 & 0x0F) << 8 | bytes[0] as u16;
    let y = (bytes[2] as u16) << 4 | (bytes[1] as u16 & 0xF0) >> 4;
    (x, y)
}

/// Decode one raw input report.
///
/// Report layout by id:
/// - `0x3F` simple: `[1]` main, `[2]` secondary, `[3]` hat, `[4..12]` 4x u16 LE sticks
/// - `0x30` full: `[3..6]` buttons, `[6..12]` 2x packed 12-bit sticks (Y inverted),
///   IMU block at [`Transport::imu_offset`]
///
/// Other ids decode to [`DecodedFrame::Unknown`]. Buffers too short for their
/// id are rejected with [`JoyconError::MalformedReport`].
pub fn decode(data: &[u8], transport: Transport) -> Result<DecodedFrame> {
    let Some(&report_id) = data.first() else {
        return Err(JoyconError::MalformedReport {
            report_id: 0,
            len: 0,
            min: 1,
        });
    };

    let Some(min) = min_report_len(report_id, transport) else {
        return Ok(DecodedFrame::Unknown { report_id });
    };
    if data.len() < min {
        return Err(JoyconError::MalformedReport {
            report_id,
            len: data.len(),
            min,
        });
    }

    match report_id {
        REPORT_ID_SIMPLE => Ok(decode_simple(data)),
        _ => Ok(decode_full(data, transport)),
    }
}

fn decode_simple(data: &[u8]) -> DecodedFrame {
    let buttons = ButtonFrame::new(ReportMode::Simple, [data[1], data[2], data[3] & 0x0F]);
    let sticks = StickFrame {
        left_x: read_u16_le(data, 4),
        left_y: read_u16_le(data, 6),
        right_x: read_u16_le(data, 8),
        right_y: read_u16_le(data, 10),
        stick_max: SIMPLE_STICK_MAX,
    };
    DecodedFrame::Simple { buttons, sticks }
}

fn decode_full(data: &[u8], transport: Transport) -> DecodedFrame {
    let buttons = ButtonFrame::new(ReportMode::Full, [data[3], data[4], data[5]]);

    let (left_x, left_y) = unpack_stick12([data[6], data[7], data[8]]);
    let (right_x, right_y) = unpack_stick12([data[9], data[10], data[11]]);
    let sticks = StickFrame {
        left_x,
        left_y: FULL_STICK_MAX - left_y,
        right_x,
        right_y: FULL_STICK_MAX - right_y,
        stick_max: FULL_STICK_MAX,
    };

    // Only the first of the three IMU frames in the report is used.
    let at = transport.imu_offset();
    let imu = ImuSample {
        accel_x: read_i16_le(data, at),
        accel_y: read_i16_le(data, at + 2),
        accel_z: read_i16_le(data, at + 4),
        gyro_pitch: read_i16_le(data, at + 6),
        gyro_yaw: read_i16_le(data, at + 8),
        gyro_roll: read_i16_le(data, at + 10),
    };

    DecodedFrame::Full {
        buttons,
        sticks,
        imu,
    }
}

/// Build a subcommand output report.
/// Format: `[0x01, counter, neutral rumble x8, subcmd, args..., 0x00 padding...]`
pub fn build_subcommand(counter: u8, subcmd: u8, args: &[u8]) -> [u8; OUTPUT_REPORT_SIZE] {
    let mut buf = [0u8; OUTPUT_REPORT_SIZE];
    buf[0] = OUTPUT_REPORT_ID_SUBCOMMAND;
    buf[1] = counter;
    buf[2..10].copy_from_slice(&NEUTRAL_RUMBLE);
    buf[10] = subcmd;
    let len = args.len().min(OUTPUT_REPORT_SIZE - 11);
    buf[11..11 + len].copy_from_slice(&args[..len]);
    buf
}

/// Switch the controller to pushing `mode` input reports.
pub fn build_set_input_mode_cmd(counter: u8, mode: ReportMode) -> [u8; OUTPUT_REPORT_SIZE] {
    build_subcommand(counter, SUBCMD_SET_INPUT_MODE, &[mode.report_id()])
}

/// Turn the 6-axis sensor on or off.
pub fn build_enable_imu_cmd(counter: u8, enable: bool) -> [u8; OUTPUT_REPORT_SIZE] {
    build_subcommand(counter, SUBCMD_ENABLE_IMU, &[if enable { 1 } else { 0 }])
}

/// Set the four player LEDs. Low nibble is solid, high nibble is flashing.
pub fn build_player_lights_cmd(counter: u8, lights: u8) -> [u8; OUTPUT_REPORT_SIZE] {
    build_subcommand(counter, SUBCMD_SET_PLAYER_LIGHTS, &[lights])
}

/// Allow or block the rumble motors.
pub fn build_enable_vibration_cmd(counter: u8, enable: bool) -> [u8; OUTPUT_REPORT_SIZE] {
    build_subcommand(counter, SUBCMD_ENABLE_VIBRATION, &[if enable { 1 } else { 0 }])
}

/// Rumble report driving each motor either at `RUMBLE_ON` or neutral.
/// Only has an effect after vibration has been enabled.
pub fn build_rumble_cmd(counter: u8, left: bool, right: bool) -> [u8; RUMBLE_REPORT_SIZE] {
    let motor = |on: bool| if on { RUMBLE_ON } else { [0x00, 0x01, 0x40, 0x40] };
    let mut buf = [0u8; RUMBLE_REPORT_SIZE];
    buf[0] = OUTPUT_REPORT_ID_RUMBLE;
    buf[1] = counter;
    buf[2..6].copy_from_slice(&motor(left));
    buf[6..10].copy_from_slice(&motor(right));
    buf
}
