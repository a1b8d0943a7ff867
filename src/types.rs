use crate::orientation::Quaternion;
use crate::protocol;

/// How the controller is attached. Changes where IMU data sits in a full report.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Bluetooth = 0,
    Usb = 1,
}

impl Transport {
    /// Map a HID transport property string ("Bluetooth", "USB", ...) to a flavor.
    /// Anything that is not Bluetooth is treated as a wired connection.
    pub fn from_transport_str(transport: &str) -> Self {
        if transport.trim().eq_ignore_ascii_case("bluetooth") {
            Transport::Bluetooth
        } else {
            Transport::Usb
        }
    }

    /// Byte offset of the first IMU sample in a full-mode report.
    pub fn imu_offset(self) -> usize {
        match self {
            Transport::Bluetooth => protocol::IMU_OFFSET_BLUETOOTH,
            Transport::Usb => protocol::IMU_OFFSET_BLUETOOTH + protocol::USB_IMU_EXTRA_OFFSET,
        }
    }
}

/// Input report layout family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportMode {
    /// Report 0x3F, pushed on every button change.
    Simple,
    /// Report 0x30, pushed at ~60 Hz with IMU data.
    Full,
}

impl ReportMode {
    pub fn report_id(self) -> u8 {
        match self {
            ReportMode::Simple => protocol::REPORT_ID_SIMPLE,
            ReportMode::Full => protocol::REPORT_ID_FULL,
        }
    }

    /// Largest raw stick value this layout can carry.
    pub fn stick_max(self) -> u16 {
        match self {
            ReportMode::Simple => protocol::SIMPLE_STICK_MAX,
            ReportMode::Full => protocol::FULL_STICK_MAX,
        }
    }
}

bitflags::bitflags! {
    /// Every physical button the decoder understands.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Buttons: u32 {
        const A           = 1 << 0;
        const B           = 1 << 1;
        const X           = 1 << 2;
        const Y           = 1 << 3;
        const DPAD_UP     = 1 << 4;
        const DPAD_RIGHT  = 1 << 5;
        const DPAD_DOWN   = 1 << 6;
        const DPAD_LEFT   = 1 << 7;
        const LEFT_STICK  = 1 << 8;
        const RIGHT_STICK = 1 << 9;
        const L           = 1 << 10;
        const R           = 1 << 11;
        const ZL          = 1 << 12;
        const ZR          = 1 << 13;
        const PLUS        = 1 << 14;
        const MINUS       = 1 << 15;
        const HOME        = 1 << 16;
        const CAPTURE     = 1 << 17;
    }
}

/// The three raw button bytes of a report and the flags they decode to.
///
/// Only constructible from raw bytes, so the flags always agree with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ButtonFrame {
    mode: ReportMode,
    raw: [u8; 3],
    buttons: Buttons,
}

impl ButtonFrame {
    /// `raw` is `[main, secondary, dpad]` as laid out for `mode`.
    pub fn new(mode: ReportMode, raw: [u8; 3]) -> Self {
        let buttons = match mode {
            ReportMode::Simple => protocol::simple_buttons(raw),
            ReportMode::Full => protocol::full_buttons(raw),
        };
        Self { mode, raw, buttons }
    }

    pub fn mode(&self) -> ReportMode {
        self.mode
    }

    pub fn raw(&self) -> [u8; 3] {
        self.raw
    }

    pub fn buttons(&self) -> Buttons {
        self.buttons
    }

    pub fn is_pressed(&self, button: Buttons) -> bool {
        self.buttons.contains(button)
    }

    pub fn state(&self) -> ButtonState {
        ButtonState::from(self.buttons)
    }
}

/// Flattened button state delivered with `ButtonChanged`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
    pub dpad_up: bool,
    pub dpad_right: bool,
    pub dpad_down: bool,
    pub dpad_left: bool,
    pub left_stick: bool,
    pub right_stick: bool,
    /// L shoulder.
    pub l1: bool,
    /// R shoulder.
    pub r1: bool,
    /// ZL trigger.
    pub l2: bool,
    /// ZR trigger.
    pub r2: bool,
    pub plus: bool,
    pub minus: bool,
    pub home: bool,
    pub capture: bool,
}

impl From<Buttons> for ButtonState {
    fn from(b: Buttons) -> Self {
        Self {
            a: b.contains(Buttons::A),
            b: b.contains(Buttons::B),
            x: b.contains(Buttons::X),
            y: b.contains(Buttons::Y),
            dpad_up: b.contains(Buttons::DPAD_UP),
            dpad_right: b.contains(Buttons::DPAD_RIGHT),
            dpad_down: b.contains(Buttons::DPAD_DOWN),
            dpad_left: b.contains(Buttons::DPAD_LEFT),
            left_stick: b.contains(Buttons::LEFT_STICK),
            right_stick: b.contains(Buttons::RIGHT_STICK),
            l1: b.contains(Buttons::L),
            r1: b.contains(Buttons::R),
            l2: b.contains(Buttons::ZL),
            r2: b.contains(Buttons::ZR),
            plus: b.contains(Buttons::PLUS),
            minus: b.contains(Buttons::MINUS),
            home: b.contains(Buttons::HOME),
            capture: b.contains(Buttons::CAPTURE),
        }
    }
}

/// Raw stick positions plus the range they were sampled in.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StickFrame {
    pub left_x: u16,
    pub left_y: u16,
    pub right_x: u16,
    pub right_y: u16,
    pub stick_max: u16,
}

impl StickFrame {
    pub fn raw(&self) -> [u16; 4] {
        [self.left_x, self.left_y, self.right_x, self.right_y]
    }

    /// `[left_x, left_y, right_x, right_y]` mapped to roughly [-1, 1].
    pub fn normalized(&self) -> [f32; 4] {
        self.raw()
            .map(|v| protocol::normalize_stick(v, self.stick_max))
    }
}

/// One raw 6-axis sample, unscaled sensor units.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImuSample {
    pub gyro_pitch: i32,
    pub gyro_yaw: i32,
    pub gyro_roll: i32,
    pub accel_x: i32,
    pub accel_y: i32,
    pub accel_z: i32,
}

impl ImuSample {
    pub fn accel(&self) -> [f32; 3] {
        [self.accel_x as f32, self.accel_y as f32, self.accel_z as f32]
    }
}

/// Result of decoding one input report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedFrame {
    Simple {
        buttons: ButtonFrame,
        sticks: StickFrame,
    },
    Full {
        buttons: ButtonFrame,
        sticks: StickFrame,
        imu: ImuSample,
    },
    /// A report id this decoder does not interpret (subcommand replies, NFC/IR).
    Unknown { report_id: u8 },
}

impl DecodedFrame {
    pub fn buttons(&self) -> Option<&ButtonFrame> {
        match self {
            DecodedFrame::Simple { buttons, .. } | DecodedFrame::Full { buttons, .. } => {
                Some(buttons)
            }
            DecodedFrame::Unknown { .. } => None,
        }
    }

    pub fn sticks(&self) -> Option<&StickFrame> {
        match self {
            DecodedFrame::Simple { sticks, .. } | DecodedFrame::Full { sticks, .. } => {
                Some(sticks)
            }
            DecodedFrame::Unknown { .. } => None,
        }
    }

    pub fn imu(&self) -> Option<&ImuSample> {
        match self {
            DecodedFrame::Full { imu, .. } => Some(imu),
            _ => None,
        }
    }
}

/// Change notifications produced by a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    ButtonChanged(ButtonState),
    AnalogChanged(StickFrame),
    ImuChanged(ImuSample),
    /// Published (calibration-relative) orientation.
    OrientationChanged(Quaternion),
}

/// Nintendo controller models recognized during enumeration.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerKind {
    JoyConLeft = 0,
    JoyConRight = 1,
    ProController = 2,
    ChargingGrip = 3,
}

impl ControllerKind {
    pub fn from_product_id(pid: u16) -> Option<Self> {
        match pid {
            protocol::PID_JOYCON_LEFT => Some(ControllerKind::JoyConLeft),
            protocol::PID_JOYCON_RIGHT => Some(ControllerKind::JoyConRight),
            protocol::PID_PRO_CONTROLLER => Some(ControllerKind::ProController),
            protocol::PID_CHARGING_GRIP => Some(ControllerKind::ChargingGrip),
            _ => None,
        }
    }
}

/// Device identification gathered during enumeration.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial: Option<String>,
    pub kind: ControllerKind,
    pub transport: Transport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_from_str() {
        assert_eq!(Transport::from_transport_str("Bluetooth"), Transport::Bluetooth);
        assert_eq!(Transport::from_transport_str(" bluetooth "), Transport::Bluetooth);
        assert_eq!(Transport::from_transport_str("USB"), Transport::Usb);
        assert_eq!(Transport::from_transport_str("Unknown"), Transport::Usb);
    }

    #[test]
    fn test_imu_offsets() {
        assert_eq!(Transport::Bluetooth.imu_offset(), 13);
        assert_eq!(Transport::Usb.imu_offset(), 23);
    }

    #[test]
    fn test_button_state_from_flags() {
        let state = ButtonState::from(Buttons::X | Buttons::ZL | Buttons::HOME);
        assert!(state.x);
        assert!(state.l2);
        assert!(state.home);
        assert!(!state.a);
        assert!(!state.l1);
        assert!(!state.capture);
    }

    #[test]
    fn test_button_frame_is_pure_function_of_raw() {
        let a = ButtonFrame::new(ReportMode::Simple, [0x08, 0x02, 0x0F]);
        let b = ButtonFrame::new(ReportMode::Simple, [0x08, 0x02, 0x0F]);
        assert_eq!(a, b);
        assert_eq!(a.buttons(), Buttons::X | Buttons::PLUS);
    }

    #[test]
    fn test_controller_kind_from_pid() {
        assert_eq!(
            ControllerKind::from_product_id(0x2006),
            Some(ControllerKind::JoyConLeft)
        );
        assert_eq!(
            ControllerKind::from_product_id(0x2009),
            Some(ControllerKind::ProController)
        );
        assert_eq!(ControllerKind::from_product_id(0x1234), None);
    }

    #[test]
    fn test_stick_frame_normalized_center() {
        let sticks = StickFrame {
            left_x: 0x800,
            left_y: 0x800,
            right_x: 0x800,
            right_y: 0x800,
            stick_max: 0xFFF,
        };
        for v in sticks.normalized() {
            assert!(v.abs() < 1e-3);
        }
    }
}
