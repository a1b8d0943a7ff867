use crate::protocol;
use crate::types::ReportMode;
use crate::{JoyconError, Result};
use hidapi::HidDevice;

/// HID transport layer for one controller.
///
/// Owns the output-report packet counter. The controller expects it to
/// advance (wrapping) with every output report.
pub struct HidTransport {
    device: HidDevice,
    packet_counter: u8,
}

impl HidTransport {
    pub fn new(device: HidDevice) -> Self {
        Self {
            device,
            packet_counter: 0,
        }
    }

    /// Consume the transport and return the inner HID device handle.
    pub fn into_device(self) -> HidDevice {
        self.device
    }

    pub fn device(&self) -> &HidDevice {
        &self.device
    }

    pub fn packet_counter(&self) -> u8 {
        self.packet_counter
    }

    fn next_counter(&mut self) -> u8 {
        let counter = self.packet_counter;
        self.packet_counter = self.packet_counter.wrapping_add(1);
        counter
    }

    fn write(&self, buf: &[u8], what: &str) -> Result<()> {
        self.device
            .write(buf)
            .map_err(|e| JoyconError::HidCommand(format!("{} failed: {}", what, e)))?;

        // Let the controller process the subcommand before the next one.
        std::thread::sleep(std::time::Duration::from_millis(20));
        Ok(())
    }

    /// Send an arbitrary subcommand with the next packet counter.
    pub fn send_subcommand(&mut self, subcmd: u8, args: &[u8]) -> Result<()> {
        let counter = self.next_counter();
        let buf = protocol::build_subcommand(counter, subcmd, args);
        self.write(&buf, &format!("subcommand 0x{:02x}", subcmd))
    }

    /// Turn the 6-axis sensor on or off.
    pub fn enable_imu(&mut self, enable: bool) -> Result<()> {
        let buf = protocol::build_enable_imu_cmd(self.next_counter(), enable);
        self.write(&buf, "enable IMU")
    }

    /// Select which input report layout the controller pushes.
    pub fn set_input_mode(&mut self, mode: ReportMode) -> Result<()> {
        let buf = protocol::build_set_input_mode_cmd(self.next_counter(), mode);
        self.write(&buf, "set input mode")
    }

    pub fn set_player_lights(&mut self, lights: u8) -> Result<()> {
        let buf = protocol::build_player_lights_cmd(self.next_counter(), lights);
        self.write(&buf, "set player lights")
    }

    /// Allow or block the rumble motors. Off by default on most firmware.
    pub fn enable_vibration(&mut self, enable: bool) -> Result<()> {
        let buf = protocol::build_enable_vibration_cmd(self.next_counter(), enable);
        self.write(&buf, "enable vibration")
    }

    /// Buzz the left and/or right motor. `(false, false)` stops both.
    pub fn set_rumble(&mut self, left: bool, right: bool) -> Result<()> {
        let buf = protocol::build_rumble_cmd(self.next_counter(), left, right);
        self.write(&buf, "rumble")
    }

    /// Read one input report. Returns 0 on timeout.
    pub fn read_report(&self, buf: &mut [u8], timeout_ms: i32) -> Result<usize> {
        Ok(self.device.read_timeout(buf, timeout_ms)?)
    }
}
