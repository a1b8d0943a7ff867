use crate::config::{EstimatorConfig, StreamConfig};
use crate::hid::HidTransport;
use crate::protocol::VID_NINTENDO;
use crate::session::Session;
use crate::stream::ControllerStream;
use crate::types::{ControllerKind, DeviceInfo, Transport};
use crate::{JoyconError, Result};
use hidapi::{BusType, HidApi};

fn create_hid_api() -> Result<HidApi> {
    let api = HidApi::new()?;
    #[cfg(target_os = "macos")]
    {
        // Keep HID opens shared on macOS to avoid seizing the interface.
        api.set_open_exclusive(false);
    }
    Ok(api)
}

fn transport_of(d: &hidapi::DeviceInfo) -> Transport {
    match d.bus_type() {
        BusType::Bluetooth => Transport::Bluetooth,
        _ => Transport::Usb,
    }
}

/// Match a hidapi DeviceInfo against the known Nintendo controllers.
fn to_device_info(d: &hidapi::DeviceInfo) -> Option<DeviceInfo> {
    if d.vendor_id() != VID_NINTENDO {
        return None;
    }
    let kind = ControllerKind::from_product_id(d.product_id())?;
    Some(DeviceInfo {
        path: d.path().to_string_lossy().into_owned(),
        vendor_id: d.vendor_id(),
        product_id: d.product_id(),
        serial: d.serial_number().map(str::to_string),
        kind,
        transport: transport_of(d),
    })
}

/// List all connected Joy-Cons and Pro Controllers.
pub fn list_devices() -> Result<Vec<DeviceInfo>> {
    let api = create_hid_api()?;
    Ok(api.device_list().filter_map(to_device_info).collect())
}

/// An opened controller ready for configuration and streaming.
pub struct Device {
    /// Keeps the platform HID context alive for the lifetime of the handle.
    api: HidApi,
    hid: HidTransport,
    info: DeviceInfo,
}

impl Device {
    /// Open the first available controller.
    pub fn open_first() -> Result<Device> {
        let api = create_hid_api()?;
        let (hid_info, info) = api
            .device_list()
            .find_map(|d| to_device_info(d).map(|info| (d.path().to_owned(), info)))
            .ok_or(JoyconError::DeviceNotFound)?;

        let device = api.open_path(&hid_info)?;
        Self::finish_open(api, device, info)
    }

    /// Open a specific controller by its enumeration info.
    pub fn open(info: &DeviceInfo) -> Result<Device> {
        let api = create_hid_api()?;
        let path = api
            .device_list()
            .find(|d| to_device_info(d).is_some() && d.path().to_string_lossy() == info.path)
            .map(|d| d.path().to_owned())
            .ok_or(JoyconError::DeviceNotFound)?;

        let device = api.open_path(&path)?;
        Self::finish_open(api, device, info.clone())
    }

    fn finish_open(api: HidApi, device: hidapi::HidDevice, info: DeviceInfo) -> Result<Device> {
        log::info!(
            "Opened {:?} over {:?}: PID={:04X} serial={}",
            info.kind,
            info.transport,
            info.product_id,
            info.serial.as_deref().unwrap_or("-")
        );
        Ok(Device {
            api,
            hid: HidTransport::new(device),
            info,
        })
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn transport(&self) -> Transport {
        self.info.transport
    }

    pub fn hid(&mut self) -> &mut HidTransport {
        &mut self.hid
    }

    /// Send the start-up subcommands: player lights, IMU and vibration enable,
    /// report mode.
    pub fn initialize(&mut self, config: &StreamConfig) -> Result<()> {
        if let Some(lights) = config.player_lights {
            self.hid.set_player_lights(lights)?;
        }
        if config.enable_imu {
            self.hid.enable_imu(true)?;
        }
        if config.enable_vibration {
            self.hid.enable_vibration(true)?;
        }
        self.hid.set_input_mode(config.report_mode)?;
        log::info!(
            "Initialized {:?}: mode={:?} imu={}",
            self.info.kind,
            config.report_mode,
            config.enable_imu
        );
        Ok(())
    }

    /// Initialize the controller and move it to a background reader thread.
    ///
    /// `session_id` identifies the session in logs and to consumers.
    pub fn start_stream(
        mut self,
        session_id: u32,
        estimator: EstimatorConfig,
        config: StreamConfig,
    ) -> Result<ControllerStream> {
        self.initialize(&config)?;
        let session = Session::new(session_id, self.info.transport, estimator);
        ControllerStream::start(self.hid, self.api, session, config)
    }
}
