use crate::types::{ButtonFrame, ButtonState, DecodedFrame, ImuSample, SessionEvent, StickFrame};

/// Changes detected between one decoded frame and the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChangeSet {
    pub buttons: Option<ButtonState>,
    pub analog: Option<StickFrame>,
    pub imu: Option<ImuSample>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.buttons.is_none() && self.analog.is_none() && self.imu.is_none()
    }

    /// Bit 0 buttons, bit 1 analog, bit 2 IMU.
    pub fn mask(&self) -> u32 {
        (self.buttons.is_some() as u32)
            | (self.analog.is_some() as u32) << 1
            | (self.imu.is_some() as u32) << 2
    }

    /// Collect the state changes carried by `events`. Orientation events are
    /// not state changes and are skipped.
    pub fn from_events(events: &[SessionEvent]) -> Self {
        let mut changes = Self::default();
        for event in events {
            match *event {
                SessionEvent::ButtonChanged(b) => changes.buttons = Some(b),
                SessionEvent::AnalogChanged(s) => changes.analog = Some(s),
                SessionEvent::ImuChanged(i) => changes.imu = Some(i),
                SessionEvent::OrientationChanged(_) => {}
            }
        }
        changes
    }

    /// Events in emission order: buttons, analog, IMU.
    pub fn events(&self) -> impl Iterator<Item = SessionEvent> {
        let buttons = self.buttons.map(SessionEvent::ButtonChanged);
        let analog = self.analog.map(SessionEvent::AnalogChanged);
        let imu = self.imu.map(SessionEvent::ImuChanged);
        buttons.into_iter().chain(analog).chain(imu)
    }
}

/// Remembers the last decoded values and reports what changed.
///
/// Nothing has been seen before the first frame, so the first frame of each
/// kind always counts as a change. Previous values are replaced on every
/// frame whether or not anything changed.
#[derive(Debug, Clone, Default)]
pub struct StateDiffer {
    buttons: Option<ButtonFrame>,
    sticks: Option<StickFrame>,
    imu: Option<ImuSample>,
}

impl StateDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `frame` with the stored state, then store it.
    /// Unknown frames change nothing.
    pub fn diff(&mut self, frame: &DecodedFrame) -> ChangeSet {
        let mut changes = ChangeSet::default();

        if let Some(buttons) = frame.buttons() {
            // The same bytes decode differently per layout, so the mode counts too.
            if self.buttons.as_ref() != Some(buttons) {
                changes.buttons = Some(buttons.state());
            }
            self.buttons = Some(*buttons);
        }

        if let Some(sticks) = frame.sticks() {
            if self.sticks.as_ref() != Some(sticks) {
                changes.analog = Some(*sticks);
            }
            self.sticks = Some(*sticks);
        }

        if let Some(imu) = frame.imu() {
            if self.imu.as_ref() != Some(imu) {
                changes.imu = Some(*imu);
            }
            self.imu = Some(*imu);
        }

        changes
    }

    pub fn buttons(&self) -> Option<&ButtonFrame> {
        self.buttons.as_ref()
    }

    pub fn sticks(&self) -> Option<&StickFrame> {
        self.sticks.as_ref()
    }

    pub fn imu(&self) -> Option<&ImuSample> {
        self.imu.as_ref()
    }

    /// Forget everything; the next frame reports as changed again.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
