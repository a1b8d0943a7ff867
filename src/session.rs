use crate::config::EstimatorConfig;
use crate::diff::{ChangeSet, StateDiffer};
use crate::orientation::{OrientationEstimator, Quaternion};
use crate::protocol;
use crate::types::{ButtonFrame, DecodedFrame, ImuSample, SessionEvent, StickFrame, Transport};
use crate::Result;
use crossbeam_channel::{Receiver, Sender};

type Callback = Box<dyn FnMut(&SessionEvent) + Send>;

/// All per-controller state: previous frames, the orientation filter and the
/// subscribers that receive change events.
///
/// A session is single-writer: reports and calibration must be applied from
/// one place, in order. Wrap it in a mutex or hand it to a
/// [`ControllerStream`](crate::ControllerStream) to share it.
pub struct Session {
    id: u32,
    transport: Transport,
    differ: StateDiffer,
    estimator: OrientationEstimator,
    subscribers: Vec<Sender<SessionEvent>>,
    callbacks: Vec<Callback>,
    reports: u64,
    malformed: u64,
}

impl Session {
    pub fn new(id: u32, transport: Transport, config: EstimatorConfig) -> Self {
        Self {
            id,
            transport,
            differ: StateDiffer::new(),
            estimator: OrientationEstimator::new(config),
            subscribers: Vec::new(),
            callbacks: Vec::new(),
            reports: 0,
            malformed: 0,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// New unbounded event receiver. Dropped receivers are pruned on the next emit.
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.subscribers.push(sender);
        receiver
    }

    /// Forward events into an existing channel.
    pub fn subscribe_sender(&mut self, sender: Sender<SessionEvent>) {
        self.subscribers.push(sender);
    }

    /// Register a callback invoked synchronously for every event.
    pub fn on_event<F>(&mut self, callback: F)
    where
        F: FnMut(&SessionEvent) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Decode one raw report and apply it.
    ///
    /// Malformed reports are rejected before any state changes. Unknown
    /// report ids are ignored and yield no events.
    pub fn handle_report(&mut self, data: &[u8]) -> Result<Vec<SessionEvent>> {
        let frame = match protocol::decode(data, self.transport) {
            Ok(frame) => frame,
            Err(e) => {
                self.malformed += 1;
                log::warn!("Session {}: rejected report: {}", self.id, e);
                return Err(e);
            }
        };
        self.reports += 1;
        Ok(self.apply(&frame))
    }

    /// Apply an already decoded frame.
    pub fn apply(&mut self, frame: &DecodedFrame) -> Vec<SessionEvent> {
        if let DecodedFrame::Unknown { report_id } = frame {
            log::debug!(
                "Session {}: ignoring report 0x{:02x}",
                self.id,
                report_id
            );
            return Vec::new();
        }

        let changes = self.differ.diff(frame);
        let mut events: Vec<SessionEvent> = changes.events().collect();

        // Every full frame advances the filter, changed or not.
        if let Some(imu) = frame.imu() {
            let q = self.estimator.update(imu);
            events.push(SessionEvent::OrientationChanged(q));
        }

        self.emit(&events);
        events
    }

    /// Like [`apply`](Self::apply) but returns which state kinds changed.
    pub fn apply_changes(&mut self, frame: &DecodedFrame) -> ChangeSet {
        ChangeSet::from_events(&self.apply(frame))
    }

    /// Zero the published orientation at the current pose.
    pub fn calibrate(&mut self) -> Quaternion {
        let q = self.estimator.calibrate();
        log::info!("Session {}: calibrated", self.id);
        self.emit(&[SessionEvent::OrientationChanged(q)]);
        q
    }

    fn emit(&mut self, events: &[SessionEvent]) {
        if events.is_empty() {
            return;
        }
        for callback in &mut self.callbacks {
            for event in events {
                callback(event);
            }
        }
        self.subscribers.retain(|sender| {
            events.iter().all(|event| sender.send(*event).is_ok())
        });
    }

    pub fn orientation(&self) -> Quaternion {
        self.estimator.orientation()
    }

    pub fn raw_orientation(&self) -> Quaternion {
        self.estimator.raw_orientation()
    }

    pub fn gyro_bias(&self) -> [f32; 3] {
        self.estimator.gyro_bias()
    }

    pub fn is_calibrated(&self) -> bool {
        self.estimator.is_calibrated()
    }

    pub fn estimator(&self) -> &OrientationEstimator {
        &self.estimator
    }

    pub fn buttons(&self) -> Option<&ButtonFrame> {
        self.differ.buttons()
    }

    pub fn sticks(&self) -> Option<&StickFrame> {
        self.differ.sticks()
    }

    pub fn imu(&self) -> Option<&ImuSample> {
        self.differ.imu()
    }

    /// Reports accepted (including unknown ids).
    pub fn report_count(&self) -> u64 {
        self.reports
    }

    /// Reports rejected as malformed.
    pub fn malformed_count(&self) -> u64 {
        self.malformed
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("transport", &self.transport)
            .field("reports", &self.reports)
            .field("malformed", &self.malformed)
            .field("subscribers", &self.subscribers.len())
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn full_report(gyro_roll: i16) -> Vec<u8> {
        let mut data = vec![0u8; 25];
        data[0] = protocol::REPORT_ID_FULL;
        data[6..12].copy_from_slice(&[0x00, 0x08, 0x80, 0x00, 0x08, 0x80]);
        data[17..19].copy_from_slice(&4096i16.to_le_bytes());
        data[23..25].copy_from_slice(&gyro_roll.to_le_bytes());
        data
    }

    #[test]
    fn test_malformed_report_leaves_state_untouched() {
        let mut session = Session::new(1, Transport::Bluetooth, EstimatorConfig::default());
        let rx = session.subscribe();
        assert!(session.handle_report(&[0x30, 0x00]).is_err());
        assert!(session.buttons().is_none());
        assert_eq!(session.malformed_count(), 1);
        assert_eq!(session.report_count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unknown_report_is_silent() {
        let mut session = Session::new(1, Transport::Bluetooth, EstimatorConfig::default());
        let events = session.handle_report(&[0x21, 0, 0, 0]).unwrap();
        assert!(events.is_empty());
        assert_eq!(session.report_count(), 1);
    }

    #[test]
    fn test_full_report_emits_all_kinds() {
        let mut session = Session::new(7, Transport::Bluetooth, EstimatorConfig::default());
        let rx = session.subscribe();
        let events = session.handle_report(&full_report(0)).unwrap();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], SessionEvent::ButtonChanged(_)));
        assert!(matches!(events[1], SessionEvent::AnalogChanged(_)));
        assert!(matches!(events[2], SessionEvent::ImuChanged(_)));
        assert!(matches!(events[3], SessionEvent::OrientationChanged(_)));
        assert_eq!(rx.try_iter().count(), 4);

        // Same report again: only the filter step is published.
        let events = session.handle_report(&full_report(0)).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SessionEvent::OrientationChanged(_)));
    }

    #[test]
    fn test_callbacks_and_dropped_subscribers() {
        let mut session = Session::new(1, Transport::Bluetooth, EstimatorConfig::default());
        let seen = Arc::new(Mutex::new(0usize));
        let seen_cb = seen.clone();
        session.on_event(move |_| *seen_cb.lock().unwrap() += 1);

        let rx = session.subscribe();
        drop(rx);
        session.handle_report(&full_report(10)).unwrap();
        assert_eq!(*seen.lock().unwrap(), 4);
        assert_eq!(session.subscribers.len(), 0);
    }

    #[test]
    fn test_calibrate_emits_identity() {
        let mut session = Session::new(1, Transport::Bluetooth, EstimatorConfig::default());
        for _ in 0..20 {
            session.handle_report(&full_report(300)).unwrap();
        }
        assert!(session.orientation().angle() > 0.05);

        let rx = session.subscribe();
        let q = session.calibrate();
        assert!(q.angle() < 1e-3);
        assert!(session.is_calibrated());
        match rx.try_recv() {
            Ok(SessionEvent::OrientationChanged(p)) => assert_eq!(p, q),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_apply_changes_mask() {
        let mut session = Session::new(1, Transport::Bluetooth, EstimatorConfig::default());
        let frame = protocol::decode(&full_report(0), Transport::Bluetooth).unwrap();
        assert_eq!(session.apply_changes(&frame).mask(), 0b111);
        assert_eq!(session.apply_changes(&frame).mask(), 0);
    }
}
