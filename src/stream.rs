use crate::config::StreamConfig;
use crate::hid::HidTransport;
use crate::orientation::Quaternion;
use crate::session::Session;
use crate::types::SessionEvent;
use crate::{JoyconError, Result};
use crossbeam_channel::{Receiver, Sender};
use hidapi::HidApi;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Consecutive read errors after which the controller is considered gone.
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 50;

/// Commands applied by the reader thread between reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamCommand {
    Calibrate,
}

/// Handle to a controller being read on a background thread.
///
/// The reader thread owns the [`Session`], so reports and calibration are
/// applied strictly in order from one place. Consumers get events over a
/// bounded channel and send commands over another.
pub struct ControllerStream {
    receiver: Receiver<SessionEvent>,
    commands: Sender<StreamCommand>,
    latest: Arc<Mutex<Quaternion>>,
    stop_flag: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl ControllerStream {
    /// Start the reader thread.
    ///
    /// `api` is kept alive on the reader thread for as long as `hid` is read.
    pub(crate) fn start(
        hid: HidTransport,
        api: HidApi,
        session: Session,
        config: StreamConfig,
    ) -> Result<ControllerStream> {
        let (sender, receiver) = crossbeam_channel::bounded(config.event_capacity);
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let latest = Arc::new(Mutex::new(session.orientation()));

        let reader = Reader {
            hid,
            _api: api,
            session,
            forwarder: EventForwarder::new(sender, latest.clone()),
            commands: command_rx,
            stop_flag: stop_flag.clone(),
            poll_timeout: config.poll_timeout,
        };

        let thread = std::thread::Builder::new()
            .name(format!("joycon-reader-{}", reader.session.id()))
            .spawn(move || reader.run())
            .map_err(|e| {
                JoyconError::HidCommand(format!("Failed to spawn reader thread: {}", e))
            })?;

        Ok(ControllerStream {
            receiver,
            commands: command_tx,
            latest,
            stop_flag,
            thread: Some(thread),
        })
    }

    /// Receive the next event (blocks until available).
    pub fn recv(&self) -> Result<SessionEvent> {
        self.receiver.recv().map_err(|_| JoyconError::StreamStopped)
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&self) -> Option<SessionEvent> {
        self.receiver.try_recv().ok()
    }

    /// Receive an event with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent> {
        self.receiver.recv_timeout(timeout).map_err(|e| match e {
            crossbeam_channel::RecvTimeoutError::Timeout => JoyconError::Timeout,
            crossbeam_channel::RecvTimeoutError::Disconnected => JoyconError::StreamStopped,
        })
    }

    /// Queue a calibration. It runs on the reader thread before the next report.
    pub fn calibrate(&self) -> Result<()> {
        self.commands
            .send(StreamCommand::Calibrate)
            .map_err(|_| JoyconError::ChannelDisconnected)
    }

    /// Most recent published orientation.
    pub fn orientation(&self) -> Quaternion {
        self.latest
            .lock()
            .map(|q| *q)
            .unwrap_or(Quaternion::IDENTITY)
    }

    /// Check if the reader thread is still running.
    pub fn is_active(&self) -> bool {
        !self.stop_flag.load(Ordering::Relaxed)
    }

    /// Stop the stream and wait for the reader thread to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ControllerStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Reader {
    hid: HidTransport,
    _api: HidApi,
    session: Session,
    forwarder: EventForwarder,
    commands: Receiver<StreamCommand>,
    stop_flag: Arc<AtomicBool>,
    poll_timeout: Duration,
}

impl Reader {
    fn run(mut self) {
        // Full-mode reports are 49 bytes over Bluetooth, 64 over USB.
        let mut buf = [0u8; 64];
        let timeout_ms = self.poll_timeout.as_millis().min(i32::MAX as u128) as i32;
        let mut read_errors = 0u32;

        log::info!("Reader for session {} started", self.session.id());

        loop {
            if self.stop_flag.load(Ordering::Relaxed) {
                log::info!("Reader stopping (stop flag set)");
                break;
            }

            while let Ok(command) = self.commands.try_recv() {
                match command {
                    StreamCommand::Calibrate => {
                        let q = self.session.calibrate();
                        self.forwarder.publish(&[SessionEvent::OrientationChanged(q)]);
                    }
                }
            }

            let len = match self.hid.read_report(&mut buf, timeout_ms) {
                Ok(0) => {
                    // Idle: retry anything held back while the consumer was behind.
                    if !self.forwarder.publish(&[]) {
                        log::info!("Event channel disconnected, stopping reader");
                        break;
                    }
                    continue;
                }
                Ok(n) => {
                    read_errors = 0;
                    n
                }
                Err(e) => {
                    read_errors += 1;
                    log::warn!("Read error ({}): {}", read_errors, e);
                    if read_errors >= MAX_CONSECUTIVE_READ_ERRORS {
                        log::warn!("Too many read errors, stopping reader");
                        break;
                    }
                    continue;
                }
            };

            // Malformed reports are logged by the session and skipped.
            if let Ok(events) = self.session.handle_report(&buf[..len]) {
                if !self.forwarder.publish(&events) {
                    log::info!("Event channel disconnected, stopping reader");
                    break;
                }
            }
        }

        self.stop_flag.store(true, Ordering::Relaxed);
    }
}

/// Slot for edge events that must not be lost: 0 buttons, 1 analog.
fn edge_slot(event: &SessionEvent) -> Option<usize> {
    match event {
        SessionEvent::ButtonChanged(_) => Some(0),
        SessionEvent::AnalogChanged(_) => Some(1),
        SessionEvent::ImuChanged(_) | SessionEvent::OrientationChanged(_) => None,
    }
}

/// Moves session events into the bounded consumer channel.
///
/// IMU and orientation events are superseded by the next report, so they are
/// dropped when the channel is full. Button and analog events carry the
/// complete new state but are only emitted on change; the latest of each kind
/// is held and retried until the consumer takes it.
struct EventForwarder {
    events: Sender<SessionEvent>,
    latest: Arc<Mutex<Quaternion>>,
    pending: [Option<SessionEvent>; 2],
}

impl EventForwarder {
    fn new(events: Sender<SessionEvent>, latest: Arc<Mutex<Quaternion>>) -> Self {
        Self {
            events,
            latest,
            pending: [None; 2],
        }
    }

    /// Forward held events, then `events`. Returns false once the consumer is gone.
    fn publish(&mut self, events: &[SessionEvent]) -> bool {
        for slot in 0..self.pending.len() {
            let Some(held) = self.pending[slot].take() else {
                continue;
            };
            // A newer event of the same kind carries the newer state.
            if events.iter().any(|e| edge_slot(e) == Some(slot)) {
                continue;
            }
            if !self.offer(held) {
                return false;
            }
        }

        for event in events {
            if let SessionEvent::OrientationChanged(q) = event {
                if let Ok(mut latest) = self.latest.lock() {
                    *latest = *q;
                }
            }
            if !self.offer(*event) {
                return false;
            }
        }
        true
    }

    fn offer(&mut self, event: SessionEvent) -> bool {
        match self.events.try_send(event) {
            Ok(()) => true,
            Err(crossbeam_channel::TrySendError::Full(event)) => {
                match edge_slot(&event) {
                    Some(slot) => {
                        log::debug!("Event channel full, holding {:?}", event);
                        self.pending[slot] = Some(event);
                    }
                    None => log::trace!("Event channel full, dropping {:?}", event),
                }
                true
            }
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => false,
        }
    }

    #[cfg(test)]
    fn has_pending(&self) -> bool {
        self.pending.iter().any(Option::is_some)
    }
}
