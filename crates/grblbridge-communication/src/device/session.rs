//! GRBL device session
//!
//! [`GrblDevice`] is the reactive core: a synchronous state machine that
//! owns the controller link, the command queue, and the position/jog state.
//! Every mutation happens on receipt of a decoded line or a public
//! operation, never concurrently. Broadcasts are collected on an outbox and
//! published by [`DeviceSession`] after the state lock is released.
//!
//! [`DeviceSession`] wraps the core in an `Arc<Mutex<..>>`, spawns the io
//! loop that segments incoming lines, and drives the unconditional
//! 1-second status poll (`?` written directly to the link, outside the
//! queue, so polling never consumes the in-flight slot).

use crate::communication::{ConnectionParams, RealSerialPort, SerialLink};
use crate::device::jog::plan_jog;
use crate::device::queue::CommandQueue;
use crate::firmware::grbl::response_parser::{decode_line, GrblReply, ResponseKind};
use crate::firmware::grbl::settings;
use crate::firmware::grbl::status_parser::StatusReport;
use grblbridge_core::{
    Axis, AxisLimits, ConnectionError, ConsoleMode, DeviceEvent, Error, EventBus, JogState,
    MachineStateEvent, MachineStatus, Result, SubscriptionId, TravelConvention,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// GRBL soft-reset control byte (Ctrl-X)
const SOFT_RESET: u8 = 0x18;
/// GRBL realtime status-query byte
const STATUS_QUERY: u8 = b'?';

/// Tunables for a device session
#[derive(Debug, Clone)]
pub struct DeviceOptions {
    /// Feed rate used for jog commands (units/min).
    pub jog_feed_rate: u32,
    /// Which corner of each axis the machine homes to.
    pub travel_convention: TravelConvention,
    /// Interval of the status poll.
    pub poll_interval: Duration,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            jog_feed_rate: 1000,
            travel_convention: TravelConvention::default(),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Reactive core for one GRBL-class controller
pub struct GrblDevice {
    /// The controller serial link; this session is its only writer.
    link: Box<dyn SerialLink>,
    /// Pending command lines.
    queue: CommandQueue,
    /// Commands transmitted but not yet acknowledged. At most one entry in
    /// steady state; dispatch waits for the prior `ok`.
    awaiting_ack: VecDeque<String>,
    /// Last-known controller status.
    status: MachineStatus,
    /// Axis mechanics learned from `$`-settings.
    limits: AxisLimits,
    /// Jog accumulator.
    jog: JogState,
    options: DeviceOptions,
    /// Events to broadcast once the state lock is released.
    pending: Vec<DeviceEvent>,
}

impl GrblDevice {
    /// Create a device core over an open link
    pub fn new(link: Box<dyn SerialLink>, options: DeviceOptions) -> Self {
        Self {
            link,
            queue: CommandQueue::new(),
            awaiting_ack: VecDeque::new(),
            status: MachineStatus::default(),
            limits: AxisLimits::default(),
            jog: JogState::Idle,
            options,
            pending: Vec::new(),
        }
    }

    /// Split `text` on newlines, queue every line, and start dispatch if
    /// the queue was stopped
    pub fn queue_commands(&mut self, text: &str) -> Result<()> {
        self.queue.push_lines(text);

        if self.queue.state() == grblbridge_core::QueueState::Stopped {
            self.queue.set_state(grblbridge_core::QueueState::Running);
            self.push_machine_state();
            self.transmit_next()?;
        }
        Ok(())
    }

    /// Pause or resume dispatch
    ///
    /// Pausing never cancels an already-transmitted command. Resuming an
    /// empty queue just stops it.
    pub fn pause_queue(&mut self, pause: bool) -> Result<()> {
        use grblbridge_core::QueueState::*;

        if pause {
            tracing::debug!("queue paused");
            self.queue.set_state(Paused);
        } else if self.queue.is_empty() {
            tracing::debug!("queue stopped");
            self.queue.set_state(Stopped);
        } else if self.queue.state() != Running {
            tracing::debug!("queue resumed");
            self.queue.set_state(Running);
            self.transmit_next()?;
        }

        self.push_machine_state();
        Ok(())
    }

    /// Stop dispatch and discard all pending and in-flight bookkeeping
    ///
    /// A byte already written to the link cannot be retracted; any late
    /// reply to a cleared command lands in the unrecognized-line policy,
    /// which clears again (idempotent).
    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.awaiting_ack.clear();
        self.push_machine_state();
    }

    /// Clear the queue and soft-reset the controller
    pub fn reset(&mut self) -> Result<()> {
        self.clear_queue();
        self.write_bytes(&[SOFT_RESET])?;
        self.console(ConsoleMode::Immediate, "-> RESET <-");
        Ok(())
    }

    /// Home the machine (`$H`) when homing is enabled, else unlock (`$X`)
    pub fn auto_home(&mut self) -> Result<()> {
        let command = if self.limits.homing_enabled {
            "$H"
        } else {
            "$X"
        };
        self.immediate_commands(command)
    }

    /// Request the parser state (`$G`), outside the queue
    pub fn request_parser_state(&mut self) -> Result<()> {
        self.immediate_commands("$G")
    }

    /// Request the G-code parameters (`$#`), outside the queue
    pub fn request_gcode_params(&mut self) -> Result<()> {
        self.immediate_commands("$#")
    }

    /// Request the settings dump (`$$`), outside the queue
    pub fn request_grbl_settings(&mut self) -> Result<()> {
        self.immediate_commands("$$")
    }

    /// Re-query parser state, settings, and parameters back-to-back,
    /// outside the queue
    pub fn refresh_device_state(&mut self) -> Result<()> {
        self.immediate_commands("$G\n$$\n$#")
    }

    /// Jog one axis by a signed distance in motor steps
    ///
    /// The jog command goes through the normal queue so jogging is
    /// serialized with all other traffic.
    pub fn jog_axis(&mut self, axis: Axis, distance_steps: f64) -> Result<()> {
        let plan = plan_jog(
            self.jog,
            self.status.machine_position,
            axis,
            distance_steps,
            &self.limits,
            self.options.travel_convention,
            self.status.display_inches,
            self.options.jog_feed_rate,
        )?;

        self.jog = JogState::Jogging {
            target: plan.target,
        };
        self.queue_commands(&plan.command)
    }

    /// Write the status-query byte directly to the link
    pub fn poll_status(&mut self) -> Result<()> {
        self.write_bytes(&[STATUS_QUERY])
    }

    /// Process one newline-stripped line received from the controller
    pub fn on_line(&mut self, line: &str) -> Result<()> {
        match decode_line(line) {
            GrblReply::Status(report) => {
                tracing::debug!("<- {} ; status report", line);
                self.on_status_report(report);
            }
            GrblReply::Setting { key, value } => {
                tracing::debug!("<- {} ; {}", line, settings::setting_name(key));
                settings::apply_setting(&mut self.limits, key, value);
                if key == settings::REPORT_INCHES {
                    self.status.display_inches = value == 1.0;
                }
                self.pending.push(DeviceEvent::GrblSetting { key, value });
            }
            GrblReply::Params(block) => {
                tracing::debug!("<- {} ; GCode parameter", line);
                self.pending.push(DeviceEvent::GcodeParams(block));
            }
            GrblReply::Modes(block) => {
                tracing::debug!("<- {} ; GCode mode", line);
                for word in &block.unrecognized {
                    tracing::warn!("Unhandled gcode mode word: {}", word);
                }
                self.pending.push(DeviceEvent::GcodeModes(block));
            }
            GrblReply::UnlockNotice => {
                tracing::debug!("<- {} ; unlock request", line);
                self.refresh_device_state()?;
            }
            GrblReply::Response(kind) => {
                tracing::debug!("<- {}", line);
                self.console(ConsoleMode::Response, line);
                self.on_response(kind)?;
            }
        }
        Ok(())
    }

    fn on_status_report(&mut self, report: StatusReport) {
        if self.jog.is_active() && report.state != "Jog" {
            self.jog = JogState::Idle;
        }

        self.status.state_name = report.state;
        if let Some(x) = report.machine_x {
            self.status.machine_position.x = x;
        }
        if let Some(y) = report.machine_y {
            self.status.machine_position.y = y;
        }
        if let Some(z) = report.machine_z {
            self.status.machine_position.z = z;
        }
        if let Some(offset) = report.work_offset {
            self.status.work_offset = offset;
        }

        self.push_machine_state();
    }

    fn on_response(&mut self, kind: ResponseKind) -> Result<()> {
        use grblbridge_core::QueueState::Running;

        match kind {
            ResponseKind::Ok => {
                self.awaiting_ack.pop_front();
                if self.queue.state() == Running {
                    self.transmit_next()?;
                }
            }
            ResponseKind::Alarm(line) => {
                // Fail-safe: an alarm aborts all pending motion rather than
                // attempting to resume.
                tracing::warn!("Controller alarm: {}", line);
                self.clear_queue();
                self.status.state_name = "Locked".to_string();
                self.push_machine_state();
            }
            ResponseKind::Error(line) => {
                tracing::warn!("Controller rejected command: {}", line);
                self.clear_queue();
            }
            ResponseKind::Other(line) => {
                // Never guess at partial success of an unknown reply.
                tracing::warn!("Unrecognized reply, clearing queue: {}", line);
                self.clear_queue();
            }
        }
        Ok(())
    }

    /// Transmit the next queued line, skipping blank and comment-only lines
    fn transmit_next(&mut self) -> Result<()> {
        loop {
            let Some(raw) = self.queue.pop() else {
                self.queue.mark_drained();
                self.push_machine_state();
                return Ok(());
            };

            // Strip any trailing inline comment and surrounding whitespace.
            let line = match raw.split_once(';') {
                Some((head, _)) => head,
                None => raw.as_str(),
            }
            .trim();

            if line.is_empty() {
                continue;
            }

            tracing::debug!("-> {}", line);
            self.console(ConsoleMode::Command, line);
            let framed = format!("{}\n", line);
            self.write_bytes(framed.as_bytes())?;
            self.awaiting_ack.push_back(line.to_string());

            // Optimistic: the last line has been handed to the link even
            // though its acknowledgement is still pending.
            if self.queue.is_empty() {
                self.queue.mark_drained();
            }

            self.push_machine_state();
            return Ok(());
        }
    }

    /// Send commands immediately, bypassing the queue
    ///
    /// Only used for status/parameter queries and unlock handling so it
    /// does not interfere with queue flow control.
    fn immediate_commands(&mut self, text: &str) -> Result<()> {
        for command in text.split('\n') {
            let framed = format!("{}\n", command);
            self.write_bytes(framed.as_bytes())?;
            self.console(ConsoleMode::Immediate, command);
        }
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        if let Err(source) = self.link.write_all(data) {
            // Transport faults are fatal to the session; surface them as a
            // status broadcast instead of retrying silently.
            self.status.state_name = "Offline".to_string();
            self.push_machine_state();
            return Err(Error::Connection(ConnectionError::WriteFailed {
                port: self.link.name().to_string(),
                source,
            }));
        }
        Ok(())
    }

    fn console(&mut self, mode: ConsoleMode, message: &str) {
        self.pending.push(DeviceEvent::ConsoleDisplay {
            mode,
            message: message.to_string(),
        });
    }

    fn push_machine_state(&mut self) {
        self.pending
            .push(DeviceEvent::MachineState(MachineStateEvent {
                state_name: self.status.state_name.clone(),
                machine_position: self.status.machine_position,
                work_position: self.status.work_position(),
                queue_length: self.queue.len(),
                queue_max: self.queue.current_max(),
                queue_state: self.queue.state(),
                display_inches: self.status.display_inches,
            }));
    }

    /// Drain the broadcast outbox
    pub fn take_events(&mut self) -> Vec<DeviceEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Read from the link into `buf`
    pub fn read_link(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.link.read(buf)
    }

    /// Last-known controller status
    pub fn machine_status(&self) -> &MachineStatus {
        &self.status
    }

    /// Current queue state
    pub fn queue_state(&self) -> grblbridge_core::QueueState {
        self.queue.state()
    }

    /// Number of pending queue lines
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Queue high-water mark
    pub fn queue_max(&self) -> usize {
        self.queue.current_max()
    }

    /// Number of transmitted-but-unacknowledged commands
    pub fn awaiting_ack_len(&self) -> usize {
        self.awaiting_ack.len()
    }

    /// Current jog accumulator
    pub fn jog_state(&self) -> JogState {
        self.jog
    }
}

/// Shared handle to a running device session
///
/// Cloneable; all clones drive the same device core and event bus.
#[derive(Clone)]
pub struct DeviceSession {
    device: Arc<Mutex<GrblDevice>>,
    bus: Arc<EventBus>,
    io_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    shutdown: Arc<Mutex<Option<mpsc::Sender<()>>>>,
}

impl DeviceSession {
    /// Open the controller port and start the session
    pub fn open(params: &ConnectionParams, options: DeviceOptions) -> Result<Self> {
        let link = RealSerialPort::open(params)?;
        tracing::info!("Device link open on {} @ {}", params.port, params.baud_rate);
        Ok(Self::start(Box::new(link), options))
    }

    /// Start a session over an already-open link
    ///
    /// Must be called from within a tokio runtime; the io loop and status
    /// poll are spawned immediately.
    pub fn start(link: Box<dyn SerialLink>, options: DeviceOptions) -> Self {
        let poll_interval = options.poll_interval;
        let session = Self {
            device: Arc::new(Mutex::new(GrblDevice::new(link, options))),
            bus: Arc::new(EventBus::new()),
            io_task: Arc::new(Mutex::new(None)),
            shutdown: Arc::new(Mutex::new(None)),
        };
        session.spawn_io_loop(poll_interval);
        session
    }

    /// Register a subscriber and refresh device state so it starts from
    /// current truth
    pub fn connect<F>(&self, handler: F) -> Result<SubscriptionId>
    where
        F: Fn(&DeviceEvent) + Send + Sync + 'static,
    {
        let id = self.bus.subscribe(handler);
        self.run(|device| device.refresh_device_state())?;
        Ok(id)
    }

    /// Remove a subscriber
    pub fn disconnect(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Queue raw command text
    pub fn queue_commands(&self, text: &str) -> Result<()> {
        self.run(|device| device.queue_commands(text))
    }

    /// Pause or resume the queue
    pub fn pause_queue(&self, pause: bool) -> Result<()> {
        self.run(|device| device.pause_queue(pause))
    }

    /// Clear the queue
    pub fn clear_queue(&self) -> Result<()> {
        self.run(|device| {
            device.clear_queue();
            Ok(())
        })
    }

    /// Clear the queue and soft-reset the controller
    pub fn reset(&self) -> Result<()> {
        self.run(|device| device.reset())
    }

    /// Home or unlock the machine
    pub fn auto_home(&self) -> Result<()> {
        self.run(|device| device.auto_home())
    }

    /// Request the parser state (`$G`)
    pub fn request_parser_state(&self) -> Result<()> {
        self.run(|device| device.request_parser_state())
    }

    /// Request the G-code parameters (`$#`)
    pub fn request_gcode_params(&self) -> Result<()> {
        self.run(|device| device.request_gcode_params())
    }

    /// Request the settings dump (`$$`)
    pub fn request_grbl_settings(&self) -> Result<()> {
        self.run(|device| device.request_grbl_settings())
    }

    /// Jog one axis by a signed distance in motor steps
    pub fn jog_axis(&self, axis: Axis, distance_steps: f64) -> Result<()> {
        self.run(|device| device.jog_axis(axis, distance_steps))
    }

    /// Snapshot of the last-known controller status
    pub fn machine_status(&self) -> MachineStatus {
        self.device.lock().machine_status().clone()
    }

    /// Stop the io loop
    pub fn shutdown(&self) {
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.try_send(());
        }
        if let Some(handle) = self.io_task.lock().take() {
            handle.abort();
        }
    }

    /// Run an operation on the device core, then publish its broadcasts
    /// with the state lock released
    fn run<T>(&self, f: impl FnOnce(&mut GrblDevice) -> Result<T>) -> Result<T> {
        let (events, result) = {
            let mut device = self.device.lock();
            let result = f(&mut device);
            (device.take_events(), result)
        };
        for event in &events {
            self.bus.publish(event);
        }
        result
    }

    fn spawn_io_loop(&self, poll_interval: Duration) {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *self.shutdown.lock() = Some(shutdown_tx);

        let device = self.device.clone();
        let bus = self.bus.clone();

        let handle = tokio::spawn(async move {
            let mut read_buf = [0u8; 512];
            let mut partial = String::new();
            let mut last_poll = Instant::now();
            let loop_delay = Duration::from_millis(10);

            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                // READ PHASE: the link read timeout is short, so the lock is
                // held only briefly.
                let read = device.lock().read_link(&mut read_buf);
                if let Ok(n) = read {
                    if n > 0 {
                        partial.push_str(&String::from_utf8_lossy(&read_buf[..n]));

                        while let Some(pos) = partial.find('\n') {
                            let line = partial[..pos].trim_end_matches('\r').trim().to_string();
                            partial.drain(..=pos);

                            if line.is_empty() {
                                continue;
                            }

                            let (events, result) = {
                                let mut dev = device.lock();
                                let result = dev.on_line(&line);
                                (dev.take_events(), result)
                            };
                            for event in &events {
                                bus.publish(event);
                            }
                            if let Err(e) = result {
                                tracing::error!("Device link failed: {}", e);
                                return;
                            }
                        }
                    }
                }

                // POLL PHASE: status query outside the queue.
                if last_poll.elapsed() >= poll_interval {
                    let (events, result) = {
                        let mut dev = device.lock();
                        let result = dev.poll_status();
                        (dev.take_events(), result)
                    };
                    for event in &events {
                        bus.publish(event);
                    }
                    if let Err(e) = result {
                        tracing::error!("Status poll failed: {}", e);
                        return;
                    }
                    last_poll = Instant::now();
                }

                tokio::time::sleep(loop_delay).await;
            }
        });

        *self.io_task.lock() = Some(handle);
    }
}
