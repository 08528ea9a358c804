//! Pendant session wiring
//!
//! Owns the panel serial link and connects the [`JoggerBridge`] state
//! machine to a running [`DeviceSession`]: device broadcasts flow out to
//! the panel display, panel events flow back in as device operations.

use crate::communication::{ConnectionParams, RealSerialPort, SerialLink};
use crate::device::DeviceSession;
use crate::jogger::bridge::{JoggerBridge, JoggerRequest, PanelMessage};
use crate::jogger::protocol::parse_event;
use grblbridge_core::{Result, SubscriptionId};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A running pendant session
pub struct JoggerSession {
    bridge: Arc<Mutex<JoggerBridge>>,
    link: Arc<Mutex<Box<dyn SerialLink>>>,
    device: DeviceSession,
    subscription: SubscriptionId,
    io_task: Mutex<Option<JoinHandle<()>>>,
    shutdown: Mutex<Option<mpsc::Sender<()>>>,
}

impl JoggerSession {
    /// Open the pendant port and start the session
    pub fn open(params: &ConnectionParams, device: DeviceSession) -> Result<Self> {
        let link = RealSerialPort::open(params)?;
        tracing::info!("Jogger link open on {} @ {}", params.port, params.baud_rate);
        Self::start(Box::new(link), device)
    }

    /// Start a session over an already-open panel link
    ///
    /// Must be called from within a tokio runtime. Subscribing to the
    /// device also triggers the connect-time state refresh, so the panel
    /// display converges on current truth.
    pub fn start(link: Box<dyn SerialLink>, device: DeviceSession) -> Result<Self> {
        let bridge = Arc::new(Mutex::new(JoggerBridge::new()));
        let link = Arc::new(Mutex::new(link));

        let handler_bridge = bridge.clone();
        let handler_link = link.clone();
        let subscription = device.connect(move |event| {
            let messages = handler_bridge.lock().on_device_event(event);
            write_panel(&handler_link, &messages);
        })?;

        let session = Self {
            bridge,
            link,
            device,
            subscription,
            io_task: Mutex::new(None),
            shutdown: Mutex::new(None),
        };
        session.spawn_io_loop();
        Ok(session)
    }

    /// Stop the io loop and detach from the device bus
    pub fn shutdown(&self) {
        self.device.disconnect(self.subscription);
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.try_send(());
        }
        if let Some(handle) = self.io_task.lock().take() {
            handle.abort();
        }
    }

    fn spawn_io_loop(&self) {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *self.shutdown.lock() = Some(shutdown_tx);

        let bridge = self.bridge.clone();
        let link = self.link.clone();
        let device = self.device.clone();

        let handle = tokio::spawn(async move {
            let mut read_buf = [0u8; 128];
            let mut partial = String::new();
            let loop_delay = Duration::from_millis(10);

            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let read = link.lock().read(&mut read_buf);
                if let Ok(n) = read {
                    if n > 0 {
                        partial.push_str(&String::from_utf8_lossy(&read_buf[..n]));

                        while let Some(pos) = partial.find('\n') {
                            let line = partial[..pos].trim().to_string();
                            partial.drain(..=pos);

                            if line.is_empty() {
                                continue;
                            }

                            tracing::debug!("jogger -> {}", line);
                            let Some(event) = parse_event(&line) else {
                                // Input fault: reject before anything is
                                // enqueued.
                                tracing::warn!("Malformed pendant event: {}", line);
                                continue;
                            };

                            let action = bridge.lock().handle_event(event);
                            write_panel(&link, &action.messages);

                            if let Some(request) = action.request {
                                if let Err(e) = execute_request(&device, request) {
                                    tracing::warn!("Pendant request failed: {}", e);
                                }
                            }
                        }
                    }
                }

                tokio::time::sleep(loop_delay).await;
            }
        });

        *self.io_task.lock() = Some(handle);
    }
}

/// Forward a panel request through the same device entry points the web
/// clients use
fn execute_request(device: &DeviceSession, request: JoggerRequest) -> Result<()> {
    match request {
        JoggerRequest::Jog { axis, steps } => device.jog_axis(axis, steps),
        JoggerRequest::ZeroAxis { axis, origin } => {
            device.queue_commands(&format!("G10L20P{}{}0", origin, axis.letter()))
        }
        JoggerRequest::SelectWcs { origin } => {
            device.queue_commands(&format!("G{}", 53 + origin as u16))?;
            device.request_parser_state()
        }
        JoggerRequest::AutoHome => device.auto_home(),
    }
}

/// Write display lines and mode bytes to the panel
///
/// Panel write failures are logged and dropped; losing the display must
/// not take the device session down with it.
fn write_panel(link: &Arc<Mutex<Box<dyn SerialLink>>>, messages: &[PanelMessage]) {
    let mut link = link.lock();
    for message in messages {
        let result = match message {
            PanelMessage::Display(line) => {
                tracing::debug!("jogger <- {}", line.trim_end());
                link.write_all(line.as_bytes())
            }
            PanelMessage::Mode(byte) => link.write_all(&[*byte]),
        };
        if let Err(e) = result {
            tracing::warn!("Panel write failed: {}", e);
        }
    }
}
