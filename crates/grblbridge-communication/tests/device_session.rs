use grblbridge_communication::device::{DeviceOptions, DeviceSession, GrblDevice};
use grblbridge_communication::SerialLink;
use grblbridge_core::{
    Axis, ConsoleMode, DeviceEvent, JogState, Position, QueueState,
};
use proptest::prelude::*;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

// Mock link capturing every write; reads time out unless scripted.
struct MockLink {
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    reads: Arc<Mutex<VecDeque<Vec<u8>>>>,
}

impl MockLink {
    fn new() -> (Self, Arc<Mutex<Vec<Vec<u8>>>>) {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let link = Self {
            writes: writes.clone(),
            reads: Arc::new(Mutex::new(VecDeque::new())),
        };
        (link, writes)
    }

    fn with_reads() -> (Self, Arc<Mutex<Vec<Vec<u8>>>>, Arc<Mutex<VecDeque<Vec<u8>>>>) {
        let (link, writes) = Self::new();
        let reads = link.reads.clone();
        (link, writes, reads)
    }
}

impl SerialLink for MockLink {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.writes.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reads.lock().unwrap().pop_front() {
            Some(chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                Ok(n)
            }
            None => Err(io::ErrorKind::TimedOut.into()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn mock_device() -> (GrblDevice, Arc<Mutex<Vec<Vec<u8>>>>) {
    let (link, writes) = MockLink::new();
    (GrblDevice::new(Box::new(link), DeviceOptions::default()), writes)
}

fn written_strings(writes: &Arc<Mutex<Vec<Vec<u8>>>>) -> Vec<String> {
    writes
        .lock()
        .unwrap()
        .iter()
        .map(|w| String::from_utf8_lossy(w).to_string())
        .collect()
}

fn last_machine_state(events: &[DeviceEvent]) -> &grblbridge_core::MachineStateEvent {
    events
        .iter()
        .rev()
        .find_map(|e| match e {
            DeviceEvent::MachineState(s) => Some(s),
            _ => None,
        })
        .expect("expected a machine-status broadcast")
}

#[test]
fn transmits_in_fifo_order_with_comment_stripping() {
    let (mut device, writes) = mock_device();

    device
        .queue_commands("G0X1\n; full line comment\nG1X2 ; trailing comment\n\nG2X3")
        .unwrap();
    // One command in flight; acks release the rest.
    device.on_line("ok").unwrap();
    device.on_line("ok").unwrap();

    assert_eq!(
        written_strings(&writes),
        vec!["G0X1\n", "G1X2\n", "G2X3\n"]
    );
    assert_eq!(device.queue_state(), QueueState::Stopped);
    assert_eq!(device.queue_max(), 0);
}

#[test]
fn at_most_one_command_awaits_acknowledgement() {
    let (mut device, _writes) = mock_device();

    device.queue_commands("G0X1\nG0X2\nG0X3").unwrap();
    assert_eq!(device.awaiting_ack_len(), 1);
    assert_eq!(device.queue_len(), 2);

    device.on_line("ok").unwrap();
    assert_eq!(device.awaiting_ack_len(), 1);
    assert_eq!(device.queue_len(), 1);
}

#[test]
fn high_water_mark_tracks_and_resets() {
    let (mut device, _writes) = mock_device();

    device.queue_commands("a1\na2\na3").unwrap();
    assert_eq!(device.queue_max(), 3);
    assert!(device.queue_max() >= device.queue_len());

    device.on_line("ok").unwrap();
    device.on_line("ok").unwrap();
    // Last line handed to the link: mark resets even though its ack is
    // still pending.
    assert_eq!(device.queue_len(), 0);
    assert_eq!(device.queue_max(), 0);
    assert_eq!(device.queue_state(), QueueState::Stopped);
}

#[test]
fn comment_only_batch_drains_without_transmitting() {
    let (mut device, writes) = mock_device();

    device.queue_commands("; nothing\n\n   ").unwrap();

    assert!(written_strings(&writes).is_empty());
    assert_eq!(device.queue_len(), 0);
    assert_eq!(device.queue_max(), 0);
    assert_eq!(device.queue_state(), QueueState::Stopped);
}

#[test]
fn work_position_equals_machine_position_with_zero_wco() {
    let (mut device, _writes) = mock_device();

    device
        .on_line("<Idle|WPos:1.000,2.000,0.000|FS:0,0>")
        .unwrap();

    let events = device.take_events();
    let state = last_machine_state(&events);
    assert_eq!(state.machine_position, Position::new(1.0, 2.0, 0.0));
    assert_eq!(state.work_position, state.machine_position);
}

#[test]
fn wco_offsets_apply_to_work_position() {
    let (mut device, _writes) = mock_device();

    device
        .on_line("<Idle|MPos:10.000,0.000,0.000|FS:0,0|WCO:1.000,2.000,3.000>")
        .unwrap();

    let events = device.take_events();
    let state = last_machine_state(&events);
    assert_eq!(state.machine_position, Position::new(10.0, 0.0, 0.0));
    assert_eq!(state.work_position, Position::new(9.0, -2.0, -3.0));
}

#[test]
fn partial_status_keeps_previous_values() {
    let (mut device, _writes) = mock_device();

    device
        .on_line("<Run|MPos:5.000,6.000,7.000|FS:0,0>")
        .unwrap();
    device.on_line("<Alarm>").unwrap();

    assert_eq!(device.machine_status().state_name, "Alarm");
    assert_eq!(
        device.machine_status().machine_position,
        Position::new(5.0, 6.0, 7.0)
    );
}

#[test]
fn consecutive_jogs_accumulate_and_clamp() {
    let (mut device, writes) = mock_device();

    device.on_line("$130=100").unwrap();
    device.on_line("$100=80").unwrap();

    device.jog_axis(Axis::X, -8000.0).unwrap();
    device.on_line("ok").unwrap();
    device.jog_axis(Axis::X, -8000.0).unwrap();

    // Two -8000-step jogs at 80 steps/mm against 100 mm of travel clamp to
    // -100, not -200.
    assert_eq!(
        device.jog_state(),
        JogState::Jogging {
            target: Position::new(-100.0, 0.0, 0.0)
        }
    );
    let commands = written_strings(&writes);
    assert_eq!(commands[0], "$J=F1000G53X-100.000\n");
    assert_eq!(commands[1], "$J=F1000G53X-100.000\n");
}

#[test]
fn jog_target_clears_when_controller_leaves_jog_state() {
    let (mut device, _writes) = mock_device();

    device.on_line("$130=100").unwrap();
    device.on_line("$100=80").unwrap();

    device.jog_axis(Axis::X, -800.0).unwrap();
    assert!(device.jog_state().is_active());

    device.on_line("<Jog|MPos:-5.000,0.000,0.000|FS:500,0>").unwrap();
    assert!(device.jog_state().is_active());

    device.on_line("<Idle|MPos:-10.000,0.000,0.000|FS:0,0>").unwrap();
    assert_eq!(device.jog_state(), JogState::Idle);
}

#[test]
fn jog_without_limits_is_refused() {
    let (mut device, writes) = mock_device();

    assert!(device.jog_axis(Axis::X, -100.0).is_err());
    assert!(written_strings(&writes).is_empty());
    assert_eq!(device.queue_len(), 0);
}

#[test]
fn alarm_clears_queue_and_reports_locked() {
    let (mut device, _writes) = mock_device();

    device.queue_commands("G0X1\nG0X2\nG0X3").unwrap();
    device.take_events();

    device.on_line("ALARM:1").unwrap();

    assert_eq!(device.queue_len(), 0);
    assert_eq!(device.queue_state(), QueueState::Stopped);
    assert_eq!(device.machine_status().state_name, "Locked");

    let events = device.take_events();
    assert_eq!(last_machine_state(&events).state_name, "Locked");
    assert_eq!(last_machine_state(&events).queue_length, 0);
}

#[test]
fn unrecognized_line_clears_queue_like_an_alarm() {
    let (mut device, _writes) = mock_device();

    device.queue_commands("G0X1\nG0X2\nG0X3").unwrap();
    assert_eq!(device.queue_len(), 2);

    device.on_line("abc").unwrap();

    assert_eq!(device.queue_len(), 0);
    assert_eq!(device.queue_max(), 0);
    assert_eq!(device.queue_state(), QueueState::Stopped);
    assert_eq!(device.awaiting_ack_len(), 0);
}

#[test]
fn error_reply_clears_queue_without_resume() {
    let (mut device, writes) = mock_device();

    device.queue_commands("G0X1\nG0X2").unwrap();
    device.on_line("error:20").unwrap();

    assert_eq!(device.queue_len(), 0);
    assert_eq!(device.queue_state(), QueueState::Stopped);
    // The second command was never transmitted.
    assert_eq!(written_strings(&writes), vec!["G0X1\n"]);
}

#[test]
fn pause_suspends_dispatch_until_resume() {
    let (mut device, writes) = mock_device();

    device.queue_commands("G0X1\nG0X2").unwrap();
    device.pause_queue(true).unwrap();

    // The in-flight command acknowledges, but nothing new goes out.
    device.on_line("ok").unwrap();
    assert_eq!(written_strings(&writes), vec!["G0X1\n"]);
    assert_eq!(device.queue_state(), QueueState::Paused);

    device.pause_queue(false).unwrap();
    assert_eq!(written_strings(&writes), vec!["G0X1\n", "G0X2\n"]);
}

#[test]
fn resume_on_empty_queue_stops() {
    let (mut device, _writes) = mock_device();

    device.pause_queue(true).unwrap();
    device.pause_queue(false).unwrap();
    assert_eq!(device.queue_state(), QueueState::Stopped);
}

#[test]
fn status_poll_does_not_consume_a_queue_slot() {
    let (mut device, writes) = mock_device();

    device.queue_commands("G0X1\nG0X2").unwrap();
    device.poll_status().unwrap();

    assert_eq!(device.awaiting_ack_len(), 1);
    assert_eq!(device.queue_len(), 1);
    let all = written_strings(&writes);
    assert_eq!(all, vec!["G0X1\n", "?"]);
}

#[test]
fn reset_clears_queue_and_sends_soft_reset() {
    let (mut device, writes) = mock_device();

    device.queue_commands("G0X1\nG0X2").unwrap();
    device.take_events();
    device.reset().unwrap();

    assert_eq!(device.queue_len(), 0);
    assert_eq!(device.queue_state(), QueueState::Stopped);
    assert_eq!(writes.lock().unwrap().last().unwrap(), &vec![0x18]);

    let events = device.take_events();
    assert!(events.iter().any(|e| matches!(
        e,
        DeviceEvent::ConsoleDisplay {
            mode: ConsoleMode::Immediate,
            message
        } if message == "-> RESET <-"
    )));
}

#[test]
fn auto_home_honors_homing_setting() {
    let (mut device, writes) = mock_device();

    device.auto_home().unwrap();
    assert_eq!(written_strings(&writes), vec!["$X\n"]);

    device.on_line("$22=1").unwrap();
    device.auto_home().unwrap();
    assert_eq!(written_strings(&writes), vec!["$X\n", "$H\n"]);
}

#[test]
fn unlock_notice_requeries_device_state() {
    let (mut device, writes) = mock_device();

    device.on_line("[MSG:'$H'|'$X' to unlock]").unwrap();

    assert_eq!(written_strings(&writes), vec!["$G\n", "$$\n", "$#\n"]);
    let events = device.take_events();
    let immediates = events
        .iter()
        .filter(|e| {
            matches!(
                e,
                DeviceEvent::ConsoleDisplay {
                    mode: ConsoleMode::Immediate,
                    ..
                }
            )
        })
        .count();
    assert_eq!(immediates, 3);
}

#[test]
fn inches_setting_converts_jog_commands() {
    let (mut device, writes) = mock_device();

    device.on_line("$130=100").unwrap();
    device.on_line("$100=80").unwrap();
    device.on_line("$13=1").unwrap();

    // -2032 steps / 80 steps-per-mm = -25.4 mm = -1 inch.
    device.jog_axis(Axis::X, -2032.0).unwrap();
    assert_eq!(written_strings(&writes), vec!["$J=F1000G53X-1.0000\n"]);

    let events = device.take_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, DeviceEvent::GrblSetting { key: 13, value } if *value == 1.0)));
}

// Property: for any sequence of queue_commands calls, the lines written to
// the link are exactly the newline-split, comment-stripped, non-empty
// inputs, in call order.
fn line_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("G0X1".to_string()),
        Just("G1 X2.5 F100".to_string()),
        Just("M3 S1000 ; spin up".to_string()),
        Just("; comment only".to_string()),
        Just(String::new()),
        Just("   ".to_string()),
        Just("$H".to_string()),
    ]
}

fn cleaned(line: &str) -> &str {
    match line.split_once(';') {
        Some((head, _)) => head,
        None => line,
    }
    .trim()
}

proptest! {
    #[test]
    fn transmitted_lines_match_cleaned_inputs(
        batches in proptest::collection::vec(
            proptest::collection::vec(line_strategy(), 0..5),
            0..5,
        )
    ) {
        let (mut device, writes) = mock_device();
        let mut expected = Vec::new();

        for batch in &batches {
            let text = batch.join("\n");
            for line in text.split('\n') {
                let clean = cleaned(line);
                if !clean.is_empty() {
                    expected.push(format!("{}\n", clean));
                }
            }

            device.queue_commands(&text).unwrap();
            prop_assert!(device.queue_max() >= device.queue_len());
            prop_assert!(device.awaiting_ack_len() <= 1);

            while device.awaiting_ack_len() > 0 {
                device.on_line("ok").unwrap();
                prop_assert!(device.queue_max() >= device.queue_len());
                prop_assert!(device.awaiting_ack_len() <= 1);
            }
        }

        prop_assert_eq!(written_strings(&writes), expected);
        prop_assert_eq!(device.queue_len(), 0);
        prop_assert_eq!(device.queue_max(), 0);
    }
}

// Session-level wiring: io loop, poll timer, and connect-time refresh.

#[tokio::test]
async fn connect_refreshes_device_state_outside_the_queue() {
    let (link, writes) = MockLink::new();
    let options = DeviceOptions {
        poll_interval: std::time::Duration::from_secs(60),
        ..Default::default()
    };
    let session = DeviceSession::start(Box::new(link), options);

    let seen: Arc<Mutex<Vec<DeviceEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    session
        .connect(move |event| sink.lock().unwrap().push(event.clone()))
        .unwrap();

    assert_eq!(written_strings(&writes), vec!["$G\n", "$$\n", "$#\n"]);
    let immediates = seen
        .lock()
        .unwrap()
        .iter()
        .filter(|e| {
            matches!(
                e,
                DeviceEvent::ConsoleDisplay {
                    mode: ConsoleMode::Immediate,
                    ..
                }
            )
        })
        .count();
    assert_eq!(immediates, 3);

    session.shutdown();
}

#[tokio::test]
async fn io_loop_decodes_lines_and_broadcasts() {
    let (link, _writes, reads) = MockLink::with_reads();
    let options = DeviceOptions {
        poll_interval: std::time::Duration::from_secs(60),
        ..Default::default()
    };
    let session = DeviceSession::start(Box::new(link), options);

    let seen: Arc<Mutex<Vec<DeviceEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    session
        .connect(move |event| sink.lock().unwrap().push(event.clone()))
        .unwrap();

    reads
        .lock()
        .unwrap()
        .push_back(b"<Idle|MPos:1.000,2.000,3.000|FS:0,0>\r\nok\r\n".to_vec());

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    let seen = seen.lock().unwrap();
    let status = seen.iter().find_map(|e| match e {
        DeviceEvent::MachineState(s) if s.state_name == "Idle" => Some(s.clone()),
        _ => None,
    });
    let status = status.expect("status broadcast");
    assert_eq!(status.machine_position, Position::new(1.0, 2.0, 3.0));
    drop(seen);

    session.shutdown();
}

#[tokio::test]
async fn status_poll_writes_query_byte_periodically() {
    let (link, writes) = MockLink::new();
    let options = DeviceOptions {
        poll_interval: std::time::Duration::from_millis(50),
        ..Default::default()
    };
    let session = DeviceSession::start(Box::new(link), options);

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    let polls = writes
        .lock()
        .unwrap()
        .iter()
        .filter(|w| w.as_slice() == b"?")
        .count();
    assert!(polls >= 2, "expected repeated polls, saw {}", polls);

    session.shutdown();
}
