//! An in-process stand-in for the Tact firmware, for demos on machines with
//! no hardware attached and for deterministic tests. It speaks the device's
//! side of the line protocol: prints the ready banner, consumes command
//! lines, keeps per-motor depth state, and shrugs off garbage the way the
//! real firmware does.

use crate::device_message::READY_BANNER;
use crate::session::DeviceLink;
use crate::touch_event::TouchEvent;

use log::{debug, warn};
use rand::prelude::*;

use std::io;
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// The emulated firmware, running on its own thread until the host side of
/// the link is dropped.
pub struct DummyDevice {
    handle: Option<thread::JoinHandle<()>>,
    depths: Arc<Mutex<Vec<f32>>>,
}

/// Host-side endpoint of the emulated link. Implements [`DeviceLink`], so a
/// [`crate::session::Session`] drives it exactly like a serial port.
pub struct DummyLink {
    to_device: Sender<Vec<u8>>,
    from_device: Receiver<String>,
}

impl DummyDevice {
    /// Spawns the firmware thread and returns it along with the host-side
    /// link endpoint.
    pub fn spawn(num_actuators: usize) -> (Self, DummyLink) {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Vec<u8>>();
        let (status_tx, status_rx) = mpsc::channel::<String>();
        let depths = Arc::new(Mutex::new(vec![0.0; num_actuators]));
        let th_depths = Arc::clone(&depths);

        let handle = thread::spawn(move || {
            firmware_loop(num_actuators, cmd_rx, status_tx, th_depths);
        });

        (
            Self {
                handle: Some(handle),
                depths,
            },
            DummyLink {
                to_device: cmd_tx,
                from_device: status_rx,
            },
        )
    }

    /// Snapshot of the current per-motor depths, as the firmware sees them.
    pub fn depths(&self) -> Vec<f32> {
        self.depths.lock().unwrap().clone()
    }

    /// Waits for the firmware thread to exit. It exits once the host link
    /// endpoint has been dropped, so drop the session first.
    pub fn join(mut self) {
        if let Some(thread) = self.handle.take() {
            thread.join().unwrap();
        }
    }
}

impl DeviceLink for DummyLink {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.to_device
            .send(bytes.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "dummy device is gone"))
    }

    fn read_line(&mut self, timeout: Duration) -> Option<String> {
        match self.from_device.recv_timeout(timeout) {
            Ok(line) => Some(line),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

fn firmware_loop(
    num_actuators: usize,
    commands: Receiver<Vec<u8>>,
    status: Sender<String>,
    depths: Arc<Mutex<Vec<f32>>>,
) {
    let mut rng = thread_rng();

    // Boot chatter, then the banner the host handshake looks for.
    let _ = status.send("Tact firmware build 7".to_owned());
    let _ = status.send(READY_BANNER.to_owned());

    let mut pending: Vec<u8> = Vec::new();
    while let Ok(chunk) = commands.recv() {
        pending.extend_from_slice(&chunk);

        while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim_end().to_owned();

            // The real controller services its loop at a few hundred hertz;
            // a little jitter keeps the emulation honest.
            thread::sleep(Duration::from_millis(rng.gen_range(1..4)));

            match TouchEvent::from_str(&line) {
                Ok(event) if event.actuator_id < num_actuators => {
                    depths.lock().unwrap()[event.actuator_id] = event.depth.clamp(0.0, 1.0);
                    if event.first_contact {
                        let _ = status
                            .send(format!("Motor {}: first contact pulse", event.actuator_id));
                    }
                }
                Ok(event) => {
                    warn!(
                        "dummy firmware ignoring command for missing motor {}",
                        event.actuator_id
                    );
                }
                // Garbage on the wire is dropped, never fatal.
                Err(_) => debug!("dummy firmware ignoring unparseable line {line:?}"),
            }
        }
    }

    debug!("dummy firmware shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    fn wait_for<F: Fn() -> bool>(cond: F) {
        for _ in 0..100 {
            if cond() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("condition not reached within a second");
    }

    fn dummy_session() -> (DummyDevice, Session<DummyLink>) {
        let (device, link) = DummyDevice::spawn(4);
        let session = Session::from_link(link, "dummy".to_owned(), 115_200, 4);
        (device, session)
    }

    #[test]
    fn announces_itself_with_the_ready_banner() {
        let (device, mut session) = dummy_session();
        assert!(session.poll_ready().is_some());
        session.disconnect();
        device.join();
    }

    #[test]
    fn applies_commands_to_motor_state() {
        let (device, mut session) = dummy_session();
        session.send(TouchEvent::new(2, 0.75, true)).unwrap();

        wait_for(|| (device.depths()[2] - 0.75).abs() < 0.005);

        session.send(TouchEvent::release(2)).unwrap();
        wait_for(|| device.depths()[2] == 0.0);

        session.disconnect();
        device.join();
    }

    #[test]
    fn clamps_depths_the_host_did_not() {
        let (device, mut session) = dummy_session();
        // Bypass the codec with an over-range depth.
        session.send_raw(b"1,1.50,0\n").unwrap();

        wait_for(|| device.depths()[1] == 1.0);

        session.disconnect();
        device.join();
    }

    #[test]
    fn survives_garbage_and_keeps_serving() {
        let (device, mut session) = dummy_session();

        for line in [&b"abc,0.5,1\n"[..], b"9,0.5,1\n", b"0,0.5\n", b"\n"] {
            session.send_raw(line).unwrap();
        }
        session.send(TouchEvent::new(0, 0.6, true)).unwrap();

        wait_for(|| (device.depths()[0] - 0.6).abs() < 0.005);

        session.disconnect();
        device.join();
    }
}
