//! Real-time playback of a compiled [`EventSequence`] over a session.

use crate::gesture::EventSequence;
use crate::session::{DeviceLink, Session, TransportError};
use crate::touch_event::TouchEvent;

use log::{debug, info};

use std::sync::mpsc::Receiver;
use std::time::Instant;

/// How a playback run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    /// Every event in the sequence went out.
    Completed,
    /// A cancel signal arrived between events; the remainder was abandoned.
    Cancelled,
}

/// Drains the sequence against the session at real-time pace.
///
/// Each pacing sleep targets the event's absolute offset measured from one
/// start instant, so encode/write latency does not compound across a
/// multi-second gesture: total playback time tracks the sequence's final
/// offset, not `final offset + accumulated overhead`.
///
/// Cancellation is checked between events, never mid-write. On cancel the
/// motors stay wherever the last event left them; a caller that needs
/// silence issues [`release_all`] afterwards. A failed send aborts the rest
/// of the sequence and surfaces the error; events already sent stay sent.
pub fn play<L: DeviceLink>(
    session: &mut Session<L>,
    sequence: &EventSequence,
    cancel: &Receiver<()>,
) -> Result<Playback, TransportError> {
    let start = Instant::now();

    for (index, (offset, event)) in sequence.events().iter().enumerate() {
        if cancel.try_recv().is_ok() {
            info!(
                "playback cancelled, {} of {} events sent",
                index,
                sequence.len()
            );
            return Ok(Playback::Cancelled);
        }

        let elapsed = start.elapsed();
        if *offset > elapsed {
            spin_sleep::sleep(*offset - elapsed);
        }

        session.send(*event)?;
    }

    debug!(
        "playback of {} events finished in {:?}",
        sequence.len(),
        start.elapsed()
    );
    Ok(Playback::Completed)
}

/// Releases every motor on the device. Demo teardown and post-cancel cleanup
/// both go through here.
pub fn release_all<L: DeviceLink>(session: &mut Session<L>) -> Result<(), TransportError> {
    for motor in 0..session.num_actuators() {
        session.send(TouchEvent::release(motor))?;
    }
    Ok(())
}
