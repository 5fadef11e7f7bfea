//! Procedural gesture synthesis. A [`GestureSpec`] compiles into a finite,
//! time-ordered [`EventSequence`] at the engine's fixed 20 Hz update rate;
//! nothing here touches the serial link, so every gesture is reproducible in
//! tests without hardware.

use crate::touch_event::TouchEvent;

use std::f32::consts::{FRAC_PI_2, PI};
use std::time::Duration;

/// One synthesis step at the 20 Hz update rate.
pub const TICK: Duration = Duration::from_millis(50);

const TICKS_PER_SECOND: f32 = 20.0;

/// A named gesture with its parameters. Consumed once per playback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureSpec {
    /// A wave travelling across all motors.
    Stroke {
        /// Gesture length in seconds.
        duration: f32,
        /// Peak contact depth.
        intensity: f32,
    },
    /// A short tap-and-fade on one motor.
    Pat {
        /// Target motor.
        motor: usize,
        /// Depth of the initial tap.
        intensity: f32,
    },
    /// A sharp contact and immediate release on one motor.
    Poke {
        /// Target motor.
        motor: usize,
        /// Depth of the contact.
        intensity: f32,
    },
    /// A symmetric pressure ramp applied to every motor at once.
    Squeeze {
        /// Gesture length in seconds.
        duration: f32,
        /// Depth at the peak of the ramp.
        max_intensity: f32,
    },
}

/// The compiled form of one gesture: `(offset from start, event)` pairs,
/// ordered by offset with ties broken by actuator id ascending.
#[derive(Debug, Clone, Default)]
pub struct EventSequence {
    events: Vec<(Duration, TouchEvent)>,
}

impl EventSequence {
    fn push(&mut self, offset: Duration, event: TouchEvent) {
        self.events.push((offset, event));
    }

    /// The timed events, in playback order.
    pub fn events(&self) -> &[(Duration, TouchEvent)] {
        &self.events
    }

    /// Number of events in the sequence.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when the sequence holds no events at all.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Offset of the final event; playback takes exactly this long.
    pub fn total_duration(&self) -> Duration {
        self.events
            .last()
            .map(|(offset, _)| *offset)
            .unwrap_or(Duration::ZERO)
    }
}

impl IntoIterator for EventSequence {
    type Item = (Duration, TouchEvent);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

/// Compiles a gesture into its event sequence for a device with
/// `num_actuators` motors.
///
/// Synthesis is deterministic and side-effect free. Intensities are passed
/// through untouched; out-of-range depths are clamped later, per event, when
/// the codec puts them on the wire.
pub fn synthesize(spec: &GestureSpec, num_actuators: usize) -> EventSequence {
    match *spec {
        GestureSpec::Stroke {
            duration,
            intensity,
        } => stroke(duration, intensity, num_actuators),
        GestureSpec::Pat { motor, intensity } => pat(motor, intensity),
        GestureSpec::Poke { motor, intensity } => poke(motor, intensity),
        GestureSpec::Squeeze {
            duration,
            max_intensity,
        } => squeeze(duration, max_intensity, num_actuators),
    }
}

fn step_count(duration: f32) -> u32 {
    (duration * TICKS_PER_SECOND).floor() as u32
}

/// Wave pattern sweeping across the motors, each offset by a quarter cycle.
fn stroke(duration: f32, intensity: f32, num_actuators: usize) -> EventSequence {
    let steps = step_count(duration);
    let mut seq = EventSequence::default();

    for step in 0..steps {
        let offset = TICK * step;
        let phase = 2.0 * PI * step as f32 / steps as f32;
        for motor in 0..num_actuators {
            let motor_phase = phase + motor as f32 * FRAC_PI_2;
            let depth = (intensity * (0.5 + 0.5 * motor_phase.sin().abs())).max(0.0);
            let first_contact = step == 0 && motor == 0;
            seq.push(offset, TouchEvent::new(motor, depth, first_contact));
        }
    }

    let end = TICK * steps;
    for motor in 0..num_actuators {
        seq.push(end, TouchEvent::release(motor));
    }
    seq
}

/// Quick pulse pattern fading out over three follow-ups.
fn pat(motor: usize, intensity: f32) -> EventSequence {
    let spacing = Duration::from_millis(100);
    let depths = [intensity, intensity * 0.7, intensity * 0.4, 0.0];

    let mut seq = EventSequence::default();
    for (i, depth) in depths.into_iter().enumerate() {
        seq.push(
            spacing * i as u32,
            TouchEvent::new(motor, depth, i == 0),
        );
    }
    seq
}

/// Sharp contact, then release one tick later.
fn poke(motor: usize, intensity: f32) -> EventSequence {
    let mut seq = EventSequence::default();
    seq.push(Duration::ZERO, TouchEvent::new(motor, intensity, true));
    seq.push(TICK, TouchEvent::release(motor));
    seq
}

/// Triangular pressure ramp on every motor simultaneously. The ramp is
/// symmetric: tick `k` and tick `steps - 1 - k` carry the same depth, and
/// the peak reaches `max_intensity` for even and odd step counts alike.
fn squeeze(duration: f32, max_intensity: f32, num_actuators: usize) -> EventSequence {
    let steps = step_count(duration);
    let half = (steps + 1) / 2;
    let mut seq = EventSequence::default();

    for step in 0..steps {
        let offset = TICK * step;
        let rise = (step + 1).min(steps - step);
        let depth = max_intensity * rise as f32 / half as f32;
        for motor in 0..num_actuators {
            seq.push(offset, TouchEvent::new(motor, depth, step == 0));
        }
    }

    let end = TICK * steps;
    for motor in 0..num_actuators {
        seq.push(end, TouchEvent::release(motor));
    }
    seq
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::touch_event::DEFAULT_NUM_ACTUATORS;

    const TOL: f32 = 1e-5;

    fn first_contact_count(seq: &EventSequence) -> usize {
        seq.events().iter().filter(|(_, e)| e.first_contact).count()
    }

    #[test]
    fn stroke_emits_a_tick_grid_plus_releases() {
        let seq = synthesize(
            &GestureSpec::Stroke {
                duration: 2.0,
                intensity: 0.6,
            },
            DEFAULT_NUM_ACTUATORS,
        );

        // 40 ticks x 4 motors, then one release per motor.
        assert_eq!(seq.len(), 40 * 4 + 4);

        let (offset, first) = seq.events()[0];
        assert_eq!(offset, Duration::ZERO);
        assert_eq!(first.actuator_id, 0);
        assert!(first.first_contact);
        assert_eq!(first_contact_count(&seq), 1);

        // Trailing releases, one per motor, at the 2 s mark.
        for (i, (offset, event)) in seq.events().iter().rev().take(4).rev().enumerate() {
            assert_eq!(*offset, Duration::from_secs(2));
            assert_eq!(event.actuator_id, i);
            assert_eq!(event.depth, 0.0);
            assert!(!event.first_contact);
        }
    }

    #[test]
    fn sequences_are_ordered_with_ties_by_actuator() {
        let seq = synthesize(
            &GestureSpec::Stroke {
                duration: 0.5,
                intensity: 0.4,
            },
            DEFAULT_NUM_ACTUATORS,
        );

        for pair in seq.events().windows(2) {
            let (off_a, ev_a) = pair[0];
            let (off_b, ev_b) = pair[1];
            assert!(off_a <= off_b);
            if off_a == off_b {
                assert!(ev_a.actuator_id < ev_b.actuator_id);
            }
        }
    }

    #[test]
    fn pat_is_the_fixed_four_event_fade() {
        let seq = synthesize(
            &GestureSpec::Pat {
                motor: 1,
                intensity: 0.8,
            },
            DEFAULT_NUM_ACTUATORS,
        );

        assert_eq!(seq.len(), 4);
        let expected = [0.8, 0.56, 0.32, 0.0];
        for (i, (offset, event)) in seq.events().iter().enumerate() {
            assert_eq!(*offset, Duration::from_millis(100 * i as u64));
            assert_eq!(event.actuator_id, 1);
            assert!((event.depth - expected[i]).abs() < TOL);
            assert_eq!(event.first_contact, i == 0);
        }
    }

    #[test]
    fn poke_is_contact_then_release() {
        let seq = synthesize(
            &GestureSpec::Poke {
                motor: 2,
                intensity: 0.9,
            },
            DEFAULT_NUM_ACTUATORS,
        );

        assert_eq!(seq.len(), 2);
        let (off_0, contact) = seq.events()[0];
        let (off_1, release) = seq.events()[1];
        assert_eq!(off_0, Duration::ZERO);
        assert!(contact.first_contact);
        assert!((contact.depth - 0.9).abs() < TOL);
        assert_eq!(off_1, TICK);
        assert_eq!(release.depth, 0.0);
        assert!(!release.first_contact);
    }

    #[test]
    fn squeeze_ramp_is_symmetric_and_peaks_at_max() {
        let seq = synthesize(
            &GestureSpec::Squeeze {
                duration: 1.5,
                max_intensity: 0.7,
            },
            DEFAULT_NUM_ACTUATORS,
        );

        let steps = 30usize;
        assert_eq!(seq.len(), steps * 4 + 4);

        // Depth is identical across motors within a tick, so sampling motor 0
        // gives the ramp.
        let ramp: Vec<f32> = seq
            .events()
            .iter()
            .filter(|(_, e)| e.actuator_id == 0)
            .map(|(_, e)| e.depth)
            .take(steps)
            .collect();

        for k in 0..steps / 2 {
            assert!(
                (ramp[k] - ramp[steps - 1 - k]).abs() < TOL,
                "ramp asymmetric at tick {k}"
            );
        }
        let peak = ramp.iter().cloned().fold(0.0f32, f32::max);
        assert!((peak - 0.7).abs() < TOL);
    }

    #[test]
    fn squeeze_marks_first_contact_on_every_motor_at_tick_zero() {
        let seq = synthesize(
            &GestureSpec::Squeeze {
                duration: 1.0,
                max_intensity: 0.5,
            },
            DEFAULT_NUM_ACTUATORS,
        );

        assert_eq!(first_contact_count(&seq), DEFAULT_NUM_ACTUATORS);
        for (offset, event) in seq.events().iter().take(DEFAULT_NUM_ACTUATORS) {
            assert_eq!(*offset, Duration::ZERO);
            assert!(event.first_contact);
        }
    }

    #[test]
    fn sub_tick_durations_still_release_every_motor() {
        for spec in [
            GestureSpec::Stroke {
                duration: 0.01,
                intensity: 0.6,
            },
            GestureSpec::Squeeze {
                duration: 0.04,
                max_intensity: 0.7,
            },
        ] {
            let seq = synthesize(&spec, DEFAULT_NUM_ACTUATORS);
            assert_eq!(seq.len(), DEFAULT_NUM_ACTUATORS);
            for (i, (offset, event)) in seq.events().iter().enumerate() {
                assert_eq!(*offset, Duration::ZERO);
                assert_eq!(event.actuator_id, i);
                assert_eq!(event.depth, 0.0);
                assert!(!event.first_contact);
            }
        }
    }

    #[test]
    fn synthesizer_leaves_intensity_unclamped() {
        let seq = synthesize(
            &GestureSpec::Poke {
                motor: 0,
                intensity: 1.4,
            },
            DEFAULT_NUM_ACTUATORS,
        );
        assert!(seq.events()[0].1.depth > 1.0);
    }

    #[test]
    fn total_duration_is_the_final_offset() {
        let seq = synthesize(
            &GestureSpec::Pat {
                motor: 0,
                intensity: 0.5,
            },
            DEFAULT_NUM_ACTUATORS,
        );
        assert_eq!(seq.total_duration(), Duration::from_millis(300));
        assert_eq!(EventSequence::default().total_duration(), Duration::ZERO);
    }
}
