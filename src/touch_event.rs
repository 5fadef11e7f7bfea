//! The wire-level command format shared with the Tact firmware. One line per
//! touch sample:
//!
//! ```text
//! <actuator_id>,<depth with two decimals>,<0|1>\n
//! ```
//!
//! Depth is clamped into `[0.0, 1.0]` at encode time; an actuator id outside
//! the device's motor range is a caller error and is rejected instead.

use nom::{
    character::complete::{char, one_of, u32},
    combinator::map,
    error::Error,
    number::complete::float,
    sequence::{preceded, tuple},
    Finish, IResult,
};

use std::fmt::{self, Display};
use std::str::FromStr;

/// Motor count of the standard Tact sleeve build.
pub const DEFAULT_NUM_ACTUATORS: usize = 4;

/// One touch sample destined for a single vibrotactile actuator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    /// Index of the target motor, `0..num_actuators`.
    pub actuator_id: usize,
    /// Normalized contact intensity. Values outside `[0.0, 1.0]` are
    /// tolerated here and clamped when the event is put on the wire.
    pub depth: f32,
    /// Marks the rising edge of a new touch, as opposed to a sustained one.
    pub first_contact: bool,
}

/// Returned when an event cannot be encoded for transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The actuator id is not present on a device with this many motors.
    InvalidActuator {
        /// The offending id.
        id: usize,
        /// Size of the valid range.
        num_actuators: usize,
    },
}

impl Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::InvalidActuator { id, num_actuators } => {
                write!(f, "actuator id {id} out of range, device has {num_actuators} motors")
            }
        }
    }
}

impl std::error::Error for CodecError {}

impl TouchEvent {
    /// Builds an event. No validation happens here; see [`TouchEvent::to_line`].
    pub fn new(actuator_id: usize, depth: f32, first_contact: bool) -> Self {
        Self {
            actuator_id,
            depth,
            first_contact,
        }
    }

    /// A release sample, ending contact on one motor.
    pub fn release(actuator_id: usize) -> Self {
        Self::new(actuator_id, 0.0, false)
    }

    /// Encodes the event as one newline-terminated wire line.
    ///
    /// Depth is clamped into `[0.0, 1.0]` before formatting. An out-of-range
    /// actuator id is a precondition violation and yields
    /// [`CodecError::InvalidActuator`] instead of a best-effort line.
    pub fn to_line(&self, num_actuators: usize) -> Result<String, CodecError> {
        if self.actuator_id >= num_actuators {
            return Err(CodecError::InvalidActuator {
                id: self.actuator_id,
                num_actuators,
            });
        }

        let depth = self.depth.clamp(0.0, 1.0);
        let flag = u8::from(self.first_contact);
        Ok(format!("{},{:.2},{}\n", self.actuator_id, depth, flag))
    }
}

fn parse_touch_event(s: &str) -> IResult<&str, TouchEvent> {
    map(
        tuple((
            u32,
            preceded(char(','), float),
            preceded(char(','), one_of("01")),
        )),
        |(id, depth, flag)| TouchEvent {
            actuator_id: id as usize,
            depth,
            first_contact: flag == '1',
        },
    )(s)
}

impl FromStr for TouchEvent {
    type Err = Error<String>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_touch_event(s.trim_end()).finish() {
            Ok((_remaining, event)) => Ok(event),
            Err(Error { input, code }) => Err(Error {
                input: input.to_string(),
                code,
            }),
        }
    }
}
