//! Classifier for the status lines the firmware prints back over the link.
//!
//! The firmware does not echo structured acknowledgements; it prints a ready
//! banner once after reset and free-form per-motor notes while running. Lines
//! that match neither shape stay opaque text, logged and otherwise ignored.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until},
    character::complete::u32,
    combinator::{map, rest},
    error::Error,
    sequence::{preceded, tuple},
    Finish, IResult,
};

use std::str::FromStr;

/// The banner the firmware prints once it has finished initializing.
pub const READY_BANNER: &str = "Tact Haptic Controller Ready";

/// A recognized status line from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceMessage {
    /// The post-reset ready banner. Matched by containment, since some
    /// bootloaders prepend garbage to the first lines out of the UART.
    Ready,
    /// A per-motor note, e.g. `Motor 2: first contact pulse`.
    MotorStatus {
        /// The motor the note concerns.
        motor: u32,
        /// Free-form remainder of the line.
        detail: String,
    },
}

fn parse_ready(s: &str) -> IResult<&str, DeviceMessage> {
    map(tuple((take_until(READY_BANNER), tag(READY_BANNER))), |_| {
        DeviceMessage::Ready
    })(s)
}

fn parse_motor_status(s: &str) -> IResult<&str, DeviceMessage> {
    map(
        tuple((preceded(tag("Motor "), u32), preceded(tag(": "), rest))),
        |(motor, detail): (u32, &str)| DeviceMessage::MotorStatus {
            motor,
            detail: detail.to_owned(),
        },
    )(s)
}

fn parse_device_message(s: &str) -> IResult<&str, DeviceMessage> {
    alt((parse_ready, parse_motor_status))(s)
}

impl FromStr for DeviceMessage {
    type Err = Error<String>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_device_message(s.trim_end()).finish() {
            Ok((_remaining, msg)) => Ok(msg),
            Err(Error { input, code }) => Err(Error {
                input: input.to_string(),
                code,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_the_ready_banner() {
        let msg = DeviceMessage::from_str("Tact Haptic Controller Ready\n").unwrap();
        assert_eq!(msg, DeviceMessage::Ready);
    }

    #[test]
    fn recognizes_the_banner_behind_uart_garbage() {
        let msg = DeviceMessage::from_str("\u{fffd}\u{7}Tact Haptic Controller Ready").unwrap();
        assert_eq!(msg, DeviceMessage::Ready);
    }

    #[test]
    fn recognizes_motor_status_lines() {
        let msg = DeviceMessage::from_str("Motor 2: first contact pulse\n").unwrap();
        assert_eq!(
            msg,
            DeviceMessage::MotorStatus {
                motor: 2,
                detail: "first contact pulse".to_owned(),
            }
        );
    }

    #[test]
    fn everything_else_is_opaque() {
        for line in ["booting", "ERR 4", "", "Motor x: huh"] {
            assert!(DeviceMessage::from_str(line).is_err());
        }
    }
}
