//! Tact is a wearable haptic sleeve: an array of vibrotactile motors driven
//! by a microcontroller that accepts line-oriented touch commands over USB
//! serial. This crate is the host-side half of the system. It compiles named
//! touch gestures (stroke, pat, poke, squeeze) into per-motor event
//! sequences at a fixed 20 Hz update rate, paces them onto the wire in real
//! time, and carries a scripted validation battery for exercising a
//! connected device end to end.
//!
//! The firmware is maintained in its own repository; from this side of the
//! cable it is a black box that consumes `"<motor>,<depth>,<first contact>"`
//! lines and prints free-form status text back. The `tact` binary is the
//! simulator and demo driver, the `validate` binary runs the battery. Both
//! can target the in-process [`dummy_device`] when no hardware is around.

#![warn(missing_docs)]
pub mod args;
pub mod device_message;
pub mod discovery;
pub mod dummy_device;
pub mod gesture;
#[allow(missing_docs)]
pub mod gui;
pub mod player;
pub mod session;
pub mod touch_event;
pub mod validator;
