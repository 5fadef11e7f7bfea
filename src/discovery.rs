//! Best-effort serial device discovery. String heuristics over the platform
//! port listing are inherently fuzzy, so they stay behind this narrow module;
//! the protocol core never looks at a port name.

use log::{debug, warn};
use serial2::SerialPort;

use std::path::{Path, PathBuf};

/// Path substrings that mark an entry as a likely USB serial adapter.
const USB_HINTS: [&str; 5] = ["ttyACM", "ttyUSB", "usbmodem", "usbserial", "COM"];

/// Conventional device paths tried, in order, when the listing turns up
/// nothing usable.
const FALLBACK_PORTS: [&str; 4] = ["/dev/ttyACM0", "/dev/ttyUSB0", "COM3", "COM4"];

/// The platform's serial port listing, in platform order. Empty when the
/// listing itself fails.
pub fn list_candidate_ports() -> Vec<PathBuf> {
    match SerialPort::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            warn!("could not enumerate serial ports: {e}");
            Vec::new()
        }
    }
}

fn matches_usb_hint(path: &Path) -> bool {
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    USB_HINTS.iter().any(|hint| name.contains(hint))
}

fn probe(path: &Path, baud: u32) -> bool {
    // Open and immediately close; all we learn is that the path exists and
    // nobody else holds it.
    match SerialPort::open(path, baud) {
        Ok(_port) => true,
        Err(e) => {
            debug!("probe of {} failed: {e}", path.display());
            false
        }
    }
}

/// Locates the device port: first listing entry that looks like a USB serial
/// adapter, else the first fallback path that opens. `None` once every
/// candidate is exhausted.
pub fn find_device_port(baud: u32) -> Option<PathBuf> {
    for port in list_candidate_ports() {
        if matches_usb_hint(&port) {
            debug!("discovery matched {}", port.display());
            return Some(port);
        }
    }

    for path in FALLBACK_PORTS {
        let path = PathBuf::from(path);
        if probe(&path, baud) {
            debug!("fallback probe succeeded on {}", path.display());
            return Some(path);
        }
    }

    None
}
