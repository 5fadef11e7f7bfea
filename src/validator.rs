//! Scripted validation battery for a connected device. Seven stages run in a
//! fixed order, each leaving exactly one [`ValidationResult`] in the log;
//! stage failures are recorded rather than propagated so one bad stage never
//! hides what the rest of the battery finds. The exception is the connect
//! stage, whose failure ends the run.

use crate::session::{DeviceLink, Session};
use crate::touch_event::TouchEvent;

use log::{info, warn};
use serde::Serialize;

use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Outcome of a single validation stage.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    /// Stage name as shown in the summary.
    pub test_name: String,
    /// Whether the stage met its acceptance criterion.
    pub passed: bool,
    /// Human-readable specifics, e.g. `"18/20 commands in 1.04s"`.
    pub details: String,
    /// Seconds since the Unix epoch when the stage finished.
    pub timestamp: f64,
}

/// The complete, ordered record of one harness run.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// True iff every stage passed.
    pub passed: bool,
    /// One entry per executed stage, in execution order.
    pub results: Vec<ValidationResult>,
}

/// Returned when a report cannot be written out.
#[derive(Debug)]
pub enum ReportError {
    /// Returned when io fails while writing the report file.
    IoError(std::io::Error),
    /// Returned when serialization of the report fails.
    RonError(ron::Error),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            ReportError::IoError(error) => Cow::from(format!("io error: {}", error)),
            ReportError::RonError(error) => Cow::from(format!("ron error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for ReportError {}

impl ValidationReport {
    /// Serializes the report as RON to the path provided.
    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(ReportError::RonError)?;
        let mut handle = File::create(path).map_err(ReportError::IoError)?;
        handle
            .write_all(text.as_bytes())
            .map_err(ReportError::IoError)
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Drives the validation battery over an exclusively-owned session.
pub struct Validator<L: DeviceLink> {
    session: Session<L>,
    results: Vec<ValidationResult>,
}

impl<L: DeviceLink> Validator<L> {
    /// Takes ownership of an open session for the duration of the run.
    pub fn new(session: Session<L>) -> Self {
        Self {
            session,
            results: Vec::new(),
        }
    }

    /// Runs the full battery and returns the report. The session is dropped
    /// (and the link closed) when the run ends.
    pub fn run(mut self) -> ValidationReport {
        if !self.check_connect() {
            warn!("aborting validation, connect stage failed");
            return ValidationReport {
                passed: false,
                results: self.results,
            };
        }

        let mut all_passed = true;
        all_passed &= self.check_basic_communication();
        all_passed &= self.check_motor_response();
        all_passed &= self.check_first_contact_detection();
        all_passed &= self.check_intensity_scaling();
        all_passed &= self.check_timing_performance();
        all_passed &= self.check_error_handling();

        ValidationReport {
            passed: all_passed,
            results: self.results,
        }
    }

    fn record(&mut self, test_name: &str, passed: bool, details: String) -> bool {
        if passed {
            info!("[PASS] {test_name}: {details}");
        } else {
            warn!("[FAIL] {test_name}: {details}");
        }
        self.results.push(ValidationResult {
            test_name: test_name.to_owned(),
            passed,
            details,
            timestamp: unix_now(),
        });
        passed
    }

    /// Stage 1: unlike casual connections, validation requires the firmware
    /// to announce itself with the exact ready banner.
    fn check_connect(&mut self) -> bool {
        match self.session.poll_ready() {
            Some(_) => {
                let details = format!("connected to {}", self.session.port_name());
                self.record("Connection", true, details)
            }
            None => self.record(
                "Connection",
                false,
                "device not responding with ready message".to_owned(),
            ),
        }
    }

    /// Stage 2: a fixed four-command batch must transmit completely.
    fn check_basic_communication(&mut self) -> bool {
        let n = self.session.num_actuators();
        let batch = [
            (0 % n, 0.5, true),
            (1 % n, 0.3, false),
            (2 % n, 0.0, false),
            (3 % n, 0.8, true),
        ];

        let mut sent = 0;
        for (motor, depth, first_contact) in batch {
            if self
                .session
                .send(TouchEvent::new(motor, depth, first_contact))
                .is_ok()
            {
                sent += 1;
                thread::sleep(Duration::from_millis(100));
            }
        }

        let passed = sent == batch.len();
        self.record(
            "Basic Communication",
            passed,
            format!("{sent}/{} commands sent successfully", batch.len()),
        )
    }

    /// Stage 3: every motor gets an activate/deactivate pair; one motor is
    /// allowed to fail without sinking the stage.
    fn check_motor_response(&mut self) -> bool {
        let n = self.session.num_actuators();
        let mut completed = 0;

        for motor in 0..n {
            let activated = self.session.send(TouchEvent::new(motor, 0.7, true)).is_ok();
            if activated {
                thread::sleep(Duration::from_millis(200));
                if self.session.send(TouchEvent::release(motor)).is_ok() {
                    completed += 1;
                }
            }
            thread::sleep(Duration::from_millis(300));
        }

        let passed = completed + 1 >= n;
        self.record(
            "Motor Response",
            passed,
            format!("{completed}/{n} motors responded correctly"),
        )
    }

    /// Stage 4: three fixed sequences exercising the contact-transition
    /// patterns the firmware keys its pulse behavior on.
    fn check_first_contact_detection(&mut self) -> bool {
        let n = self.session.num_actuators();
        let sequences: [[(usize, f32, bool); 3]; 3] = [
            // First contact, then sustain, then release.
            [(0 % n, 0.6, true), (0 % n, 0.6, false), (0 % n, 0.0, false)],
            // Out of contact straight into a fresh contact.
            [(1 % n, 0.0, false), (1 % n, 0.5, true), (1 % n, 0.0, false)],
            // Sustained contact varying depth, no new onset.
            [(2 % n, 0.4, false), (2 % n, 0.8, false), (2 % n, 0.0, false)],
        ];

        let mut completed = 0;
        for sequence in &sequences {
            let mut all_sent = true;
            for (motor, depth, first_contact) in sequence {
                if self
                    .session
                    .send(TouchEvent::new(*motor, *depth, *first_contact))
                    .is_err()
                {
                    all_sent = false;
                    break;
                }
                thread::sleep(Duration::from_millis(100));
            }
            if all_sent {
                completed += 1;
            }
            thread::sleep(Duration::from_millis(500));
        }

        let passed = completed == sequences.len();
        self.record(
            "First Contact Detection",
            passed,
            format!("{completed}/{} sequences completed", sequences.len()),
        )
    }

    /// Stage 5: one onset followed by four ascending depth levels on a
    /// single motor.
    fn check_intensity_scaling(&mut self) -> bool {
        let n = self.session.num_actuators();
        let motor = 1 % n;
        let levels = [0.3, 0.5, 0.7, 0.9];

        if self.session.send(TouchEvent::new(motor, 0.1, true)).is_err() {
            return self.record(
                "Intensity Scaling",
                false,
                "failed to start intensity test".to_owned(),
            );
        }
        thread::sleep(Duration::from_millis(200));

        let mut sent = 0;
        for level in levels {
            if self
                .session
                .send(TouchEvent::new(motor, level, false))
                .is_ok()
            {
                sent += 1;
            }
            thread::sleep(Duration::from_millis(300));
        }

        let _ = self.session.send(TouchEvent::release(motor));

        let passed = sent == levels.len();
        self.record(
            "Intensity Scaling",
            passed,
            format!("{sent}/{} intensity levels tested", levels.len()),
        )
    }

    /// Stage 6: twenty commands at the 20 Hz tick; the wall clock must land
    /// within 500 ms of the 1 s nominal, bounding scheduling jitter.
    fn check_timing_performance(&mut self) -> bool {
        let n = self.session.num_actuators();
        let command_count = 20;

        let start = Instant::now();
        let mut sent = 0;
        for i in 0..command_count {
            let motor = i % n;
            let depth = if i % 2 == 0 { 0.5 } else { 0.0 };
            let first_contact = i % 4 == 0;
            if self
                .session
                .send(TouchEvent::new(motor, depth, first_contact))
                .is_ok()
            {
                sent += 1;
            }
            spin_sleep::sleep(Duration::from_millis(50));
        }
        let total = start.elapsed().as_secs_f64();

        let expected = command_count as f64 * 0.05;
        let timing_ok = (total - expected).abs() < 0.5;
        let passed = timing_ok && sent == command_count;
        self.record(
            "Timing Performance",
            passed,
            format!("{sent}/{command_count} commands in {total:.2}s"),
        )
    }

    /// Stage 7: the link must swallow malformed traffic without erroring,
    /// and a valid pair afterwards proves it did not wedge.
    fn check_error_handling(&mut self) -> bool {
        let n = self.session.num_actuators();
        let out_of_range_id = format!("{n},0.5,1\n");
        let malformed: [&[u8]; 6] = [
            out_of_range_id.as_bytes(), // motor id past the end of the array
            b"0,1.5,1\n",               // depth above 1.0
            b"0,-0.1,1\n",              // negative depth
            b"abc,0.5,1\n",             // not even a number
            b"0,0.5\n",                 // missing field
            b"\n",                      // empty command
        ];

        let mut accepted = 0;
        for line in malformed {
            if self.session.send_raw(line).is_ok() {
                accepted += 1;
            }
            thread::sleep(Duration::from_millis(100));
        }

        let recovered = self.session.send(TouchEvent::new(0, 0.5, true)).is_ok() && {
            thread::sleep(Duration::from_millis(100));
            self.session.send(TouchEvent::release(0)).is_ok()
        };

        let passed = accepted == malformed.len() && recovered;
        self.record(
            "Error Handling",
            passed,
            format!(
                "system handled {accepted}/{} invalid commands, recovery {}",
                malformed.len(),
                if recovered { "ok" } else { "failed" }
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DeviceLink;

    use std::collections::VecDeque;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Link whose writes succeed unless the line starts with one of the
    /// poisoned prefixes; inbound lines are scripted.
    struct ScriptedLink {
        written: Arc<Mutex<Vec<String>>>,
        inbound: VecDeque<String>,
        poisoned_prefixes: Vec<String>,
    }

    impl ScriptedLink {
        fn new(inbound: &[&str]) -> (Self, Arc<Mutex<Vec<String>>>) {
            let written = Arc::new(Mutex::new(Vec::new()));
            let link = Self {
                written: Arc::clone(&written),
                inbound: inbound.iter().map(|s| s.to_string()).collect(),
                poisoned_prefixes: Vec::new(),
            };
            (link, written)
        }
    }

    impl DeviceLink for ScriptedLink {
        fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
            let line = String::from_utf8_lossy(bytes).into_owned();
            if self.poisoned_prefixes.iter().any(|p| line.starts_with(p)) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "motor wire cut"));
            }
            self.written.lock().unwrap().push(line);
            Ok(())
        }

        fn read_line(&mut self, _timeout: Duration) -> Option<String> {
            self.inbound.pop_front()
        }
    }

    fn validator(link: ScriptedLink) -> Validator<ScriptedLink> {
        Validator::new(Session::from_link(link, "mock".to_owned(), 115_200, 4))
    }

    #[test]
    fn connect_failure_halts_the_run() {
        let (link, written) = ScriptedLink::new(&["garbage", "but no banner"]);
        let report = validator(link).run();

        assert!(!report.passed);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].test_name, "Connection");
        assert!(!report.results[0].passed);
        // Nothing was transmitted before the run gave up.
        assert!(written.lock().unwrap().is_empty());
    }

    #[test]
    fn full_battery_passes_on_a_healthy_link() {
        let (link, _written) = ScriptedLink::new(&["Tact Haptic Controller Ready"]);
        let report = validator(link).run();

        assert!(report.passed);
        assert_eq!(report.results.len(), 7);
        let names: Vec<_> = report
            .results
            .iter()
            .map(|r| r.test_name.as_str())
            .collect();
        assert_eq!(
            names,
            [
                "Connection",
                "Basic Communication",
                "Motor Response",
                "First Contact Detection",
                "Intensity Scaling",
                "Timing Performance",
                "Error Handling",
            ]
        );
        assert!(report.results.iter().all(|r| r.passed));
    }

    #[test]
    fn motor_response_tolerates_exactly_one_bad_motor() {
        let (mut link, _written) = ScriptedLink::new(&[]);
        link.poisoned_prefixes = vec!["2,".to_owned()];
        let mut validator = validator(link);

        assert!(validator.check_motor_response());
        let result = validator.results.last().unwrap();
        assert!(result.details.starts_with("3/4"));
    }

    #[test]
    fn motor_response_fails_with_two_bad_motors() {
        let (mut link, _written) = ScriptedLink::new(&[]);
        link.poisoned_prefixes = vec!["1,".to_owned(), "2,".to_owned()];
        let mut validator = validator(link);

        assert!(!validator.check_motor_response());
    }

    #[test]
    fn timing_stage_lands_inside_the_jitter_budget() {
        let (link, written) = ScriptedLink::new(&[]);
        let mut validator = validator(link);

        let start = Instant::now();
        assert!(validator.check_timing_performance());
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed <= Duration::from_millis(1500));
        assert_eq!(written.lock().unwrap().len(), 20);
    }

    #[test]
    fn error_handling_requires_recovery_after_garbage() {
        let (link, written) = ScriptedLink::new(&[]);
        let mut validator = validator(link);

        assert!(validator.check_error_handling());

        let written = written.lock().unwrap();
        // Six raw lines, then the valid event/release pair.
        assert_eq!(written.len(), 8);
        assert_eq!(written[6], "0,0.50,1\n");
        assert_eq!(written[7], "0,0.00,0\n");
    }

    #[test]
    fn later_stages_still_run_after_a_mid_battery_failure() {
        let (mut link, _written) = ScriptedLink::new(&["Tact Haptic Controller Ready"]);
        // Poisoning motor 0 sinks several stages, but every stage must still
        // report.
        link.poisoned_prefixes = vec!["0,".to_owned()];
        let report = validator(link).run();

        assert!(!report.passed);
        assert_eq!(report.results.len(), 7);
        assert!(report.results.iter().any(|r| !r.passed));
    }

    #[test]
    fn report_serializes_to_ron() {
        let report = ValidationReport {
            passed: false,
            results: vec![ValidationResult {
                test_name: "Connection".to_owned(),
                passed: false,
                details: "device not responding with ready message".to_owned(),
                timestamp: 1_700_000_000.0,
            }],
        };

        let tempfile = tempfile::NamedTempFile::new().unwrap();
        report.to_path(tempfile.path()).unwrap();

        let text = std::fs::read_to_string(tempfile.path()).unwrap();
        assert!(text.contains("Connection"));
        assert!(text.contains("passed: false"));
    }
}
