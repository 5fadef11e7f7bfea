//! Simulator and demo driver for the Tact sleeve: connects (or spawns the
//! dummy firmware), then runs the requested demo, gesture, or the
//! interactive prompt.

use clap::Parser;
use log::{info, warn};

use tact::args::{TactArgs, TactCommand};
use tact::discovery;
use tact::dummy_device::DummyDevice;
use tact::gesture::{synthesize, GestureSpec};
use tact::gui::device_selector;
use tact::player::{play, release_all};
use tact::session::{DeviceLink, Session, TransportError};
use tact::touch_event::TouchEvent;

use std::error::Error;
use std::io::{self, BufRead, Write};
use std::process::exit;
use std::sync::mpsc::channel;
use std::thread::sleep;
use std::time::Duration;

fn main() {
    env_logger::init();
    let args = TactArgs::parse();

    if args.dummy {
        let (device, link) = DummyDevice::spawn(args.motors);
        let mut session = Session::from_link(link, "dummy".to_owned(), args.baud, args.motors);
        greet(&mut session);
        let outcome = run(&mut session, &args);
        session.disconnect();
        device.join();
        if let Err(e) = outcome {
            eprintln!("Error: {e}");
            exit(1);
        }
        return;
    }

    let Some(port) = resolve_port(&args) else {
        eprintln!("Error: could not find a Tact device. Specify --port or try --pick.");
        exit(1);
    };

    let mut session = match Session::open(Some(&port), args.baud, args.motors) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error connecting to the device: {e}");
            exit(1);
        }
    };
    println!("Connected to Tact device on {}", session.port_name());

    greet(&mut session);
    let outcome = run(&mut session, &args);
    session.disconnect();
    if let Err(e) = outcome {
        eprintln!("Error: {e}");
        exit(1);
    }
}

/// Explicit port, interactive pick, or the discovery heuristics, in that
/// order.
fn resolve_port(args: &TactArgs) -> Option<String> {
    if let Some(port) = &args.port {
        return Some(port.clone());
    }

    if args.pick {
        return match device_selector(discovery::list_candidate_ports()) {
            Ok(choice) => choice.map(|p| p.to_string_lossy().into_owned()),
            Err(e) => {
                warn!("device selector failed: {e}");
                None
            }
        };
    }

    discovery::find_device_port(args.baud).map(|p| p.to_string_lossy().into_owned())
}

/// Lenient handshake: a silent device is worth a warning, nothing more. The
/// validation suite is the strict counterpart.
fn greet<L: DeviceLink>(session: &mut Session<L>) {
    if session.poll_ready().is_none() {
        warn!("no ready banner from the device, continuing anyway");
    }
}

fn run<L: DeviceLink>(session: &mut Session<L>, args: &TactArgs) -> Result<(), Box<dyn Error>> {
    match &args.command {
        None | Some(TactCommand::Demo) => quick_demo(session)?,
        Some(TactCommand::Test) => gesture_tests(session)?,
        Some(TactCommand::Gesture(cmd)) => play_spec(session, &cmd.to_spec())?,
        Some(TactCommand::Interactive) => interactive(session)?,
    }
    Ok(())
}

fn play_spec<L: DeviceLink>(
    session: &mut Session<L>,
    spec: &GestureSpec,
) -> Result<(), TransportError> {
    let sequence = synthesize(spec, session.num_actuators());
    info!(
        "playing {:?}: {} events over {:?}",
        spec,
        sequence.len(),
        sequence.total_duration()
    );
    let (_cancel_tx, cancel_rx) = channel();
    play(session, &sequence, &cancel_rx)?;
    Ok(())
}

fn quick_demo<L: DeviceLink>(session: &mut Session<L>) -> Result<(), TransportError> {
    println!("Running quick demo...");
    sleep(Duration::from_secs(1));
    play_spec(
        session,
        &GestureSpec::Poke {
            motor: 0,
            intensity: 0.9,
        },
    )?;
    sleep(Duration::from_secs(1));
    play_spec(
        session,
        &GestureSpec::Pat {
            motor: 1,
            intensity: 0.8,
        },
    )?;
    sleep(Duration::from_secs(1));
    play_spec(
        session,
        &GestureSpec::Stroke {
            duration: 2.0,
            intensity: 0.6,
        },
    )?;
    println!("Demo complete. Use the interactive subcommand for manual control.");
    Ok(())
}

fn gesture_tests<L: DeviceLink>(session: &mut Session<L>) -> Result<(), TransportError> {
    println!("\n=== Running Gesture Tests ===");

    println!("\n1. Testing stroke gesture...");
    play_spec(
        session,
        &GestureSpec::Stroke {
            duration: 2.0,
            intensity: 0.6,
        },
    )?;
    sleep(Duration::from_secs(1));

    println!("\n2. Testing pat gestures...");
    for motor in 0..session.num_actuators() {
        println!("   Pat on motor {motor}");
        play_spec(
            session,
            &GestureSpec::Pat {
                motor,
                intensity: 0.8,
            },
        )?;
        sleep(Duration::from_millis(500));
    }

    println!("\n3. Testing poke gestures...");
    for motor in 0..session.num_actuators() {
        println!("   Poke on motor {motor}");
        play_spec(
            session,
            &GestureSpec::Poke {
                motor,
                intensity: 0.9,
            },
        )?;
        sleep(Duration::from_millis(500));
    }

    println!("\n4. Testing squeeze gesture...");
    play_spec(
        session,
        &GestureSpec::Squeeze {
            duration: 1.5,
            max_intensity: 0.7,
        },
    )?;

    println!("\nGesture tests complete!");
    Ok(())
}

fn interactive<L: DeviceLink>(session: &mut Session<L>) -> Result<(), Box<dyn Error>> {
    println!("\n=== Tact Interactive Mode ===");
    println!("Commands:");
    println!("  stroke                    - wave across all motors");
    println!("  pat [motor]               - tap-and-fade (default motor 1)");
    println!("  poke [motor]              - sharp contact (default motor 2)");
    println!("  squeeze                   - pressure ramp on all motors");
    println!("  manual <m> <depth> <0|1>  - send one event by hand");
    println!("  release                   - silence every motor");
    println!("  test                      - run the full gesture battery");
    println!("  quit                      - exit interactive mode");
    println!();

    let stdin = io::stdin();
    loop {
        print!("Tact> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, rest)) = words.split_first() else {
            continue;
        };

        let outcome = match command {
            "quit" | "q" => break,
            "stroke" => play_spec(
                session,
                &GestureSpec::Stroke {
                    duration: 2.0,
                    intensity: 0.6,
                },
            ),
            "pat" => play_spec(
                session,
                &GestureSpec::Pat {
                    motor: parse_motor(rest, 1),
                    intensity: 0.8,
                },
            ),
            "poke" => play_spec(
                session,
                &GestureSpec::Poke {
                    motor: parse_motor(rest, 2),
                    intensity: 0.9,
                },
            ),
            "squeeze" => play_spec(
                session,
                &GestureSpec::Squeeze {
                    duration: 1.5,
                    max_intensity: 0.7,
                },
            ),
            "manual" => manual_event(session, rest),
            "release" => release_all(session),
            "test" => gesture_tests(session),
            other => {
                println!("Unknown command: {other}");
                Ok(())
            }
        };

        // Keep the prompt alive on errors; the user may just retry.
        if let Err(e) = outcome {
            println!("Error: {e}");
        }
    }
    Ok(())
}

fn parse_motor(rest: &[&str], default: usize) -> usize {
    rest.first()
        .and_then(|word| word.parse().ok())
        .unwrap_or(default)
}

fn manual_event<L: DeviceLink>(
    session: &mut Session<L>,
    rest: &[&str],
) -> Result<(), TransportError> {
    let parsed = match rest {
        [motor, depth, flag] => match (motor.parse(), depth.parse(), *flag) {
            (Ok(motor), Ok(depth), "0") => Some(TouchEvent::new(motor, depth, false)),
            (Ok(motor), Ok(depth), "1") => Some(TouchEvent::new(motor, depth, true)),
            _ => None,
        },
        _ => None,
    };

    match parsed {
        Some(event) => {
            session.send(event)?;
            println!("Sent {},{:.2},{}", event.actuator_id, event.depth, u8::from(event.first_contact));
            Ok(())
        }
        None => {
            println!("Usage: manual <motor> <depth> <0|1>");
            Ok(())
        }
    }
}
