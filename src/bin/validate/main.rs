//! Runs the scripted validation battery against a connected Tact device
//! (or the dummy firmware) and prints the ordered pass/fail summary.

use clap::Parser;

use tact::args::ValidateArgs;
use tact::dummy_device::DummyDevice;
use tact::session::Session;
use tact::validator::{ValidationReport, Validator};

use std::process::exit;

fn main() {
    env_logger::init();
    let args = ValidateArgs::parse();

    println!("{:=<50}", "");
    println!("TACT SYSTEM VALIDATION SUITE");
    println!("{:=<50}", "");

    let report = if args.dummy {
        let (device, link) = DummyDevice::spawn(args.motors);
        let session = Session::from_link(link, "dummy".to_owned(), args.baud, args.motors);
        let report = Validator::new(session).run();
        device.join();
        report
    } else {
        match Session::open(args.port.as_deref(), args.baud, args.motors) {
            Ok(session) => Validator::new(session).run(),
            Err(e) => {
                eprintln!("Validation failed before it started: {e}");
                exit(1);
            }
        }
    };

    print_summary(&report);

    if let Some(path) = &args.out {
        match report.to_path(path) {
            Ok(()) => println!("Report written to {path}"),
            Err(e) => {
                eprintln!("Could not write report: {e}");
                exit(1);
            }
        }
    }

    exit(i32::from(!report.passed));
}

fn print_summary(report: &ValidationReport) {
    println!();
    println!("{:=<50}", "");
    println!("VALIDATION SUMMARY");
    println!("{:=<50}", "");

    for result in &report.results {
        let symbol = if result.passed { "✓" } else { "✗" };
        println!("{symbol} {}: {}", result.test_name, result.details);
    }

    let passed = report.results.iter().filter(|r| r.passed).count();
    println!();
    println!("Overall result: {passed}/{} stages passed", report.results.len());
    if report.passed {
        println!("System validation successful. The sleeve is ready for use.");
    } else {
        println!("System validation FAILED. Check the stages above and the hardware setup.");
    }
}
