// Commandline argument parsers, using clap, for the two Tact host binaries

use crate::gesture::GestureSpec;
use crate::touch_event::DEFAULT_NUM_ACTUATORS;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Arguments for the `tact` simulator binary.
#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct TactArgs {
    /// Serial port path. Discovered automatically when omitted
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate of the serial link
    #[arg(short, long, default_value_t = 115_200)]
    pub baud: u32,

    /// Number of vibrotactile motors on the sleeve
    #[arg(short, long, default_value_t = DEFAULT_NUM_ACTUATORS)]
    pub motors: usize,

    /// Drive the in-process dummy firmware instead of real hardware
    #[arg(long)]
    pub dummy: bool,

    /// Pick the serial port from an interactive list
    #[arg(long)]
    pub pick: bool,

    #[command(subcommand)]
    /// Which task to perform. The quick demo runs when omitted
    pub command: Option<TactCommand>,
}

/// Tasks the simulator can run.
#[derive(Debug, Subcommand, Clone)]
pub enum TactCommand {
    /// Short showcase: a poke, a pat, then a stroke
    #[command(about)]
    Demo,

    /// Run the full gesture battery across all motors
    #[command(about)]
    Test,

    /// Play one gesture and exit
    #[command(about)]
    Gesture(GestureCommand),

    /// Drive the device manually from a command prompt
    #[command(about)]
    Interactive,
}

/// Parameters for playing one gesture from the command line.
#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct GestureCommand {
    /// Which gesture to play
    #[arg(value_enum)]
    pub name: GestureName,

    /// Gesture length in seconds; used by stroke and squeeze
    #[arg(short, long, default_value_t = 2.0)]
    pub duration: f32,

    /// Peak contact depth
    #[arg(short, long, default_value_t = 0.6)]
    pub intensity: f32,

    /// Target motor; used by pat and poke
    #[arg(long, default_value_t = 1)]
    pub motor: usize,
}

/// The gestures the synthesizer knows, as commandline values.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GestureName {
    Stroke,
    Pat,
    Poke,
    Squeeze,
}

impl GestureCommand {
    /// The spec the synthesizer consumes for this invocation.
    pub fn to_spec(&self) -> GestureSpec {
        match self.name {
            GestureName::Stroke => GestureSpec::Stroke {
                duration: self.duration,
                intensity: self.intensity,
            },
            GestureName::Pat => GestureSpec::Pat {
                motor: self.motor,
                intensity: self.intensity,
            },
            GestureName::Poke => GestureSpec::Poke {
                motor: self.motor,
                intensity: self.intensity,
            },
            GestureName::Squeeze => GestureSpec::Squeeze {
                duration: self.duration,
                max_intensity: self.intensity,
            },
        }
    }
}

/// Arguments for the `validate` harness binary.
#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct ValidateArgs {
    /// Serial port path. Discovered automatically when omitted
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate of the serial link
    #[arg(short, long, default_value_t = 115_200)]
    pub baud: u32,

    /// Number of vibrotactile motors on the sleeve
    #[arg(short, long, default_value_t = DEFAULT_NUM_ACTUATORS)]
    pub motors: usize,

    /// Validate the stack against the in-process dummy firmware
    #[arg(long)]
    pub dummy: bool,

    /// Also write the result log to this path, in RON
    #[arg(short, long)]
    pub out: Option<String>,
}
