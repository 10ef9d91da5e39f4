use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tm02_protocol::CurrentSource;

#[derive(Parser)]
#[clap(author, version, about = "Ultra-TM02 host controller", long_about = None)]
pub struct Cli {
    /// YAML configuration file
    #[clap(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Serial port, or "[simulator]" for the simulated instrument
    #[clap(short, long, global = true)]
    pub port: Option<String>,

    /// Serial baud rate
    #[clap(short, long, global = true)]
    pub baud: Option<u32>,

    /// More log output (repeat for trace)
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lists selectable endpoints
    Ports,
    /// Shows identifier, readings and status
    Info,
    /// Polls temperature, voltage and current
    Watch(WatchConf),
    /// Selects the excitation current source
    SetSource {
        #[clap(value_enum)]
        source: SourceArg,
    },
    /// Trims one of the excitation sources
    SetAdjust {
        #[clap(value_enum)]
        source: SourceArg,
        /// Adjustment in µA
        #[clap(allow_negative_numbers = true)]
        value: f32,
    },
    /// Sets the temperatures mapped to 4 mA and 20 mA
    SetRange(RangeConf),
    /// Starts acquisition
    Start,
    /// Stops acquisition
    Stop,
    /// Saves parameters to flash
    Save,
    /// Reloads parameters from flash
    Load,
    /// Restores factory defaults
    Reset,
    /// Downloads a calibration table from a CSV file
    Upload(UploadConf),
    /// Writes a sample calibration table CSV
    SampleTable {
        /// Output file
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SourceArg {
    /// 10 µA source
    Low,
    /// 17 µA source
    High,
}

impl From<SourceArg> for CurrentSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Low => CurrentSource::Low,
            SourceArg::High => CurrentSource::High,
        }
    }
}

#[derive(Args)]
pub struct WatchConf {
    /// Number of readings, 0 for unlimited
    #[clap(short = 'n', long, default_value_t = 10)]
    pub count: u32,
    /// Delay between readings in milliseconds
    #[clap(short, long, default_value_t = 1000)]
    pub interval_ms: u64,
}

#[derive(Args)]
pub struct RangeConf {
    /// Temperature at 4 mA
    #[clap(long = "at-4ma", allow_negative_numbers = true)]
    pub at_4ma: f32,
    /// Temperature at 20 mA
    #[clap(long = "at-20ma", allow_negative_numbers = true)]
    pub at_20ma: f32,
}

#[derive(Args)]
pub struct UploadConf {
    /// CSV file with voltage (mV) and temperature (K) columns
    pub file: PathBuf,
    /// Points per packet, overrides the configuration
    #[clap(long)]
    pub packet_points: Option<usize>,
}
