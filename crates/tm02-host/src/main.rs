mod cli;

use std::error::Error;
use std::io::Write;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tm02_host::{list_endpoints, AnyDevice, Endpoint, HostConfig, SIMULATOR_ENDPOINT};
use tm02_protocol::CalibrationTable;
use tracing_subscriber::EnvFilter;

use cli::*;

type Result<T> = std::result::Result<T, Box<dyn Error>>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` when set.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Ports => {
            list_endpoints().iter().for_each(|p| println!("{}", p));
            Ok(())
        }
        Commands::SampleTable { file } => {
            let table = CalibrationTable::sample();
            table.save(file)?;
            println!("wrote {} points to {}", table.len(), file.display());
            Ok(())
        }
        command => {
            let config = load_config(cli)?;
            let mut device = open_device(&config)?;
            let result = execute(&mut device, command);
            device.disconnect();
            result
        }
    }
}

fn load_config(cli: &Cli) -> Result<HostConfig> {
    let mut config = match &cli.config {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::default(),
    };
    if let Some(port) = &cli.port {
        config.port = Some(port.clone());
    }
    if let Some(baud) = cli.baud {
        config.baud = baud;
    }
    if let Commands::Upload(UploadConf {
        packet_points: Some(points),
        ..
    }) = &cli.command
    {
        config.points_per_packet = *points;
    }
    Ok(config)
}

fn open_device(config: &HostConfig) -> Result<AnyDevice> {
    let endpoint = Endpoint::parse(config.port.as_deref().unwrap_or(SIMULATOR_ENDPOINT));
    Ok(AnyDevice::connect(&endpoint, config)?)
}

fn execute(device: &mut AnyDevice, command: &Commands) -> Result<()> {
    match command {
        Commands::Info => {
            let status = device.status()?;
            println!("device:      {}", device.device_id()?);
            println!("temperature: {:.2} °C", device.temperature()?);
            println!("voltage:     {:.2} mV", device.voltage()?);
            println!("current:     {:.3} mA", device.output_current()?);
            println!("running:     {}", status.running);
            println!("source:      {}", status.current_source);
            println!("probe:       {}", if status.probe_ok { "ok" } else { "fault" });
            println!("samples:     {}", status.sample_count);
        }
        Commands::Watch(conf) => {
            let mut taken = 0;
            while conf.count == 0 || taken < conf.count {
                if taken > 0 {
                    thread::sleep(Duration::from_millis(conf.interval_ms));
                }
                let temperature = device.temperature()?;
                let voltage = device.voltage()?;
                let current = device.output_current()?;
                println!("{:.2} °C\t{:.2} mV\t{:.3} mA", temperature, voltage, current);
                taken += 1;
            }
        }
        Commands::SetSource { source } => device.set_current_source((*source).into())?,
        Commands::SetAdjust { source, value } => match source {
            SourceArg::Low => device.set_current_adjust_low(*value)?,
            SourceArg::High => device.set_current_adjust_high(*value)?,
        },
        Commands::SetRange(range) => {
            device.set_temp_at_4ma(range.at_4ma)?;
            device.set_temp_at_20ma(range.at_20ma)?;
        }
        Commands::Start => device.start_acquisition()?,
        Commands::Stop => device.stop_acquisition()?,
        Commands::Save => device.save_parameters()?,
        Commands::Load => device.load_parameters()?,
        Commands::Reset => device.reset_defaults()?,
        Commands::Upload(conf) => upload(device, conf)?,
        Commands::Ports | Commands::SampleTable { .. } => {}
    }
    Ok(())
}

fn upload(device: &mut AnyDevice, conf: &UploadConf) -> Result<()> {
    let table = CalibrationTable::load(&conf.file)?;
    println!("loaded {} points from {}", table.len(), conf.file.display());

    let mut stderr = std::io::stderr();
    let result = device.download_table(&table, |sent, total| {
        let _ = write!(stderr, "\rpacket {}/{}", sent, total);
    });
    let _ = writeln!(stderr);
    println!("{}", result?);
    Ok(())
}
