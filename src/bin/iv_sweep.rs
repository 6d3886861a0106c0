
use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;

use fe_control::camera::{self, CameraSettings};
use fe_control::devices::keithley2400::Keithley2400;
use fe_control::export;
use fe_control::sweep::{self, SweepConfig};

#[derive(Parser)]
#[command(name = "iv_sweep", about = "I-V sweep control for a Keithley 2400-class SourceMeter over VXI-11")]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Run a voltage sweep up and back down, recording current at each step
	Sweep(SweepArgs),
	/// Restore supply defaults, clear the error queue and switch the output off
	Shutdown {
		/// Hostname or address of the VXI-11 gateway for the supply
		#[arg(long)]
		host: String,
	},
	/// Print the supply identification
	Identify {
		#[arg(long)]
		host: String,
	},
	/// Push ISO, aperture and shutter-speed indices to the tethered camera
	SyncCamera {
		/// Index into the camera's ISO table
		#[arg(long)]
		iso: u32,
		/// Index into the camera's aperture table
		#[arg(long)]
		aperture: u32,
		/// Index into the camera's shutter-speed table
		#[arg(long)]
		shutter_speed: u32,
	},
	/// Trip the shutter without saving an image, to confirm the camera responds
	ShutterTest,
	/// Capture one image into a directory under a time-of-day name
	Capture {
		#[arg(long, default_value = ".")]
		dir: PathBuf,
	},
}

#[derive(clap::Args)]
struct SweepArgs {
	/// Hostname or address of the VXI-11 gateway for the supply
	#[arg(long)]
	host: String,

	/// Sweep start voltage [V]
	#[arg(long, default_value_t = 0.0)]
	v_min: f64,

	/// Voltage step [V]; must evenly divide (v_max - v_min)
	#[arg(long)]
	v_step: f64,

	/// Sweep end voltage [V]
	#[arg(long)]
	v_max: f64,

	/// Current compliance [A]
	#[arg(long, default_value_t = 1e-3)]
	i_compliance: f64,

	/// Pause between sweep points [ms]
	#[arg(long, default_value_t = 0.0)]
	delay_ms: f64,

	/// Instrument source delay after each voltage change [ms]
	#[arg(long, default_value_t = 0.0)]
	settle_ms: f64,

	/// Directory for exported files and captured images
	#[arg(long, default_value = ".")]
	out_dir: PathBuf,

	/// Basename for the exported CSV and JSON; no export without it
	#[arg(long)]
	filename: Option<String>,

	/// Capture one photo after the sweep completes
	#[arg(long)]
	capture: bool,
}

fn run_sweep(args:&SweepArgs) -> io::Result<()> {
	let config = SweepConfig {
		v_min: args.v_min,
		v_step: args.v_step,
		v_max: args.v_max,
		i_compliance: args.i_compliance,
		delay_between_pts_ms: args.delay_ms,
		settle_delay_ms: args.settle_ms,
	};

	// An invalid configuration has to fail before the instrument is contacted
	config.validate()?;

	let mut supply = Keithley2400::new(&args.host)?;
	let state = supply.get_full_state()?;
	info!("Connected to {} {} (serial {})", state.manufacturer, state.model, state.serial_num);

	let record = sweep::run(&mut supply, &config)?;

	println!("{:>10}  {:>14}", "V [V]", "I [A]");
	for point in &record.points {
		println!("{:>10.2}  {:>14.6e}", point.voltage_v, point.current_a);
	}

	if let Ok(ohms) = record.resistance_ohms() {
		println!("Linear fit resistance: {:.4e} [Ohm]", ohms);
	}

	if let Some(filename) = &args.filename {
		export::write_csv(&record, &args.out_dir.join(format!("{}.csv", filename)))?;
		export::write_json(&record, &args.out_dir.join(format!("{}.json", filename)))?;
	}

	if args.capture {
		let saved = camera::capture_to(&args.out_dir)?;
		println!("Image saved to {}", saved.display());
	}

	Ok(())
}

fn main() -> io::Result<()> {
	env_logger::init();

	let cli = Cli::parse();

	match cli.command {
		Command::Sweep(args) => run_sweep(&args),
		Command::Shutdown { host } => {
			let mut supply = Keithley2400::new(&host)?;
			supply.shutdown()
		},
		Command::Identify { host } => {
			let mut supply = Keithley2400::new(&host)?;
			let state = supply.get_full_state()?;
			println!("{}", serde_json::to_string_pretty(&state)?);
			Ok(())
		},
		Command::SyncCamera { iso, aperture, shutter_speed } => {
			CameraSettings{ iso, aperture, shutter_speed }.sync()
		},
		Command::ShutterTest => camera::shutter_test(),
		Command::Capture { dir } => {
			let saved = camera::capture_to(&dir)?;
			println!("Image saved to {}", saved.display());
			Ok(())
		},
	}
}
