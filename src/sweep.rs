
use std::io::{self, Error, ErrorKind};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local};
use log::{debug, info};
use serde::{Serialize, Deserialize};

use crate::devices::keithley2400::Keithley2400;
use crate::utils::{LinearFitProblem, LinearFit};

// Tolerance for deciding whether the step evenly divides the span.  The inputs
// are decimal volts held in floats, so an exact modulo test would misfire for
// steps like 0.1
const STEP_FIT_TOLERANCE_V:f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
	pub v_min: f64,
	pub v_step: f64,
	pub v_max: f64,
	pub i_compliance: f64,
	pub delay_between_pts_ms: f64,
	pub settle_delay_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RampDirection { Up, Down }

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SweepPoint {
	pub voltage_v: f64,
	pub current_a: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SweepRecord {
	pub started: DateTime<Local>,
	pub points: Vec<SweepPoint>,
}

// The narrow view of the instrument that the sweep needs.  The Keithley driver
// implements it against real hardware; tests implement it with a script
pub trait VoltageSource {
	fn prepare(&mut self, config:&SweepConfig) -> io::Result<()>;
	fn set_voltage(&mut self, volts:f64) -> io::Result<()>;
	fn read_current(&mut self) -> io::Result<f64>;
	fn finish(&mut self) -> io::Result<()>;
}

fn invalid(msg:&str) -> io::Error { Error::new(ErrorKind::InvalidInput, msg) }

fn round2(x:f64) -> f64 { (x * 100.0).round() / 100.0 }

impl SweepConfig {

	pub fn validate(&self) -> io::Result<()> {
		if !self.v_step.is_finite() || self.v_step <= 0.0 {
			return Err(invalid("Step size must be a positive number of volts"));
		}
		if self.v_max < self.v_min {
			return Err(invalid("Maximum voltage must not be below minimum voltage"));
		}
		if self.i_compliance <= 0.0 {
			return Err(invalid("Current compliance must be positive"));
		}

		let span:f64 = self.v_max - self.v_min;
		let steps:f64 = (span / self.v_step).round();
		if (steps * self.v_step - span).abs() > STEP_FIT_TOLERANCE_V {
			return Err(invalid("Step size does not evenly divide the sweep span; please re-enter"));
		}

		Ok(())
	}

	// Number of points per ramp direction; only meaningful for a valid config
	pub fn num_points(&self) -> usize {
		((self.v_max - self.v_min) / self.v_step).round() as usize + 1
	}

	pub fn setpoints(&self, direction:RampDirection) -> Vec<f64> {
		let n:usize = self.num_points();
		(0..n).map(|i| match direction {
			RampDirection::Up   => round2(self.v_min + self.v_step * (i as f64)),
			RampDirection::Down => round2(self.v_max - self.v_step * (i as f64)),
		}).collect()
	}

}

impl SweepRecord {

	pub fn new() -> Self {
		SweepRecord{ started: Local::now(), points: Vec::new() }
	}

	pub fn len(&self) -> usize { self.points.len() }
	pub fn is_empty(&self) -> bool { self.points.is_empty() }

	// Least-squares fit of I against V over every recorded point; the slope is
	// the small-signal conductance in siemens
	pub fn fit(&self) -> io::Result<LinearFit> {
		let problem = LinearFitProblem {
			points: self.points.iter().map(|p| (p.voltage_v, p.current_a)).collect()
		};
		problem.solve()
	}

	pub fn resistance_ohms(&self) -> io::Result<f64> {
		let fit:LinearFit = self.fit()?;
		if fit.slope.abs() < 1e-15 {
			return Err(Error::new(ErrorKind::Other, "Fitted conductance is zero; resistance is unbounded"));
		}
		Ok(1.0 / fit.slope)
	}

}

// Ramps the voltage from min to max and back down, one set-then-read exchange
// per step.  Validation runs before any instrument traffic; an invalid config
// means the instrument is never touched.  Any device error aborts the run and
// propagates to the caller
pub fn run<S: VoltageSource + ?Sized>(source:&mut S, config:&SweepConfig) -> io::Result<SweepRecord> {
	config.validate()?;

	source.prepare(config)?;

	let mut record = SweepRecord::new();

	for direction in &[RampDirection::Up, RampDirection::Down] {
		match direction {
			RampDirection::Up   => info!("IV scan from {} V to {} V, ramping up", config.v_min, config.v_max),
			RampDirection::Down => info!("IV scan from {} V to {} V, ramping down", config.v_max, config.v_min),
		}

		for setpoint in config.setpoints(*direction) {
			source.set_voltage(setpoint)?;
			let current_a:f64 = source.read_current()?;
			debug!("{} V -> {:.4e} A", setpoint, current_a);

			record.points.push(SweepPoint{ voltage_v: setpoint, current_a });

			if config.delay_between_pts_ms > 0.0 {
				thread::sleep(Duration::from_secs_f64(config.delay_between_pts_ms / 1000.0));
			}
		}
	}

	source.finish()?;

	Ok(record)
}

impl VoltageSource for Keithley2400 {

	fn prepare(&mut self, config:&SweepConfig) -> io::Result<()> {
		self.beeper_off()?;
		self.enable_output()?;
		self.set_voltage_range(config.v_max)?;
		self.set_current_compliance(config.i_compliance)?;
		self.set_source_delay_ms(config.settle_delay_ms)
	}

	fn set_voltage(&mut self, volts:f64) -> io::Result<()> { Keithley2400::set_voltage(self, volts) }

	fn read_current(&mut self) -> io::Result<f64> { Keithley2400::read_current(self) }

	fn finish(&mut self) -> io::Result<()> { self.shutdown() }

}

#[cfg(test)]
mod tests {

	use std::io;

	use super::{SweepConfig, RampDirection, VoltageSource, run};

	fn config(v_min:f64, v_step:f64, v_max:f64) -> SweepConfig {
		SweepConfig {
			v_min, v_step, v_max,
			i_compliance: 1e-3,
			delay_between_pts_ms: 0.0,
			settle_delay_ms: 0.0,
		}
	}

	// Replays a fixed resistance and records every command it receives
	struct ScriptedSource {
		resistance_ohms: f64,
		last_setpoint: f64,
		commands: Vec<String>,
	}

	impl ScriptedSource {
		fn new(resistance_ohms:f64) -> Self {
			ScriptedSource{ resistance_ohms, last_setpoint: 0.0, commands: Vec::new() }
		}
	}

	impl VoltageSource for ScriptedSource {

		fn prepare(&mut self, _config:&SweepConfig) -> io::Result<()> {
			self.commands.push("prepare".to_owned());
			Ok(())
		}

		fn set_voltage(&mut self, volts:f64) -> io::Result<()> {
			self.last_setpoint = volts;
			self.commands.push(format!("set {}", volts));
			Ok(())
		}

		fn read_current(&mut self) -> io::Result<f64> {
			self.commands.push("read".to_owned());
			Ok(self.last_setpoint / self.resistance_ohms)
		}

		fn finish(&mut self) -> io::Result<()> {
			self.commands.push("finish".to_owned());
			Ok(())
		}

	}

	#[test]
	fn ascending_and_descending_setpoints() {
		let cfg = config(0.0, 0.5, 1.0);
		cfg.validate().unwrap();
		assert_eq!(cfg.num_points(), 3);
		assert_eq!(cfg.setpoints(RampDirection::Up), vec![0.0, 0.5, 1.0]);
		assert_eq!(cfg.setpoints(RampDirection::Down), vec![1.0, 0.5, 0.0]);
	}

	#[test]
	fn step_that_does_not_divide_span_is_invalid() {
		assert!(config(0.0, 0.3, 1.0).validate().is_err());
	}

	#[test]
	fn decimal_step_that_divides_span_is_valid() {
		// 0.1 does not divide 1.0 exactly in binary floating point, but it has
		// to be accepted here
		let cfg = config(0.0, 0.1, 1.0);
		cfg.validate().unwrap();
		assert_eq!(cfg.num_points(), 11);
	}

	#[test]
	fn zero_or_negative_step_is_invalid() {
		assert!(config(0.0, 0.0, 1.0).validate().is_err());
		assert!(config(0.0, -0.5, 1.0).validate().is_err());
	}

	#[test]
	fn descending_span_is_invalid() {
		assert!(config(1.0, 0.5, 0.0).validate().is_err());
	}

	#[test]
	fn equal_min_and_max_gives_a_single_point() {
		let cfg = config(2.0, 0.5, 2.0);
		cfg.validate().unwrap();
		assert_eq!(cfg.setpoints(RampDirection::Up), vec![2.0]);
		assert_eq!(cfg.setpoints(RampDirection::Down), vec![2.0]);
	}

	#[test]
	fn invalid_config_issues_no_commands() {
		let mut source = ScriptedSource::new(50.0);
		assert!(run(&mut source, &config(0.0, 0.3, 1.0)).is_err());
		assert!(source.commands.is_empty());
	}

	#[test]
	fn valid_sweep_records_both_ramps_in_order() {
		let mut source = ScriptedSource::new(50.0);
		let record = run(&mut source, &config(0.0, 0.5, 1.0)).unwrap();

		assert_eq!(record.len(), 6);
		let voltages:Vec<f64> = record.points.iter().map(|p| p.voltage_v).collect();
		assert_eq!(voltages, vec![0.0, 0.5, 1.0, 1.0, 0.5, 0.0]);

		assert_eq!(source.commands.first().unwrap(), "prepare");
		assert_eq!(source.commands.last().unwrap(), "finish");

		// One set-then-read exchange per step
		let n_sets = source.commands.iter().filter(|c| c.starts_with("set ")).count();
		let n_reads = source.commands.iter().filter(|c| c.as_str() == "read").count();
		assert_eq!(n_sets, 6);
		assert_eq!(n_reads, 6);
	}

	#[test]
	fn device_error_aborts_the_run() {
		struct FailsOnRead;

		impl VoltageSource for FailsOnRead {
			fn prepare(&mut self, _config:&SweepConfig) -> io::Result<()> { Ok(()) }
			fn set_voltage(&mut self, _volts:f64) -> io::Result<()> { Ok(()) }
			fn read_current(&mut self) -> io::Result<f64> {
				Err(io::Error::new(io::ErrorKind::Other, "I/O timeout"))
			}
			fn finish(&mut self) -> io::Result<()> { Ok(()) }
		}

		assert!(run(&mut FailsOnRead, &config(0.0, 0.5, 1.0)).is_err());
	}

	#[test]
	fn resistance_estimate_from_ohmic_source() {
		let mut source = ScriptedSource::new(50.0);
		let record = run(&mut source, &config(0.0, 0.5, 2.0)).unwrap();
		let r = record.resistance_ohms().unwrap();
		assert!((r - 50.0).abs() < 1e-6);
	}

}
