
use std::io::{self, Error, ErrorKind};
use std::ops::Drop;
use std::str;
use std::thread;
use std::time::Duration;

use log::warn;
use regex::{Captures, Match, Regex};
use serde::{Serialize, Deserialize};

use crate::vxi11::CoreClient;

lazy_static! {
	static ref IDN_RE: Regex = Regex::new("([^,]+),([^,]+),([^,]+),([^,\\s]+)").unwrap();
}

pub const DEFAULT_TX_THROTTLE_DURATION_SEC:f32 = 0.1;

// A 2400-series SourceMeter sources a voltage and measures the resulting
// current through the device under test, with a programmable compliance limit
// so the supply never pushes more current than the sample can take
pub struct Keithley2400 {
	core: CoreClient,
	tx_throttle_duration: Duration,
	pub state: Option<State>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct State {
	pub manufacturer: String,
	pub model: String,
	pub serial_num: String,
	pub fw_version: String,
}

fn match_str(opt_match:Option<Match>, err:&str) -> io::Result<String> {
	match opt_match {
		Some(m) => Ok(m.as_str().to_owned()),
		None    => Err(Error::new(ErrorKind::Other, err))
	}
}

fn err(msg:&str) -> io::Error { Error::new(ErrorKind::Other, msg) }

// A triggered read (":READ?") answers with comma-delimited fields; the source
// voltage is the first and the measured current is the second
pub fn parse_read_current(resp:&str) -> io::Result<f64> {
	let field:&str = resp.split(',').nth(1)
		.ok_or_else(|| Error::new(ErrorKind::InvalidData, "No second field in measurement response"))?;
	field.trim().parse::<f64>()
		.map_err(|_| Error::new(ErrorKind::InvalidData, "Unable to parse measured current as a float"))
}

impl Keithley2400 {

	pub fn new(host:&str) -> io::Result<Self> {
		let mut core = CoreClient::new(host)?;

		core.create_link()?;

		match str::from_utf8(&(core.ask(b"*IDN?")?)) {
			Ok(idn_resp) => {
				if idn_resp.contains("KEITHLEY") && idn_resp.contains("24") { /* Do nothing because this is what we expected */ }
				else { return Err(Error::new(ErrorKind::Other, "Successfully connected to a device but it doesn't appear to be the right model")); }
			},
			Err(_) => return Err(Error::new(ErrorKind::Other, "Received a response to *IDN? but unable to interpret as UTF-8")),
		}

		// TODO: make this configurable
		let tx_throttle_duration = Duration::from_secs_f32(DEFAULT_TX_THROTTLE_DURATION_SEC);

		Ok(Self{ core, tx_throttle_duration, state: None })
	}

	pub fn get_full_state(&mut self) -> io::Result<State> {
		let str_idn:String      = self.ask_str("*IDN?")?;
		let caps_idn:Captures   = IDN_RE.captures(&str_idn).ok_or_else(|| err("Unable to parse *IDN? response"))?;
		let manufacturer:String = match_str(caps_idn.get(1), "No match for manufacturer")?;
		let model:String        = match_str(caps_idn.get(2), "No match for model")?;
		let serial_num:String   = match_str(caps_idn.get(3), "No match for serial_num")?;
		let fw_version:String   = match_str(caps_idn.get(4), "No match for fw_version")?;

		Ok(State{ manufacturer, model, serial_num, fw_version })
	}

	pub fn set_voltage_range(&mut self, volts:f64) -> io::Result<()> {
		self.write_str(&format!(":SOUR:VOLT:RANG {}", volts))
	}

	// Current compliance in amps; the supply clamps at this current no matter
	// what voltage is being sourced
	pub fn set_current_compliance(&mut self, amps:f64) -> io::Result<()> {
		self.write_str(&format!(":SENS:CURR:PROT {}", amps))
	}

	// The instrument holds each new voltage for this long before triggering
	// the measurement
	pub fn set_source_delay_ms(&mut self, delay_ms:f64) -> io::Result<()> {
		self.write_str(&format!(":SOUR:DEL {}", delay_ms / 1000.0))
	}

	pub fn set_voltage(&mut self, volts:f64) -> io::Result<()> {
		self.write_str(&format!(":SOUR:VOLT {}", volts))
	}

	pub fn read_current(&mut self) -> io::Result<f64> {
		let resp:String = self.ask_str(":READ?")?;
		parse_read_current(&resp)
	}

	// Restores power-on defaults, clears the error queue and status registers,
	// and turns the output off.  This is the abort/disconnect path, so it gets
	// called on a supply in an unknown state
	pub fn shutdown(&mut self) -> io::Result<()> {
		// The supply may be holding a half-finished exchange in its buffers
		self.core.device_clear()?;
		self.write_str("*RST")?;
		self.write_str("*CLS")?;
		self.disable_output()
	}

	// One-liners
	pub fn reset(&mut self)          -> io::Result<()> { self.write_str("*RST") }
	pub fn clear_status(&mut self)   -> io::Result<()> { self.write_str("*CLS") }
	pub fn beeper_off(&mut self)     -> io::Result<()> { self.write_str(":SYST:BEEP:STAT OFF") }
	pub fn enable_output(&mut self)  -> io::Result<()> { self.write_str(":OUTP ON") }
	pub fn disable_output(&mut self) -> io::Result<()> { self.write_str(":OUTP OFF") }

	pub fn write_str(&mut self, data:&str) -> io::Result<()> {
		thread::sleep(self.tx_throttle_duration);
		self.core.write(data.as_bytes())
	}

	pub fn ask(&mut self, data:&[u8]) -> io::Result<Vec<u8>> {
		thread::sleep(self.tx_throttle_duration);
		self.core.ask(data)
	}

	pub fn ask_str(&mut self, data:&str) -> io::Result<String> {
		str::from_utf8(&self.ask(data.as_bytes())?)
			.map(|s| s.to_owned())
			.map_err(|_| Error::new(ErrorKind::Other, "Unable to parse response as UTF-8"))
	}

}

impl Drop for Keithley2400 {

	fn drop(&mut self) {
		if let Err(e) = self.core.destroy_link() {
			warn!("Unable to destroy link for Keithley2400: {}", e);
		}
	}

}

#[cfg(test)]
mod tests {

	use super::parse_read_current;

	#[test]
	fn parses_second_field_as_current() {
		// Typical 2400 reading: voltage, current, resistance, time, status
		let resp = "+1.000000E+00,+1.234567E-03,+9.910000E+37,+1.000000E+03,+2.150800E+04\n";
		let amps = parse_read_current(resp).unwrap();
		assert!((amps - 1.234567e-3).abs() < 1e-12);
	}

	#[test]
	fn rejects_reading_with_one_field() {
		assert!(parse_read_current("+1.000000E+00\n").is_err());
	}

	#[test]
	fn rejects_non_numeric_current() {
		assert!(parse_read_current("+1.0,not_a_number,+2.0").is_err());
	}

}
