
use std::fs;
use std::io::{self, Error, ErrorKind};
use std::path::Path;

use log::info;

use crate::sweep::SweepRecord;

fn csv_err(e:csv::Error) -> io::Error { Error::new(ErrorKind::Other, e) }

// Two-column table, one row per recorded step, ramp-up rows first
pub fn write_csv(record:&SweepRecord, path:&Path) -> io::Result<()> {
	let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;

	writer.write_record(&["voltage_v", "current_a"]).map_err(csv_err)?;
	for point in &record.points {
		writer.write_record(&[point.voltage_v.to_string(), point.current_a.to_string()]).map_err(csv_err)?;
	}
	writer.flush()?;

	info!("I-V data saved to {}", path.display());
	Ok(())
}

pub fn write_json(record:&SweepRecord, path:&Path) -> io::Result<()> {
	fs::write(path, serde_json::to_string_pretty(record)?.as_bytes())?;
	info!("I-V record saved to {}", path.display());
	Ok(())
}

#[cfg(test)]
mod tests {

	use crate::sweep::{SweepPoint, SweepRecord};
	use super::{write_csv, write_json};

	fn record() -> SweepRecord {
		let mut record = SweepRecord::new();
		record.points.push(SweepPoint{ voltage_v: 0.0, current_a: 0.0 });
		record.points.push(SweepPoint{ voltage_v: 0.5, current_a: 1.0e-2 });
		record.points.push(SweepPoint{ voltage_v: 1.0, current_a: 2.0e-2 });
		record
	}

	#[test]
	fn csv_has_header_and_one_row_per_point() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("scan.csv");

		write_csv(&record(), &path).unwrap();

		let contents = std::fs::read_to_string(&path).unwrap();
		let lines:Vec<&str> = contents.lines().collect();
		assert_eq!(lines.len(), 4);
		assert_eq!(lines[0], "voltage_v,current_a");
		assert_eq!(lines[1], "0,0");
		assert_eq!(lines[2], "0.5,0.01");
	}

	#[test]
	fn json_round_trips_the_record() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("scan.json");

		write_json(&record(), &path).unwrap();

		let contents = std::fs::read_to_string(&path).unwrap();
		let loaded:SweepRecord = serde_json::from_str(&contents).unwrap();
		assert_eq!(loaded.points.len(), 3);
		assert!((loaded.points[2].current_a - 2.0e-2).abs() < 1e-12);
	}

}
