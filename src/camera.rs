
// Tethered camera control through the gphoto2 command line tool, which keeps
// the vendor SDK out of process.  The three capture settings are opaque
// indices into the camera's own settings tables, so they only make sense for
// whichever body is attached

use std::io::{self, Error, ErrorKind};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::Local;
use log::info;
use serde::{Serialize, Deserialize};

pub const GPHOTO2_BIN:&str = "gphoto2";

pub const ISO_CONFIG:&str           = "/main/imgsettings/iso";
pub const APERTURE_CONFIG:&str      = "/main/capturesettings/aperture";
pub const SHUTTER_SPEED_CONFIG:&str = "/main/capturesettings/shutterspeed";

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CameraSettings {
	pub iso: u32,
	pub aperture: u32,
	pub shutter_speed: u32,
}

fn run_gphoto2(args:&[String]) -> io::Result<()> {
	let status = Command::new(GPHOTO2_BIN).args(args).status()?;
	if status.success() { Ok(()) }
	else { Err(Error::new(ErrorKind::Other, format!("gphoto2 exited with {}", status))) }
}

impl CameraSettings {

	// One invocation per setting, matching what the camera accepts
	pub fn sync_commands(&self) -> Vec<Vec<String>> {
		vec![
			vec!["--set-config-index".to_owned(), format!("{}={}", ISO_CONFIG, self.iso)],
			vec!["--set-config-index".to_owned(), format!("{}={}", APERTURE_CONFIG, self.aperture)],
			vec!["--set-config-index".to_owned(), format!("{}={}", SHUTTER_SPEED_CONFIG, self.shutter_speed)],
		]
	}

	pub fn sync(&self) -> io::Result<()> {
		for args in self.sync_commands() {
			run_gphoto2(&args)?;
		}
		info!("Camera synced successfully");
		Ok(())
	}

}

pub fn capture_filename(time_of_day:&str) -> String {
	format!("{}.jpg", time_of_day)
}

pub fn capture_args(target:&Path) -> Vec<String> {
	vec![
		"--capture-image-and-download".to_owned(),
		"--filename".to_owned(),
		target.to_string_lossy().into_owned(),
		"--force-overwrite".to_owned(),
	]
}

// Trips the shutter and saves the image into the target directory under a
// time-of-day name
pub fn capture_to(dir:&Path) -> io::Result<PathBuf> {
	let target:PathBuf = dir.join(capture_filename(&Local::now().format("%H-%M-%S").to_string()));
	info!("Capturing image to {}", target.display());
	run_gphoto2(&capture_args(&target))?;
	Ok(target)
}

// Trips the shutter without saving anything, to confirm the camera responds
pub fn shutter_test() -> io::Result<()> {
	info!("Shutter test, without image saving");
	run_gphoto2(&["--capture-image".to_owned()])
}

#[cfg(test)]
mod tests {

	use std::path::Path;

	use super::{CameraSettings, capture_args, capture_filename};

	#[test]
	fn sync_commands_cover_all_three_settings() {
		let settings = CameraSettings{ iso: 3, aperture: 7, shutter_speed: 12 };
		let commands = settings.sync_commands();

		assert_eq!(commands.len(), 3);
		assert_eq!(commands[0], vec!["--set-config-index", "/main/imgsettings/iso=3"]);
		assert_eq!(commands[1], vec!["--set-config-index", "/main/capturesettings/aperture=7"]);
		assert_eq!(commands[2], vec!["--set-config-index", "/main/capturesettings/shutterspeed=12"]);
	}

	#[test]
	fn capture_args_name_the_target_file() {
		let target = Path::new("/tmp/captures").join(capture_filename("14-03-59"));
		let args = capture_args(&target);
		assert_eq!(args[0], "--capture-image-and-download");
		assert_eq!(args[2], "/tmp/captures/14-03-59.jpg");
	}

}
