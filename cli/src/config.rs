use crate::cmd::RunArgs;
use color_eyre::eyre::{bail, Result, WrapErr};
use multicam_core::{ProcessingSettings, StreamConfig};
use serde::Deserialize;
use std::{fs, path::Path};

/// Contents of a `--config` session file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
	/// Filter settings for streams that don't set their own.
	pub processing: Option<ProcessingSettings>,
	#[serde(rename = "stream")]
	pub streams: Vec<StreamEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamEntry {
	pub device: i32,
	#[serde(default)]
	pub width: Option<i32>,
	#[serde(default)]
	pub height: Option<i32>,
	#[serde(flatten)]
	pub config: StreamConfig,
}

impl SessionConfig {
	pub fn load(path: &Path) -> Result<Self> {
		let text = fs::read_to_string(path)
			.wrap_err_with(|| format!("failed to read config from {}", path.display()))?;
		Self::parse(&text).wrap_err_with(|| format!("invalid config in {}", path.display()))
	}

	fn parse(text: &str) -> Result<Self> {
		let mut session: Self = toml::from_str(text)?;
		if let Some(processing) = &session.processing {
			for stream in &mut session.streams {
				if stream.config.processing == ProcessingSettings::default() {
					stream.config.processing = processing.clone();
				}
			}
		}
		Ok(session)
	}

	/// Merges the command line into the session: listed devices are added if
	/// missing, and explicit flags override every stream's values.
	pub fn apply_args(&mut self, args: &RunArgs) -> Result<()> {
		for &device in &args.devices {
			if self.streams.iter().any(|stream| stream.device == device) {
				continue;
			}
			self.streams.push(StreamEntry {
				device,
				width: None,
				height: None,
				config: StreamConfig {
					processing: self.processing.clone().unwrap_or_default(),
					..Default::default()
				},
			});
		}
		if self.streams.is_empty() {
			bail!("no cameras given, pass --devices or a config with [[stream]] entries");
		}

		for stream in &mut self.streams {
			if args.width.is_some() {
				stream.width = args.width;
			}
			if args.height.is_some() {
				stream.height = args.height;
			}
			if let Some(buffer_size) = args.buffer_size {
				stream.config.buffer_size = buffer_size;
			}
			if args.no_drop {
				stream.config.drop_if_full = false;
			}
			if args.sync {
				stream.config.sync = true;
			}
			if args.roi.is_some() {
				stream.config.roi = args.roi;
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use multicam_core::{Priority, Roi};

	fn args(devices: &[i32]) -> RunArgs {
		RunArgs {
			devices: devices.to_vec(),
			config: None,
			width: None,
			height: None,
			buffer_size: None,
			no_drop: false,
			sync: false,
			roi: None,
		}
	}

	#[test]
	fn parses_session_file() {
		let session = SessionConfig::parse(
			r#"
			[processing]
			grayscale = true

			[[stream]]
			device = 0
			width = 640
			height = 480
			sync = true
			capture_priority = "high"

			[[stream]]
			device = 2
			buffer_size = 4
			drop_if_full = false
			roi = { x = 10, y = 10, width = 100, height = 80 }
			"#,
		)
		.unwrap();
		assert_eq!(session.streams.len(), 2);
		let first = &session.streams[0];
		assert_eq!((first.width, first.height), (Some(640), Some(480)));
		assert!(first.config.sync);
		assert_eq!(first.config.capture_priority, Priority::High);
		assert!(first.config.processing.grayscale);
		let second = &session.streams[1];
		assert_eq!(second.config.buffer_size, 4);
		assert!(!second.config.drop_if_full);
		assert_eq!(second.config.roi, Some(Roi::new(10, 10, 100, 80)));
		assert!(second.config.processing.grayscale);
	}

	#[test]
	fn command_line_overrides_and_extends() {
		let mut session = SessionConfig::parse(
			r#"
			[[stream]]
			device = 1
			"#,
		)
		.unwrap();
		let mut args = args(&[1, 3]);
		args.sync = true;
		args.buffer_size = Some(2);
		session.apply_args(&args).unwrap();
		let devices = session.streams.iter().map(|s| s.device).collect::<Vec<_>>();
		assert_eq!(devices, vec![1, 3]);
		assert!(session.streams.iter().all(|s| s.config.sync));
		assert!(session.streams.iter().all(|s| s.config.buffer_size == 2));
	}

	#[test]
	fn needs_at_least_one_camera() {
		let mut session = SessionConfig::default();
		assert!(session.apply_args(&args(&[])).is_err());
	}
}
