use crate::error::{Error, Result};
use parking_lot::Mutex;
use serde::Deserialize;

/// Region of interest in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Roi {
	pub x: i32,
	pub y: i32,
	pub width: i32,
	pub height: i32,
}

impl Roi {
	pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
		Self {
			x,
			y,
			width,
			height,
		}
	}

	pub fn validate(&self, frame_width: i32, frame_height: i32) -> Result<()> {
		if self.width <= 0 || self.height <= 0 {
			return Err(Error::invalid(format!("empty region of interest {self:?}")));
		}
		let exceeds = |start: i32, len: i32, limit: i32| {
			start < 0 || start.checked_add(len).map_or(true, |end| end > limit)
		};
		if exceeds(self.x, self.width, frame_width) || exceeds(self.y, self.height, frame_height) {
			return Err(Error::invalid(format!(
				"region of interest {self:?} exceeds {frame_width}x{frame_height} frame"
			)));
		}
		Ok(())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmoothType {
	Blur,
	#[default]
	Gaussian,
	Median,
}

/// Filter flags and parameters handed to the filter pipeline for each frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProcessingSettings {
	pub grayscale: bool,
	pub smooth: bool,
	pub dilate: bool,
	pub erode: bool,
	pub flip: bool,
	pub canny: bool,

	pub smooth_type: SmoothType,
	/// Kernel width (kernel size for median).
	pub smooth_param1: i32,
	/// Kernel height.
	pub smooth_param2: i32,
	/// Gaussian sigma x.
	pub smooth_param3: f64,
	/// Gaussian sigma y.
	pub smooth_param4: f64,
	pub dilate_iterations: i32,
	pub erode_iterations: i32,
	/// 0 flips around the x axis, 1 around the y axis, -1 around both.
	pub flip_code: i32,
	pub canny_threshold1: f64,
	pub canny_threshold2: f64,
	pub canny_aperture_size: i32,
	pub canny_l2_gradient: bool,
}

impl Default for ProcessingSettings {
	fn default() -> Self {
		Self {
			grayscale: false,
			smooth: false,
			dilate: false,
			erode: false,
			flip: false,
			canny: false,
			smooth_type: SmoothType::Gaussian,
			smooth_param1: 3,
			smooth_param2: 3,
			smooth_param3: 0.0,
			smooth_param4: 0.0,
			dilate_iterations: 1,
			erode_iterations: 1,
			flip_code: 0,
			canny_threshold1: 10.0,
			canny_threshold2: 100.0,
			canny_aperture_size: 3,
			canny_l2_gradient: false,
		}
	}
}

impl ProcessingSettings {
	pub fn validate(&self) -> Result<()> {
		let odd_positive = |value: i32| value > 0 && value % 2 == 1;
		match self.smooth_type {
			SmoothType::Blur if self.smooth_param1 <= 0 || self.smooth_param2 <= 0 => {
				return Err(Error::invalid("blur kernel size must be positive"));
			}
			SmoothType::Gaussian
				if !odd_positive(self.smooth_param1) || !odd_positive(self.smooth_param2) =>
			{
				return Err(Error::invalid("gaussian kernel size must be odd and positive"));
			}
			SmoothType::Median if !odd_positive(self.smooth_param1) || self.smooth_param1 < 3 => {
				return Err(Error::invalid("median kernel size must be odd and at least 3"));
			}
			_ => {}
		}
		if self.smooth_param3 < 0.0 || self.smooth_param4 < 0.0 {
			return Err(Error::invalid("gaussian sigma must not be negative"));
		}
		if self.dilate_iterations <= 0 || self.erode_iterations <= 0 {
			return Err(Error::invalid("morphology iterations must be positive"));
		}
		if !(-1..=1).contains(&self.flip_code) {
			return Err(Error::invalid(format!("invalid flip code {}", self.flip_code)));
		}
		if ![3, 5, 7].contains(&self.canny_aperture_size) {
			return Err(Error::invalid(format!(
				"canny aperture size must be 3, 5 or 7, got {}",
				self.canny_aperture_size
			)));
		}
		Ok(())
	}
}

/// What the processing loop reads once at the top of every iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsSnapshot {
	pub settings: ProcessingSettings,
	pub roi: Option<Roi>,
}

/// Shared settings for one stream. Writers replace whole values under the
/// lock, so a reader never sees a half-applied update.
pub struct SettingsHandle {
	frame_width: i32,
	frame_height: i32,
	current: Mutex<SettingsSnapshot>,
}

impl SettingsHandle {
	pub fn new(settings: ProcessingSettings, frame_size: (i32, i32)) -> Result<Self> {
		settings.validate()?;
		Ok(Self {
			frame_width: frame_size.0,
			frame_height: frame_size.1,
			current: Mutex::new(SettingsSnapshot {
				settings,
				roi: None,
			}),
		})
	}

	pub fn snapshot(&self) -> SettingsSnapshot {
		self.current.lock().clone()
	}

	/// Applies `edit` to a copy of the current settings and stores the result
	/// if it is still valid.
	pub fn update(&self, edit: impl FnOnce(&mut ProcessingSettings)) -> Result<()> {
		let mut current = self.current.lock();
		let mut settings = current.settings.clone();
		edit(&mut settings);
		settings.validate()?;
		current.settings = settings;
		Ok(())
	}

	pub fn set_roi(&self, roi: Roi) -> Result<()> {
		roi.validate(self.frame_width, self.frame_height)?;
		self.current.lock().roi = Some(roi);
		Ok(())
	}

	pub fn reset_roi(&self) {
		self.current.lock().roi = None;
	}

	pub fn frame_size(&self) -> (i32, i32) {
		(self.frame_width, self.frame_height)
	}
}
