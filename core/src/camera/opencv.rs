use super::Camera;
use crate::error::{Error, Result};
use opencv::{
	core::Mat,
	prelude::*,
	videoio::{VideoCapture, CAP_ANY, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};
use tracing::{info, warn};

pub struct OpenCvCamera {
	device: i32,
	capture: VideoCapture,
	width: i32,
	height: i32,
}

impl OpenCvCamera {
	/// Opens capture device `device`, requesting `width`x`height` when given.
	/// The device may settle on a different size; [`Camera::resolution`]
	/// reports what it actually delivers.
	pub fn open(device: i32, width: Option<i32>, height: Option<i32>) -> Result<Self> {
		let unavailable = |reason: String| Error::CameraUnavailable { device, reason };
		let mut capture =
			VideoCapture::new(device, CAP_ANY).map_err(|err| unavailable(err.to_string()))?;
		if !capture
			.is_opened()
			.map_err(|err| unavailable(err.to_string()))?
		{
			return Err(unavailable("device could not be opened".to_owned()));
		}

		for (prop, value) in [(CAP_PROP_FRAME_WIDTH, width), (CAP_PROP_FRAME_HEIGHT, height)] {
			let Some(value) = value else { continue };
			match capture.set(prop, f64::from(value)) {
				Ok(true) => {}
				Ok(false) | Err(_) => {
					warn!(device, prop, value, "camera refused requested frame size")
				}
			}
		}

		let width = capture
			.get(CAP_PROP_FRAME_WIDTH)
			.map_err(|err| unavailable(err.to_string()))?
			.round() as i32;
		let height = capture
			.get(CAP_PROP_FRAME_HEIGHT)
			.map_err(|err| unavailable(err.to_string()))?
			.round() as i32;
		info!(device, width, height, "opened camera");
		Ok(Self {
			device,
			capture,
			width,
			height,
		})
	}
}

impl Camera for OpenCvCamera {
	type Frame = Mat;

	fn grab(&mut self) -> Result<Mat> {
		let mut frame = Mat::default();
		let grabbed = self
			.capture
			.read(&mut frame)
			.map_err(|err| Error::Camera(format!("device {}: {err}", self.device)))?;
		if !grabbed || frame.cols() == 0 {
			return Err(Error::Camera(format!(
				"device {} returned no frame",
				self.device
			)));
		}
		Ok(frame)
	}

	fn resolution(&self) -> (i32, i32) {
		(self.width, self.height)
	}
}

impl Drop for OpenCvCamera {
	fn drop(&mut self) {
		if let Err(err) = self.capture.release() {
			warn!(device = self.device, "failed to release camera: {err}");
		} else {
			info!(device = self.device, "closed camera");
		}
	}
}
