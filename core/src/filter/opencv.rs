use super::FilterPipeline;
use crate::{
	error::{Error, Result},
	settings::{ProcessingSettings, SettingsSnapshot, SmoothType},
};
use opencv::{
	core::{self, Mat, Point, Rect, Size, BORDER_CONSTANT, BORDER_DEFAULT},
	imgproc,
	prelude::*,
};

fn wrap<T>(result: opencv::Result<T>, what: &str) -> Result<T> {
	result.map_err(|err| Error::Filter(format!("failed to {what}: {err}")))
}

/// The standard filter chain: ROI crop, grayscale, smoothing, dilate, erode,
/// flip and Canny edge detection, each one enabled by its settings flag.
///
/// Scratch matrices are reused across frames.
#[derive(Default)]
pub struct OpenCvFilters {
	scratch: Mat,
}

impl OpenCvFilters {
	pub fn new() -> Self {
		Self::default()
	}

	fn smooth(&mut self, frame: &mut Mat, settings: &ProcessingSettings) -> Result<()> {
		let ksize = Size::new(settings.smooth_param1, settings.smooth_param2);
		match settings.smooth_type {
			SmoothType::Blur => wrap(
				imgproc::blur(
					&*frame,
					&mut self.scratch,
					ksize,
					Point::new(-1, -1),
					BORDER_DEFAULT,
				),
				"apply box blur",
			)?,
			SmoothType::Gaussian => wrap(
				imgproc::gaussian_blur(
					&*frame,
					&mut self.scratch,
					ksize,
					settings.smooth_param3,
					settings.smooth_param4,
					BORDER_DEFAULT,
				),
				"apply gaussian blur",
			)?,
			SmoothType::Median => wrap(
				imgproc::median_blur(&*frame, &mut self.scratch, settings.smooth_param1),
				"apply median blur",
			)?,
		}
		std::mem::swap(frame, &mut self.scratch);
		Ok(())
	}

	fn morph(&mut self, frame: &mut Mat, iterations: i32, dilate: bool) -> Result<()> {
		let border_value = wrap(
			imgproc::morphology_default_border_value(),
			"get morphology border value",
		)?;
		let kernel = Mat::default();
		let anchor = Point::new(-1, -1);
		if dilate {
			wrap(
				imgproc::dilate(
					&*frame,
					&mut self.scratch,
					&kernel,
					anchor,
					iterations,
					BORDER_CONSTANT,
					border_value,
				),
				"dilate frame",
			)?;
		} else {
			wrap(
				imgproc::erode(
					&*frame,
					&mut self.scratch,
					&kernel,
					anchor,
					iterations,
					BORDER_CONSTANT,
					border_value,
				),
				"erode frame",
			)?;
		}
		std::mem::swap(frame, &mut self.scratch);
		Ok(())
	}
}

impl FilterPipeline<Mat> for OpenCvFilters {
	fn apply(&mut self, frame: Mat, snapshot: &SettingsSnapshot) -> Result<Mat> {
		let settings = &snapshot.settings;
		let mut frame = match snapshot.roi {
			Some(roi) => {
				let rect = Rect::new(roi.x, roi.y, roi.width, roi.height);
				let view = wrap(Mat::roi(&frame, rect), "crop to region of interest")?;
				wrap(view.try_clone(), "copy region of interest")?
			}
			None => frame,
		};

		// Canny needs a single channel image, so it implies grayscale.
		if (settings.grayscale || settings.canny) && frame.channels() > 1 {
			wrap(
				imgproc::cvt_color(&frame, &mut self.scratch, imgproc::COLOR_BGR2GRAY, 0),
				"convert frame to grayscale",
			)?;
			std::mem::swap(&mut frame, &mut self.scratch);
		}
		if settings.smooth {
			self.smooth(&mut frame, settings)?;
		}
		if settings.dilate {
			self.morph(&mut frame, settings.dilate_iterations, true)?;
		}
		if settings.erode {
			self.morph(&mut frame, settings.erode_iterations, false)?;
		}
		if settings.flip {
			wrap(
				core::flip(&frame, &mut self.scratch, settings.flip_code),
				"flip frame",
			)?;
			std::mem::swap(&mut frame, &mut self.scratch);
		}
		if settings.canny {
			wrap(
				imgproc::canny(
					&frame,
					&mut self.scratch,
					settings.canny_threshold1,
					settings.canny_threshold2,
					settings.canny_aperture_size,
					settings.canny_l2_gradient,
				),
				"detect edges",
			)?;
			std::mem::swap(&mut frame, &mut self.scratch);
		}
		Ok(frame)
	}
}
