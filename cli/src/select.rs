use crate::cmd::SelectArgs;
use color_eyre::eyre::{Result, WrapErr};
use multicam_core::{camera::opencv::OpenCvCamera, opencv::highgui, Camera};

pub fn select(args: SelectArgs) -> Result<()> {
	let mut camera = OpenCvCamera::open(args.device, args.width, args.height)
		.wrap_err_with(|| format!("failed to open camera {}", args.device))?;
	let frame = camera
		.grab()
		.wrap_err_with(|| format!("failed to grab a frame from camera {}", args.device))?;
	camera.close();

	let roi = highgui::select_roi("Select ROI", &frame, true, false, true)
		.wrap_err("failed to select roi")?;
	highgui::destroy_all_windows().wrap_err("failed to close windows")?;
	println!("{},{},{},{}", roi.x, roi.y, roi.width, roi.height);
	Ok(())
}
