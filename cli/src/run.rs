use crate::{cmd::RunArgs, config::SessionConfig};
use color_eyre::eyre::{Result, WrapErr};
use crossbeam_channel::{bounded, RecvTimeoutError};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use multicam_core::{
	camera::opencv::OpenCvCamera,
	filter::opencv::OpenCvFilters,
	opencv::{core::Mat, highgui},
	DisplayEvent, ProcessingSettings, StreamController, StreamId,
};
use std::{
	collections::HashMap,
	time::{Duration, Instant},
};
use tracing::{info, warn};

const KEY_ESCAPE: i32 = 27;
const REFRESH: Duration = Duration::from_millis(250);

fn window_name(id: StreamId) -> String {
	format!("camera {}", id.0)
}

pub fn run(args: RunArgs) -> Result<()> {
	let mut session = match &args.config {
		Some(path) => SessionConfig::load(path)?,
		None => SessionConfig::default(),
	};
	session.apply_args(&args)?;

	let controller = StreamController::<Mat>::new(true);
	let (event_sender, event_receiver) = bounded::<DisplayEvent<Mat>>(session.streams.len() * 4);
	let progress = MultiProgress::new();
	let style = ProgressStyle::with_template("{spinner:.green} {prefix:.bold} {msg}")
		.wrap_err("invalid progress template")?;
	let mut bars = HashMap::new();

	for stream in &session.streams {
		let id = StreamId(
			u32::try_from(stream.device)
				.wrap_err_with(|| format!("invalid camera device {}", stream.device))?,
		);
		let camera = OpenCvCamera::open(stream.device, stream.width, stream.height)
			.wrap_err_with(|| format!("failed to open camera {}", stream.device))?;
		controller
			.connect(
				id,
				camera,
				OpenCvFilters::new(),
				event_sender.clone(),
				&stream.config,
			)
			.wrap_err_with(|| format!("failed to connect camera {}", stream.device))?;
		highgui::named_window(&window_name(id), highgui::WINDOW_AUTOSIZE)
			.wrap_err("failed to create window")?;
		let bar = progress.add(
			ProgressBar::new_spinner()
				.with_style(style.clone())
				.with_prefix(window_name(id)),
		);
		bars.insert(id, bar);
	}
	drop(event_sender);
	info!(
		"q: quit, s: toggle sync, c: clear buffers, r: reset roi, \
		 g/b/d/e/f/k: toggle grayscale/smooth/dilate/erode/flip/canny"
	);

	let mut last_refresh = Instant::now();
	loop {
		match event_receiver.recv_timeout(Duration::from_millis(5)) {
			Ok(DisplayEvent::Frame(id, frame)) => {
				highgui::imshow(&window_name(id), &frame).wrap_err("failed to show frame")?;
			}
			Ok(DisplayEvent::Statistics(..)) | Err(RecvTimeoutError::Timeout) => {}
			Err(RecvTimeoutError::Disconnected) => break,
		}

		let key = highgui::wait_key(1).wrap_err("failed to poll keyboard")?;
		if key >= 0 && !handle_key(&controller, key & 0xff) {
			break;
		}

		if last_refresh.elapsed() >= REFRESH {
			last_refresh = Instant::now();
			for (id, bar) in &bars {
				let Ok(status) = controller.status(*id) else {
					continue;
				};
				bar.set_message(format!(
					"{} -> {} fps | buffer {}/{} | dropped {} | {}{}",
					status.capture.average_fps,
					status.processing.average_fps,
					status.buffer_size,
					status.buffer_capacity,
					status.capture.frames_dropped,
					if status.sync_member { "synced" } else { "free" },
					if status.capturing { "" } else { " | camera lost" },
				));
				bar.tick();
			}
		}
	}

	for bar in bars.values() {
		bar.finish();
	}
	let result = controller.shutdown();
	highgui::destroy_all_windows().wrap_err("failed to close windows")?;
	result.wrap_err("failed to disconnect cameras")
}

/// Returns `false` when the user asked to quit.
fn handle_key(controller: &StreamController<Mat>, key: i32) -> bool {
	let toggle: fn(&mut ProcessingSettings) = match u8::try_from(key).map(char::from) {
		Ok('q') => return false,
		_ if key == KEY_ESCAPE => return false,
		Ok('s') => {
			controller.set_sync_enabled(!controller.sync_enabled());
			return true;
		}
		Ok('c') => {
			for id in controller.ids() {
				match controller.clear_buffer(id) {
					Ok(true) => info!(stream = %id, "cleared buffer"),
					Ok(false) => info!(stream = %id, "buffer empty or busy, not cleared"),
					Err(err) => warn!(stream = %id, "failed to clear buffer: {err}"),
				}
			}
			return true;
		}
		Ok('r') => {
			for id in controller.ids() {
				if let Ok(settings) = controller.settings(id) {
					settings.reset_roi();
				}
			}
			return true;
		}
		Ok('g') => |s| s.grayscale = !s.grayscale,
		Ok('b') => |s| s.smooth = !s.smooth,
		Ok('d') => |s| s.dilate = !s.dilate,
		Ok('e') => |s| s.erode = !s.erode,
		Ok('f') => |s| s.flip = !s.flip,
		Ok('k') => |s| s.canny = !s.canny,
		_ => return true,
	};
	for id in controller.ids() {
		let result = controller
			.settings(id)
			.and_then(|settings| settings.update(toggle));
		if let Err(err) = result {
			warn!(stream = %id, "failed to update settings: {err}");
		}
	}
	true
}
