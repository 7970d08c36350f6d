use crate::{
	buffer::BoundedFrameQueue,
	camera::Camera,
	error::Result,
	registry::StreamId,
	stats::{LoopStatistics, RateStatistic},
	thread::{self, LoopControl, LoopHandle, Priority},
};
use std::{sync::Arc, time::Instant};
use tracing::{debug, error, trace};

/// Pulls frames from a camera into a stream's queue until told to stop.
///
/// With `drop_if_full` off, a full queue blocks the loop inside `insert`; the
/// stop request is only seen once a slot frees up or the queue is woken.
pub struct CaptureLoop<C: Camera> {
	id: StreamId,
	camera: C,
	queue: Arc<BoundedFrameQueue<C::Frame>>,
	drop_if_full: bool,
	rate: RateStatistic,
	stats: LoopStatistics,
	control: Arc<LoopControl>,
}

impl<C: Camera> CaptureLoop<C> {
	pub fn new(
		id: StreamId,
		camera: C,
		queue: Arc<BoundedFrameQueue<C::Frame>>,
		drop_if_full: bool,
		stat_window: usize,
	) -> Self {
		Self {
			id,
			camera,
			queue,
			drop_if_full,
			rate: RateStatistic::new(stat_window),
			stats: LoopStatistics::default(),
			control: LoopControl::new(),
		}
	}

	pub fn spawn(self, priority: Priority) -> Result<LoopHandle> {
		let name = format!("capture {}", self.id);
		let control = self.control.clone();
		let thread = thread::spawn(name.clone(), priority, move || self.run())?;
		Ok(LoopHandle::new(name, control, thread))
	}

	/// Runs the loop on the current thread. The camera is closed on return.
	pub fn run(mut self) -> Result<()> {
		debug!(stream = %self.id, "capture loop started");
		let mut last = Instant::now();
		let result = loop {
			let now = Instant::now();
			self.rate.record(now - last);
			last = now;

			let frame = match self.camera.grab() {
				Ok(frame) => frame,
				Err(err) => {
					error!(stream = %self.id, "stopping capture: {err}");
					break Err(err);
				}
			};
			if self.queue.insert(frame, self.drop_if_full) {
				self.stats.frames_processed += 1;
			} else {
				self.stats.frames_dropped += 1;
				trace!(stream = %self.id, dropped = self.stats.frames_dropped, "frame dropped");
			}
			self.stats.average_fps = self.rate.average_fps();
			self.control.publish(self.stats);

			if self.control.stop_requested() {
				break Ok(());
			}
		};
		self.control.finish();
		debug!(stream = %self.id, captured = self.stats.frames_processed, "capture loop stopped");
		result
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{error::Error, thread::LoopState};
	use std::{thread::sleep, time::Duration};

	struct Counter {
		next: u32,
		fail_after: Option<u32>,
	}

	impl Camera for Counter {
		type Frame = u32;

		fn grab(&mut self) -> Result<u32> {
			if self.fail_after == Some(self.next) {
				return Err(Error::Camera("unplugged".to_owned()));
			}
			sleep(Duration::from_millis(1));
			self.next += 1;
			Ok(self.next - 1)
		}

		fn resolution(&self) -> (i32, i32) {
			(1, 1)
		}
	}

	#[test]
	fn camera_error_ends_the_loop_and_keeps_queued_frames() {
		let queue = Arc::new(BoundedFrameQueue::new(8).unwrap());
		let camera = Counter {
			next: 0,
			fail_after: Some(3),
		};
		let capture = CaptureLoop::new(StreamId(0), camera, queue.clone(), false, 4);
		let control = capture.control.clone();
		assert!(matches!(capture.run(), Err(Error::Camera(_))));
		assert_eq!(control.state(), LoopState::Stopped);
		assert_eq!(queue.size(), 3);
		assert_eq!(control.statistics().frames_processed, 3);
	}

	#[test]
	fn full_queue_drops_frames_when_allowed() {
		let queue = Arc::new(BoundedFrameQueue::new(2).unwrap());
		let camera = Counter {
			next: 0,
			fail_after: Some(5),
		};
		let capture = CaptureLoop::new(StreamId(0), camera, queue.clone(), true, 4);
		let control = capture.control.clone();
		let _ = capture.run();
		let stats = control.statistics();
		assert_eq!(stats.frames_processed, 2);
		assert_eq!(stats.frames_dropped, 3);
		assert_eq!(queue.remove(), Some(0));
		assert_eq!(queue.remove(), Some(1));
	}

	#[test]
	fn stop_request_is_observed_after_an_iteration() {
		let queue = Arc::new(BoundedFrameQueue::new(4).unwrap());
		let camera = Counter {
			next: 0,
			fail_after: None,
		};
		let handle = CaptureLoop::new(StreamId(1), camera, queue.clone(), true, 4)
			.spawn(Priority::Inherit)
			.unwrap();
		assert_eq!(handle.name(), "capture #1");
		sleep(Duration::from_millis(20));
		handle.stop();
		handle.join().unwrap();
		assert!(queue.size() > 0);
	}
}
