use crate::{
	buffer::BoundedFrameQueue,
	display::DisplaySink,
	error::Result,
	filter::FilterPipeline,
	registry::StreamId,
	settings::SettingsHandle,
	stats::{LoopStatistics, RateStatistic},
	sync::SyncBarrier,
	thread::{self, LoopControl, LoopHandle, Priority},
};
use std::{sync::Arc, time::Instant};
use tracing::{debug, warn};

/// Takes frames off a stream's queue, filters them and hands the result to
/// the display.
///
/// Each iteration first waits on the sync barrier, so synchronised streams
/// start every frame together. The settings snapshot is taken once per
/// frame, after the frame has been dequeued and before any filter runs.
pub struct ProcessingLoop<F, P, D> {
	id: StreamId,
	queue: Arc<BoundedFrameQueue<F>>,
	barrier: Arc<SyncBarrier>,
	settings: Arc<SettingsHandle>,
	filters: P,
	display: D,
	rate: RateStatistic,
	stats: LoopStatistics,
	control: Arc<LoopControl>,
}

impl<F, P, D> ProcessingLoop<F, P, D>
where
	F: Send + 'static,
	P: FilterPipeline<F>,
	D: DisplaySink<F>,
{
	pub fn new(
		id: StreamId,
		queue: Arc<BoundedFrameQueue<F>>,
		barrier: Arc<SyncBarrier>,
		settings: Arc<SettingsHandle>,
		filters: P,
		display: D,
		stat_window: usize,
	) -> Self {
		Self {
			id,
			queue,
			barrier,
			settings,
			filters,
			display,
			rate: RateStatistic::new(stat_window),
			stats: LoopStatistics::default(),
			control: LoopControl::new(),
		}
	}

	pub fn spawn(self, priority: Priority) -> Result<LoopHandle> {
		let name = format!("processing {}", self.id);
		let control = self.control.clone();
		let thread = thread::spawn(name.clone(), priority, move || self.run())?;
		Ok(LoopHandle::new(name, control, thread))
	}

	pub fn run(mut self) -> Result<()> {
		debug!(stream = %self.id, "processing loop started");
		let mut last = Instant::now();
		loop {
			let now = Instant::now();
			self.rate.record(now - last);
			last = now;

			self.barrier.arrive(self.id);
			let Some(frame) = self.queue.remove() else {
				// Queue closed: the stream is being torn down.
				break;
			};
			let snapshot = self.settings.snapshot();
			match self.filters.apply(frame, &snapshot) {
				Ok(frame) => {
					self.display.on_frame(self.id, frame);
					self.stats.frames_processed += 1;
				}
				Err(err) => {
					self.stats.frames_dropped += 1;
					warn!(stream = %self.id, "failed to process frame: {err}");
				}
			}
			self.stats.average_fps = self.rate.average_fps();
			self.control.publish(self.stats);
			self.display.on_statistics(self.id, self.stats);

			if self.control.stop_requested() {
				break;
			}
		}
		self.control.finish();
		debug!(stream = %self.id, processed = self.stats.frames_processed, "processing loop stopped");
		Ok(())
	}
}
