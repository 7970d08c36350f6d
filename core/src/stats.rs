use std::time::Duration;

pub const DEFAULT_RATE_WINDOW: usize = 32;

/// Snapshot of a loop's throughput, published after every iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStatistics {
	pub average_fps: u32,
	pub frames_processed: u64,
	pub frames_dropped: u64,
}

/// Rolling frame-rate estimate over a fixed window of inter-frame intervals.
///
/// Each interval contributes `1000 / ms` frames per second; once `window`
/// samples have been collected their mean becomes the new average and the
/// accumulator starts over. Intervals under a millisecond are ignored.
#[derive(Debug, Clone)]
pub struct RateStatistic {
	window: usize,
	samples: usize,
	fps_sum: u64,
	average_fps: u32,
}

impl RateStatistic {
	pub fn new(window: usize) -> Self {
		Self {
			window: window.max(1),
			samples: 0,
			fps_sum: 0,
			average_fps: 0,
		}
	}

	pub fn record(&mut self, interval: Duration) {
		let millis = interval.as_millis();
		if millis == 0 {
			return;
		}
		self.fps_sum += (1000 / millis) as u64;
		self.samples += 1;
		if self.samples == self.window {
			self.average_fps = (self.fps_sum / self.window as u64) as u32;
			self.fps_sum = 0;
			self.samples = 0;
		}
	}

	#[inline]
	pub fn average_fps(&self) -> u32 {
		self.average_fps
	}

	/// Samples collected towards the next average.
	#[inline]
	pub fn pending_samples(&self) -> usize {
		self.samples
	}
}

impl Default for RateStatistic {
	fn default() -> Self {
		Self::new(DEFAULT_RATE_WINDOW)
	}
}
