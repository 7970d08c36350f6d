use crate::{
	error::{Error, Result},
	settings::{ProcessingSettings, Roi},
	stats::DEFAULT_RATE_WINDOW,
	thread::Priority,
};
use serde::Deserialize;

/// Per-stream buffering, pacing and threading options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
	/// Frames the queue between capture and processing can hold.
	pub buffer_size: usize,
	/// Discard new frames instead of stalling the camera when the queue is full.
	pub drop_if_full: bool,
	/// Join the sync group so processing runs in lock-step with other members.
	pub sync: bool,
	pub capture_priority: Priority,
	pub processing_priority: Priority,
	/// Samples per frame-rate average.
	pub stat_window: usize,
	pub processing: ProcessingSettings,
	pub roi: Option<Roi>,
}

impl Default for StreamConfig {
	fn default() -> Self {
		Self {
			buffer_size: 1,
			drop_if_full: true,
			sync: false,
			capture_priority: Priority::Normal,
			processing_priority: Priority::Normal,
			stat_window: DEFAULT_RATE_WINDOW,
			processing: ProcessingSettings::default(),
			roi: None,
		}
	}
}

impl StreamConfig {
	pub fn validate(&self) -> Result<()> {
		if self.buffer_size == 0 {
			return Err(Error::invalid("buffer size must be at least 1"));
		}
		if self.stat_window == 0 {
			return Err(Error::invalid("statistics window must be at least 1"));
		}
		self.processing.validate()
	}
}
