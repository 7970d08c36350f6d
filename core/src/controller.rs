//! Connecting and disconnecting streams.
//!
//! A stream is a camera, its queue and the two loop threads around it. The
//! controller creates all of them together on connect and tears them down in
//! a fixed order on disconnect: request stop, unregister (which closes the
//! queue and leaves the sync group, waking anything blocked), then join.

use crate::{
	buffer::BoundedFrameQueue,
	camera::Camera,
	capture::CaptureLoop,
	config::StreamConfig,
	display::DisplaySink,
	error::{Error, Result},
	filter::FilterPipeline,
	processing::ProcessingLoop,
	registry::{StreamId, StreamRegistry},
	settings::SettingsHandle,
	stats::LoopStatistics,
	sync::SyncBarrier,
	thread::{LoopHandle, LoopState},
};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, error, info};

struct Stream {
	capture: LoopHandle,
	processing: LoopHandle,
	settings: Arc<SettingsHandle>,
	resolution: (i32, i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamStatus {
	pub id: StreamId,
	pub resolution: (i32, i32),
	pub buffer_size: usize,
	pub buffer_capacity: usize,
	pub sync_member: bool,
	/// `false` once the capture loop has exited, e.g. after a camera error.
	pub capturing: bool,
	pub capture: LoopStatistics,
	pub processing: LoopStatistics,
}

pub struct StreamController<F> {
	registry: StreamRegistry<F>,
	streams: Mutex<HashMap<StreamId, Stream>>,
}

impl<F: Send + 'static> StreamController<F> {
	pub fn new(sync_enabled: bool) -> Self {
		Self {
			registry: StreamRegistry::new(Arc::new(SyncBarrier::new(sync_enabled))),
			streams: Mutex::new(HashMap::new()),
		}
	}

	/// Starts capturing from `camera` and processing its frames with `filters`,
	/// publishing results to `display`.
	pub fn connect<C, P, D>(
		&self,
		id: StreamId,
		camera: C,
		filters: P,
		display: D,
		config: &StreamConfig,
	) -> Result<()>
	where
		C: Camera<Frame = F>,
		P: FilterPipeline<F>,
		D: DisplaySink<F>,
	{
		config.validate()?;
		let mut streams = self.streams.lock();
		if streams.contains_key(&id) {
			return Err(Error::DuplicateStream(id));
		}

		let resolution = camera.resolution();
		let settings = Arc::new(SettingsHandle::new(config.processing.clone(), resolution)?);
		if let Some(roi) = config.roi {
			settings.set_roi(roi)?;
		}
		let queue = Arc::new(BoundedFrameQueue::new(config.buffer_size)?);
		self.registry.add_stream(id, queue.clone(), config.sync)?;

		let capture = CaptureLoop::new(
			id,
			camera,
			queue.clone(),
			config.drop_if_full,
			config.stat_window,
		)
		.spawn(config.capture_priority);
		let capture = match capture {
			Ok(capture) => capture,
			Err(err) => {
				let _ = self.registry.remove_stream(id);
				return Err(err);
			}
		};

		let processing = ProcessingLoop::new(
			id,
			queue,
			self.registry.barrier().clone(),
			settings.clone(),
			filters,
			display,
			config.stat_window,
		)
		.spawn(config.processing_priority);
		let processing = match processing {
			Ok(processing) => processing,
			Err(err) => {
				capture.stop();
				let _ = self.registry.remove_stream(id);
				let _ = capture.join();
				return Err(err);
			}
		};

		streams.insert(
			id,
			Stream {
				capture,
				processing,
				settings,
				resolution,
			},
		);
		info!(
			stream = %id,
			width = resolution.0,
			height = resolution.1,
			buffer = config.buffer_size,
			drop_if_full = config.drop_if_full,
			sync = config.sync,
			"stream connected"
		);
		Ok(())
	}

	/// Stops both loops of `id`, unregisters it and waits for the threads.
	///
	/// A camera failure that already ended the capture loop is not reported
	/// again here; a panicked loop thread is.
	pub fn disconnect(&self, id: StreamId) -> Result<()> {
		let stream = self.streams.lock().remove(&id).ok_or(Error::NotFound(id))?;
		teardown(&self.registry, id, stream)
	}

	/// Disconnects every stream, returning the first error encountered.
	pub fn shutdown(&self) -> Result<()> {
		let mut result = Ok(());
		for id in self.ids() {
			if let Err(err) = self.disconnect(id) {
				error!(stream = %id, "failed to disconnect: {err}");
				if result.is_ok() {
					result = Err(err);
				}
			}
		}
		result
	}

	pub fn status(&self, id: StreamId) -> Result<StreamStatus> {
		let streams = self.streams.lock();
		let stream = streams.get(&id).ok_or(Error::NotFound(id))?;
		let queue = self.registry.get_queue(id)?;
		Ok(StreamStatus {
			id,
			resolution: stream.resolution,
			buffer_size: queue.size(),
			buffer_capacity: queue.capacity(),
			sync_member: self.registry.is_sync_member(id),
			capturing: stream.capture.state() != LoopState::Stopped,
			capture: stream.capture.statistics(),
			processing: stream.processing.statistics(),
		})
	}

	/// Returns `Ok(false)` if the queue was empty or busy; try again later.
	pub fn clear_buffer(&self, id: StreamId) -> Result<bool> {
		let cleared = self.registry.get_queue(id)?.clear();
		debug!(stream = %id, cleared, "clear buffer requested");
		Ok(cleared)
	}

	pub fn settings(&self, id: StreamId) -> Result<Arc<SettingsHandle>> {
		self.streams
			.lock()
			.get(&id)
			.map(|stream| stream.settings.clone())
			.ok_or(Error::NotFound(id))
	}

	pub fn set_sync_enabled(&self, enabled: bool) {
		self.registry.barrier().set_enabled(enabled);
		info!(enabled, "stream sync {}", if enabled { "started" } else { "stopped" });
	}

	pub fn sync_enabled(&self) -> bool {
		self.registry.barrier().is_enabled()
	}

	pub fn contains(&self, id: StreamId) -> bool {
		self.registry.contains(id)
	}

	pub fn ids(&self) -> Vec<StreamId> {
		self.registry.ids()
	}
}

impl<F> Drop for StreamController<F> {
	fn drop(&mut self) {
		for (id, stream) in std::mem::take(&mut *self.streams.lock()) {
			if let Err(err) = teardown(&self.registry, id, stream) {
				error!(stream = %id, "failed to disconnect: {err}");
			}
		}
	}
}

fn teardown<F>(registry: &StreamRegistry<F>, id: StreamId, stream: Stream) -> Result<()> {
	stream.processing.stop();
	stream.capture.stop();
	registry.remove_stream(id)?;

	let processing = stream.processing.join();
	let capture = stream.capture.join();
	if let Err(err) = &capture {
		debug!(stream = %id, "capture loop had ended with: {err}");
	}
	info!(stream = %id, "stream disconnected");
	match (processing, capture) {
		(Err(err), _) | (_, Err(err @ Error::Panicked(_))) => Err(err),
		_ => Ok(()),
	}
}
