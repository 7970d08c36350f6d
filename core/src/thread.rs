use crate::{
	error::{Error, Result},
	stats::LoopStatistics,
};
use parking_lot::Mutex;
use serde::Deserialize;
use std::{
	sync::Arc,
	thread::{Builder, JoinHandle},
};
use thread_priority::{ThreadBuilderExt, ThreadPriority, ThreadPriorityValue};
use tracing::{error, warn};

/// Scheduling priority for loop threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
	Idle,
	Lowest,
	Low,
	/// The platform default.
	#[default]
	Normal,
	High,
	Highest,
	TimeCritical,
	/// Keep whatever the spawning thread has.
	Inherit,
}

impl Priority {
	fn to_thread_priority(self) -> Option<ThreadPriority> {
		let value: u8 = match self {
			Self::Idle => return Some(ThreadPriority::Min),
			Self::TimeCritical => return Some(ThreadPriority::Max),
			Self::Normal | Self::Inherit => return None,
			Self::Lowest => 15,
			Self::Low => 30,
			Self::High => 65,
			Self::Highest => 80,
		};
		ThreadPriorityValue::try_from(value)
			.ok()
			.map(ThreadPriority::Crossplatform)
	}
}

/// Spawns a named thread, applying `priority` where the platform allows.
/// Failing to set the priority is not fatal.
pub(crate) fn spawn<F, T>(name: String, priority: Priority, f: F) -> Result<JoinHandle<T>>
where
	F: FnOnce() -> T + Send + 'static,
	T: Send + 'static,
{
	let builder = Builder::new().name(name.clone());
	let handle = match priority.to_thread_priority() {
		Some(thread_priority) => builder.spawn_with_priority(thread_priority, move |applied| {
			if let Err(err) = applied {
				warn!(thread = %name, ?priority, "failed to set thread priority: {err:?}");
			}
			f()
		}),
		None => builder.spawn(f),
	};
	handle.map_err(Error::Spawn)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
	Running,
	StopRequested,
	Stopped,
}

/// State shared between a loop thread and whoever controls it.
pub(crate) struct LoopControl {
	state: Mutex<LoopState>,
	stats: Mutex<LoopStatistics>,
}

impl LoopControl {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			state: Mutex::new(LoopState::Running),
			stats: Mutex::new(LoopStatistics::default()),
		})
	}

	pub fn request_stop(&self) {
		let mut state = self.state.lock();
		if *state == LoopState::Running {
			*state = LoopState::StopRequested;
		}
	}

	pub fn stop_requested(&self) -> bool {
		*self.state.lock() != LoopState::Running
	}

	pub fn finish(&self) {
		*self.state.lock() = LoopState::Stopped;
	}

	pub fn state(&self) -> LoopState {
		*self.state.lock()
	}

	pub fn publish(&self, stats: LoopStatistics) {
		*self.stats.lock() = stats;
	}

	pub fn statistics(&self) -> LoopStatistics {
		*self.stats.lock()
	}
}

/// Owning handle to a running capture or processing loop.
///
/// Stopping is cooperative: the loop notices the request at the end of its
/// current iteration. A loop blocked on its queue or on the sync barrier has
/// to be woken separately, by closing the queue or leaving the group, before
/// [`LoopHandle::join`] can return.
pub struct LoopHandle {
	name: String,
	control: Arc<LoopControl>,
	thread: Option<JoinHandle<Result<()>>>,
}

impl LoopHandle {
	pub(crate) fn new(name: String, control: Arc<LoopControl>, thread: JoinHandle<Result<()>>) -> Self {
		Self {
			name,
			control,
			thread: Some(thread),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn stop(&self) {
		self.control.request_stop();
	}

	pub fn state(&self) -> LoopState {
		self.control.state()
	}

	pub fn statistics(&self) -> LoopStatistics {
		self.control.statistics()
	}

	/// Waits for the thread to exit and returns the loop's own result.
	pub fn join(mut self) -> Result<()> {
		let Some(thread) = self.thread.take() else {
			return Ok(());
		};
		match thread.join() {
			Ok(result) => result,
			Err(_) => {
				self.control.finish();
				error!(thread = %self.name, "loop thread panicked");
				Err(Error::Panicked(self.name.clone()))
			}
		}
	}
}
