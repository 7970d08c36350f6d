use crate::{registry::StreamId, stats::LoopStatistics};
use crossbeam_channel::Sender;

/// Receives processed frames and statistics from processing loops.
///
/// Both callbacks run on the processing thread and must return quickly.
pub trait DisplaySink<F>: Send + 'static {
	fn on_frame(&self, id: StreamId, frame: F);
	fn on_statistics(&self, id: StreamId, stats: LoopStatistics);
}

#[derive(Debug)]
pub enum DisplayEvent<F> {
	Frame(StreamId, F),
	Statistics(StreamId, LoopStatistics),
}

// Never blocks: events are dropped when the display falls behind.
impl<F: Send + 'static> DisplaySink<F> for Sender<DisplayEvent<F>> {
	fn on_frame(&self, id: StreamId, frame: F) {
		let _ = self.try_send(DisplayEvent::Frame(id, frame));
	}

	fn on_statistics(&self, id: StreamId, stats: LoopStatistics) {
		let _ = self.try_send(DisplayEvent::Statistics(id, stats));
	}
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplay;

impl<F: Send + 'static> DisplaySink<F> for NullDisplay {
	fn on_frame(&self, _: StreamId, _: F) {}

	fn on_statistics(&self, _: StreamId, _: LoopStatistics) {}
}
