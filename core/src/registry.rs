use crate::{
	buffer::BoundedFrameQueue,
	error::{Error, Result},
	sync::SyncBarrier,
};
use parking_lot::Mutex;
use serde::Deserialize;
use std::{collections::HashMap, fmt, sync::Arc};
use tracing::debug;

/// Identifies one camera stream. Usually the capture device number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct StreamId(pub u32);

impl fmt::Display for StreamId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Owns every connected stream's frame queue and the shared sync barrier.
///
/// Lock order is always registry first, barrier second.
pub struct StreamRegistry<F> {
	queues: Mutex<HashMap<StreamId, Arc<BoundedFrameQueue<F>>>>,
	barrier: Arc<SyncBarrier>,
}

impl<F> StreamRegistry<F> {
	pub fn new(barrier: Arc<SyncBarrier>) -> Self {
		Self {
			queues: Mutex::new(HashMap::new()),
			barrier,
		}
	}

	pub fn add_stream(
		&self,
		id: StreamId,
		queue: Arc<BoundedFrameQueue<F>>,
		join_sync_group: bool,
	) -> Result<()> {
		let mut queues = self.queues.lock();
		if queues.contains_key(&id) {
			return Err(Error::DuplicateStream(id));
		}
		queues.insert(id, queue);
		if join_sync_group {
			self.barrier.join(id);
		}
		debug!(stream = %id, sync = join_sync_group, "stream registered");
		Ok(())
	}

	pub fn get_queue(&self, id: StreamId) -> Result<Arc<BoundedFrameQueue<F>>> {
		self.queues
			.lock()
			.get(&id)
			.cloned()
			.ok_or(Error::NotFound(id))
	}

	/// Unregisters `id`, pulls it out of the sync group and closes its queue,
	/// waking anything blocked on either.
	pub fn remove_stream(&self, id: StreamId) -> Result<Arc<BoundedFrameQueue<F>>> {
		let mut queues = self.queues.lock();
		let queue = queues.remove(&id).ok_or(Error::NotFound(id))?;
		self.barrier.leave(id);
		queue.close();
		debug!(stream = %id, "stream unregistered");
		Ok(queue)
	}

	pub fn contains(&self, id: StreamId) -> bool {
		self.queues.lock().contains_key(&id)
	}

	pub fn is_sync_member(&self, id: StreamId) -> bool {
		let _queues = self.queues.lock();
		self.barrier.is_member(id)
	}

	pub fn ids(&self) -> Vec<StreamId> {
		let mut ids = self.queues.lock().keys().copied().collect::<Vec<_>>();
		ids.sort();
		ids
	}

	pub fn barrier(&self) -> &Arc<SyncBarrier> {
		&self.barrier
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crossbeam_channel::bounded;
	use std::{thread, time::Duration};

	fn registry() -> StreamRegistry<u32> {
		StreamRegistry::new(Arc::new(SyncBarrier::new(true)))
	}

	fn queue() -> Arc<BoundedFrameQueue<u32>> {
		Arc::new(BoundedFrameQueue::new(2).unwrap())
	}

	#[test]
	fn duplicate_ids_are_rejected() {
		let registry = registry();
		registry.add_stream(StreamId(0), queue(), false).unwrap();
		assert!(matches!(
			registry.add_stream(StreamId(0), queue(), true),
			Err(Error::DuplicateStream(StreamId(0)))
		));
		// The failed add must not have touched sync membership.
		assert!(!registry.is_sync_member(StreamId(0)));
	}

	#[test]
	fn lookup_and_removal() {
		let registry = registry();
		let q = queue();
		registry.add_stream(StreamId(3), q.clone(), true).unwrap();
		assert!(registry.contains(StreamId(3)));
		assert!(registry.is_sync_member(StreamId(3)));
		assert!(Arc::ptr_eq(&registry.get_queue(StreamId(3)).unwrap(), &q));

		registry.remove_stream(StreamId(3)).unwrap();
		assert!(!registry.contains(StreamId(3)));
		assert!(!registry.is_sync_member(StreamId(3)));
		assert!(matches!(
			registry.get_queue(StreamId(3)),
			Err(Error::NotFound(StreamId(3)))
		));
		assert!(matches!(
			registry.remove_stream(StreamId(3)),
			Err(Error::NotFound(_))
		));
	}

	#[test]
	fn ids_may_be_reused_after_removal() {
		let registry = registry();
		registry.add_stream(StreamId(1), queue(), false).unwrap();
		registry.remove_stream(StreamId(1)).unwrap();
		registry.add_stream(StreamId(1), queue(), true).unwrap();
		assert_eq!(registry.ids(), vec![StreamId(1)]);
	}

	#[test]
	fn removal_wakes_barrier_waiter() {
		let registry = Arc::new(registry());
		registry.add_stream(StreamId(0), queue(), true).unwrap();
		registry.add_stream(StreamId(1), queue(), true).unwrap();

		let (tx, rx) = bounded(1);
		let waiter = {
			let barrier = registry.barrier().clone();
			thread::spawn(move || {
				barrier.arrive(StreamId(0));
				tx.send(()).unwrap();
			})
		};
		assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
		registry.remove_stream(StreamId(1)).unwrap();
		assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
		waiter.join().unwrap();
	}

	#[test]
	fn removal_wakes_queue_consumer() {
		let registry = registry();
		let q = queue();
		registry.add_stream(StreamId(0), q.clone(), false).unwrap();

		let (tx, rx) = bounded(1);
		let consumer = thread::spawn(move || tx.send(q.remove()).unwrap());
		assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
		registry.remove_stream(StreamId(0)).unwrap();
		assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), None);
		consumer.join().unwrap();
	}
}
