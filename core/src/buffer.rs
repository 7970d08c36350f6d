//! Fixed-capacity frame queue shared between a capture producer and a
//! processing consumer.
//!
//! Capacity is enforced by two counting semaphores ("free" and "used" slots)
//! while the deque itself sits behind its own mutex. Two single-holder gates,
//! one per side, let [`BoundedFrameQueue::clear`] lock out insertion and
//! removal without ever waiting on a frame to arrive or leave.

mod semaphore;

use self::semaphore::Semaphore;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;

pub struct BoundedFrameQueue<F> {
	capacity: usize,
	frames: Mutex<VecDeque<F>>,
	free_slots: Semaphore,
	used_slots: Semaphore,
	insert_gate: Mutex<()>,
	remove_gate: Mutex<()>,
}

impl<F> BoundedFrameQueue<F> {
	pub fn new(capacity: usize) -> Result<Self> {
		if capacity == 0 {
			return Err(Error::invalid("frame queue capacity must be at least 1"));
		}
		Ok(Self {
			capacity,
			frames: Mutex::new(VecDeque::with_capacity(capacity)),
			free_slots: Semaphore::new(capacity),
			used_slots: Semaphore::new(0),
			insert_gate: Mutex::new(()),
			remove_gate: Mutex::new(()),
		})
	}

	/// Appends `frame` to the back of the queue.
	///
	/// With `drop_if_full` the call never blocks: if there is no free slot the
	/// frame is discarded. Otherwise it blocks until a slot frees up.
	///
	/// Returns `true` if the frame was queued, `false` if it was dropped or the
	/// queue has been [closed](BoundedFrameQueue::close).
	pub fn insert(&self, frame: F, drop_if_full: bool) -> bool {
		let _gate = self.insert_gate.lock();
		let acquired = if drop_if_full {
			self.free_slots.try_acquire()
		} else {
			self.free_slots.acquire()
		};
		if !acquired {
			return false;
		}
		self.frames.lock().push_back(frame);
		self.used_slots.release();
		true
	}

	/// Blocks until a frame is available and removes the oldest one.
	///
	/// Only returns `None` once the queue has been
	/// [closed](BoundedFrameQueue::close).
	pub fn remove(&self) -> Option<F> {
		let _gate = self.remove_gate.lock();
		if !self.used_slots.acquire() {
			return None;
		}
		let frame = self.frames.lock().pop_front();
		self.free_slots.release();
		frame
	}

	/// Discards every queued frame.
	///
	/// Never waits: if an insert or remove is in progress (including one that
	/// is blocked on a full or empty queue) this returns `false` right away.
	/// Also returns `false` when there was nothing to discard.
	pub fn clear(&self) -> bool {
		if self.is_closed() || self.frames.lock().is_empty() {
			return false;
		}
		let Some(_insert_gate) = self.insert_gate.try_lock() else {
			return false;
		};
		let Some(_remove_gate) = self.remove_gate.try_lock() else {
			return false;
		};

		// Both sides are locked out, so the slot counts are stable:
		// free == capacity - queued and used == queued.
		let mut frames = self.frames.lock();
		let queued = frames.len();
		if queued == 0 {
			return false;
		}
		self.free_slots.release_many(queued);
		// Both only fail if the queue was closed meanwhile; leave it as it is.
		if !self.free_slots.acquire_many(self.capacity) || !self.used_slots.acquire_many(queued) {
			return false;
		}
		frames.clear();
		self.free_slots.release_many(self.capacity);
		true
	}

	/// Wakes every thread blocked in [`insert`](Self::insert) or
	/// [`remove`](Self::remove) and makes all later calls return right away.
	/// Used to unstick a stream's loops when it is torn down.
	pub fn close(&self) {
		self.free_slots.close();
		self.used_slots.close();
	}

	pub fn is_closed(&self) -> bool {
		self.used_slots.is_closed()
	}

	// The queries below are unsynchronised snapshots and may be stale by the
	// time the caller acts on them.

	#[inline]
	pub fn size(&self) -> usize {
		self.frames.lock().len()
	}

	#[inline]
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	#[inline]
	pub fn is_full(&self) -> bool {
		self.size() == self.capacity
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.size() == 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crossbeam_channel::bounded;
	use std::{sync::Arc, thread, time::Duration};

	const BLOCKED: Duration = Duration::from_millis(150);
	const DEADLINE: Duration = Duration::from_secs(5);

	#[test]
	fn zero_capacity_is_rejected() {
		assert!(matches!(
			BoundedFrameQueue::<u32>::new(0),
			Err(Error::InvalidArgument(_))
		));
	}

	#[test]
	fn size_stays_within_capacity() {
		let queue = BoundedFrameQueue::new(3).unwrap();
		for i in 0..3 {
			assert!(queue.insert(i, false));
			assert!(queue.size() <= queue.capacity());
		}
		assert!(queue.is_full());
		assert_eq!(queue.remove(), Some(0));
		assert!(queue.insert(3, false));
		while !queue.is_empty() {
			queue.remove();
		}
		assert_eq!(queue.size(), 0);
		assert_eq!(queue.capacity(), 3);
	}

	#[test]
	fn drop_if_full_discards_new_frame() {
		let queue = BoundedFrameQueue::new(2).unwrap();
		assert!(queue.insert(1, true));
		assert!(queue.insert(2, true));
		assert!(!queue.insert(3, true));
		assert_eq!(queue.size(), 2);
		assert_eq!(queue.remove(), Some(1));
		assert_eq!(queue.remove(), Some(2));
		assert!(queue.is_empty());
	}

	#[test]
	fn blocking_insert_waits_for_remove() {
		let queue = Arc::new(BoundedFrameQueue::new(2).unwrap());
		queue.insert(1, false);
		queue.insert(2, false);

		let (tx, rx) = bounded(1);
		let producer = {
			let queue = queue.clone();
			thread::spawn(move || tx.send(queue.insert(3, false)).unwrap())
		};
		assert!(rx.recv_timeout(BLOCKED).is_err(), "insert into a full queue returned");

		assert_eq!(queue.remove(), Some(1));
		assert!(rx.recv_timeout(DEADLINE).unwrap());
		producer.join().unwrap();
		assert_eq!(queue.size(), 2);
		assert_eq!(queue.remove(), Some(2));
		assert_eq!(queue.remove(), Some(3));
	}

	#[test]
	fn remove_blocks_until_insert() {
		let queue = Arc::new(BoundedFrameQueue::new(1).unwrap());
		let (tx, rx) = bounded(1);
		let consumer = {
			let queue = queue.clone();
			thread::spawn(move || tx.send(queue.remove()).unwrap())
		};
		assert!(rx.recv_timeout(BLOCKED).is_err());
		queue.insert(7, false);
		assert_eq!(rx.recv_timeout(DEADLINE).unwrap(), Some(7));
		consumer.join().unwrap();
	}

	#[test]
	fn single_producer_single_consumer_is_fifo() {
		let queue = Arc::new(BoundedFrameQueue::new(4).unwrap());
		let producer = {
			let queue = queue.clone();
			thread::spawn(move || {
				for i in 0..1000_u32 {
					queue.insert(i, false);
				}
			})
		};
		let received = (0..1000).map(|_| queue.remove().unwrap()).collect::<Vec<_>>();
		producer.join().unwrap();
		assert_eq!(received, (0..1000).collect::<Vec<_>>());
	}

	#[test]
	fn clear_empty_queue_returns_false() {
		let queue = BoundedFrameQueue::<u32>::new(4).unwrap();
		assert!(!queue.clear());
	}

	#[test]
	fn clear_discards_frames_and_restores_slots() {
		let queue = BoundedFrameQueue::new(4).unwrap();
		for i in 0..3 {
			queue.insert(i, false);
		}
		assert!(queue.clear());
		assert_eq!(queue.size(), 0);
		assert_eq!(queue.capacity(), 4);

		// Every slot is usable again and nothing from before the clear remains.
		for i in 10..14 {
			assert!(queue.insert(i, true));
		}
		assert!(!queue.insert(14, true));
		assert_eq!(queue.remove(), Some(10));
	}

	#[test]
	fn clear_is_rejected_while_insert_is_blocked() {
		let queue = Arc::new(BoundedFrameQueue::new(1).unwrap());
		queue.insert(1, false);
		let (tx, rx) = bounded(1);
		let producer = {
			let queue = queue.clone();
			thread::spawn(move || tx.send(queue.insert(2, false)).unwrap())
		};
		assert!(rx.recv_timeout(BLOCKED).is_err());
		assert!(!queue.clear());
		assert_eq!(queue.size(), 1);

		assert_eq!(queue.remove(), Some(1));
		assert!(rx.recv_timeout(DEADLINE).unwrap());
		producer.join().unwrap();
		assert_eq!(queue.remove(), Some(2));
	}

	#[test]
	fn clear_under_load_keeps_bounds_and_order() {
		for capacity in [1, 2, 5] {
			let queue = Arc::new(BoundedFrameQueue::new(capacity).unwrap());
			let producer = {
				let queue = queue.clone();
				thread::spawn(move || {
					for i in 0..5000_u32 {
						queue.insert(i, true);
						assert!(queue.size() <= capacity);
					}
					queue.close();
				})
			};
			let consumer = {
				let queue = queue.clone();
				thread::spawn(move || {
					let mut last = None;
					while let Some(frame) = queue.remove() {
						assert!(last < Some(frame), "{last:?} then {frame}");
						last = Some(frame);
					}
				})
			};
			let mut cleared = 0;
			while !queue.is_closed() {
				cleared += usize::from(queue.clear());
				assert!(queue.size() <= capacity);
			}
			producer.join().unwrap();
			consumer.join().unwrap();
			assert!(queue.size() <= capacity, "capacity {capacity}, cleared {cleared}");
		}
	}

	#[test]
	fn close_unblocks_producer_and_consumer() {
		let full = Arc::new(BoundedFrameQueue::new(1).unwrap());
		full.insert(1, false);
		let empty = Arc::new(BoundedFrameQueue::<u32>::new(1).unwrap());

		let (insert_tx, insert_rx) = bounded(1);
		let (remove_tx, remove_rx) = bounded(1);
		let producer = {
			let full = full.clone();
			thread::spawn(move || insert_tx.send(full.insert(2, false)).unwrap())
		};
		let consumer = {
			let empty = empty.clone();
			thread::spawn(move || remove_tx.send(empty.remove()).unwrap())
		};
		assert!(insert_rx.recv_timeout(BLOCKED).is_err());
		assert!(remove_rx.recv_timeout(Duration::ZERO).is_err());

		full.close();
		empty.close();
		assert!(!insert_rx.recv_timeout(DEADLINE).unwrap());
		assert_eq!(remove_rx.recv_timeout(DEADLINE).unwrap(), None);
		producer.join().unwrap();
		consumer.join().unwrap();

		// The interrupted insert left the queue untouched, and nothing blocks
		// any more.
		assert_eq!(full.size(), 1);
		assert!(full.is_closed());
		assert!(!full.insert(3, false));
		assert!(!full.insert(3, true));
		assert_eq!(full.remove(), None);
		assert!(!full.clear());
	}
}
