use parking_lot::{Condvar, Mutex};

struct State {
	permits: usize,
	closed: bool,
}

/// Counting semaphore that can be closed to release its waiters.
pub(crate) struct Semaphore {
	state: Mutex<State>,
	available: Condvar,
}

impl Semaphore {
	pub fn new(permits: usize) -> Self {
		Self {
			state: Mutex::new(State {
				permits,
				closed: false,
			}),
			available: Condvar::new(),
		}
	}

	/// Blocks until `n` permits are taken. Returns `false` without taking
	/// anything once the semaphore is closed.
	pub fn acquire_many(&self, n: usize) -> bool {
		let mut state = self.state.lock();
		loop {
			if state.closed {
				return false;
			}
			if state.permits >= n {
				state.permits -= n;
				return true;
			}
			self.available.wait(&mut state);
		}
	}

	#[inline]
	pub fn acquire(&self) -> bool {
		self.acquire_many(1)
	}

	pub fn try_acquire(&self) -> bool {
		let mut state = self.state.lock();
		if state.closed || state.permits == 0 {
			return false;
		}
		state.permits -= 1;
		true
	}

	pub fn release_many(&self, n: usize) {
		if n == 0 {
			return;
		}
		self.state.lock().permits += n;
		self.available.notify_all();
	}

	#[inline]
	pub fn release(&self) {
		self.release_many(1)
	}

	pub fn close(&self) {
		self.state.lock().closed = true;
		self.available.notify_all();
	}

	pub fn is_closed(&self) -> bool {
		self.state.lock().closed
	}

	#[cfg(test)]
	pub fn available(&self) -> usize {
		self.state.lock().permits
	}
}
