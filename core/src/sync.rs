//! Lock-step pacing across streams.
//!
//! Every member of the sync group calls [`SyncBarrier::arrive`] once per frame;
//! nobody proceeds until the whole group has arrived. Membership and the
//! global enable flag can only change through [`SyncBarrier::join`],
//! [`SyncBarrier::leave`] and [`SyncBarrier::set_enabled`], and each of those
//! wakes waiters whenever the change could otherwise strand them.

use crate::registry::StreamId;
use parking_lot::{Condvar, Mutex};
use std::collections::HashSet;
use tracing::debug;

struct BarrierState {
	members: HashSet<StreamId>,
	arrived: HashSet<StreamId>,
	enabled: bool,
	// Incremented whenever a round is released.
	round: u64,
}

impl BarrierState {
	fn release_round(&mut self) {
		self.arrived.clear();
		self.round = self.round.wrapping_add(1);
	}

	fn round_complete(&self) -> bool {
		!self.arrived.is_empty() && self.arrived.len() >= self.members.len()
	}
}

pub struct SyncBarrier {
	state: Mutex<BarrierState>,
	released: Condvar,
}

impl SyncBarrier {
	pub fn new(enabled: bool) -> Self {
		Self {
			state: Mutex::new(BarrierState {
				members: HashSet::new(),
				arrived: HashSet::new(),
				enabled,
				round: 0,
			}),
			released: Condvar::new(),
		}
	}

	/// Waits for the rest of the sync group.
	///
	/// Returns immediately when `id` is not a member or sync is disabled. The
	/// last member to arrive releases everyone. A waiter also returns if it is
	/// removed from the group or sync gets disabled while it waits.
	pub fn arrive(&self, id: StreamId) {
		let mut state = self.state.lock();
		if !state.enabled || !state.members.contains(&id) {
			return;
		}
		state.arrived.insert(id);
		if state.round_complete() {
			state.release_round();
			self.released.notify_all();
			return;
		}
		let round = state.round;
		while state.round == round && state.enabled && state.members.contains(&id) {
			self.released.wait(&mut state);
		}
		state.arrived.remove(&id);
	}

	pub fn join(&self, id: StreamId) {
		let mut state = self.state.lock();
		if state.members.insert(id) {
			debug!(stream = %id, members = state.members.len(), "stream joined sync group");
		}
	}

	/// Removes `id` from the group. Members already waiting are re-evaluated
	/// against the smaller group, so a round that is now complete is released.
	pub fn leave(&self, id: StreamId) -> bool {
		let mut state = self.state.lock();
		if !state.members.remove(&id) {
			return false;
		}
		state.arrived.remove(&id);
		debug!(stream = %id, members = state.members.len(), "stream left sync group");
		if state.round_complete() {
			state.release_round();
		}
		self.released.notify_all();
		true
	}

	pub fn set_enabled(&self, enabled: bool) {
		let mut state = self.state.lock();
		if state.enabled == enabled {
			return;
		}
		state.enabled = enabled;
		debug!(enabled, "stream sync toggled");
		if !enabled {
			state.release_round();
		}
		self.released.notify_all();
	}

	pub fn is_enabled(&self) -> bool {
		self.state.lock().enabled
	}

	pub fn is_member(&self, id: StreamId) -> bool {
		self.state.lock().members.contains(&id)
	}

	pub fn member_count(&self) -> usize {
		self.state.lock().members.len()
	}

	/// Members currently blocked in [`arrive`](Self::arrive).
	pub fn waiting(&self) -> usize {
		self.state.lock().arrived.len()
	}
}

impl Default for SyncBarrier {
	fn default() -> Self {
		Self::new(true)
	}
}
