//! Dirty-subscriber accumulation and the flush loop.
//!
//! Every public mutating operation builds one [`Changes`] accumulator,
//! threads it through the structural walk, and hands it to the tree's
//! [`Hub`] when the mutation is complete. Delivery is strictly
//! post-mutation: observers never see a partially updated tree.
//!
//! Reactions are allowed to mutate. Such mutations are queued for the
//! *next* round, never delivered re-entrantly, and rounds drain to fixpoint
//! before the top-level mutating call returns. A reaction chain that never
//! settles will therefore spin; breaking such feedback loops is the
//! caller's responsibility.

use smallvec::SmallVec;
use tracing::trace;

use crate::{
  rc::{MutRc, RcDerefMut},
  subscriber::Subscriber,
};

// ============================================================================
// Changes
// ============================================================================

/// The per-mutation dirty set, deduplicated by subscriber identity.
///
/// This is the explicit mutation context: it exists only for the duration
/// of one public operation and is consumed by [`Hub::deliver`].
pub(crate) struct Changes {
  dirty: SmallVec<[Subscriber; 4]>,
}

impl Changes {
  pub fn new() -> Self { Changes { dirty: SmallVec::new() } }

  /// Mark a subscriber dirty; marking twice is a no-op.
  pub fn mark(&mut self, subscriber: &Subscriber) {
    if !self.dirty.iter().any(|s| s.ptr_eq(subscriber)) {
      self.dirty.push(subscriber.clone());
    }
  }

  #[cfg(test)]
  pub fn len(&self) -> usize { self.dirty.len() }
}

// ============================================================================
// Hub
// ============================================================================

/// Per-tree notification delivery.
///
/// Clones share the same loop state; every façade handle onto one tree
/// carries a clone.
pub(crate) struct Hub {
  inner: MutRc<HubInner>,
}

#[derive(Default)]
struct HubInner {
  flushing: bool,
  pending: Vec<Subscriber>,
}

impl Clone for Hub {
  #[inline]
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl Hub {
  pub fn new() -> Self { Hub { inner: MutRc::own(HubInner::default()) } }

  /// Queue the accumulated dirty set and, unless a delivery is already in
  /// progress higher up the stack, drain rounds to fixpoint.
  ///
  /// When called from inside a reaction (a mutation performed during a
  /// flush), the dirt is merged into the pending set and delivered by the
  /// outer loop's next round.
  pub fn deliver(&self, changes: Changes) {
    {
      let mut inner = self.inner.rc_deref_mut();
      for subscriber in changes.dirty {
        if !inner.pending.iter().any(|s| s.ptr_eq(&subscriber)) {
          inner.pending.push(subscriber);
        }
      }
      if inner.flushing || inner.pending.is_empty() {
        return;
      }
      inner.flushing = true;
    }

    loop {
      let batch = std::mem::take(&mut self.inner.rc_deref_mut().pending);
      if batch.is_empty() {
        break;
      }
      trace!(reactions = batch.len(), "flush round");
      for subscriber in batch {
        if subscriber.is_active() {
          subscriber.run();
        }
      }
    }
    self.inner.rc_deref_mut().flushing = false;
  }
}
