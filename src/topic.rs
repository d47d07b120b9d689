//! The unit of change notification.
//!
//! A [`Topic`] is one mutable cell plus the set of [`Subscriber`]s that
//! currently depend on it. Writing a different value marks every subscriber
//! dirty in the mutation's [`Changes`] accumulator; delivery happens later,
//! in the flush loop, never inside `set`.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::{
  flush::Changes,
  rc::{MutRc, RcDeref, RcDerefMut},
  subscriber::Subscriber,
};

/// Emptiness predicate for topic values.
///
/// A topic whose value is vacant and whose subscriber set is empty is
/// eligible for detach: its owner no longer has a reason to keep it.
pub trait Vacant {
  fn is_vacant(&self) -> bool;
}

impl<T> Vacant for Vec<T> {
  #[inline]
  fn is_vacant(&self) -> bool { self.is_empty() }
}

impl<T> Vacant for Option<T> {
  #[inline]
  fn is_vacant(&self) -> bool { self.is_none() }
}

// ============================================================================
// Topic
// ============================================================================

/// An observable single-value cell.
///
/// Clones share the same cell; identity is the cell address.
pub struct Topic<T> {
  inner: MutRc<TopicInner<T>>,
}

struct TopicInner<T> {
  value: T,
  subscribers: SmallVec<[Subscriber; 2]>,
  on_detach: Option<Box<dyn FnOnce()>>,
}

impl<T> Clone for Topic<T> {
  #[inline]
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<T> Topic<T> {
  pub fn new(value: T) -> Self {
    Topic {
      inner: MutRc::own(TopicInner { value, subscribers: SmallVec::new(), on_detach: None }),
    }
  }

  /// Number of current subscribers.
  pub fn subscriber_count(&self) -> usize { self.inner.rc_deref().subscribers.len() }

  #[inline]
  pub(crate) fn ptr_key(&self) -> usize { self.inner.ptr_key() }
}

impl<T: Clone> Topic<T> {
  /// Current value, no side effect.
  pub fn get(&self) -> T { self.inner.rc_deref().value.clone() }
}

impl<T: PartialEq + Vacant + 'static> Topic<T> {
  /// Replace the value. Iff it differs from the previous one, every current
  /// subscriber is marked dirty in `changes`.
  ///
  /// A write that leaves the value vacant also re-checks the detach
  /// condition, so a cell emptied after its last subscriber left is
  /// reclaimed without waiting for another unsubscribe.
  pub(crate) fn set(&self, value: T, changes: &mut Changes) {
    {
      let mut inner = self.inner.rc_deref_mut();
      if inner.value == value {
        return;
      }
      inner.value = value;
      for subscriber in &inner.subscribers {
        changes.mark(subscriber);
      }
    }
    self.maybe_detach();
  }

  /// Add a subscriber; a second subscription of the same subscriber is a
  /// no-op.
  pub(crate) fn subscribe(&self, subscriber: &Subscriber) {
    let mut inner = self.inner.rc_deref_mut();
    if !inner.subscribers.iter().any(|s| s.ptr_eq(subscriber)) {
      inner.subscribers.push(subscriber.clone());
    }
  }

  /// Remove a subscriber, then check the detach condition.
  pub(crate) fn unsubscribe(&self, subscriber: &Subscriber) {
    {
      let mut inner = self.inner.rc_deref_mut();
      inner.subscribers.retain(|s| !s.ptr_eq(subscriber));
    }
    self.maybe_detach();
  }

  /// Install the owner-supplied detach callback. Invoked at most once, when
  /// the topic has no subscribers and a vacant value.
  pub(crate) fn set_detach(&self, f: impl FnOnce() + 'static) {
    self.inner.rc_deref_mut().on_detach = Some(Box::new(f));
  }

  fn maybe_detach(&self) {
    let callback = {
      let mut inner = self.inner.rc_deref_mut();
      if inner.subscribers.is_empty() && inner.value.is_vacant() {
        inner.on_detach.take()
      } else {
        None
      }
    };
    if let Some(callback) = callback {
      callback();
    }
  }

  /// Type-erased handle for heterogeneous dependency sets.
  pub(crate) fn erased(&self) -> DynTopic { DynTopic(Rc::new(self.clone())) }
}

// ============================================================================
// Type-erased topics
// ============================================================================

trait ErasedTopic {
  fn subscribe(&self, subscriber: &Subscriber);
  fn unsubscribe(&self, subscriber: &Subscriber);
  fn topic_key(&self) -> usize;
}

impl<T: PartialEq + Vacant + 'static> ErasedTopic for Topic<T> {
  fn subscribe(&self, subscriber: &Subscriber) { Topic::subscribe(self, subscriber) }

  fn unsubscribe(&self, subscriber: &Subscriber) { Topic::unsubscribe(self, subscriber) }

  fn topic_key(&self) -> usize { self.ptr_key() }
}

/// A [`Topic`] with its value type erased: just enough surface for a
/// [`Subscriber`] to hold a dependency on it.
#[derive(Clone)]
pub struct DynTopic(Rc<dyn ErasedTopic>);

impl DynTopic {
  #[inline]
  pub(crate) fn subscribe(&self, subscriber: &Subscriber) { self.0.subscribe(subscriber) }

  #[inline]
  pub(crate) fn unsubscribe(&self, subscriber: &Subscriber) { self.0.unsubscribe(subscriber) }

  /// Identity of the underlying cell.
  #[inline]
  pub(crate) fn key(&self) -> usize { self.0.topic_key() }
}
