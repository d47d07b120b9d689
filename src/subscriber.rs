//! A reaction bound to a replaceable set of topics.
//!
//! One [`Subscriber`] lives per long-lived observation site. Every time its
//! reaction runs, the dependency set may have changed shape, so the whole
//! set is swapped with [`resubscribe`](Subscriber::resubscribe) rather than
//! patched.

use smallvec::SmallVec;

use crate::{
  rc::{MutRc, RcDeref, RcDerefMut, WeakRc},
  topic::DynTopic,
};

/// A reaction plus the topics it currently depends on.
///
/// Clones share the same state; identity is the shared cell, which is also
/// how topics and the flush loop deduplicate.
pub struct Subscriber {
  inner: MutRc<SubscriberInner>,
}

struct SubscriberInner {
  reaction: Option<Box<dyn FnMut()>>,
  deps: Vec<DynTopic>,
  active: bool,
}

impl Clone for Subscriber {
  #[inline]
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl Subscriber {
  pub fn new(reaction: impl FnMut() + 'static) -> Self {
    let subscriber = Self::deferred();
    subscriber.set_reaction(reaction);
    subscriber
  }

  /// A subscriber without a reaction yet; used where the reaction needs a
  /// handle to the subscriber it belongs to.
  pub(crate) fn deferred() -> Self {
    Subscriber {
      inner: MutRc::own(SubscriberInner { reaction: None, deps: Vec::new(), active: true }),
    }
  }

  pub(crate) fn set_reaction(&self, reaction: impl FnMut() + 'static) {
    self.inner.rc_deref_mut().reaction = Some(Box::new(reaction));
  }

  /// False once torn down; an inactive subscriber is skipped at flush time
  /// even if it was marked dirty earlier in the same round.
  pub fn is_active(&self) -> bool { self.inner.rc_deref().active }

  /// Swap the whole dependency set.
  ///
  /// New topics are subscribed before stale ones are unsubscribed, so a
  /// topic present in both sets never transits through zero subscribers
  /// (which could detach it mid-swap).
  pub fn resubscribe(&self, mut deps: Vec<DynTopic>) {
    let mut kept = SmallVec::<[usize; 8]>::new();
    deps.retain(|topic| {
      let key = topic.key();
      if kept.contains(&key) {
        false
      } else {
        kept.push(key);
        true
      }
    });

    for topic in &deps {
      topic.subscribe(self);
    }
    let stale = std::mem::replace(&mut self.inner.rc_deref_mut().deps, deps);
    for topic in &stale {
      if !kept.contains(&topic.key()) {
        topic.unsubscribe(self);
      }
    }
  }

  /// Deactivate, drop the reaction, and unsubscribe from everything.
  pub fn teardown(&self) {
    let deps = {
      let mut inner = self.inner.rc_deref_mut();
      if !inner.active {
        return;
      }
      inner.active = false;
      inner.reaction = None;
      std::mem::take(&mut inner.deps)
    };
    for topic in &deps {
      topic.unsubscribe(self);
    }
  }

  /// Invoke the reaction once. The reaction is free to call back into this
  /// subscriber (the usual re-subscription path), so it is taken out of the
  /// cell for the duration of the call.
  pub(crate) fn run(&self) {
    let reaction = {
      let mut inner = self.inner.rc_deref_mut();
      if !inner.active {
        return;
      }
      inner.reaction.take()
    };
    if let Some(mut reaction) = reaction {
      reaction();
      let mut inner = self.inner.rc_deref_mut();
      if inner.active {
        inner.reaction = Some(reaction);
      }
    }
  }

  #[inline]
  pub(crate) fn ptr_eq(&self, other: &Self) -> bool { self.inner.ptr_eq(&other.inner) }

  #[inline]
  pub(crate) fn downgrade(&self) -> WeakSubscriber { WeakSubscriber(self.inner.downgrade()) }
}

pub(crate) struct WeakSubscriber(WeakRc<SubscriberInner>);

impl WeakSubscriber {
  pub(crate) fn upgrade(&self) -> Option<Subscriber> {
    self.0.upgrade().map(|inner| Subscriber { inner })
  }
}
