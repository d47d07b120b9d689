//! The tracked-read observation site.
//!
//! [`Track`] is the explicit dependency collector a tracked computation
//! receives: every `watch*` call on a [`StateRef`](crate::state::StateRef)
//! deposits the topics it visited. [`Effect`] is the complete observation
//! lifecycle over one [`Subscriber`]: run the computation now, swap in the
//! collected set, and repeat on every notification until dropped.
//!
//! A host framework with its own scheduling can skip `Effect` and drive the
//! same cycle by hand: build a `Track`, run the computation, and hand
//! [`Track::finish`] to [`Subscriber::resubscribe`].

use std::cell::RefCell;

use crate::{subscriber::Subscriber, topic::DynTopic};

/// Collects the topics one tracked computation depends on.
#[derive(Default)]
pub struct Track {
  topics: RefCell<Vec<DynTopic>>,
}

impl Track {
  pub fn new() -> Self { Self::default() }

  pub(crate) fn collect(&self, topics: Vec<DynTopic>) {
    self.topics.borrow_mut().extend(topics);
  }

  /// The gathered dependency set, ready for
  /// [`Subscriber::resubscribe`](crate::subscriber::Subscriber::resubscribe).
  pub fn finish(self) -> Vec<DynTopic> { self.topics.into_inner() }
}

/// A self-re-running tracked computation.
///
/// The reaction runs once on construction and again after every flush round
/// in which one of its dependencies changed; each run replaces the whole
/// dependency set, since the computation may have read a different shape.
/// Dropping the effect tears the subscription down.
pub struct Effect {
  subscriber: Subscriber,
}

impl Effect {
  pub fn new(mut reaction: impl FnMut(&Track) + 'static) -> Self {
    let subscriber = Subscriber::deferred();
    // the reaction owns only a weak handle, so dropping the Effect is the
    // single owner of the subscription
    let weak = subscriber.downgrade();
    subscriber.set_reaction(move || {
      let Some(subscriber) = weak.upgrade() else { return };
      let track = Track::new();
      reaction(&track);
      subscriber.resubscribe(track.finish());
    });
    let effect = Effect { subscriber };
    effect.subscriber.run();
    effect
  }

  pub fn is_active(&self) -> bool { self.subscriber.is_active() }

  /// Explicit teardown; dropping the effect does the same.
  pub fn unsubscribe(self) {}
}

impl Drop for Effect {
  fn drop(&mut self) { self.subscriber.teardown(); }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    flush::{Changes, Hub},
    rc::{MutRc, RcDeref, RcDerefMut},
    topic::Topic,
  };

  #[test]
  fn effect_runs_immediately_and_on_notification() {
    let topic = Topic::new(Some(1));
    let runs = MutRc::own(0);

    let effect = {
      let topic = topic.clone();
      let runs = runs.clone();
      Effect::new(move |cx| {
        *runs.rc_deref_mut() += 1;
        cx.collect(vec![topic.erased()]);
      })
    };
    assert_eq!(*runs.rc_deref(), 1);
    assert_eq!(topic.subscriber_count(), 1);

    let mut changes = Changes::new();
    topic.set(Some(2), &mut changes);
    Hub::new().deliver(changes);
    assert_eq!(*runs.rc_deref(), 2);

    drop(effect);
    assert_eq!(topic.subscriber_count(), 0);
  }

  #[test]
  fn dropped_effect_stops_reacting() {
    let topic = Topic::new(Some(1));
    let runs = MutRc::own(0);

    let effect = {
      let topic = topic.clone();
      let runs = runs.clone();
      Effect::new(move |cx| {
        *runs.rc_deref_mut() += 1;
        cx.collect(vec![topic.erased()]);
      })
    };
    assert!(effect.is_active());
    effect.unsubscribe();

    let mut changes = Changes::new();
    topic.set(Some(2), &mut changes);
    Hub::new().deliver(changes);
    assert_eq!(*runs.rc_deref(), 1);
  }

  #[test]
  fn dependency_set_follows_the_computation() {
    let gate = Topic::new(Some(true));
    let a = Topic::new(Some(1));
    let b = Topic::new(Some(2));

    let _effect = {
      let (gate, a, b) = (gate.clone(), a.clone(), b.clone());
      Effect::new(move |cx| {
        let open = gate.get() == Some(true);
        cx.collect(vec![gate.erased()]);
        if open {
          cx.collect(vec![a.erased()]);
        } else {
          cx.collect(vec![b.erased()]);
        }
      })
    };
    assert_eq!(a.subscriber_count(), 1);
    assert_eq!(b.subscriber_count(), 0);

    let mut changes = Changes::new();
    gate.set(Some(false), &mut changes);
    Hub::new().deliver(changes);
    assert_eq!(a.subscriber_count(), 0);
    assert_eq!(b.subscriber_count(), 1);
  }
}
