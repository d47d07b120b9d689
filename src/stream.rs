//! Bridge from the tree's synchronous notifications to `futures` streams.
//!
//! [`StateRef::changes`] hands the subtree to async hosts: the current value
//! arrives immediately, then one value per flush round that touched the
//! subtree. Dropping the stream tears the backing subscription down and
//! ends the feed.

use std::{
  pin::Pin,
  task::{Context, Poll},
};

use futures::{channel::mpsc, Stream, StreamExt};
use pin_project_lite::pin_project;

use crate::{effect::Effect, state::StateRef, value::Value};

pin_project! {
  /// Extracted values of one subtree, behavior-subject style.
  pub struct ValueStream {
    #[pin]
    receiver: mpsc::UnboundedReceiver<Value>,
    // keeps the tracked subscription alive exactly as long as the stream
    _effect: Effect,
  }
}

impl Stream for ValueStream {
  type Item = Value;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Value>> {
    self.project().receiver.poll_next_unpin(cx)
  }
}

impl StateRef {
  /// A stream of this position's extracted value: the current value first,
  /// then one per mutation round that changed anything beneath it.
  ///
  /// ```rust
  /// use futures::{executor::block_on, StreamExt};
  /// use rxtree::prelude::*;
  ///
  /// let state = create_state(record! { "n" => 1 }).unwrap();
  /// let mut numbers = state.get("n").changes();
  ///
  /// state.get("n").update(2).unwrap();
  ///
  /// block_on(async {
  ///   assert_eq!(numbers.next().await, Some(Value::from(1)));
  ///   assert_eq!(numbers.next().await, Some(Value::from(2)));
  /// });
  /// ```
  pub fn changes(&self) -> ValueStream {
    let (sender, receiver) = mpsc::unbounded();
    let target = self.clone();
    let effect = Effect::new(move |cx| {
      // a closed receiver just means the stream side is gone first
      let _ = sender.unbounded_send(target.watch(cx));
    });
    ValueStream { receiver, _effect: effect }
  }
}
