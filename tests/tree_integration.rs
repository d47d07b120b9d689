//! Integration tests for the reactive state tree.
//!
//! Exercises the end-to-end behavior: structural updates waking exactly the
//! dependents of what changed, key-set bookkeeping, kind transitions,
//! validation, storage reclamation, and chained update rounds.

use std::{cell::RefCell, rc::Rc};

use float_cmp::approx_eq;
use rxtree::prelude::*;

/// An effect that records every value it sees for `target`. The first entry
/// is the initial run, so `seen.len() - 1` is the notification count.
fn watch_values(target: &StateRef) -> (Effect, Rc<RefCell<Vec<Value>>>) {
  let seen = Rc::new(RefCell::new(Vec::new()));
  let effect = Effect::new({
    let target = target.clone();
    let seen = seen.clone();
    move |cx| seen.borrow_mut().push(target.watch(cx))
  });
  (effect, seen)
}

#[test]
fn round_trips_structural_values() {
  let value = record! {
    "title" => "groceries",
    "done" => false,
    "price" => 2.5,
    "items" => array!["milk", record! { "name" => "eggs", "count" => 12 }],
    "empty_record" => record! {},
    "empty_array" => array![],
  };
  let state = create_state(value.clone()).unwrap();
  assert_eq!(state.read(), value);

  let price = state.get("price").read();
  let Value::Number(price) = price else { panic!("price is not a number") };
  assert!(approx_eq!(f64, price, 2.5));

  assert_eq!(
    state.get("items").at(1).get("name").read(),
    Value::from("eggs")
  );
}

#[test]
fn second_identical_update_is_silent() {
  let value = record! { "a" => record! { "x" => 1 }, "b" => array![1, 2] };
  let state = create_state(value.clone()).unwrap();

  let (_root_watch, root_seen) = watch_values(&state);
  let (_leaf_watch, leaf_seen) = watch_values(&state.get("a").get("x"));
  let sizes = Rc::new(RefCell::new(Vec::new()));
  let _size_watch = Effect::new({
    let b = state.get("b");
    let sizes = sizes.clone();
    move |cx| sizes.borrow_mut().push(b.watch_size(cx))
  });

  // applying the exact same value again must not notify anybody
  state.update(value).unwrap();

  assert_eq!(root_seen.borrow().len(), 1);
  assert_eq!(leaf_seen.borrow().len(), 1);
  assert_eq!(*sizes.borrow(), vec![2]);
}

#[test]
fn structural_update_wakes_only_what_changed() {
  let state = create_state(record! {
    "a" => record! { "x" => 1, "y" => 2 },
    "b" => 3,
  })
  .unwrap();

  let (_ax, ax_seen) = watch_values(&state.get("a").get("x"));
  let (_ay, ay_seen) = watch_values(&state.get("a").get("y"));
  let (_a, a_seen) = watch_values(&state.get("a"));
  let (_b, b_seen) = watch_values(&state.get("b"));

  // replace the whole tree; only a.y actually differs
  state
    .update(record! {
      "a" => record! { "x" => 1, "y" => 9 },
      "b" => 3,
    })
    .unwrap();

  // a.y and its containing subtree re-ran...
  assert_eq!(ay_seen.borrow().len(), 2);
  assert_eq!(ay_seen.borrow().last(), Some(&Value::from(9)));
  assert_eq!(a_seen.borrow().len(), 2);
  // ...while the untouched positions stayed asleep
  assert_eq!(ax_seen.borrow().len(), 1);
  assert_eq!(b_seen.borrow().len(), 1);
}

#[test]
fn size_dependents_ignore_child_value_changes() {
  let state = create_state(array![1, 2, 3]).unwrap();

  let sizes = Rc::new(RefCell::new(Vec::new()));
  let _size_watch = Effect::new({
    let state = state.clone();
    let sizes = sizes.clone();
    move |cx| sizes.borrow_mut().push(state.watch_size(cx))
  });
  assert_eq!(*sizes.borrow(), vec![3]);

  // element value changes do not touch the key set
  state.at(1).update(9).unwrap();
  state.update(array![1, 9, 7]).unwrap();
  assert_eq!(*sizes.borrow(), vec![3]);

  // a count change does
  state.update(array![1, 9, 7, 4]).unwrap();
  assert_eq!(*sizes.borrow(), vec![3, 4]);

  state.remove_key("3");
  assert_eq!(*sizes.borrow(), vec![3, 4, 3]);
  assert_eq!(state.read(), array![1, 9, 7]);
}

#[test]
fn removing_a_key_empties_its_subtree() {
  let state = create_state(record! { "a" => 1, "b" => 2 }).unwrap();

  state.remove_key("a");

  assert_eq!(state.read_keys(), vec!["b".to_owned()]);
  assert_eq!(state.read_size(), 1);
  assert_eq!(state.get("a").read_kind(), Kind::Empty);
  assert_eq!(state.read(), record! { "b" => 2 });
}

#[test]
fn kind_transitions_are_observable() {
  let state = create_state(record! { "v" => 5 }).unwrap();

  let kinds = Rc::new(RefCell::new(Vec::new()));
  let _kind_watch = Effect::new({
    let v = state.get("v");
    let kinds = kinds.clone();
    move |cx| kinds.borrow_mut().push(v.watch_kind(cx))
  });
  assert_eq!(*kinds.borrow(), vec![Kind::Atomic]);

  state.get("v").update(record! { "x" => 1 }).unwrap();
  state.get("v").update(array![1]).unwrap();
  state.get("v").update(7).unwrap();
  state.get("v").update(()).unwrap();

  assert_eq!(
    *kinds.borrow(),
    vec![Kind::Atomic, Kind::Object, Kind::Array, Kind::Atomic, Kind::Empty]
  );
}

#[test]
fn rejected_update_neither_mutates_nor_notifies() {
  let state = create_state(record! { "n" => 1 }).unwrap();
  let (_watch, seen) = watch_values(&state);
  let before = state.read();

  let result = state.update(record! { "n" => 2, "bad" => f64::NAN });
  assert!(matches!(result, Err(InvalidValue::NonFiniteNumber(_))));

  // all-or-nothing: even the valid "n" part was not applied
  assert_eq!(state.read(), before);
  assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn emptied_and_unobserved_storage_is_reclaimed() {
  let state = create_state(record! { "outer" => record! { "inner" => 1 } }).unwrap();

  let (watch, seen) = watch_values(&state.get("outer").get("inner"));
  assert_eq!(*seen.borrow(), vec![Value::from(1)]);

  state.get("outer").update(()).unwrap();
  assert_eq!(seen.borrow().last(), Some(&Value::Empty));
  assert_eq!(state.read_keys(), Vec::<String>::new());

  // once the last watcher leaves, nothing of the old subtree survives:
  // re-creation starts from a pristine position
  drop(watch);
  state.get("outer").get("inner").update(2).unwrap();
  assert_eq!(
    state.read(),
    record! { "outer" => record! { "inner" => 2 } }
  );
  assert_eq!(state.get("outer").read_keys(), vec!["inner".to_owned()]);
}

#[test]
fn updates_from_reactions_run_in_the_next_round() {
  let state = create_state(record! { "a" => 1, "b" => 0 }).unwrap();
  let order = Rc::new(RefCell::new(Vec::new()));

  let _b_watch = Effect::new({
    let b = state.get("b");
    let order = order.clone();
    move |cx| {
      let value = b.watch(cx);
      order.borrow_mut().push(format!("b={value:?}"));
    }
  });
  let _a_watch = Effect::new({
    let state = state.clone();
    let order = order.clone();
    move |cx| {
      let value = state.get("a").watch(cx);
      order.borrow_mut().push(format!("a={value:?}"));
      if let Value::Number(n) = value {
        // a mutation performed by a reaction: delivered next round
        state.get("b").update(n * 2.0).unwrap();
      }
      order.borrow_mut().push("a done".to_owned());
    }
  });

  order.borrow_mut().clear();
  state.get("a").update(5).unwrap();

  // the whole a-reaction completes before b's queued round runs
  assert_eq!(
    *order.borrow(),
    vec![
      "a=Number(5.0)".to_owned(),
      "a done".to_owned(),
      "b=Number(10.0)".to_owned(),
    ]
  );
  assert_eq!(state.get("b").read(), Value::from(10.0));
}

#[test]
fn a_read_through_a_missing_key_sees_its_appearance() {
  let state = create_state(record! { "a" => 1 }).unwrap();

  let (_watch, seen) = watch_values(&state.get("missing"));
  assert_eq!(*seen.borrow(), vec![Value::Empty]);

  state.get("missing").update(42).unwrap();

  assert_eq!(
    *seen.borrow(),
    vec![Value::Empty, Value::from(42)]
  );
  assert_eq!(
    state.read_keys(),
    vec!["a".to_owned(), "missing".to_owned()]
  );
}

#[test]
fn a_read_below_a_leaf_sees_the_reshape() {
  let state = create_state(record! { "a" => 5 }).unwrap();

  let (_watch, seen) = watch_values(&state.get("a").get("b"));
  assert_eq!(*seen.borrow(), vec![Value::Empty]);

  // writing through the leaf turns it into a branch; the watcher re-walks
  state.get("a").get("b").update(7).unwrap();
  assert_eq!(seen.borrow().last(), Some(&Value::from(7)));
  assert_eq!(state.get("a").read_kind(), Kind::Object);
}

#[test]
fn torn_down_watchers_stop_receiving() {
  let state = create_state(record! { "n" => 1 }).unwrap();
  let (watch, seen) = watch_values(&state.get("n"));

  state.get("n").update(2).unwrap();
  assert_eq!(seen.borrow().len(), 2);

  drop(watch);
  state.get("n").update(3).unwrap();
  assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn equal_references_are_interchangeable() {
  let state = create_state(record! {}).unwrap();
  let first = state.get("a").get("b");
  let second = state.get("a").get("b");

  first.update(1).unwrap();
  assert_eq!(second.read(), Value::from(1));

  let (_watch, seen) = watch_values(&second);
  first.update(2).unwrap();
  assert_eq!(*seen.borrow(), vec![Value::from(1), Value::from(2)]);
}

#[test]
fn callables_are_stored_by_identity() {
  let greet = Callable::new(|| Value::from("hi"));
  let state = create_state(record! { "cb" => greet.clone() }).unwrap();

  let (_watch, seen) = watch_values(&state.get("cb"));
  assert_eq!(seen.borrow().len(), 1);

  // the same handle again: no change
  state.get("cb").update(greet.clone()).unwrap();
  assert_eq!(seen.borrow().len(), 1);

  // a fresh callable, even if behaviorally identical, is a new value
  state
    .get("cb")
    .update(Callable::new(|| Value::from("hi")))
    .unwrap();
  assert_eq!(seen.borrow().len(), 2);

  let Value::Callable(stored) = state.get("cb").read() else {
    panic!("cb is not callable")
  };
  assert_eq!(stored.call(), Value::from("hi"));
}
