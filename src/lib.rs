//! # rxtree: a fine-grained reactive state tree
//!
//! Store an arbitrarily nested value, hand out lazy references into it, and
//! let every observer depend on exactly the sub-parts it reads. After an
//! update, only the observers whose sub-parts actually changed are
//! notified: no manual dependency declarations, no whole-tree re-renders.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxtree::prelude::*;
//!
//! let todos = create_state(record! {
//!   "title" => "groceries",
//!   "items" => array!["milk", "eggs"],
//! })
//! .unwrap();
//!
//! // lazy references: addresses, not data
//! let title = todos.get("title");
//! let items = todos.get("items");
//!
//! // a tracked computation re-runs only when what it read changes
//! let effect = Effect::new({
//!   let title = title.clone();
//!   move |cx| {
//!     println!("title is now {:?}", title.watch(cx));
//!   }
//! });
//!
//! items.at(0).update("oat milk").unwrap(); // effect stays asleep
//! title.update("errands").unwrap(); // effect re-runs
//! drop(effect);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`StateRef`] | A lazy address into the tree plus every read/write operation |
//! | [`Value`] / [`Kind`] | What the tree stores and how a position classifies |
//! | [`Effect`] / [`Track`] | A tracked computation and its dependency collector |
//! | [`Subscriber`] | The low-level reaction + dependency-set pair |
//! | [`ValueStream`] | A `futures` stream of a subtree's values |
//!
//! Change detection is equality-based and structural updates are diffed:
//! writing a whole new tree only wakes the dependents of positions whose
//! values differ. Mutations are synchronous and notifications are flushed
//! in deduplicated rounds after the mutation completes; a reaction that
//! mutates again is delivered in the next round, never re-entrantly.
//!
//! [`StateRef`]: state::StateRef
//! [`Value`]: value::Value
//! [`Kind`]: value::Kind
//! [`Effect`]: effect::Effect
//! [`Track`]: effect::Track
//! [`Subscriber`]: subscriber::Subscriber
//! [`ValueStream`]: stream::ValueStream

pub mod effect;
pub mod error;
mod flush;
mod node;
mod path;
pub mod prelude;
pub mod rc;
pub mod state;
pub mod stream;
pub mod subscriber;
pub mod topic;
pub mod value;

// Re-export the prelude module
pub use prelude::*;
