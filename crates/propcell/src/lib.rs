#![forbid(unsafe_code)]

//! Observable, versioned, audit-stamped value cells.
//!
//! # Role
//! `propcell` provides a single primitive, [`Prop<T>`]: a typed value holder
//! meant to model one field of a domain object. Each cell tracks whether it
//! has ever been set, who changed it last and when, an append-only history of
//! displaced values, and a registry of synchronous change listeners.
//!
//! # Primary pieces
//! - [`Prop`]: the mutable cell and its canonical mutation algorithm.
//! - [`Version`]: an immutable snapshot of a prior (value, timestamp, author)
//!   state, handed out through [`Prop::history`].
//! - [`PropChanged`]: the one-shot notification payload delivered to
//!   listeners on every mutation.
//!
//! # Invariants
//! 1. `is_set()` is true iff at least one mutation has stored a value (or a
//!    value was seeded at construction); it never reverts to false.
//! 2. A history snapshot is recorded only when a mutation displaces an
//!    already-set value, and always from the pre-mutation state.
//! 3. Listeners fire after the cell's state is fully updated, most recently
//!    registered first, against a snapshot of the registry taken at dispatch
//!    time.
//! 4. Id and owner edits are silent: no history entry, no notification.
//!
//! # Concurrency
//! Cells are `Rc`-backed and single-threaded by construction. Every mutation
//! runs to completion (history, state, listener fan-out) before the `set`
//! call returns. Re-entrant mutation from inside a listener callback is
//! permitted; the dispatch loop holds no interior borrow.

pub mod event;
pub mod prop;
pub mod version;

pub use event::PropChanged;
pub use prop::{ListenerHandle, Prop, PropBuilder, UNSET_TIMESTAMP};
pub use version::Version;
