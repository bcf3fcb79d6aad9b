#![forbid(unsafe_code)]

//! The observable, versioned value cell and its mutation algorithm.
//!
//! # Design
//!
//! [`Prop<T>`] wraps its state in shared, reference-counted storage
//! (`Rc<RefCell<..>>`). Cloning a `Prop` creates a new handle to the **same**
//! cell; this is what lets a change event carry a live reference back to its
//! source. Every mutation entry point converges on one canonical operation,
//! [`Prop::assign`], which runs the four-step algorithm: snapshot the
//! displaced state into history, capture the previous value, overwrite the
//! current state, then fan out to listeners.
//!
//! # Invariants
//!
//! 1. History records the *pre-mutation* state, and only when the cell was
//!    already set; the first mutation produces no entry.
//! 2. Listener fan-out runs against a snapshot of the registry, most
//!    recently registered first. Registry edits inside a callback do not
//!    affect the in-flight dispatch.
//! 3. Fan-out begins only after the cell's state is fully updated, with no
//!    interior borrow held, so a callback may read or re-enter `assign` on
//!    the same cell.
//! 4. `set_id` and `set_owner` never record history and never notify.
//!
//! # Failure Modes
//!
//! - **Listener panic**: not caught. The panic unwinds to the caller of the
//!   mutating method and listeners later in the fan-out do not run. The
//!   cell's own state is already fully updated at that point.
//! - **Unbounded history**: a recording cell keeps every displaced value for
//!   its lifetime. Callers owning high-churn fields should construct with
//!   recording disabled.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::trace;
use uuid::Uuid;

use crate::event::PropChanged;
use crate::version::Version;

/// Sentinel for "never modified". Kept as a plain integer rather than an
/// `Option` so it round-trips unchanged through consumers that persist
/// timestamps as raw epoch milliseconds.
pub const UNSET_TIMESTAMP: i64 = -1;

/// A listener callback, stored strongly in registration order.
type ListenerRc<T> = Rc<dyn Fn(&PropChanged<T>)>;

/// Identifies one listener registration for later removal.
///
/// Handles are unique per cell for its lifetime; removing a registration
/// does not recycle its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

/// Interior state shared by all handles to one cell.
struct PropInner<T> {
    id: Uuid,
    /// Untyped, non-owning back-reference to whatever composed this cell.
    /// Never upgraded or inspected here.
    owner: Option<Weak<dyn Any>>,
    value: Option<T>,
    is_set: bool,
    last_modified: i64,
    last_modified_by: Option<String>,
    record_history: bool,
    /// `Some` iff `record_history`; "disabled" stays distinguishable from
    /// "recording but nothing displaced yet".
    history: Option<Vec<Version<T>>>,
    listeners: Vec<(ListenerHandle, ListenerRc<T>)>,
    next_listener_id: u64,
}

/// A typed, observable, versioned value holder for one field of a domain
/// object.
///
/// Tracks the current value, whether the cell has ever been set, the
/// timestamp and author of the most recent change, an optional append-only
/// history of displaced values, and a registry of synchronous change
/// listeners.
pub struct Prop<T> {
    inner: Rc<RefCell<PropInner<T>>>,
}

// Manual Clone: shares the same cell.
impl<T> Clone for Prop<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Prop<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Prop")
            .field("id", &inner.id)
            .field("value", &inner.value)
            .field("is_set", &inner.is_set)
            .field("last_modified", &inner.last_modified)
            .field("listener_count", &inner.listeners.len())
            .finish_non_exhaustive()
    }
}

impl<T: Clone + 'static> Default for Prop<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Prop<T> {
    /// Create an unset cell with history recording enabled and no owner.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a cell seeded with an initial value.
    ///
    /// Seeding marks the cell as set but records no history entry and fires
    /// no notification; the seed is the baseline, not an edit.
    #[must_use]
    pub fn seeded(value: T) -> Self {
        Self::builder().value(value).build()
    }

    /// Start building a cell with non-default construction options.
    #[must_use]
    pub fn builder() -> PropBuilder<T> {
        PropBuilder::new()
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Get a clone of the current value, or `None` while unset (or after an
    /// explicit absent assignment).
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.inner.borrow().value.clone()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.inner.borrow().value.as_ref())
    }

    /// True once any mutation has occurred (or a value was seeded at
    /// construction). Never reverts to false.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.inner.borrow().is_set
    }

    /// Epoch-millisecond timestamp of the most recent mutation, or
    /// [`UNSET_TIMESTAMP`] before the first one. Stored exactly as supplied
    /// by the caller; backdated or out-of-order stamps are accepted as-is.
    #[must_use]
    pub fn last_modified(&self) -> i64 {
        self.inner.borrow().last_modified
    }

    /// Identifier of whoever performed the most recent mutation, if the
    /// mutation supplied one.
    #[must_use]
    pub fn last_modified_by(&self) -> Option<String> {
        self.inner.borrow().last_modified_by.clone()
    }

    /// Whether this cell was constructed with history recording.
    #[must_use]
    pub fn records_history(&self) -> bool {
        self.inner.borrow().record_history
    }

    /// A defensive copy of the displaced-value history, oldest first, or
    /// `None` when this cell was constructed with recording disabled.
    ///
    /// `None` means "history disabled"; a recording cell that has displaced
    /// nothing yet returns `Some` of an empty sequence.
    #[must_use]
    pub fn history(&self) -> Option<Vec<Version<T>>> {
        self.inner.borrow().history.clone()
    }

    /// Number of currently registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    // ------------------------------------------------------------------
    // Identity metadata (silent: no history, no notification)
    // ------------------------------------------------------------------

    /// Unique identifier of this cell, generated at construction.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.inner.borrow().id
    }

    /// Reassign the identifier. A metadata edit only: no history entry, no
    /// notification.
    pub fn set_id(&self, id: Uuid) {
        self.inner.borrow_mut().id = id;
    }

    /// The untyped back-reference to whatever composed this cell, if one
    /// was provided. The cell itself never upgrades it.
    #[must_use]
    pub fn owner(&self) -> Option<Weak<dyn Any>> {
        self.inner.borrow().owner.clone()
    }

    /// Reassign the owner back-reference. A metadata edit only: no history
    /// entry, no notification.
    pub fn set_owner(&self, owner: Option<Weak<dyn Any>>) {
        self.inner.borrow_mut().owner = owner;
    }

    // ------------------------------------------------------------------
    // Mutation family
    // ------------------------------------------------------------------

    /// Store a new value, stamped with the current wall-clock time and no
    /// author.
    pub fn set(&self, value: T) {
        self.assign(Some(value), None, None);
    }

    /// Store a new value on behalf of `author`, stamped with the current
    /// wall-clock time.
    pub fn set_by(&self, value: T, author: impl Into<String>) {
        self.assign(Some(value), Some(author.into()), None);
    }

    /// Store a new value with an explicit timestamp and no author.
    pub fn set_at(&self, value: T, timestamp: i64) {
        self.assign(Some(value), None, Some(timestamp));
    }

    /// Store a new value with explicit author and timestamp.
    pub fn set_audited(&self, value: T, author: impl Into<String>, timestamp: i64) {
        self.assign(Some(value), Some(author.into()), Some(timestamp));
    }

    /// The canonical mutation operation; every `set` variant converges here.
    ///
    /// A `None` timestamp means "now". Passing `None` for the value is a
    /// real mutation, unlike an absent value at construction: it marks the
    /// cell as set, snapshots the displaced state into history (when
    /// recording and already set), and notifies listeners.
    ///
    /// Listeners run most recently registered first, against a snapshot of
    /// the registry, after the cell's state is fully updated and with no
    /// interior borrow held. A listener panic unwinds to the caller and
    /// aborts the remaining fan-out.
    pub fn assign(&self, value: Option<T>, author: Option<String>, timestamp: Option<i64>) {
        let timestamp = timestamp.unwrap_or_else(now_millis);

        let (id, previous, current, fanout) = {
            let mut inner = self.inner.borrow_mut();

            if inner.record_history && inner.is_set {
                let displaced = Version::new(
                    inner.value.clone(),
                    inner.last_modified,
                    inner.last_modified_by.clone(),
                );
                if let Some(history) = inner.history.as_mut() {
                    history.push(displaced);
                }
            }

            let previous = inner.value.take();
            inner.value = value;
            inner.is_set = true;
            inner.last_modified = timestamp;
            inner.last_modified_by = author;

            let fanout: Vec<ListenerRc<T>> = inner
                .listeners
                .iter()
                .map(|(_, listener)| Rc::clone(listener))
                .collect();
            (inner.id, previous, inner.value.clone(), fanout)
        };

        trace!(prop = %id, timestamp, listeners = fanout.len(), "value stored");

        if !fanout.is_empty() {
            let event = PropChanged::new(self.clone(), current, previous);
            for listener in fanout.iter().rev() {
                listener(&event);
            }
        }
    }

    // ------------------------------------------------------------------
    // Listener registry
    // ------------------------------------------------------------------

    /// Register a change listener. Listeners are notified on every mutation,
    /// most recently registered first.
    ///
    /// Returns a handle identifying this registration for
    /// [`remove_listener`](Self::remove_listener).
    pub fn add_listener(&self, listener: impl Fn(&PropChanged<T>) + 'static) -> ListenerHandle {
        let mut inner = self.inner.borrow_mut();
        let handle = ListenerHandle(inner.next_listener_id);
        inner.next_listener_id += 1;
        inner.listeners.push((handle, Rc::new(listener)));
        trace!(prop = %inner.id, listeners = inner.listeners.len(), "listener added");
        handle
    }

    /// Remove the registration identified by `handle`. Returns false when no
    /// such registration exists (already removed, or from another cell).
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        let mut inner = self.inner.borrow_mut();
        match inner.listeners.iter().position(|(h, _)| *h == handle) {
            Some(index) => {
                inner.listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drop every registered listener.
    pub fn remove_all_listeners(&self) {
        self.inner.borrow_mut().listeners.clear();
    }
}

/// Current wall-clock time in epoch milliseconds. Degrades to the unset
/// sentinel rather than panicking if the clock reports a pre-epoch time.
fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|elapsed| i64::try_from(elapsed.as_millis()).ok())
        .unwrap_or(UNSET_TIMESTAMP)
}

/// Builder covering the construction options: seeded value, owner
/// back-reference, history recording, and audit metadata for re-hydrating a
/// cell from previously persisted data without it looking like a live edit.
pub struct PropBuilder<T> {
    owner: Option<Weak<dyn Any>>,
    value: Option<T>,
    record_history: bool,
    author: Option<String>,
    timestamp: i64,
}

impl<T: Clone + 'static> Default for PropBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> PropBuilder<T> {
    fn new() -> Self {
        Self {
            owner: None,
            value: None,
            record_history: true,
            author: None,
            timestamp: UNSET_TIMESTAMP,
        }
    }

    /// Seed an initial value. Marks the cell as set without recording a
    /// history entry or firing a notification.
    #[must_use]
    pub fn value(mut self, value: T) -> Self {
        self.value = Some(value);
        self
    }

    /// Attach a non-owning back-reference to the composing structure.
    #[must_use]
    pub fn owner(mut self, owner: Weak<dyn Any>) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Enable or disable history recording. Fixed for the cell's lifetime;
    /// defaults to enabled.
    #[must_use]
    pub fn record_history(mut self, record: bool) -> Self {
        self.record_history = record;
        self
    }

    /// Author to carry as the seed's audit metadata. It surfaces in the
    /// history entry recorded when the seed is later displaced.
    #[must_use]
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Timestamp to carry as the seed's audit metadata. Defaults to the
    /// unset sentinel; seeding never stamps wall-clock time on its own.
    #[must_use]
    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn build(self) -> Prop<T> {
        let is_set = self.value.is_some();
        Prop {
            inner: Rc::new(RefCell::new(PropInner {
                id: Uuid::new_v4(),
                owner: self.owner,
                value: self.value,
                is_set,
                last_modified: self.timestamp,
                last_modified_by: self.author,
                record_history: self.record_history,
                history: self.record_history.then(Vec::new),
                listeners: Vec::new(),
                next_listener_id: 0,
            })),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
