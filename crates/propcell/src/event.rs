#![forbid(unsafe_code)]

//! One-shot change notification payload.

use std::fmt;

use crate::prop::Prop;

/// Notification delivered to each listener when a [`Prop`] mutates.
///
/// A fresh event is built for every dispatch and dropped when the fan-out
/// completes; the cell never stores it. Listeners that need the data beyond
/// the callback must copy it out.
pub struct PropChanged<T> {
    source: Prop<T>,
    value: Option<T>,
    previous: Option<T>,
}

impl<T> PropChanged<T> {
    pub(crate) fn new(source: Prop<T>, value: Option<T>, previous: Option<T>) -> Self {
        Self {
            source,
            value,
            previous,
        }
    }

    /// The cell that changed. Its state is fully updated by the time
    /// listeners run, so `get()` on it observes the new value.
    #[must_use]
    pub fn source(&self) -> &Prop<T> {
        &self.source
    }

    /// The newly stored value.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// The value that was displaced. Absent on the first mutation of an
    /// unseeded cell.
    #[must_use]
    pub fn previous_value(&self) -> Option<&T> {
        self.previous.as_ref()
    }
}

impl<T: fmt::Debug> fmt::Debug for PropChanged<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropChanged")
            .field("value", &self.value)
            .field("previous", &self.previous)
            .finish_non_exhaustive()
    }
}
