//! Shared ordered sequences that taps mutate in place.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

/// An ordered sequence shared by every holder of a handle.
///
/// Cloning an `ObservableList` clones the handle, not the items: a mutation
/// through any clone is visible through all of them immediately. Every
/// operation is synchronous, and the lock is released before it returns, so
/// callers never observe a half-applied mutation.
///
/// The list emits no events of its own. How mutations from different taps
/// interleave is decided by the kind of hook those taps run under; read
/// [`snapshot`](Self::snapshot) after the call completes for the
/// authoritative contents.
///
/// # Example
///
/// ```
/// use tapwork_hook::ObservableList;
///
/// let warnings = ObservableList::from(vec!["W0"]);
/// let seen_by_tap = warnings.clone();
///
/// seen_by_tap.pop_front();
/// seen_by_tap.push_front("W1");
///
/// assert_eq!(warnings.snapshot(), vec!["W1"]);
/// ```
pub struct ObservableList<T> {
    items: Arc<Mutex<VecDeque<T>>>,
}

impl<T> ObservableList<T> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Appends an item at the end.
    pub fn push_back(&self, item: T) {
        self.items.lock().push_back(item);
    }

    /// Inserts an item at the front.
    pub fn push_front(&self, item: T) {
        self.items.lock().push_front(item);
    }

    /// Removes and returns the first item.
    pub fn pop_front(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Removes and returns the last item.
    pub fn pop_back(&self) -> Option<T> {
        self.items.lock().pop_back()
    }

    /// Removes `delete_count` items starting at `start` and inserts `items`
    /// in their place. Returns the removed items.
    ///
    /// `start` past the end appends; `delete_count` is clamped to the items
    /// available.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        items: impl IntoIterator<Item = T>,
    ) -> Vec<T> {
        let inserted: Vec<T> = items.into_iter().collect();

        let mut list = self.items.lock();
        let start = start.min(list.len());
        let end = start + delete_count.min(list.len() - start);
        let removed: Vec<T> = list.drain(start..end).collect();

        let tail = list.split_off(start);
        list.extend(inserted);
        list.extend(tail);
        removed
    }

    /// Removes every item and returns them in order.
    pub fn take(&self) -> Vec<T> {
        self.items.lock().drain(..).collect()
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns true if the list holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Returns true if both handles refer to the same list.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

impl<T: Clone> ObservableList<T> {
    /// Copies the current contents in order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.items.lock().iter().cloned().collect()
    }

    /// Returns a copy of the first item.
    #[must_use]
    pub fn front(&self) -> Option<T> {
        self.items.lock().front().cloned()
    }

    /// Returns a copy of the last item.
    #[must_use]
    pub fn back(&self) -> Option<T> {
        self.items.lock().back().cloned()
    }
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for ObservableList<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            items: Arc::new(Mutex::new(items.into())),
        }
    }
}

impl<T> FromIterator<T> for ObservableList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: Arc::new(Mutex::new(iter.into_iter().collect())),
        }
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.items.lock().iter()).finish()
    }
}
