//! Lock-free, append-only event log
//!
//! Writers link a new node in front of the current tail with a
//! compare-and-swap retry loop; nothing is ever unlinked, so a reader that
//! loaded the tail can walk back to the start without synchronising with
//! writers. The walk yields newest-first, so [`AppendLog::snapshot`] reverses
//! it to restore insertion order.
//!
//! Memory grows for the lifetime of the log. Nodes are freed only when the
//! log itself is dropped.

use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

struct Node<T> {
    item: T,
    /// Previously appended node; null for the first one. Written only before
    /// the node is published.
    prev: *const Node<T>,
}

/// Multi-writer append-only log preserving insertion order
pub struct AppendLog<T> {
    tail: AtomicPtr<Node<T>>,
    len: AtomicUsize,
}

// SAFETY: items are moved in by `push` from any thread (needs `Send`) and
// shared by reference with concurrent `snapshot` callers (needs `Sync`).
unsafe impl<T: Send> Send for AppendLog<T> {}
unsafe impl<T: Send + Sync> Sync for AppendLog<T> {}

impl<T> AppendLog<T> {
    /// Create an empty log
    pub fn new() -> Self {
        Self {
            tail: AtomicPtr::new(ptr::null_mut()),
            len: AtomicUsize::new(0),
        }
    }

    /// Append an item
    ///
    /// Never blocks; under contention the CAS is retried until it wins.
    /// Concurrent pushes are ordered by the order their CAS succeeds.
    pub fn push(&self, item: T) {
        let node = Box::into_raw(Box::new(Node {
            item,
            prev: ptr::null(),
        }));

        let mut current = self.tail.load(Ordering::Acquire);
        loop {
            // SAFETY: `node` is not published yet, this thread owns it.
            unsafe {
                (*node).prev = current;
            }
            match self
                .tail
                .compare_exchange_weak(current, node, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        self.len.fetch_add(1, Ordering::Relaxed);
    }

    /// Append every item of `iter`, in order
    ///
    /// Items from concurrent writers may interleave with the batch.
    pub fn push_all<I: IntoIterator<Item = T>>(&self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }

    /// Number of appended items
    ///
    /// May lag pushes that are still in flight.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.tail.load(Ordering::Acquire).is_null()
    }
}

impl<T: Clone> AppendLog<T> {
    /// Copy of every item appended before this call, oldest first
    ///
    /// Pushes racing with the snapshot may or may not be included.
    pub fn snapshot(&self) -> Vec<T> {
        let mut items = Vec::with_capacity(self.len());
        let mut cursor: *const Node<T> = self.tail.load(Ordering::Acquire);

        // SAFETY: published nodes are immutable and live until `drop`, which
        // cannot run while `&self` is borrowed.
        while let Some(node) = unsafe { cursor.as_ref() } {
            items.push(node.item.clone());
            cursor = node.prev;
        }

        items.reverse();
        items
    }
}

impl<T> Default for AppendLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Extend<T> for AppendLog<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.push_all(iter);
    }
}

impl<T> FromIterator<T> for AppendLog<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut log = AppendLog::new();
        log.extend(iter);
        log
    }
}

impl<T> fmt::Debug for AppendLog<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppendLog").field("len", &self.len()).finish()
    }
}

impl<T> Drop for AppendLog<T> {
    fn drop(&mut self) {
        let mut cursor = *self.tail.get_mut();
        while !cursor.is_null() {
            // SAFETY: `&mut self` excludes every reader and writer; each node
            // came from `Box::into_raw` and is reclaimed exactly once.
            let node = unsafe { Box::from_raw(cursor) };
            cursor = node.prev as *mut Node<T>;
        }
    }
}
