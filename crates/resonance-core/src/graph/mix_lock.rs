//! The simulation's single reentrant mutex.
//!
//! Every externally entrant API (connect, set property, create node) takes
//! this lock; the audio pump takes it for the duration of one `tick()`.
//! Reentrancy matters because a post-change property callback, or a node's
//! own internal setup, may itself call back into a locking API while the
//! calling thread already holds the lock — the standard library's
//! `std::sync::Mutex` would deadlock in that case, so this wraps it with an
//! owning-thread + depth counter instead. `parking_lot::ReentrantMutex` would
//! be the natural choice in a codebase that already depended on it, but this
//! workspace does not, so this is hand-rolled (see DESIGN.md).

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, ThreadId};

/// A mutex that may be locked multiple times by the same thread without
/// deadlocking; the inner value becomes accessible only once the outermost
/// guard is acquired.
pub struct ReentrantMixLock<T> {
    owner: Mutex<Option<ThreadId>>,
    depth: AtomicUsize,
    data: UnsafeCell<T>,
}

// SAFETY: access to `data` is only exposed through `MixLockGuard`, which is
// only constructed while `owner` correctly identifies the calling thread as
// the (possibly-reentrant) lock holder.
unsafe impl<T: Send> Sync for ReentrantMixLock<T> {}
unsafe impl<T: Send> Send for ReentrantMixLock<T> {}

impl<T> ReentrantMixLock<T> {
    /// Wraps `data` behind a fresh, unlocked reentrant mutex.
    pub fn new(data: T) -> Self {
        Self {
            owner: Mutex::new(None),
            depth: AtomicUsize::new(0),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquires the lock, blocking if another thread currently holds it.
    /// Reentrant: if the calling thread already holds it, this succeeds
    /// immediately and increments the depth counter instead of blocking.
    pub fn lock(&self) -> MixLockGuard<'_, T> {
        let this_thread = thread::current().id();
        let mut owner = self.owner.lock().unwrap_or_else(|e| e.into_inner());
        let reentering = *owner == Some(this_thread);
        if !reentering {
            // Another thread holds it (or nobody does); wait for ownership.
            while owner.is_some() {
                owner = self.park_until_released(owner);
            }
            *owner = Some(this_thread);
        }
        self.depth.fetch_add(1, Ordering::AcqRel);
        drop(owner);
        MixLockGuard { lock: self }
    }

    /// Spins the owner mutex, released and re-acquired, until the previous
    /// holder has fully unwound (depth back to zero). A real realtime engine
    /// would use a condvar; this keeps the dependency surface unchanged from
    /// the teacher's stack while remaining correct for the moderate
    /// contention the mix lock actually sees (API calls between blocks).
    fn park_until_released<'a>(
        &'a self,
        mut owner: MutexGuard<'a, Option<ThreadId>>,
    ) -> MutexGuard<'a, Option<ThreadId>> {
        drop(owner);
        while self.depth.load(Ordering::Acquire) > 0 {
            thread::yield_now();
        }
        owner = self.owner.lock().unwrap_or_else(|e| e.into_inner());
        owner
    }

    fn unlock(&self) {
        let prev = self.depth.fetch_sub(1, Ordering::AcqRel);
        if prev == 1 {
            let mut owner = self.owner.lock().unwrap_or_else(|e| e.into_inner());
            *owner = None;
        }
    }
}

/// RAII guard returned by [`ReentrantMixLock::lock`].
pub struct MixLockGuard<'a, T> {
    lock: &'a ReentrantMixLock<T>,
}

impl<T> std::ops::Deref for MixLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: guard existence proves the calling thread owns the lock.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> std::ops::DerefMut for MixLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: guard existence proves the calling thread owns the lock.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for MixLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reentrant_lock_allows_nested_acquire_same_thread() {
        let lock = ReentrantMixLock::new(0_i32);
        let outer = lock.lock();
        {
            let inner = lock.lock();
            assert_eq!(*inner, 0);
        }
        assert_eq!(*outer, 0);
    }

    #[test]
    fn lock_mutates_visible_after_release() {
        let lock = ReentrantMixLock::new(vec![1, 2, 3]);
        {
            let mut guard = lock.lock();
            guard.push(4);
        }
        let guard = lock.lock();
        assert_eq!(*guard, vec![1, 2, 3, 4]);
    }
}
