//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Thread-owned transaction locks.
//!
//! A transaction spans several calls (`begin_*`, any number of reads or
//! writes, then the terminal call), so it cannot be represented by a guard
//! living on one stack frame. [`TransactionLock`] records the owning thread
//! instead: other threads block until it is released, and the owning thread
//! itself gets an error rather than a deadlock if it tries to acquire again.

use crate::transport::TransportError;
use parking_lot::{Condvar, Mutex};
use std::thread::{self, ThreadId};

/// A non-reentrant lock owned by a thread rather than a guard.
#[derive(Debug, Default)]
pub struct TransactionLock {
    owner: Mutex<Option<ThreadId>>,
    released: Condvar,
}

impl TransactionLock {
    /// Creates an unowned lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the lock is free, then takes it for the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Reentrancy`] naming `operation` if the
    /// calling thread already owns the lock.
    pub fn acquire(&self, operation: &'static str) -> Result<(), TransportError> {
        let me = thread::current().id();
        let mut owner = self.owner.lock();
        if *owner == Some(me) {
            return Err(TransportError::Reentrancy { operation });
        }
        while owner.is_some() {
            self.released.wait(&mut owner);
        }
        *owner = Some(me);
        Ok(())
    }

    /// Returns `true` if the calling thread owns the lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        *self.owner.lock() == Some(thread::current().id())
    }

    /// Returns `true` if any thread owns the lock.
    pub fn is_locked(&self) -> bool {
        self.owner.lock().is_some()
    }

    /// Releases the lock if the calling thread owns it.
    ///
    /// Returns whether a release happened. One waiting thread is woken.
    pub fn release(&self) -> bool {
        let mut owner = self.owner.lock();
        if *owner != Some(thread::current().id()) {
            return false;
        }
        *owner = None;
        drop(owner);
        self.released.notify_one();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[test]
    fn test_acquire_release() {
        let lock = TransactionLock::new();
        assert!(!lock.is_locked());
        lock.acquire("begin_read").unwrap();
        assert!(lock.is_locked());
        assert!(lock.is_held_by_current_thread());
        assert!(lock.release());
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_same_thread_reacquire_fails() {
        let lock = TransactionLock::new();
        lock.acquire("begin_write").unwrap();
        match lock.acquire("begin_write") {
            Err(TransportError::Reentrancy { operation }) => assert_eq!(operation, "begin_write"),
            other => panic!("expected reentrancy error, got {:?}", other),
        }
        assert!(lock.is_held_by_current_thread());
    }

    #[test]
    fn test_release_by_non_owner_is_ignored() {
        let lock = Arc::new(TransactionLock::new());
        lock.acquire("begin_read").unwrap();

        let other = Arc::clone(&lock);
        let released = thread::spawn(move || {
            assert!(!other.is_held_by_current_thread());
            other.release()
        })
        .join()
        .unwrap();

        assert!(!released);
        assert!(lock.is_held_by_current_thread());
    }

    #[test]
    fn test_other_thread_blocks_until_release() {
        let lock = Arc::new(TransactionLock::new());
        let acquired = Arc::new(AtomicBool::new(false));
        lock.acquire("begin_read").unwrap();

        let waiter = {
            let lock = Arc::clone(&lock);
            let acquired = Arc::clone(&acquired);
            thread::spawn(move || {
                lock.acquire("begin_read").unwrap();
                acquired.store(true, Ordering::SeqCst);
                lock.release();
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));

        lock.release();
        waiter.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
    }
}
