//! Memory budget service.
//!
//! The kernel does not own an allocator; it owns a budget. Components that
//! buffer data (the scripting host's file reads, in particular) reserve
//! against the budget before allocating and release when the buffer is
//! marshaled away. The kernel snapshots `used()` into its metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("memory budget exceeded: requested {requested} bytes, {available} available")]
pub struct BudgetExceeded {
    pub requested: u64,
    pub available: u64,
}

/// A fixed byte budget with atomic usage tracking.
#[derive(Debug)]
pub struct MemoryBudget {
    capacity: u64,
    used: AtomicU64,
}

impl MemoryBudget {
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            used: AtomicU64::new(0),
        }
    }

    /// Reserve `n` bytes, failing if the reservation would exceed the cap.
    pub fn try_reserve(&self, n: u64) -> Result<(), BudgetExceeded> {
        let mut current = self.used.load(Ordering::SeqCst);
        loop {
            let next = current.saturating_add(n);
            if next > self.capacity {
                return Err(BudgetExceeded {
                    requested: n,
                    available: self.capacity.saturating_sub(current),
                });
            }
            match self.used.compare_exchange_weak(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    /// Release a previous reservation.
    pub fn release(&self, n: u64) {
        let mut current = self.used.load(Ordering::SeqCst);
        loop {
            let next = current.saturating_sub(n);
            match self.used.compare_exchange_weak(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn used(&self) -> u64 {
        self.used.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn available(&self) -> u64 {
        self.capacity.saturating_sub(self.used())
    }
}
