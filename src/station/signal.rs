//! Cross-thread flag signalling.
//!
//! [`EventGroup`] is the std rendition of a FreeRTOS event group: a small
//! set of independent flag bits that the event path sets and clears while
//! any number of caller threads poll or block on them, optionally with a
//! timeout. Waiting never consumes a flag; a bit stays set until someone
//! clears it, so late readers observe the same outcome as the thread that
//! was woken for it.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::warn;

/// Station interface is up.
pub const STARTED: u8 = 1 << 0;
/// An address has been acquired and no disassociation followed.
pub const CONNECTED: u8 = 1 << 1;
/// The retry budget is exhausted; the attempt is over.
pub const FAILED: u8 = 1 << 2;

/// Flag set with blocking wait support.
pub struct EventGroup {
    bits: Mutex<u8>,
    cond: Condvar,
}

impl EventGroup {
    pub fn new() -> Self {
        Self {
            bits: Mutex::new(0),
            cond: Condvar::new(),
        }
    }

    /// Sets the bits in `mask` and wakes every waiter.
    pub fn set(&self, mask: u8) {
        {
            let mut bits = self.lock();
            *bits |= mask;
        }
        self.cond.notify_all();
    }

    /// Clears the bits in `mask`. Clearing never satisfies a wait, so no
    /// waiter is woken.
    pub fn clear(&self, mask: u8) {
        *self.lock() &= !mask;
    }

    /// Clears every flag.
    pub fn clear_all(&self) {
        *self.lock() = 0;
    }

    /// Non-blocking snapshot of the current bits.
    pub fn get(&self) -> u8 {
        *self.lock()
    }

    /// True when any bit of `mask` is currently set.
    pub fn is_set(&self, mask: u8) -> bool {
        self.get() & mask != 0
    }

    /// Blocks until any bit of `mask` is set or `timeout` expires.
    ///
    /// `None` waits without bound. Returns the bits observed on wake-up; on
    /// timeout the returned snapshot has no `mask` bit set. Spurious wakes
    /// are absorbed internally.
    pub fn wait_any(&self, mask: u8, timeout: Option<Duration>) -> u8 {
        let bits = self.lock();
        match timeout {
            None => {
                let bits = self
                    .cond
                    .wait_while(bits, |b| *b & mask == 0)
                    .unwrap_or_else(PoisonError::into_inner);
                *bits
            }
            Some(bound) => {
                let (bits, _) = self
                    .cond
                    .wait_timeout_while(bits, bound, |b| *b & mask == 0)
                    .unwrap_or_else(PoisonError::into_inner);
                *bits
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, u8> {
        self.bits.lock().unwrap_or_else(|poisoned| {
            warn!("Event group mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl Default for EventGroup {
    fn default() -> Self {
        Self::new()
    }
}
