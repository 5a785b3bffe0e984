//! Process-wide at-most-one-run guard.

use std::sync::{Arc, Mutex, MutexGuard};

/// Check-and-set flag shared by every run trigger.
///
/// Losers get `false` / `None` immediately; nothing blocks or queues.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    in_flight: Arc<Mutex<bool>>,
}

impl RunGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self) -> MutexGuard<'_, bool> {
        // The flag is a plain bool; a poisoned lock still holds a valid value.
        self.in_flight
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Atomically claim the run slot. Returns `true` for the single winner.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        let mut flag = self.flag();
        if *flag {
            false
        } else {
            *flag = true;
            true
        }
    }

    pub fn release(&self) {
        *self.flag() = false;
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        *self.flag()
    }

    /// Claim the slot and hand back a permit that releases it on drop.
    #[must_use]
    pub fn try_permit(&self) -> Option<RunPermit> {
        self.try_acquire().then(|| RunPermit {
            guard: self.clone(),
        })
    }
}

/// Held for the duration of one run; dropping it frees the slot, including
/// on panic unwinding.
#[derive(Debug)]
pub struct RunPermit {
    guard: RunGuard,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.guard.release();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    use super::*;

    #[test]
    fn second_acquire_fails_until_release() {
        let guard = RunGuard::new();
        assert!(guard.try_acquire());
        assert!(!guard.try_acquire());
        guard.release();
        assert!(guard.try_acquire());
    }

    #[test]
    fn permit_releases_on_drop() {
        let guard = RunGuard::new();
        let permit = guard.try_permit().unwrap();
        assert!(guard.is_held());
        assert!(guard.try_permit().is_none());
        drop(permit);
        assert!(!guard.is_held());
    }

    #[test]
    fn exactly_one_winner_under_contention() {
        let guard = RunGuard::new();
        let winners = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                let winners = Arc::clone(&winners);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    if guard.try_acquire() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}
