//! At most one mutating call per store.
//!
//! A store holds a [`BusyFlag`]; each mutating operation calls
//! [`BusyFlag::try_acquire`] at entry. While a guard is alive further calls get
//! `None` and return [`Mutation::Busy`] without touching the network. The
//! guard clears the flag on drop, so early returns and errors never leave a
//! store stuck busy.

use std::sync::atomic::{AtomicBool, Ordering};

/// Outcome of a single-flight mutating operation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Mutation<T> {
    /// The operation ran.
    Applied(T),
    /// Another operation was in flight; this one was dropped.
    Busy,
}

impl<T> Mutation<T> {
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }

    /// The applied value, if the operation ran.
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Busy => None,
        }
    }
}

/// Busy flag shared by a store's mutating operations.
#[derive(Debug, Default)]
pub struct BusyFlag(AtomicBool);

impl BusyFlag {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Mark the store busy, or `None` if it already is.
    #[must_use]
    pub fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(&self.0))
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Clears the owning [`BusyFlag`] when dropped.
#[derive(Debug)]
pub struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let flag = BusyFlag::new();
        let guard = flag.try_acquire();
        assert!(guard.is_some());
        assert!(flag.is_busy());
        assert!(flag.try_acquire().is_none());

        drop(guard);
        assert!(!flag.is_busy());
        assert!(flag.try_acquire().is_some());
    }

    #[test]
    fn test_guard_released_on_early_return() {
        fn fails(flag: &BusyFlag) -> Result<(), &'static str> {
            let _guard = flag.try_acquire().ok_or("busy")?;
            Err("network down")
        }

        let flag = BusyFlag::new();
        assert_eq!(fails(&flag), Err("network down"));
        assert!(!flag.is_busy());
    }

    #[test]
    fn test_mutation_helpers() {
        assert!(Mutation::<()>::Busy.is_busy());
        assert_eq!(Mutation::Applied(3).applied(), Some(3));
        assert_eq!(Mutation::<u8>::Busy.applied(), None);
    }
}
