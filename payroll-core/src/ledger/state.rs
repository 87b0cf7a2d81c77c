use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

/// Consistency of one calendar year's computed blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum YearState {
    /// Every entry matches its chronological position.
    #[default]
    Clean,
    /// A mutation has invalidated later entries, or the last walk aborted.
    Dirty,
    /// A walk is in progress.
    Recomputing,
}

/// Per-year exclusive locks plus the observable [`YearState`] of each year.
#[derive(Debug, Default)]
pub(crate) struct YearLocks {
    locks: Mutex<HashMap<i32, Arc<AsyncMutex<()>>>>,
    states: Mutex<HashMap<i32, YearState>>,
}

impl YearLocks {
    /// Locks every year in `years`, ascending and without duplicates, so two
    /// callers locking the same pair can never deadlock.
    pub(crate) async fn lock(
        &self,
        years: &[i32],
    ) -> Vec<OwnedMutexGuard<()>> {
        let mut ordered = years.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for year in ordered {
            let lock = self.lock_for(year);
            guards.push(lock.lock_owned().await);
        }
        guards
    }

    pub(crate) fn state(
        &self,
        year: i32,
    ) -> YearState {
        let states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.get(&year).copied().unwrap_or_default()
    }

    pub(crate) fn set_state(
        &self,
        year: i32,
        state: YearState,
    ) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = states.insert(year, state).unwrap_or_default();
        if previous != state {
            debug!(year, from = ?previous, to = ?state, "Year state changed");
        }
    }

    fn lock_for(
        &self,
        year: i32,
    ) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(year).or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn unseen_year_is_clean() {
        assert_eq!(YearLocks::default().state(2024), YearState::Clean);
    }

    #[test]
    fn state_is_tracked_per_year() {
        let locks = YearLocks::default();

        locks.set_state(2024, YearState::Dirty);

        assert_eq!(locks.state(2024), YearState::Dirty);
        assert_eq!(locks.state(2023), YearState::Clean);
    }

    #[tokio::test]
    async fn duplicate_years_lock_once() {
        let locks = YearLocks::default();

        let guards = locks.lock(&[2024, 2024]).await;

        assert_eq!(guards.len(), 1);
    }

    #[tokio::test]
    async fn same_year_is_exclusive() {
        let locks = Arc::new(YearLocks::default());
        let held = locks.lock(&[2024]).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move { locks.lock(&[2024]).await.len() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(held);
        assert_eq!(contender.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn other_years_are_independent() {
        let locks = YearLocks::default();
        let _held = locks.lock(&[2024]).await;

        let other = tokio::time::timeout(Duration::from_secs(1), locks.lock(&[2023])).await;

        assert!(other.is_ok());
    }
}
