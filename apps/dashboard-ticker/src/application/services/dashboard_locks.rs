//! Per-dashboard async locks, created on first use.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::dashboard::DashboardId;

pub(crate) type DashboardLock = Arc<tokio::sync::Mutex<()>>;

#[derive(Debug, Default)]
pub(crate) struct DashboardLocks {
    locks: Mutex<HashMap<DashboardId, DashboardLock>>,
}

impl DashboardLocks {
    /// The dashboard's lock. Callers hold the returned handle while they
    /// lock or wait on it.
    pub(crate) fn get(&self, dashboard: &DashboardId) -> DashboardLock {
        Arc::clone(self.locks.lock().entry(dashboard.clone()).or_default())
    }

    /// Whether someone currently holds the dashboard's lock.
    pub(crate) fn is_held(&self, dashboard: &DashboardId) -> bool {
        self.locks
            .lock()
            .get(dashboard)
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    /// Run `f` under the dashboard's lock, then forget the lock.
    ///
    /// The entry survives while anyone else holds a handle to it, so a
    /// task queued on the old lock can never run next to one that took a
    /// fresh lock.
    pub(crate) async fn retire<R>(&self, dashboard: &DashboardId, f: impl FnOnce() -> R) -> R {
        let lock = self.get(dashboard);
        let _guard = lock.lock().await;
        let out = f();

        let mut locks = self.locks.lock();
        // One handle in the map, one held here.
        if locks
            .get(dashboard)
            .is_some_and(|held| Arc::ptr_eq(held, &lock) && Arc::strong_count(held) == 2)
        {
            locks.remove(dashboard);
        }
        out
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby() -> DashboardId {
        DashboardId::new("lobby")
    }

    #[test]
    fn same_dashboard_shares_one_lock() {
        let locks = DashboardLocks::default();

        let a = locks.get(&lobby());
        let b = locks.get(&lobby());
        let other = locks.get(&DashboardId::new("kitchen"));

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn retire_removes_unshared_lock() {
        let locks = DashboardLocks::default();
        let retired = Arc::downgrade(&locks.get(&lobby()));

        assert_eq!(locks.retire(&lobby(), || 7).await, 7);

        assert_eq!(locks.len(), 0);
        assert!(retired.upgrade().is_none());
    }

    #[tokio::test]
    async fn retire_waits_for_holder_and_keeps_shared_lock() {
        let locks = DashboardLocks::default();
        let lock = locks.get(&lobby());
        let guard = lock.lock().await;
        let mut ran = false;
        let id = lobby();

        tokio::join!(
            locks.retire(&id, || ran = true),
            async {
                tokio::task::yield_now().await;
                assert!(locks.is_held(&lobby()));
                drop(guard);
            }
        );

        assert!(ran);
        assert!(Arc::ptr_eq(&locks.get(&lobby()), &lock));
        assert!(!locks.is_held(&lobby()));
    }
}
