use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Round-robin pool of `proxy-NN` subdomain slots under one zone.
///
/// Handing out an index never blocks. Each slot also has a lock held by its
/// lease, so if there are more workers than slots a worker waits for the
/// slot instead of re-pointing a record another worker is still probing.
pub struct SubdomainPool {
    slots: Vec<Arc<Mutex<()>>>,
    next: AtomicUsize,
}

impl SubdomainPool {
    /// A zone tops out at roughly 800 records.
    pub const DEFAULT_SIZE: usize = 500;

    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            slots: (0..size).map(|_| Arc::new(Mutex::new(()))).collect(),
            next: AtomicUsize::new(0),
        }
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Next index in 1..=size, wrapping forever.
    pub fn next_index(&self) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % self.slots.len() + 1
    }

    pub async fn acquire(&self) -> SubdomainLease {
        let index = self.next_index();
        let guard = self.slots[index - 1].clone().lock_owned().await;
        SubdomainLease { index, _guard: guard }
    }
}

impl Default for SubdomainPool {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIZE)
    }
}

/// Exclusive use of one subdomain slot until dropped.
pub struct SubdomainLease {
    index: usize,
    _guard: OwnedMutexGuard<()>,
}

impl SubdomainLease {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn subdomain(&self) -> String {
        format!("proxy-{:02}", self.index)
    }

    pub fn record_name(&self, zone_domain: &str) -> String {
        format!("{}.{}", self.subdomain(), zone_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_indices_cycle() {
        let pool = SubdomainPool::new(3);
        let seen: Vec<usize> = (0..7).map(|_| pool.next_index()).collect();
        assert_eq!(seen, vec![1, 2, 3, 1, 2, 3, 1]);
    }

    #[test]
    fn test_default_pool_covers_500_slots() {
        let pool = SubdomainPool::default();
        let first = pool.next_index();
        for _ in 1..SubdomainPool::DEFAULT_SIZE - 1 {
            pool.next_index();
        }
        assert_eq!(first, 1);
        assert_eq!(pool.next_index(), 500);
        assert_eq!(pool.next_index(), 1);
    }

    #[tokio::test]
    async fn test_lease_names() {
        let pool = SubdomainPool::new(10);
        let lease = pool.acquire().await;
        assert_eq!(lease.index(), 1);
        assert_eq!(lease.subdomain(), "proxy-01");
        assert_eq!(lease.record_name("spare.example.com"), "proxy-01.spare.example.com");
    }

    #[tokio::test]
    async fn test_busy_slot_waits_for_release() {
        let pool = Arc::new(SubdomainPool::new(1));
        let first = pool.acquire().await;

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await.index() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        assert_eq!(waiter.await.unwrap(), 1);
    }
}
