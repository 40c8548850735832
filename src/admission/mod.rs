//! Upstream admission control.
//!
//! # Responsibilities
//! - Bound concurrent upstream connections to the platform ceiling
//! - Queue excess callers in arrival order
//! - Expose active/pending counts for the health endpoint
//!
//! # Design Decisions
//! - Built on a tokio semaphore: permits are handed to the oldest waiter
//!   on release, so a freed slot never leaks to a late arrival
//! - Scoped acquisition: the permit is released on drop, covering every
//!   error path through the forwarder
//! - No wait timeout and no queue-depth cap; callers wait as long as the
//!   upstream takes (carried limitation)

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounds concurrent upstream connections with FIFO queuing.
#[derive(Debug)]
pub struct AdmissionController {
    slots: Arc<Semaphore>,
    max: usize,
    pending: AtomicUsize,
}

impl AdmissionController {
    pub fn new(max: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(max)),
            max,
            pending: AtomicUsize::new(0),
        }
    }

    /// Acquire a slot, waiting in arrival order if all are taken.
    pub async fn acquire(&self) -> AdmissionPermit {
        self.pending.fetch_add(1, Ordering::SeqCst);
        // The semaphore is never closed, so acquire cannot fail.
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .expect("admission semaphore closed unexpectedly");
        self.pending.fetch_sub(1, Ordering::SeqCst);

        tracing::trace!(
            active = self.active(),
            pending = self.pending(),
            "Admission slot acquired"
        );
        AdmissionPermit { _permit: permit }
    }

    /// Slots currently held.
    pub fn active(&self) -> usize {
        self.max - self.slots.available_permits()
    }

    /// Configured capacity.
    pub fn max(&self) -> usize {
        self.max
    }

    /// Callers waiting (or about to be admitted).
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

/// A held upstream connection slot.
///
/// Dropping the permit releases the slot to the oldest waiter, so the
/// bound holds even if the forwarding path errors or panics.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn acquire_within_capacity_is_immediate() {
        let admission = AdmissionController::new(2);
        let _a = admission.acquire().await;
        let _b = admission.acquire().await;
        assert_eq!(admission.active(), 2);
        assert_eq!(admission.pending(), 0);
    }

    #[tokio::test]
    async fn drop_releases_slot() {
        let admission = AdmissionController::new(1);
        let permit = admission.acquire().await;
        assert_eq!(admission.active(), 1);
        drop(permit);
        assert_eq!(admission.active(), 0);
    }

    #[tokio::test]
    async fn excess_acquire_waits_until_release() {
        let admission = Arc::new(AdmissionController::new(1));
        let held = admission.acquire().await;

        let waiter = {
            let admission = admission.clone();
            tokio::spawn(async move {
                let _p = admission.acquire().await;
            })
        };

        // Give the waiter time to enqueue; it must not be admitted yet.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(admission.pending(), 1);
        assert!(!waiter.is_finished());

        drop(held);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be admitted after release")
            .unwrap();
        assert_eq!(admission.pending(), 0);
    }

    #[tokio::test]
    async fn waiters_admitted_in_arrival_order() {
        let admission = Arc::new(AdmissionController::new(1));
        let held = admission.acquire().await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handles = Vec::new();
        for i in 0..3 {
            let admission = admission.clone();
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                let permit = admission.acquire().await;
                tx.send(i).unwrap();
                drop(permit);
            }));
            // Serialize enqueue order.
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(admission.pending(), 3);

        drop(held);
        for handle in handles {
            handle.await.unwrap();
        }
        let order: Vec<u32> = [rx.recv().await, rx.recv().await, rx.recv().await]
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(order, vec![0, 1, 2]);
    }
}
