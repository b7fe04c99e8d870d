//! Counting admission control for external processes

use std::sync::Arc;

use fleet_common::{FleetError, FleetResult};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default number of bridge processes allowed to run at once
pub const DEFAULT_CAPACITY: usize = 10;

/// Bounds how many external processes may run simultaneously.
///
/// Cloning is cheap and every clone shares the same permits.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held slot. The slot is returned when the permit is dropped, so every
/// exit path of the guarded scope releases exactly once.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    pub fn new(capacity: usize) -> FleetResult<Self> {
        if capacity == 0 {
            return Err(FleetError::Config(
                "concurrency limit must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Wait until a slot is free and take it
    pub async fn acquire(&self) -> GatePermit {
        // The semaphore is owned by the gate and never closed.
        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => unreachable!("concurrency gate semaphore closed"),
        };
        GatePermit { _permit: permit }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of permits currently held
    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(DEFAULT_CAPACITY)),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(ConcurrencyGate::new(0), Err(FleetError::Config(_))));
    }

    #[test]
    fn test_default_capacity() {
        let gate = ConcurrencyGate::default();
        assert_eq!(gate.capacity(), DEFAULT_CAPACITY);
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let gate = ConcurrencyGate::new(2).unwrap();
        let first = gate.acquire().await;
        let second = gate.acquire().await;
        assert_eq!(gate.in_flight(), 2);

        drop(first);
        assert_eq!(gate.in_flight(), 1);
        drop(second);
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_acquire_blocks_at_capacity() {
        let gate = ConcurrencyGate::new(1).unwrap();
        let held = gate.acquire().await;

        let blocked = tokio::time::timeout(Duration::from_millis(50), gate.acquire()).await;
        assert!(blocked.is_err());

        drop(held);
        let admitted = tokio::time::timeout(Duration::from_millis(50), gate.acquire()).await;
        assert!(admitted.is_ok());
    }

    #[tokio::test]
    async fn test_permit_released_when_task_panics() {
        let gate = ConcurrencyGate::new(1).unwrap();
        let task_gate = gate.clone();

        let handle = tokio::spawn(async move {
            let _permit = task_gate.acquire().await;
            panic!("operation failed while holding a permit");
        });
        assert!(handle.await.is_err());

        assert_eq!(gate.in_flight(), 0);
    }
}
