//! Bounded engine pool.
//!
//! At most `workers` solves run at once, each on a blocking thread. Callers
//! wait for a free worker; there is no queue ordering beyond the semaphore's
//! own fairness.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::debug;

use super::{DatalogEngine, EngineError, EngineResult, Relations, Signatures};

#[derive(Clone)]
pub struct EnginePool {
    engine: Arc<dyn DatalogEngine>,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl EnginePool {
    /// Pool of `workers` slots over one engine; a zero size is raised to one
    pub fn new(engine: Arc<dyn DatalogEngine>, workers: usize) -> Self {
        let workers = workers.max(1);
        EnginePool {
            engine,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Workers not currently running a solve
    pub fn idle(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run a program on the next free worker
    pub async fn run(
        &self,
        program: String,
        inputs: Relations,
        outputs: Signatures,
    ) -> EngineResult<Relations> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| EngineError::PoolClosed)?;
        debug!(idle = self.permits.available_permits(), "engine_worker_acquired");

        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || {
            let result = engine.run(&program, &inputs, &outputs);
            drop(permit);
            result
        })
        .await
        .map_err(|e| EngineError::Worker(e.to_string()))?
    }

    /// Refuse new work; callers already waiting get `PoolClosed`
    pub fn close(&self) {
        self.permits.close();
    }
}

impl std::fmt::Debug for EnginePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnginePool")
            .field("workers", &self.workers)
            .field("idle", &self.idle())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Relation;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Echoes its inputs back and records peak concurrency
    struct Echo {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl DatalogEngine for Echo {
        fn run(&self, _program: &str, inputs: &Relations, _outputs: &Signatures) -> EngineResult<Relations> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(inputs.clone())
        }
    }

    fn echo() -> Arc<Echo> {
        Arc::new(Echo {
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_run_returns_engine_output() {
        let pool = EnginePool::new(echo(), 2);
        let mut inputs = Relations::new();
        inputs.insert("a".to_string(), Relation::boolean(true));
        let out = pool.run(String::new(), inputs.clone(), Signatures::new()).await.unwrap();
        assert_eq!(out, inputs);
        assert_eq!(pool.idle(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let engine = echo();
        let pool = EnginePool::new(engine.clone(), 2);
        let handles: Vec<_> = (0..6)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move { pool.run(String::new(), Relations::new(), Signatures::new()).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert!(engine.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_closed_pool() {
        let pool = EnginePool::new(echo(), 1);
        pool.close();
        let err = pool.run(String::new(), Relations::new(), Signatures::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::PoolClosed));
    }

    #[test]
    fn test_zero_workers_raised_to_one() {
        assert_eq!(EnginePool::new(echo(), 0).workers(), 1);
    }
}
