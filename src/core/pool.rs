use crate::core::queue::ZipQueue;
use crate::utils::error::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Result of an operation run through [`retry_fixed`].
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T>,
    pub attempts: u32,
}

/// Runs `op(attempt)` up to `max_attempts` times with no backoff.
pub async fn retry_fixed<T, F, Fut>(max_attempts: u32, op: F) -> Attempted<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_pause(max_attempts, Duration::ZERO, op).await
}

/// 與 [`retry_fixed`] 相同，但每次失敗後固定等待 `pause`
pub async fn retry_with_pause<T, F, Fut>(max_attempts: u32, pause: Duration, mut op: F) -> Attempted<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => {
                return Attempted {
                    result: Ok(value),
                    attempts: attempt,
                }
            }
            Err(e) if attempt >= max_attempts => {
                return Attempted {
                    result: Err(e),
                    attempts: attempt,
                }
            }
            Err(e) => {
                tracing::debug!("Attempt {}/{} failed: {}", attempt, max_attempts, e);
                if !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
                attempt += 1;
            }
        }
    }
}

/// Spawns `min(workers, queue.len())` tasks that pop ZIP codes until the
/// queue is empty, running `job` for each, and waits for all of them.
pub async fn drain_queue<F, Fut>(queue: Arc<ZipQueue>, workers: usize, job: F) -> Result<()>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let worker_count = workers.max(1).min(queue.len());
    if worker_count == 0 {
        return Ok(());
    }

    tracing::debug!("Starting {} workers", worker_count);
    let job = Arc::new(job);
    let mut handles = Vec::with_capacity(worker_count);

    for worker_id in 0..worker_count {
        let queue = Arc::clone(&queue);
        let job = Arc::clone(&job);
        handles.push(tokio::spawn(async move {
            while let Some(zip) = queue.pop() {
                tracing::debug!(worker_id, zip = %zip, "Worker picked ZIP");
                job(zip).await;
            }
        }));
    }

    for handle in handles {
        handle.await?;
    }
    Ok(())
}
