//! Ticker-driven background loop implementing [`Service`].
//!
//! [`TickerService`] runs a job every `period` on its own Tokio task. An
//! atomic running flag makes `start` idempotent. `stop` clears the flag,
//! fires the loop's cancellation token and waits for the loop to exit. A
//! job already in progress is not dropped; it receives the token and is
//! expected to return promptly once it fires.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt as _;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::registry::Service;

/// The job a ticker runs each period.
type Job = Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, ()> + Send + Sync>;

/// A running loop: its stop signal and task handle.
struct LoopHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Periodic background service.
pub struct TickerService {
    name: String,
    period: Duration,
    job: Job,
    running: AtomicBool,
    active: Mutex<Option<LoopHandle>>,
}

impl TickerService {
    /// Create a stopped service that will run `job` every `period` once started.
    /// The first run happens one full period after `start`.
    pub fn new<F, Fut>(name: impl Into<String>, period: Duration, job: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            name: name.into(),
            period: period.max(Duration::from_millis(1)),
            job: Arc::new(move |token| job(token).boxed()),
            running: AtomicBool::new(false),
            active: Mutex::new(None),
        }
    }

    /// The configured period.
    pub const fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl Service for TickerService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) {
        let mut active = self.active.lock().await;
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_loop(
            self.name.clone(),
            self.period,
            Arc::clone(&self.job),
            cancel.clone(),
        ));
        *active = Some(LoopHandle { cancel, task });
    }

    async fn stop(&self) {
        let mut active = self.active.lock().await;
        if self
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        if let Some(handle) = active.take() {
            handle.cancel.cancel();
            if let Err(e) = handle.task.await {
                tracing::error!(service = self.name, error = %e, "background loop ended abnormally");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

async fn run_loop(name: String, period: Duration, job: Job, cancel: CancellationToken) {
    let start = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!(service = name, period_ms = period.as_millis(), "background loop started");
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                tracing::debug!(service = name, "background job running");
                job(cancel.clone()).await;
                tracing::debug!(service = name, "background job ran");
            }
        }
    }
    tracing::debug!(service = name, "background loop exited");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counting(period: Duration) -> (TickerService, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let service = TickerService::new("counter", period, move |_token| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        (service, runs)
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_until_stopped() {
        let (service, runs) = counting(Duration::from_secs(60));
        service.start().await;
        assert!(service.is_running());

        tokio::time::sleep(Duration::from_secs(185)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        service.stop().await;
        assert!(!service.is_running());
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_a_no_op() {
        let (service, runs) = counting(Duration::from_secs(10));
        service.start().await;
        service.start().await;
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        service.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_waits_for_the_job_in_progress() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        let service = TickerService::new("slow", Duration::from_secs(1), move |_token| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                flag.store(true, Ordering::SeqCst);
            }
        });

        service.start().await;
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        service.stop().await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn can_restart_after_stop() {
        let (service, runs) = counting(Duration::from_secs(1));
        service.start().await;
        service.stop().await;
        service.start().await;
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        service.stop().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_on_a_stopped_service_returns_immediately() {
        let (service, _runs) = counting(Duration::from_secs(1));
        service.stop().await;
        assert!(!service.is_running());
    }
}
