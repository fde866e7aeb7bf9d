//! Background flush task
//!
//! Flushes the service buffer on a fixed period regardless of occupancy.
//! The task stops when its [`FlushHandle`] is shut down or dropped, and always
//! performs one last flush on the way out.

use tokio::sync::oneshot;
use tokio::task::{self, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error};

use super::service::LogService;

/// Handle to the running flush task
pub struct FlushHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl FlushHandle {
    /// Check if the task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the task and wait for its final flush
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            // Ignore error if the task already exited
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}

pub(super) fn spawn(service: LogService) -> FlushHandle {
    let period = service.options().flush_interval;
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let service = service.clone();
                    run_blocking(move || service.flush()).await;
                }
                // Fires on explicit shutdown and when the handle is dropped
                _ = &mut shutdown_rx => break,
            }
        }

        let written = run_blocking(move || service.flush_all()).await;
        debug!(written, "Flush task stopped");
    });

    FlushHandle {
        shutdown_tx: Some(shutdown_tx),
        task,
    }
}

/// Run a flush on the blocking pool
async fn run_blocking(flush: impl FnOnce() -> usize + Send + 'static) -> usize {
    match task::spawn_blocking(flush).await {
        Ok(written) => written,
        Err(e) => {
            error!("Flush task failed: {}", e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use crate::logging::clock::ManualClock;
    use crate::logging::service::ServiceOptions;
    use crate::logging::store::{MemoryStore, PartitionStore};

    use super::*;

    fn start_service(interval_ms: u64) -> (LogService, FlushHandle, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap(),
        ));
        let options = ServiceOptions {
            max_buffer_size: 100,
            flush_interval: Duration::from_millis(interval_ms),
            console_mirror: false,
        };
        let (service, handle) = LogService::start(options, store.clone(), clock);
        (service, handle, store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_flush_before_interval() {
        let (service, handle, store) = start_service(5000);
        service.info("waiting", None, None);

        time::sleep(Duration::from_millis(4999)).await;
        assert_eq!(service.buffered_len(), 1);
        assert!(store.list().unwrap().is_empty());

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_on_interval() {
        let (service, handle, store) = start_service(5000);
        service.info("first", None, None);

        time::sleep(Duration::from_millis(5001)).await;
        assert_eq!(service.buffered_len(), 0);
        assert_eq!(
            store.contents("2026-10-19.log").unwrap().lines().count(),
            1
        );

        service.info("second", None, None);
        time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(service.buffered_len(), 0);
        assert_eq!(
            store.contents("2026-10-19.log").unwrap().lines().count(),
            2
        );

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_performs_final_flush() {
        let (service, handle, store) = start_service(60_000);
        service.warn("pending at shutdown", None, None);

        handle.shutdown().await;

        assert_eq!(service.buffered_len(), 0);
        assert!(store
            .contents("2026-10-19.log")
            .unwrap()
            .contains("pending at shutdown"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_task() {
        let (service, handle, store) = start_service(60_000);
        service.info("pending at drop", None, None);

        drop(handle);
        for _ in 0..100 {
            if store.contents("2026-10-19.log").is_some() {
                break;
            }
            time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(service.buffered_len(), 0);
        assert!(store.contents("2026-10-19.log").is_some());
    }

    /// Store whose first append blocks until released
    struct GatedStore {
        inner: MemoryStore,
        entered: Arc<tokio::sync::Notify>,
        release: std::sync::Mutex<std::sync::mpsc::Receiver<()>>,
    }

    impl PartitionStore for GatedStore {
        fn ensure_dir(&self) -> std::io::Result<()> {
            self.inner.ensure_dir()
        }

        fn append(&self, name: &str, block: &str) -> std::io::Result<()> {
            self.entered.notify_one();
            let _ = self
                .release
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(5));
            self.inner.append(name, block)
        }

        fn read(&self, name: &str) -> std::io::Result<Option<String>> {
            self.inner.read(name)
        }

        fn list(&self) -> std::io::Result<Vec<String>> {
            self.inner.list()
        }

        fn remove(&self, name: &str) -> std::io::Result<()> {
            self.inner.remove(name)
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_slow_write_does_not_block_runtime() {
        let entered = Arc::new(tokio::sync::Notify::new());
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let store = Arc::new(GatedStore {
            inner: MemoryStore::new(),
            entered: entered.clone(),
            release: std::sync::Mutex::new(release_rx),
        });
        let options = ServiceOptions {
            flush_interval: Duration::from_millis(10),
            console_mirror: false,
            ..Default::default()
        };
        let (service, handle) = LogService::start(
            options,
            store.clone(),
            Arc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap(),
            )),
        );
        service.info("slow disk", None, None);

        // This task keeps running while the write is stuck
        time::timeout(Duration::from_secs(5), entered.notified())
            .await
            .unwrap();
        assert_eq!(service.buffered_len(), 0);

        release_tx.send(()).unwrap();
        handle.shutdown().await;

        assert!(store
            .inner
            .contents("2026-10-19.log")
            .unwrap()
            .contains("slow disk"));
    }
}
