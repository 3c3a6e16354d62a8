use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::AbortHandle;
use tracing::{debug, error};

/// Ties background requests to the lifetime of the view that issued them.
///
/// A result only reaches the view while the scope is open. Closing or
/// dropping the scope aborts whatever is still in flight, and a result that
/// races the close is discarded. Each operation key holds at most one task;
/// issuing the same key again aborts the earlier request.
pub struct ViewScope {
    name: String,
    active: Arc<AtomicBool>,
    tasks: Mutex<HashMap<String, AbortHandle>>,
}

impl ViewScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: Arc::new(AtomicBool::new(true)),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Runs `fut` in the background and hands its output to `apply` if the
    /// view is still open when it completes.
    pub fn spawn<F, T, A>(&self, key: &str, fut: F, apply: A)
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        A: FnOnce(T) + Send + 'static,
    {
        if !self.is_active() {
            debug!("View {} is closed, not starting {}", self.name, key);
            return;
        }

        let active = Arc::clone(&self.active);
        let view = self.name.clone();
        let operation = key.to_string();
        let handle = tokio::spawn(async move {
            let output = fut.await;
            if active.load(Ordering::Acquire) {
                apply(output);
            } else {
                debug!("Discarding {} result for closed view {}", operation, view);
            }
        });

        self.track(key, handle.abort_handle());
    }

    /// Awaits `fut` as a tracked task. Returns `None` when the view closed
    /// or the task was superseded before a result arrived.
    pub async fn run<F, T>(&self, key: &str, fut: F) -> Option<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if !self.is_active() {
            debug!("View {} is closed, not starting {}", self.name, key);
            return None;
        }

        let handle = tokio::spawn(fut);
        self.track(key, handle.abort_handle());

        match handle.await {
            Ok(output) if self.is_active() => Some(output),
            Ok(_) => {
                debug!("Discarding {} result for closed view {}", key, self.name);
                None
            }
            Err(e) if e.is_cancelled() => {
                debug!("{} in view {} was cancelled", key, self.name);
                None
            }
            Err(e) => {
                error!("{} in view {} panicked: {}", key, self.name, e);
                None
            }
        }
    }

    fn track(&self, key: &str, handle: AbortHandle) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        tasks.retain(|_, task| !task.is_finished());
        if let Some(previous) = tasks.insert(key.to_string(), handle) {
            debug!("Superseding in-flight {} in view {}", key, self.name);
            previous.abort();
        }
    }

    /// Marks the view as torn down and aborts all in-flight requests.
    pub fn close(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            debug!("Closing view {}", self.name);
        }
        let mut tasks = self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for (_, task) in tasks.drain() {
            task.abort();
        }
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_result_applied_while_open() {
        let scope = ViewScope::new("appointments");
        let applied = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&applied);

        scope.spawn("load", async { 7 }, move |value| {
            sink.store(value, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(applied.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_result_discarded_after_close() {
        let scope = ViewScope::new("slots");
        let applied = Arc::new(AtomicBool::new(false));
        let sink = Arc::clone(&applied);

        scope.spawn(
            "fetch",
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
            },
            move |_| sink.store(true, Ordering::SeqCst),
        );
        scope.close();

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!applied.load(Ordering::SeqCst));
        assert!(!scope.is_active());
    }

    #[tokio::test]
    async fn test_same_key_supersedes_previous_request() {
        let scope = ViewScope::new("booking");
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let sink = Arc::clone(&hits);
            scope.spawn(
                "slots",
                async {
                    tokio::time::sleep(Duration::from_millis(40)).await;
                },
                move |_| {
                    sink.fetch_add(1, Ordering::SeqCst);
                },
            );
        }

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_returns_none_when_closed() {
        let scope = ViewScope::new("home");
        assert_eq!(scope.run("count", async { 3 }).await, Some(3));

        scope.close();
        assert_eq!(scope.run("count", async { 3 }).await, None);
    }
}
