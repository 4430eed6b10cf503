//! 后台任务
//!
//! 每次上传在响应之后启动一个独立的渲染/打印任务（不等待、不重试）。
//! 任务中的 panic 会被捕获并记录，不会影响服务。
//!
//! 默认不限制并发任务数；`RENDER_CONCURRENCY > 0` 时用信号量限制，
//! 超出的任务排队等待而不会被丢弃。

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Panic payload as text
pub fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// 后台任务调度器
#[derive(Debug, Clone)]
pub struct ShotTasks {
    /// `None` = 不限制
    limit: Option<Arc<Semaphore>>,
    in_flight: Arc<AtomicUsize>,
}

impl ShotTasks {
    /// `concurrency == 0` 表示不限制
    pub fn new(concurrency: usize) -> Self {
        Self {
            limit: (concurrency > 0).then(|| Arc::new(Semaphore::new(concurrency))),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 已启动但尚未结束的任务数（含排队中的）
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// 启动一个后台任务
    ///
    /// 返回的句柄可以丢弃；任务结束（包括 panic）时一定会更新计数。
    pub fn spawn<F>(&self, name: &'static str, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let limit = self.limit.clone();
        let in_flight = self.in_flight.clone();
        in_flight.fetch_add(1, Ordering::AcqRel);

        tokio::spawn(async move {
            let _permit = match limit {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };

            let result: Result<(), Box<dyn Any + Send>> =
                AssertUnwindSafe(future).catch_unwind().await;
            if let Err(panic_info) = result {
                tracing::error!(
                    task = %name,
                    panic = %panic_message(panic_info.as_ref()),
                    "Background task panicked"
                );
            }

            in_flight.fetch_sub(1, Ordering::AcqRel);
        })
    }
}

impl Default for ShotTasks {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_panic_is_contained() {
        let tasks = ShotTasks::default();
        let handle = tasks.spawn("boom", async { panic!("render exploded") });
        handle.await.unwrap();
        assert_eq!(tasks.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_bounded_tasks_queue() {
        let tasks = ShotTasks::new(1);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                tasks.spawn("bounded", async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(tasks.in_flight(), 0);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("bad trace"));
        assert_eq!(panic_message(payload.as_ref()), "bad trace");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "Unknown panic");
    }
}
