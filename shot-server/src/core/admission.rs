//! 准入控制
//!
//! 所有请求（上传、查询、管理）在处理前都要获取一个许可，处理结束后释放，
//! 错误路径同样释放。超出上限的请求排队等待，不会被拒绝。
//! 后台渲染和打印任务不占用许可。

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

use super::error::ServerError;

/// 进程级请求并发上限
#[derive(Debug, Clone)]
pub struct AdmissionControl {
    permits: Arc<Semaphore>,
    max: usize,
}

impl AdmissionControl {
    pub fn new(max: usize) -> Self {
        let max = max.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    /// 等待一个许可；许可在返回值被丢弃时释放
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        self.permits.clone().acquire_owned().await
    }

    /// 当前持有许可的请求数
    pub fn active(&self) -> usize {
        self.max - self.permits.available_permits()
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

/// 准入中间件：每个请求持有一个许可直到响应生成
pub async fn admit(
    State(admission): State<AdmissionControl>,
    request: Request,
    next: Next,
) -> Response {
    let _permit = match admission.acquire().await {
        Ok(permit) => permit,
        Err(e) => return ServerError::Internal(e.into()).into_response(),
    };
    next.run(request).await
}
