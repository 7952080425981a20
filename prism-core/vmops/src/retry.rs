//! 并发令牌重试
//!
//! 每次变更调用遵循「取令牌 → 变更」：紧邻调用前取一次新鲜 ETag，
//! 每次尝试生成新的 v4 请求 ID。令牌一次性有效，命中并发冲突时
//! 重新取令牌短暂退避后重试，超过上限把冲突原样上抛。

use std::future::Future;

use tokio::time::{sleep, Duration};
use tracing::warn;
use uuid::Uuid;

use prism_platform::PlatformError;

use crate::error::{OpsError, Result};

/// 单次变更的最大尝试次数
pub const MAX_MUTATION_ATTEMPTS: u32 = 3;

const CONFLICT_BACKOFF: Duration = Duration::from_millis(200);

/// 以令牌保护执行一次变更
///
/// `fetch_token` 返回新鲜 ETag；`mutate` 以 (etag, request_id)
/// 执行实际调用。
pub async fn with_concurrency_token<T, FetchFut, MutateFut>(
    mut fetch_token: impl FnMut() -> FetchFut,
    mut mutate: impl FnMut(String, String) -> MutateFut,
) -> Result<T>
where
    FetchFut: Future<Output = Result<String>>,
    MutateFut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let etag = fetch_token().await?;
        let request_id = Uuid::new_v4().to_string();

        match mutate(etag, request_id).await {
            Ok(value) => return Ok(value),
            Err(OpsError::Platform(PlatformError::Conflict(detail)))
                if attempt < MAX_MUTATION_ATTEMPTS =>
            {
                warn!(
                    "并发令牌失效 (第 {} 次尝试), 重新取令牌重试: {}",
                    attempt, detail
                );
                sleep(CONFLICT_BACKOFF).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[tokio::test]
    async fn test_conflict_retries_with_fresh_token() {
        let fetched = RefCell::new(Vec::new());
        let used = RefCell::new(Vec::new());

        let result: Result<&str> = with_concurrency_token(
            || {
                let etag = format!("etag-{}", fetched.borrow().len());
                fetched.borrow_mut().push(etag.clone());
                async move { Ok(etag) }
            },
            |etag, request_id| {
                used.borrow_mut().push((etag.clone(), request_id));
                let attempt = used.borrow().len();
                async move {
                    if attempt == 1 {
                        Err(OpsError::Platform(PlatformError::Conflict(
                            "stale etag".to_string(),
                        )))
                    } else {
                        Ok("done")
                    }
                }
            },
        )
        .await;

        assert!(matches!(result, Ok("done")));
        // 恰好两次尝试, 每次都用了新取的令牌
        let used = used.borrow();
        assert_eq!(used.len(), 2);
        assert_eq!(used[0].0, "etag-0");
        assert_eq!(used[1].0, "etag-1");
        assert_ne!(used[0].1, used[1].1);
    }

    #[tokio::test]
    async fn test_conflict_surfaces_after_max_attempts() {
        let attempts = RefCell::new(0u32);

        let result: Result<()> = with_concurrency_token(
            || async { Ok("etag".to_string()) },
            |_etag, _request_id| {
                *attempts.borrow_mut() += 1;
                async {
                    Err(OpsError::Platform(PlatformError::Conflict(
                        "always stale".to_string(),
                    )))
                }
            },
        )
        .await;

        assert!(matches!(
            result,
            Err(OpsError::Platform(PlatformError::Conflict(_)))
        ));
        assert_eq!(*attempts.borrow(), MAX_MUTATION_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_non_conflict_error_is_not_retried() {
        let attempts = RefCell::new(0u32);

        let result: Result<()> = with_concurrency_token(
            || async { Ok("etag".to_string()) },
            |_etag, _request_id| {
                *attempts.borrow_mut() += 1;
                async {
                    Err(OpsError::Platform(PlatformError::NotFound(
                        "vm gone".to_string(),
                    )))
                }
            },
        )
        .await;

        assert!(matches!(
            result,
            Err(OpsError::Platform(PlatformError::NotFound(_)))
        ));
        assert_eq!(*attempts.borrow(), 1);
    }
}
