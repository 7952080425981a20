//! 任务查询 API
//!
//! 客机级长任务（客机关机/重启）返回任务 ext_id，调用方轮询其状态。

use serde_json::Value;
use tracing::debug;

use crate::client::PrismClient;
use crate::error::Result;

const BASE: &str = "/api/prism/v4.0/config/tasks";

/// 远端任务状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Unknown(String),
}

impl TaskStatus {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "QUEUED" => Self::Queued,
            "RUNNING" => Self::Running,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// 任务查询 API
pub struct TasksApi<'a> {
    client: &'a PrismClient,
}

impl<'a> TasksApi<'a> {
    /// 创建新的任务 API 实例
    pub(crate) fn new(client: &'a PrismClient) -> Self {
        Self { client }
    }

    /// 查询任务详情
    pub async fn get_task(&self, ext_id: &str) -> Result<Value> {
        debug!("查询任务: {}", ext_id);
        self.client.get(&format!("{}/{}", BASE, ext_id)).await
    }

    /// 查询任务状态
    pub async fn get_task_status(&self, ext_id: &str) -> Result<(TaskStatus, Option<String>)> {
        let task = self.get_task(ext_id).await?;
        let status = task["status"].as_str().unwrap_or("").to_string();
        let message = task["errorMessages"][0]["message"]
            .as_str()
            .or_else(|| task["legacyErrorMessage"].as_str())
            .map(|s| s.to_string());
        Ok((TaskStatus::from_raw(&status), message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_from_raw() {
        assert_eq!(TaskStatus::from_raw("SUCCEEDED"), TaskStatus::Succeeded);
        assert_eq!(TaskStatus::from_raw("FAILED"), TaskStatus::Failed);
        assert_eq!(TaskStatus::from_raw("RUNNING"), TaskStatus::Running);
        assert_eq!(
            TaskStatus::from_raw("CANCELED"),
            TaskStatus::Unknown("CANCELED".to_string())
        );
    }
}
