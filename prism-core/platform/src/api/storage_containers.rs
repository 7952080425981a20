//! 存储容器管理 API

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::info;

use crate::client::PrismClient;
use crate::error::Result;

const CONFIG_BASE: &str = "/api/clustermgmt/v4.0/config/storage-containers";
const STATS_BASE: &str = "/api/clustermgmt/v4.0/stats/storage-containers";

/// 存储容器管理 API
pub struct StorageContainersApi<'a> {
    client: &'a PrismClient,
}

impl<'a> StorageContainersApi<'a> {
    /// 创建新的存储容器 API 实例
    pub(crate) fn new(client: &'a PrismClient) -> Self {
        Self { client }
    }

    /// 查询存储容器列表
    pub async fn list_storage_containers(&self) -> Result<Vec<Value>> {
        info!("查询存储容器列表");
        self.client.get_list(CONFIG_BASE).await
    }

    /// 查询存储容器详情
    pub async fn get_storage_container(&self, ext_id: &str) -> Result<Value> {
        info!("查询存储容器详情: {}", ext_id);
        self.client.get(&format!("{}/{}", CONFIG_BASE, ext_id)).await
    }

    /// 查询存储容器容量统计
    ///
    /// 按给定时间窗口拉取容量时间序列（容量/剩余/已分配字节数）。
    pub async fn get_storage_container_stats(
        &self,
        ext_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Value> {
        info!("查询存储容器统计: {}", ext_id);
        let path = format!(
            "{}/{}?$startTime={}&$endTime={}",
            STATS_BASE,
            ext_id,
            start_time.to_rfc3339(),
            end_time.to_rfc3339(),
        );
        self.client.get(&path).await
    }
}
