//! 集群/主机管理 API

use serde_json::Value;
use tracing::info;

use crate::client::PrismClient;
use crate::error::Result;

const BASE: &str = "/api/clustermgmt/v4.0/config";

/// 集群/主机管理 API
pub struct ClustersApi<'a> {
    client: &'a PrismClient,
}

impl<'a> ClustersApi<'a> {
    /// 创建新的集群 API 实例
    pub(crate) fn new(client: &'a PrismClient) -> Self {
        Self { client }
    }

    /// 查询集群列表
    pub async fn list_clusters(&self) -> Result<Vec<Value>> {
        info!("查询集群列表");
        self.client.get_list(&format!("{}/clusters", BASE)).await
    }

    /// 查询集群详情
    pub async fn get_cluster(&self, ext_id: &str) -> Result<Value> {
        info!("查询集群详情: {}", ext_id);
        self.client.get(&format!("{}/clusters/{}", BASE, ext_id)).await
    }

    /// 查询主机列表
    pub async fn list_hosts(&self) -> Result<Vec<Value>> {
        info!("查询主机列表");
        self.client.get_list(&format!("{}/hosts", BASE)).await
    }

    /// 查询主机详情
    pub async fn get_host(&self, ext_id: &str) -> Result<Value> {
        info!("查询主机详情: {}", ext_id);
        self.client.get(&format!("{}/hosts/{}", BASE, ext_id)).await
    }
}
