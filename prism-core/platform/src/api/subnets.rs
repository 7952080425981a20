//! 子网管理 API

use serde_json::Value;
use tracing::info;

use crate::client::PrismClient;
use crate::error::Result;

const BASE: &str = "/api/networking/v4.0/config/subnets";

/// 子网管理 API
pub struct SubnetsApi<'a> {
    client: &'a PrismClient,
}

impl<'a> SubnetsApi<'a> {
    /// 创建新的子网 API 实例
    pub(crate) fn new(client: &'a PrismClient) -> Self {
        Self { client }
    }

    /// 查询子网列表
    pub async fn list_subnets(&self) -> Result<Vec<Value>> {
        info!("查询子网列表");
        self.client.get_list(BASE).await
    }

    /// 查询子网详情
    pub async fn get_subnet(&self, ext_id: &str) -> Result<Value> {
        info!("查询子网详情: {}", ext_id);
        self.client.get(&format!("{}/{}", BASE, ext_id)).await
    }
}
