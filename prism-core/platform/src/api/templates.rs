//! 模板管理 API

use serde_json::Value;
use tracing::info;

use crate::client::PrismClient;
use crate::error::Result;

const BASE: &str = "/api/vmm/v4.0/content/templates";

/// 模板管理 API
pub struct TemplatesApi<'a> {
    client: &'a PrismClient,
}

impl<'a> TemplatesApi<'a> {
    /// 创建新的模板 API 实例
    pub(crate) fn new(client: &'a PrismClient) -> Self {
        Self { client }
    }

    /// 查询模板列表
    pub async fn list_templates(&self) -> Result<Vec<Value>> {
        info!("查询模板列表");
        self.client.get_list(BASE).await
    }

    /// 查询模板详情
    pub async fn get_template(&self, ext_id: &str) -> Result<Value> {
        info!("查询模板详情: {}", ext_id);
        self.client.get(&format!("{}/{}", BASE, ext_id)).await
    }
}
