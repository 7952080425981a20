//! 命令间共享的工具函数

use anyhow::{Context, Result};

use prism_platform::{PrismClient, PrismConfig};
use prism_storage::{Storage, StorageManager};

use crate::config::{CliConfig, EndpointConfig};

/// 打开本地存储
pub async fn open_storage(config: &CliConfig) -> Result<Storage> {
    let manager = StorageManager::new(&config.db_path)
        .await
        .context("打开数据库失败")?;
    Ok(Storage::from_manager(&manager))
}

/// 按端点配置构造平台客户端
pub fn build_client(endpoint: &EndpointConfig) -> Result<PrismClient> {
    let client = PrismClient::new(
        &endpoint.hostname,
        endpoint.port,
        &endpoint.username,
        &endpoint.password,
        PrismConfig {
            verify_ssl: endpoint.verify_ssl,
            ..Default::default()
        },
    )?;
    Ok(client)
}

/// 解析端点名称为 (配置, 本地端点记录 id)
///
/// 端点行不存在时按配置补建，保证清单写入始终有归属。
pub async fn resolve_endpoint(
    config: &CliConfig,
    storage: &Storage,
    name: &str,
) -> Result<(EndpointConfig, i64)> {
    let endpoint = config.get_endpoint(name)?.clone();
    let record = storage
        .endpoints()
        .upsert(
            name,
            &endpoint.hostname,
            endpoint.port as i64,
            &endpoint.username,
            endpoint.verify_ssl,
        )
        .await?;
    Ok((endpoint, record.id))
}
