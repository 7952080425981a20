//! 清单采集器
//!
//! 从远端平台拉取原始资源集合。采集结果是一次刷新内的普通数据，
//! 随管线向下传递，不存在跨刷新的实例级缓存。
//!
//! 两种模式：
//! - 全量采集：列出端点下全部集群/主机/存储容器(含最近一小时容量
//!   统计)/模板/虚拟机(完整配置)/子网
//! - 定向采集：仅按外部引用逐个拉取指定对象

use chrono::{Duration, Utc};
use serde_json::Value;
use tracing::{info, warn};

use prism_platform::{PlatformError, PrismClient};

use crate::error::{InventoryError, Result};
use crate::fieldmap;

/// 存储容器及其容量统计
#[derive(Debug, Clone)]
pub struct DatastoreBundle {
    pub ext_id: String,
    pub name: Option<String>,
    pub max_capacity_bytes: Option<i64>,
    pub cluster_name: Option<String>,
    pub cluster_uuid: Option<String>,
    /// 容量时间序列载荷；统计拉取失败时为 Null
    pub stats: Value,
}

/// 一次刷新采集到的全部原始资源
#[derive(Debug, Clone, Default)]
pub struct CollectedInventory {
    pub clusters: Vec<Value>,
    pub hosts: Vec<Value>,
    pub datastores: Vec<DatastoreBundle>,
    pub templates: Vec<Value>,
    /// 虚拟机完整配置（含磁盘/网卡/启动配置）
    pub vms: Vec<Value>,
    pub subnets: Vec<Value>,
}

/// 定向刷新的外部引用集合
#[derive(Debug, Clone, Default)]
pub struct TargetSet {
    pub vms: Vec<String>,
    pub templates: Vec<String>,
    pub hosts: Vec<String>,
    pub storages: Vec<String>,
    pub clusters: Vec<String>,
}

impl TargetSet {
    pub fn is_empty(&self) -> bool {
        self.vms.is_empty()
            && self.templates.is_empty()
            && self.hosts.is_empty()
            && self.storages.is_empty()
            && self.clusters.is_empty()
    }
}

/// 清单采集器
pub struct Collector<'a> {
    client: &'a PrismClient,
}

impl<'a> Collector<'a> {
    pub fn new(client: &'a PrismClient) -> Self {
        Self { client }
    }

    /// 全量采集
    ///
    /// 单个资源族拉取失败时记录日志并按空集降级；连接/认证错误
    /// 直接中止本轮刷新。
    pub async fn collect_full(&self) -> Result<CollectedInventory> {
        let clusters = degrade("clusters", self.client.clusters().list_clusters().await)?;
        let hosts = degrade("hosts", self.client.clusters().list_hosts().await)?;
        let datastores = self.collect_datastores(&clusters).await?;
        let templates = degrade("templates", self.client.templates().list_templates().await)?;
        let vms = self.collect_vms_full().await?;
        let subnets = degrade("subnets", self.client.subnets().list_subnets().await)?;

        info!(
            "全量采集完成: {} 集群, {} 主机, {} 存储容器, {} 模板, {} 虚拟机, {} 子网",
            clusters.len(),
            hosts.len(),
            datastores.len(),
            templates.len(),
            vms.len(),
            subnets.len()
        );

        Ok(CollectedInventory {
            clusters,
            hosts,
            datastores,
            templates,
            vms,
            subnets,
        })
    }

    /// 定向采集
    ///
    /// 逐个外部引用拉取；单个目标失败会以 `TargetFetch` 错误上抛。
    pub async fn collect_targets(&self, targets: &TargetSet) -> Result<CollectedInventory> {
        let mut collected = CollectedInventory::default();

        for ems_ref in &targets.clusters {
            let cluster = self
                .client
                .clusters()
                .get_cluster(ems_ref)
                .await
                .map_err(|e| target_fetch("clusters", ems_ref, e))?;
            collected.clusters.push(cluster);
        }

        for ems_ref in &targets.hosts {
            let host = self
                .client
                .clusters()
                .get_host(ems_ref)
                .await
                .map_err(|e| target_fetch("hosts", ems_ref, e))?;
            collected.hosts.push(host);
        }

        for ems_ref in &targets.storages {
            let config = self
                .client
                .storage_containers()
                .get_storage_container(ems_ref)
                .await
                .map_err(|e| target_fetch("storages", ems_ref, e))?;
            let Some(ext_id) = container_ext_id(&config) else {
                warn!("存储容器记录缺少外部引用, 已跳过: {}", ems_ref);
                continue;
            };
            collected
                .datastores
                .push(self.bundle_datastore(ext_id, config, &collected.clusters).await);
        }

        for ems_ref in &targets.templates {
            let template = self
                .client
                .templates()
                .get_template(ems_ref)
                .await
                .map_err(|e| target_fetch("templates", ems_ref, e))?;
            collected.templates.push(template);
        }

        for ems_ref in &targets.vms {
            let vm = self
                .client
                .vms()
                .get_vm(ems_ref)
                .await
                .map_err(|e| target_fetch("vms", ems_ref, e))?;
            collected.vms.push(vm);
        }

        info!(
            "定向采集完成: {} 集群, {} 主机, {} 存储容器, {} 模板, {} 虚拟机",
            collected.clusters.len(),
            collected.hosts.len(),
            collected.datastores.len(),
            collected.templates.len(),
            collected.vms.len()
        );

        Ok(collected)
    }

    /// 列出虚拟机摘要后逐台补全详情
    ///
    /// 列表接口只返回摘要，磁盘/网卡/启动配置必须按 ID 拉取；
    /// 单台详情失败时跳过该虚拟机。
    async fn collect_vms_full(&self) -> Result<Vec<Value>> {
        let summaries = degrade("vms", self.client.vms().list_vms().await)?;

        let mut vms = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let Some(ext_id) = fieldmap::lookup_str(&summary, &["extId", "ext_id"]) else {
                warn!("虚拟机摘要缺少 extId, 已跳过");
                continue;
            };

            match self.client.vms().get_vm(ext_id).await {
                Ok(detail) => vms.push(detail),
                Err(e) if is_fatal(&e) => return Err(e.into()),
                Err(e) => {
                    warn!("拉取虚拟机详情失败: {} - {}", ext_id, e);
                }
            }
        }
        Ok(vms)
    }

    /// 采集存储容器及最近一小时容量统计
    async fn collect_datastores(&self, clusters: &[Value]) -> Result<Vec<DatastoreBundle>> {
        let configs = degrade(
            "datastores",
            self.client
                .storage_containers()
                .list_storage_containers()
                .await,
        )?;

        let mut bundles = Vec::with_capacity(configs.len());
        for config in configs {
            // 无外部引用的容器既查不了统计也落不了库
            let Some(ext_id) = container_ext_id(&config) else {
                warn!("存储容器记录缺少外部引用, 已跳过");
                continue;
            };
            bundles.push(self.bundle_datastore(ext_id, config, clusters).await);
        }
        Ok(bundles)
    }

    async fn bundle_datastore(
        &self,
        ext_id: String,
        config: Value,
        clusters: &[Value],
    ) -> DatastoreBundle {
        let name = fieldmap::lookup_str(&config, &["name"]).map(|s| s.to_string());
        let max_capacity_bytes =
            fieldmap::lookup_i64(&config, &["maxCapacityBytes", "max_capacity_bytes"]);
        let cluster_name =
            fieldmap::lookup_str(&config, &["clusterName", "cluster_name"]).map(|s| s.to_string());

        // 容器自带集群引用优先，缺失时按集群名称映射
        let cluster_uuid = fieldmap::lookup_str(&config, &["clusterExtId", "cluster_ext_id"])
            .map(|s| s.to_string())
            .or_else(|| {
                cluster_name.as_deref().and_then(|name| {
                    clusters.iter().find_map(|c| {
                        (fieldmap::lookup_str(c, &["name"]) == Some(name))
                            .then(|| {
                                fieldmap::lookup_str(c, &["extId", "ext_id"]).map(|s| s.to_string())
                            })
                            .flatten()
                    })
                })
            });

        // 最近一小时容量窗口；单个容器统计失败不阻塞采集
        let end_time = Utc::now();
        let start_time = end_time - Duration::hours(1);
        let stats = match self
            .client
            .storage_containers()
            .get_storage_container_stats(&ext_id, start_time, end_time)
            .await
        {
            Ok(stats) => stats,
            Err(e) => {
                warn!("拉取存储容器统计失败: {} - {}", ext_id, e);
                Value::Null
            }
        };

        DatastoreBundle {
            ext_id,
            name,
            max_capacity_bytes,
            cluster_name,
            cluster_uuid,
            stats,
        }
    }
}

/// 解析存储容器记录的外部引用；缺失或为空时返回 None
fn container_ext_id(config: &Value) -> Option<String> {
    fieldmap::lookup_str(
        config,
        &["containerExtId", "container_ext_id", "extId", "ext_id"],
    )
    .filter(|s| !s.is_empty())
    .map(str::to_string)
}

/// 连接/认证错误不可降级
fn is_fatal(err: &PlatformError) -> bool {
    matches!(err, PlatformError::Connection(_) | PlatformError::Auth(_))
}

/// 资源族级降级：失败记录日志并返回空集，致命错误上抛
fn degrade(family: &'static str, result: prism_platform::Result<Vec<Value>>) -> Result<Vec<Value>> {
    match result {
        Ok(items) => Ok(items),
        Err(e) if is_fatal(&e) => Err(e.into()),
        Err(e) => {
            warn!("采集 {} 失败, 按空集处理: {}", family, e);
            Ok(Vec::new())
        }
    }
}

fn target_fetch(family: &'static str, ems_ref: &str, source: PlatformError) -> InventoryError {
    InventoryError::TargetFetch {
        family,
        ems_ref: ems_ref.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_container_ext_id_key_variants() {
        let camel = json!({"containerExtId": "c-1"});
        assert_eq!(container_ext_id(&camel).as_deref(), Some("c-1"));

        let snake = json!({"container_ext_id": "c-2"});
        assert_eq!(container_ext_id(&snake).as_deref(), Some("c-2"));

        let generic = json!({"extId": "c-3"});
        assert_eq!(container_ext_id(&generic).as_deref(), Some("c-3"));
    }

    #[test]
    fn test_container_without_ext_id_yields_none() {
        // 无引用的容器在采集阶段整体跳过，不会发起统计查询
        let missing = json!({"name": "SelfServiceContainer"});
        assert_eq!(container_ext_id(&missing), None);

        let empty = json!({"extId": ""});
        assert_eq!(container_ext_id(&empty), None);
    }
}
