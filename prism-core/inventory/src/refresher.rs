//! 刷新协调器
//!
//! 把采集器、解析器、持久化器串成一轮完整的调谐：
//! 采集 → 解析 → 单事务提交。同一端点同一时刻只跑一轮刷新，
//! 由调用方保证；不同端点的刷新互不共享可变状态。

use sqlx::SqlitePool;
use tracing::info;

use prism_platform::PrismClient;

use crate::collector::{Collector, TargetSet};
use crate::error::Result;
use crate::parser::InventoryParser;
use crate::persister::{CommitStats, InventoryPersister};

/// 刷新范围
#[derive(Debug, Clone)]
pub enum RefreshTarget {
    /// 全量刷新：端点下全部资源
    Full,
    /// 定向刷新：仅指定外部引用集合
    Targets(TargetSet),
}

/// 刷新协调器
pub struct Refresher<'a> {
    client: &'a PrismClient,
    pool: &'a SqlitePool,
}

impl<'a> Refresher<'a> {
    pub fn new(client: &'a PrismClient, pool: &'a SqlitePool) -> Self {
        Self { client, pool }
    }

    /// 对指定端点执行一轮刷新
    pub async fn refresh(&self, endpoint_id: i64, target: &RefreshTarget) -> Result<CommitStats> {
        let collector = Collector::new(self.client);

        let collected = match target {
            RefreshTarget::Full => {
                info!("开始全量刷新: 端点 {}", endpoint_id);
                collector.collect_full().await?
            }
            RefreshTarget::Targets(targets) => {
                if targets.is_empty() {
                    info!("定向刷新目标集为空: 端点 {}, 本轮跳过", endpoint_id);
                    return Ok(CommitStats::default());
                }
                info!("开始定向刷新: 端点 {}", endpoint_id);
                collector.collect_targets(targets).await?
            }
        };

        let mut persister = InventoryPersister::new(endpoint_id);
        InventoryParser::new(&collected).parse(&mut persister);
        let stats = persister.commit(self.pool).await?;

        info!("刷新完成: 端点 {}", endpoint_id);
        Ok(stats)
    }
}
