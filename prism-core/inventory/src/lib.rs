//! 清单调谐管线
//!
//! 把远端平台的资源视图调谐进本地存储，一轮刷新 = 采集 → 解析 →
//! 单事务提交：
//!
//! - **采集器** (`Collector`): 全量或定向拉取原始资源集合
//! - **解析器** (`InventoryParser`): 原始 JSON → 规范化构建项的纯转换
//! - **持久化器** (`InventoryPersister`): 按自然键暂存并在单事务内提交
//! - **刷新协调器** (`Refresher`): 串联三者，对外提供 `refresh`
//!
//! # 示例
//!
//! ```ignore
//! use prism_inventory::{Refresher, RefreshTarget};
//!
//! let refresher = Refresher::new(&client, storage.pool());
//! let stats = refresher.refresh(endpoint_id, &RefreshTarget::Full).await?;
//! ```

pub mod collector;
pub mod error;
pub mod fieldmap;
pub mod parser;
pub mod persister;
pub mod refresher;

pub use collector::{CollectedInventory, Collector, DatastoreBundle, TargetSet};
pub use error::{InventoryError, Result};
pub use parser::InventoryParser;
pub use persister::{
    ClusterBuild, CommitStats, DiskBuild, HardwareBuild, HostBuild, HostStorageBuild,
    InventoryPersister, LanBuild, NicBuild, StorageBuild, TemplateBuild, VmBuild,
};
pub use refresher::{RefreshTarget, Refresher};
