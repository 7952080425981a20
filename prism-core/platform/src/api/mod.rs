//! Prism 平台 API 模块
//!
//! 提供按远端子 API 族划分的封装，包括：
//! - 集群/主机管理 (ClustersApi)
//! - 存储容器管理 (StorageContainersApi)
//! - 模板管理 (TemplatesApi)
//! - 虚拟机管理 (VmApi)
//! - 子网管理 (SubnetsApi)
//! - 任务查询 (TasksApi)

pub mod clusters;
pub mod storage_containers;
pub mod subnets;
pub mod tasks;
pub mod templates;
pub mod vms;

pub use clusters::ClustersApi;
pub use storage_containers::StorageContainersApi;
pub use subnets::SubnetsApi;
pub use tasks::TasksApi;
pub use templates::TemplatesApi;
pub use vms::VmApi;
