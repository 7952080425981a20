//! Nutanix Prism 平台接入模块
//!
//! 提供与 Prism 管理端 REST API 交互的客户端实现。
//!
//! # 功能
//!
//! - **连接管理** (`PrismClient`): 由主机名/端口/凭据/TLS 校验模式构造
//!   认证句柄，按子 API 族提供访问器
//! - **集群/主机** (`ClustersApi`): 集群与宿主机查询
//! - **存储容器** (`StorageContainersApi`): 容器配置与容量统计
//! - **模板** (`TemplatesApi`): 模板查询
//! - **虚拟机** (`VmApi`): 清单查询与令牌保护的生命周期变更
//! - **子网** (`SubnetsApi`): 子网查询
//! - **任务** (`TasksApi`): 长任务状态轮询
//!
//! # 示例
//!
//! ```ignore
//! use prism_platform::{PrismClient, PrismConfig};
//!
//! let client = PrismClient::new("pc.lab.local", 9440, "admin", "secret", PrismConfig::default())?;
//! client.verify_credentials().await?;
//!
//! let clusters = client.clusters().list_clusters().await?;
//! let (vm, etag) = client.vms().get_vm_with_etag("12e3f98c-...").await?;
//! ```

pub mod api;
pub mod client;
pub mod error;

pub use client::{PrismClient, PrismConfig, REQUEST_ID_HEADER};
pub use error::{PlatformError, Result};

// 导出 API 模块
pub use api::{
    clusters::ClustersApi,
    storage_containers::StorageContainersApi,
    subnets::SubnetsApi,
    tasks::{TaskStatus, TasksApi},
    templates::TemplatesApi,
    vms::VmApi,
};
