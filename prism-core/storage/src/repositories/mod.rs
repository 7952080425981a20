//! 清单实体仓储
//!
//! 读取类方法通过连接池执行；协调（upsert/重建）类方法接收
//! `&mut SqliteConnection`，以便持久化器在单个事务内提交整个图。

mod clusters;
mod devices;
mod endpoints;
mod hardware;
mod host_storages;
mod hosts;
mod lans;
mod storages;
mod templates;
mod vms;

pub use clusters::ClusterRepository;
pub use devices::{DiskRepository, GuestDeviceRepository, NetworkRepository};
pub use endpoints::EndpointRepository;
pub use hardware::{HardwareRepository, OperatingSystemRepository};
pub use host_storages::HostStorageRepository;
pub use hosts::HostRepository;
pub use lans::LanRepository;
pub use storages::StorageRepository;
pub use templates::TemplateRepository;
pub use vms::{VmRepository, VmUpsert};
