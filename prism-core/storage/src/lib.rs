mod connection;
mod error;
mod models;
mod repositories;

pub use connection::StorageManager;
pub use error::{Result, StorageError};
pub use models::*;
pub use repositories::*;

use sqlx::SqlitePool;

/// 统一的数据访问层入口
pub struct Storage {
    pool: SqlitePool,
    endpoints: EndpointRepository,
    clusters: ClusterRepository,
    hosts: HostRepository,
    storages: StorageRepository,
    vms: VmRepository,
    templates: TemplateRepository,
    hardwares: HardwareRepository,
    operating_systems: OperatingSystemRepository,
    disks: DiskRepository,
    networks: NetworkRepository,
    guest_devices: GuestDeviceRepository,
    lans: LanRepository,
    host_storages: HostStorageRepository,
}

impl Storage {
    /// 从 StorageManager 创建 Storage
    pub fn from_manager(manager: &StorageManager) -> Self {
        Self::from_pool(manager.pool().clone())
    }

    /// 从连接池创建 Storage
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool: pool.clone(),
            endpoints: EndpointRepository::new(pool.clone()),
            clusters: ClusterRepository::new(pool.clone()),
            hosts: HostRepository::new(pool.clone()),
            storages: StorageRepository::new(pool.clone()),
            vms: VmRepository::new(pool.clone()),
            templates: TemplateRepository::new(pool.clone()),
            hardwares: HardwareRepository::new(pool.clone()),
            operating_systems: OperatingSystemRepository::new(pool.clone()),
            disks: DiskRepository::new(pool.clone()),
            networks: NetworkRepository::new(pool.clone()),
            guest_devices: GuestDeviceRepository::new(pool.clone()),
            lans: LanRepository::new(pool.clone()),
            host_storages: HostStorageRepository::new(pool),
        }
    }

    /// 获取端点仓储
    pub fn endpoints(&self) -> &EndpointRepository {
        &self.endpoints
    }

    /// 获取集群仓储
    pub fn clusters(&self) -> &ClusterRepository {
        &self.clusters
    }

    /// 获取主机仓储
    pub fn hosts(&self) -> &HostRepository {
        &self.hosts
    }

    /// 获取存储容器仓储
    pub fn storages(&self) -> &StorageRepository {
        &self.storages
    }

    /// 获取虚拟机仓储
    pub fn vms(&self) -> &VmRepository {
        &self.vms
    }

    /// 获取模板仓储
    pub fn templates(&self) -> &TemplateRepository {
        &self.templates
    }

    /// 获取硬件仓储
    pub fn hardwares(&self) -> &HardwareRepository {
        &self.hardwares
    }

    /// 获取操作系统仓储
    pub fn operating_systems(&self) -> &OperatingSystemRepository {
        &self.operating_systems
    }

    /// 获取磁盘仓储
    pub fn disks(&self) -> &DiskRepository {
        &self.disks
    }

    /// 获取网络仓储
    pub fn networks(&self) -> &NetworkRepository {
        &self.networks
    }

    /// 获取客户设备仓储
    pub fn guest_devices(&self) -> &GuestDeviceRepository {
        &self.guest_devices
    }

    /// 获取 LAN 仓储
    pub fn lans(&self) -> &LanRepository {
        &self.lans
    }

    /// 获取主机-存储关联仓储
    pub fn host_storages(&self) -> &HostStorageRepository {
        &self.host_storages
    }

    /// 获取数据库连接池
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
