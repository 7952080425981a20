//! 清单持久化器
//!
//! 声明各实体集合的自然键与参与 upsert 的属性集，暂存解析器产出的
//! 构建项，并在一个事务内将整张图调谐进本地存储。
//!
//! 跨实体链接以**惰性引用**（自然键字符串）暂存，提交时通过本次
//! 提交过程中逐步建立的 ems_ref -> 代理键索引解析，构建阶段从不
//! 触发存储查询，因此集群/主机/虚拟机的构建顺序互不约束。
//!
//! 本轮未暂存的既有行一律保持不动（条目删除由外部协作方负责）；
//! 硬件子设备（磁盘/网络/客户设备）例外，按被暂存的硬件整体重建。

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use prism_storage::{
    ClusterRepository, DiskRepository, GuestDeviceRepository, HardwareRepository,
    HostRepository, HostStorageRepository, LanRepository, NetworkRepository,
    OperatingSystemRepository, StorageRepository, TemplateRepository, VmRepository, VmUpsert,
};

use crate::error::Result;

/// 集群构建项
#[derive(Debug, Clone)]
pub struct ClusterBuild {
    pub ems_ref: String,
    pub name: Option<String>,
    pub uid_ems: Option<String>,
}

/// 主机构建项
#[derive(Debug, Clone)]
pub struct HostBuild {
    pub ems_ref: String,
    pub name: Option<String>,
    /// 所属集群的惰性引用
    pub cluster_ref: Option<String>,
    pub memory_mb: Option<i64>,
    pub cpu_sockets: Option<i64>,
    pub cpu_total_cores: Option<i64>,
}

/// 存储容器构建项
#[derive(Debug, Clone)]
pub struct StorageBuild {
    pub ems_ref: String,
    pub name: Option<String>,
    pub store_type: Option<String>,
    pub total_space: Option<i64>,
    pub free_space: Option<i64>,
    pub uncommitted: Option<i64>,
    pub location: Option<String>,
}

/// LAN/子网构建项，键为稳定网络 UID
#[derive(Debug, Clone)]
pub struct LanBuild {
    pub uid_ems: String,
    pub ems_ref: Option<String>,
    pub name: Option<String>,
    pub tag: Option<i64>,
}

/// 模板构建项
#[derive(Debug, Clone)]
pub struct TemplateBuild {
    pub ems_ref: String,
    pub uid_ems: Option<String>,
    pub name: Option<String>,
    pub vendor: Option<String>,
    pub location: Option<String>,
    pub raw_power_state: Option<String>,
}

/// 硬件构建项
#[derive(Debug, Clone, Default)]
pub struct HardwareBuild {
    pub memory_mb: Option<i64>,
    pub cpu_sockets: Option<i64>,
    pub cpu_cores_per_socket: Option<i64>,
    pub cpu_total_cores: Option<i64>,
    pub guest_os: Option<String>,
}

/// 磁盘构建项
#[derive(Debug, Clone)]
pub struct DiskBuild {
    pub device_name: String,
    pub device_type: Option<String>,
    pub controller_type: Option<String>,
    pub size_mb: Option<i64>,
    pub location: Option<String>,
    pub filename: Option<String>,
    /// 所属存储容器的惰性引用；无法归属时为 None
    pub storage_ref: Option<String>,
    pub bootable: bool,
}

/// 网卡构建项（设备 + 可选网络子记录）
#[derive(Debug, Clone)]
pub struct NicBuild {
    pub uid_ems: String,
    pub device_name: String,
    pub address: Option<String>,
    pub ipaddress: Option<String>,
    pub ipv6address: Option<String>,
    /// LAN 惰性引用：子网外部引用，缺失时为网络 UID
    pub lan_ref: Option<String>,
}

/// 虚拟机构建项（含硬件与子设备）
#[derive(Debug, Clone)]
pub struct VmBuild {
    pub ems_ref: String,
    pub uid_ems: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub vendor: Option<String>,
    pub raw_power_state: Option<String>,
    pub power_state: Option<String>,
    pub connection_state: Option<String>,
    pub boot_time: Option<DateTime<Utc>>,
    pub host_ref: Option<String>,
    pub cluster_ref: Option<String>,
    pub hardware: HardwareBuild,
    pub os_product_name: Option<String>,
    pub disks: Vec<DiskBuild>,
    pub nics: Vec<NicBuild>,
}

/// 主机-存储关联构建项（惰性引用对）
#[derive(Debug, Clone)]
pub struct HostStorageBuild {
    pub host_ref: String,
    pub storage_ref: String,
}

/// 一次提交的行计数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitStats {
    pub clusters: usize,
    pub hosts: usize,
    pub storages: usize,
    pub lans: usize,
    pub templates: usize,
    pub vms: usize,
    pub disks: usize,
    pub networks: usize,
    pub guest_devices: usize,
    pub host_storages: usize,
}

/// 清单持久化器
pub struct InventoryPersister {
    endpoint_id: i64,
    clusters: BTreeMap<String, ClusterBuild>,
    hosts: BTreeMap<String, HostBuild>,
    storages: BTreeMap<String, StorageBuild>,
    lans: BTreeMap<String, LanBuild>,
    templates: BTreeMap<String, TemplateBuild>,
    vms: BTreeMap<String, VmBuild>,
    host_storages: Vec<HostStorageBuild>,
}

impl InventoryPersister {
    pub fn new(endpoint_id: i64) -> Self {
        Self {
            endpoint_id,
            clusters: BTreeMap::new(),
            hosts: BTreeMap::new(),
            storages: BTreeMap::new(),
            lans: BTreeMap::new(),
            templates: BTreeMap::new(),
            vms: BTreeMap::new(),
            host_storages: Vec::new(),
        }
    }

    pub fn endpoint_id(&self) -> i64 {
        self.endpoint_id
    }

    /// 暂存集群（同键重复暂存时后者覆盖前者）
    pub fn build_cluster(&mut self, build: ClusterBuild) {
        self.clusters.insert(build.ems_ref.clone(), build);
    }

    /// 暂存主机
    pub fn build_host(&mut self, build: HostBuild) {
        self.hosts.insert(build.ems_ref.clone(), build);
    }

    /// 暂存存储容器
    pub fn build_storage(&mut self, build: StorageBuild) {
        self.storages.insert(build.ems_ref.clone(), build);
    }

    /// 暂存 LAN（键为稳定网络 UID，同 UID 永不产生第二行）
    pub fn build_lan(&mut self, build: LanBuild) {
        self.lans.insert(build.uid_ems.clone(), build);
    }

    /// 暂存模板
    pub fn build_template(&mut self, build: TemplateBuild) {
        self.templates.insert(build.ems_ref.clone(), build);
    }

    /// 暂存虚拟机（连同硬件与子设备）
    pub fn build_vm(&mut self, build: VmBuild) {
        self.vms.insert(build.ems_ref.clone(), build);
    }

    /// 暂存主机-存储关联
    pub fn build_host_storage(&mut self, build: HostStorageBuild) {
        self.host_storages.push(build);
    }

    /// 将整张暂存图在单个事务内调谐进存储
    ///
    /// 提交顺序保证惰性引用的被引用方先于引用方落库：
    /// 集群 → 主机 → 存储容器 → LAN → 模板 → 虚拟机(硬件/系统/子设备)
    /// → 主机-存储关联。任何一步失败整体回滚。
    pub async fn commit(&self, pool: &SqlitePool) -> Result<CommitStats> {
        let mut tx = pool.begin().await.map_err(prism_storage::StorageError::from)?;
        let mut stats = CommitStats::default();

        // 提交过程中逐步建立的自然键 -> 代理键索引；定向刷新中
        // 未被本轮暂存的被引用方在提交时按自然键回查补充
        let mut cluster_ids: HashMap<String, i64> = HashMap::new();
        let mut host_ids: HashMap<String, i64> = HashMap::new();
        let mut storage_ids: HashMap<String, i64> = HashMap::new();
        let mut lan_ids: HashMap<String, i64> = HashMap::new();

        for build in self.clusters.values() {
            let id = ClusterRepository::upsert_tx(
                &mut tx,
                self.endpoint_id,
                &build.ems_ref,
                build.name.as_deref(),
                build.uid_ems.as_deref(),
            )
            .await?;
            cluster_ids.insert(build.ems_ref.clone(), id);
            stats.clusters += 1;
        }

        for build in self.hosts.values() {
            let cluster_id = resolve_ref(
                &mut tx,
                &mut cluster_ids,
                CLUSTER_BY_REF,
                self.endpoint_id,
                build.cluster_ref.as_deref(),
            )
            .await?;
            let id = HostRepository::upsert_tx(
                &mut tx,
                self.endpoint_id,
                &build.ems_ref,
                build.name.as_deref(),
                cluster_id,
                build.memory_mb,
                build.cpu_sockets,
                build.cpu_total_cores,
            )
            .await?;
            host_ids.insert(build.ems_ref.clone(), id);
            stats.hosts += 1;
        }

        for build in self.storages.values() {
            let id = StorageRepository::upsert_tx(
                &mut tx,
                self.endpoint_id,
                &build.ems_ref,
                build.name.as_deref(),
                build.store_type.as_deref(),
                build.total_space,
                build.free_space,
                build.uncommitted,
                build.location.as_deref(),
            )
            .await?;
            storage_ids.insert(build.ems_ref.clone(), id);
            stats.storages += 1;
        }

        for build in self.lans.values() {
            let id = LanRepository::upsert_tx(
                &mut tx,
                self.endpoint_id,
                &build.uid_ems,
                build.ems_ref.as_deref(),
                build.name.as_deref(),
                build.tag,
            )
            .await?;
            // LAN 可按子网外部引用或网络 UID 两种键被引用
            lan_ids.insert(build.uid_ems.clone(), id);
            if let Some(ems_ref) = build.ems_ref.as_deref() {
                lan_ids.insert(ems_ref.to_string(), id);
            }
            stats.lans += 1;
        }

        for build in self.templates.values() {
            TemplateRepository::upsert_tx(
                &mut tx,
                self.endpoint_id,
                &build.ems_ref,
                build.uid_ems.as_deref(),
                build.name.as_deref(),
                build.vendor.as_deref(),
                build.location.as_deref(),
                build.raw_power_state.as_deref(),
            )
            .await?;
            stats.templates += 1;
        }

        for build in self.vms.values() {
            let host_id = resolve_ref(
                &mut tx,
                &mut host_ids,
                HOST_BY_REF,
                self.endpoint_id,
                build.host_ref.as_deref(),
            )
            .await?;
            let cluster_id = resolve_ref(
                &mut tx,
                &mut cluster_ids,
                CLUSTER_BY_REF,
                self.endpoint_id,
                build.cluster_ref.as_deref(),
            )
            .await?;

            let vm_id = VmRepository::upsert_tx(
                &mut tx,
                self.endpoint_id,
                &VmUpsert {
                    ems_ref: &build.ems_ref,
                    uid_ems: build.uid_ems.as_deref(),
                    name: build.name.as_deref(),
                    description: build.description.as_deref(),
                    location: build.location.as_deref(),
                    vendor: build.vendor.as_deref(),
                    raw_power_state: build.raw_power_state.as_deref(),
                    power_state: build.power_state.as_deref(),
                    connection_state: build.connection_state.as_deref(),
                    boot_time: build.boot_time,
                    host_id,
                    cluster_id,
                },
            )
            .await?;
            stats.vms += 1;

            let hardware_id = HardwareRepository::upsert_tx(
                &mut tx,
                vm_id,
                build.hardware.memory_mb,
                build.hardware.cpu_sockets,
                build.hardware.cpu_cores_per_socket,
                build.hardware.cpu_total_cores,
                build.hardware.guest_os.as_deref(),
            )
            .await?;

            OperatingSystemRepository::upsert_tx(
                &mut tx,
                vm_id,
                build.os_product_name.as_deref(),
            )
            .await?;

            // 子设备按本轮构建整体重建
            DiskRepository::delete_by_hardware_tx(&mut tx, hardware_id).await?;
            NetworkRepository::delete_by_hardware_tx(&mut tx, hardware_id).await?;
            GuestDeviceRepository::delete_by_hardware_tx(&mut tx, hardware_id).await?;

            for disk in &build.disks {
                let storage_id = resolve_ref(
                    &mut tx,
                    &mut storage_ids,
                    STORAGE_BY_REF,
                    self.endpoint_id,
                    disk.storage_ref.as_deref(),
                )
                .await?;
                DiskRepository::insert_tx(
                    &mut tx,
                    hardware_id,
                    &disk.device_name,
                    disk.device_type.as_deref(),
                    disk.controller_type.as_deref(),
                    disk.size_mb,
                    disk.location.as_deref(),
                    disk.filename.as_deref(),
                    storage_id,
                    disk.bootable,
                )
                .await?;
                stats.disks += 1;
            }

            for nic in &build.nics {
                let network_id = match nic.ipaddress.as_deref() {
                    Some(ipaddress) => {
                        let id = NetworkRepository::insert_tx(
                            &mut tx,
                            hardware_id,
                            &nic.device_name,
                            Some(ipaddress),
                            nic.ipv6address.as_deref(),
                        )
                        .await?;
                        stats.networks += 1;
                        Some(id)
                    }
                    None => None,
                };

                let lan_id = resolve_ref(
                    &mut tx,
                    &mut lan_ids,
                    LAN_BY_REF,
                    self.endpoint_id,
                    nic.lan_ref.as_deref(),
                )
                .await?;
                GuestDeviceRepository::insert_tx(
                    &mut tx,
                    hardware_id,
                    &nic.uid_ems,
                    Some(&nic.device_name),
                    Some("ethernet"),
                    Some("ethernet"),
                    nic.address.as_deref(),
                    network_id,
                    lan_id,
                )
                .await?;
                stats.guest_devices += 1;
            }
        }

        for link in &self.host_storages {
            let host_id = resolve_ref(
                &mut tx,
                &mut host_ids,
                HOST_BY_REF,
                self.endpoint_id,
                Some(&link.host_ref),
            )
            .await?;
            let storage_id = resolve_ref(
                &mut tx,
                &mut storage_ids,
                STORAGE_BY_REF,
                self.endpoint_id,
                Some(&link.storage_ref),
            )
            .await?;
            let (Some(host_id), Some(storage_id)) = (host_id, storage_id) else {
                debug!(
                    "跳过无法解析的主机-存储关联: {} -> {}",
                    link.host_ref, link.storage_ref
                );
                continue;
            };
            HostStorageRepository::link_tx(&mut tx, host_id, storage_id).await?;
            stats.host_storages += 1;
        }

        tx.commit().await.map_err(prism_storage::StorageError::from)?;

        info!(
            "清单提交完成: {} 集群, {} 主机, {} 存储, {} LAN, {} 模板, {} 虚拟机, {} 磁盘, {} 网卡",
            stats.clusters,
            stats.hosts,
            stats.storages,
            stats.lans,
            stats.templates,
            stats.vms,
            stats.disks,
            stats.guest_devices
        );
        Ok(stats)
    }
}

const CLUSTER_BY_REF: &str = "SELECT id FROM clusters WHERE endpoint_id = ?1 AND ems_ref = ?2";
const HOST_BY_REF: &str = "SELECT id FROM hosts WHERE endpoint_id = ?1 AND ems_ref = ?2";
const STORAGE_BY_REF: &str = "SELECT id FROM storages WHERE endpoint_id = ?1 AND ems_ref = ?2";
const LAN_BY_REF: &str =
    "SELECT id FROM lans WHERE endpoint_id = ?1 AND (uid_ems = ?2 OR ems_ref = ?2)";

/// 解析惰性引用：先查本次提交索引，索引未命中时在同一事务内
/// 按自然键回查既有行并写回索引；仍找不到即悬空 (None)
async fn resolve_ref(
    conn: &mut SqliteConnection,
    index: &mut HashMap<String, i64>,
    lookup_sql: &str,
    endpoint_id: i64,
    key: Option<&str>,
) -> Result<Option<i64>> {
    let Some(key) = key else {
        return Ok(None);
    };
    if let Some(id) = index.get(key) {
        return Ok(Some(*id));
    }
    let row: Option<(i64,)> = sqlx::query_as(lookup_sql)
        .bind(endpoint_id)
        .bind(key)
        .fetch_optional(conn)
        .await
        .map_err(prism_storage::StorageError::from)?;
    match row {
        Some((id,)) => {
            index.insert(key.to_string(), id);
            Ok(Some(id))
        }
        None => Ok(None),
    }
}
