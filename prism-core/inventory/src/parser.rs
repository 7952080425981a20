//! 清单解析器
//!
//! 将采集到的原始 JSON 资源转换为持久化器的构建项。纯转换：只依赖
//! 采集结果的形状，不访问远端平台，也不访问本地存储。
//!
//! 单条记录（某台虚拟机、某块磁盘、某张网卡）畸形或缺关键字段时
//! 记录告警并仅跳过该条记录，不影响本轮其余资源。
//!
//! 一轮内的解析顺序：主机(同时建立集群-主机索引) → 集群 → 模板 →
//! 子网/LAN → 虚拟机 → 数据存储 → 主机-存储关联。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::collector::CollectedInventory;
use crate::fieldmap;
use crate::persister::{
    ClusterBuild, DiskBuild, HardwareBuild, HostBuild, HostStorageBuild, InventoryPersister,
    LanBuild, NicBuild, StorageBuild, TemplateBuild, VmBuild,
};

const MIB: i64 = 1024 * 1024;

const EXT_ID: &[&str] = &["extId", "ext_id"];

/// 清单解析器
pub struct InventoryParser<'a> {
    collected: &'a CollectedInventory,
    /// 集群 UUID -> 该集群下主机外部引用，解析主机时建立，
    /// 供主机-存储关联使用
    cluster_hosts: HashMap<String, Vec<String>>,
}

impl<'a> InventoryParser<'a> {
    pub fn new(collected: &'a CollectedInventory) -> Self {
        Self {
            collected,
            cluster_hosts: HashMap::new(),
        }
    }

    /// 解析整轮采集结果并暂存进持久化器
    pub fn parse(mut self, persister: &mut InventoryPersister) {
        self.parse_hosts(persister);
        self.parse_clusters(persister);
        self.parse_templates(persister);
        self.parse_subnets(persister);
        for vm in &self.collected.vms {
            self.parse_vm(vm, persister);
        }
        self.parse_datastores(persister);
        self.parse_host_storages(persister);
    }

    fn parse_hosts(&mut self, persister: &mut InventoryPersister) {
        for host in &self.collected.hosts {
            let Some(ems_ref) = fieldmap::lookup_str(host, EXT_ID) else {
                warn!("主机记录缺少 extId, 已跳过");
                continue;
            };

            let cluster_uuid = fieldmap::lookup_str(
                host,
                &["cluster.uuid", "cluster.extId", "cluster.ext_id"],
            );
            if let Some(uuid) = cluster_uuid {
                self.cluster_hosts
                    .entry(uuid.to_string())
                    .or_default()
                    .push(ems_ref.to_string());
            }

            let memory_mb = fieldmap::lookup_i64(
                host,
                &["memorySizeBytes", "memory_size_bytes"],
            )
            .map(|bytes| bytes / MIB);

            persister.build_host(HostBuild {
                ems_ref: ems_ref.to_string(),
                name: fieldmap::lookup_str(host, &["hostName", "host_name", "name"])
                    .map(str::to_string),
                cluster_ref: cluster_uuid.map(str::to_string),
                memory_mb,
                cpu_sockets: fieldmap::lookup_i64(
                    host,
                    &["numberOfCpuSockets", "number_of_cpu_sockets"],
                ),
                cpu_total_cores: fieldmap::lookup_i64(
                    host,
                    &["numberOfCpuCores", "number_of_cpu_cores"],
                ),
            });
        }
    }

    fn parse_clusters(&self, persister: &mut InventoryPersister) {
        for cluster in &self.collected.clusters {
            let Some(ems_ref) = fieldmap::lookup_str(cluster, EXT_ID) else {
                warn!("集群记录缺少 extId, 已跳过");
                continue;
            };
            persister.build_cluster(ClusterBuild {
                ems_ref: ems_ref.to_string(),
                name: fieldmap::lookup_str(cluster, &["name"]).map(str::to_string),
                uid_ems: Some(ems_ref.to_string()),
            });
        }
    }

    fn parse_templates(&self, persister: &mut InventoryPersister) {
        for template in &self.collected.templates {
            let Some(ems_ref) =
                fieldmap::lookup_str(template, &["extId", "ext_id", "uuid", "id"])
            else {
                warn!("模板记录缺少外部引用, 已跳过");
                continue;
            };
            persister.build_template(TemplateBuild {
                ems_ref: ems_ref.to_string(),
                uid_ems: Some(ems_ref.to_string()),
                name: Some(
                    fieldmap::lookup_str(template, &["templateName", "template_name", "name"])
                        .unwrap_or("Unnamed Template")
                        .to_string(),
                ),
                vendor: Some("nutanix".to_string()),
                location: Some(
                    fieldmap::lookup_str(
                        template,
                        &["storageContainerPath", "storage_container_path", "uri"],
                    )
                    .unwrap_or("unknown-location")
                    .to_string(),
                ),
                raw_power_state: Some("never".to_string()),
            });
        }
    }

    /// LAN 以稳定网络 UID 为键暂存；持久化层按该键 upsert，
    /// 同一 UID 在多轮刷新间绝不产生第二行
    fn parse_subnets(&self, persister: &mut InventoryPersister) {
        for subnet in &self.collected.subnets {
            let ems_ref = fieldmap::lookup_str(subnet, EXT_ID).map(str::to_string);
            let uid_ems = network_uid(subnet).or_else(|| ems_ref.clone());
            let Some(uid_ems) = uid_ems else {
                warn!("子网记录缺少网络标识, 已跳过");
                continue;
            };
            persister.build_lan(LanBuild {
                uid_ems,
                ems_ref,
                name: fieldmap::lookup_str(subnet, &["name"]).map(str::to_string),
                tag: fieldmap::lookup_i64(
                    subnet,
                    &["vlanId", "vlan_id", "networkId", "network_id"],
                ),
            });
        }
    }

    fn parse_vm(&self, vm: &Value, persister: &mut InventoryPersister) {
        let Some(ems_ref) = fieldmap::lookup_str(vm, EXT_ID) else {
            warn!("虚拟机记录缺少 extId, 已跳过");
            return;
        };

        let description = fieldmap::lookup_str(vm, &["description"]);
        let os_label = derive_os_label(vm, description);

        let cluster_ref = fieldmap::lookup_str(vm, &["cluster.extId", "cluster.ext_id"]);
        let raw_power_state = fieldmap::lookup_str(vm, &["powerState", "power_state"]);

        let cpu_sockets = fieldmap::lookup_i64(vm, &["numSockets", "num_sockets"]);
        let cpu_cores_per_socket =
            fieldmap::lookup_i64(vm, &["numCoresPerSocket", "num_cores_per_socket"]);
        let hardware = HardwareBuild {
            memory_mb: fieldmap::lookup_i64(vm, &["memorySizeBytes", "memory_size_bytes"])
                .map(|bytes| bytes / MIB),
            cpu_sockets,
            cpu_cores_per_socket,
            cpu_total_cores: match (cpu_sockets, cpu_cores_per_socket) {
                (Some(sockets), Some(cores)) => Some(sockets * cores),
                _ => None,
            },
            guest_os: Some(os_label.clone()),
        };

        let disks = self.parse_disks(vm, ems_ref);
        let nics = parse_nics(vm, ems_ref);

        persister.build_vm(VmBuild {
            ems_ref: ems_ref.to_string(),
            uid_ems: fieldmap::lookup_str(vm, &["biosUuid", "bios_uuid"]).map(str::to_string),
            name: fieldmap::lookup_str(vm, &["name"]).map(str::to_string),
            description: description.map(str::to_string),
            location: Some(cluster_ref.unwrap_or("unknown").to_string()),
            vendor: Some("nutanix".to_string()),
            raw_power_state: raw_power_state.map(str::to_string),
            power_state: Some(normalize_power_state(raw_power_state).to_string()),
            connection_state: Some("connected".to_string()),
            boot_time: fieldmap::lookup_str(vm, &["createTime", "create_time"])
                .and_then(parse_timestamp),
            host_ref: fieldmap::lookup_str(vm, &["host.extId", "host.ext_id"])
                .map(str::to_string),
            cluster_ref: cluster_ref.map(str::to_string),
            hardware,
            os_product_name: Some(os_label),
            disks,
            nics,
        });
    }

    /// 每块后备磁盘与每个 CD-ROM 设备各产出一条磁盘记录
    fn parse_disks(&self, vm: &Value, vm_ref: &str) -> Vec<DiskBuild> {
        let boot_address = fieldmap::lookup(
            vm,
            &[
                "bootConfig.bootDevice.diskAddress",
                "boot_config.boot_device.disk_address",
            ],
        );

        let mut builds = Vec::new();

        if let Some(disks) = fieldmap::lookup_array(vm, &["disks"]) {
            for (index, disk) in disks.iter().enumerate() {
                let size_mb = fieldmap::lookup_i64(
                    disk,
                    &["backingInfo.diskSizeBytes", "backing_info.disk_size_bytes"],
                )
                .map(|bytes| bytes / MIB);

                builds.push(DiskBuild {
                    device_name: format!("Disk {index}"),
                    device_type: Some("disk".to_string()),
                    controller_type: Some(controller_type(disk, "scsi")),
                    size_mb,
                    location: Some("unknown".to_string()),
                    filename: fieldmap::lookup_str(disk, EXT_ID).map(str::to_string),
                    storage_ref: self.resolve_disk_container(disk, vm),
                    bootable: is_boot_device(disk, boot_address),
                });
            }
        }

        if let Some(cdroms) = fieldmap::lookup_array(vm, &["cdRoms", "cd_roms"]) {
            for (index, cdrom) in cdroms.iter().enumerate() {
                let size_mb = fieldmap::lookup_i64(
                    cdrom,
                    &["backingInfo.diskSizeBytes", "backing_info.disk_size_bytes"],
                )
                .map(|bytes| bytes / MIB);

                builds.push(DiskBuild {
                    device_name: format!("CD-ROM {index}"),
                    device_type: Some("cdrom".to_string()),
                    controller_type: Some(controller_type(cdrom, "ide")),
                    size_mb,
                    location: Some("unknown".to_string()),
                    filename: fieldmap::lookup_str(cdrom, EXT_ID).map(str::to_string),
                    storage_ref: self.resolve_disk_container(cdrom, vm),
                    bootable: is_boot_device(cdrom, boot_address),
                });
            }
        }

        if builds.is_empty() {
            debug!("虚拟机 {} 无磁盘设备", vm_ref);
        }
        builds
    }

    /// 磁盘归属容器的解析顺序：磁盘自身后备信息 → 虚拟机级存储配置
    /// → 首个已知容器 → 无法归属 (None)，绝不因此整机失败
    fn resolve_disk_container(&self, disk: &Value, vm: &Value) -> Option<String> {
        fieldmap::lookup_str(
            disk,
            &[
                "backingInfo.storageContainer.extId",
                "backing_info.storage_container.ext_id",
                "backingInfo.storageContainer.uuid",
                "backing_info.storage_container.uuid",
            ],
        )
        .map(str::to_string)
        .or_else(|| {
            fieldmap::lookup_str(
                vm,
                &[
                    "storageConfig.storageContainer.extId",
                    "storage_config.storage_container.ext_id",
                ],
            )
            .map(str::to_string)
        })
        .or_else(|| {
            self.collected
                .datastores
                .first()
                .map(|ds| ds.ext_id.clone())
        })
    }

    fn parse_datastores(&self, persister: &mut InventoryPersister) {
        for ds in &self.collected.datastores {
            if ds.ext_id.is_empty() {
                warn!("存储容器记录缺少外部引用, 已跳过");
                continue;
            }

            // 缺失序列按零落库，容量字段永不为 NULL
            let total_space = latest_stat(
                &ds.stats,
                &["storageCapacityBytes", "storage_capacity_bytes"],
            )
            .or(ds.max_capacity_bytes)
            .unwrap_or(0);
            let free_space = latest_stat(&ds.stats, &["storageFreeBytes", "storage_free_bytes"])
                .unwrap_or(0);
            let uncommitted = latest_stat(
                &ds.stats,
                &["storageUsageBytes", "storage_usage_bytes"],
            )
            .unwrap_or(0);

            debug!(
                "存储容器 {} 容量: 总量 {} 字节, 已用 {} 字节",
                ds.ext_id,
                total_space,
                used_bytes(total_space, Some(free_space))
            );

            persister.build_storage(StorageBuild {
                ems_ref: ds.ext_id.clone(),
                name: ds.name.clone(),
                store_type: Some("NutanixVolume".to_string()),
                total_space: Some(total_space),
                free_space: Some(free_space),
                uncommitted: Some(uncommitted),
                location: ds.cluster_name.clone(),
            });
        }
    }

    /// 集群内每台主机与该集群的每个数据存储建立关联
    fn parse_host_storages(&self, persister: &mut InventoryPersister) {
        for ds in &self.collected.datastores {
            let Some(cluster_uuid) = ds.cluster_uuid.as_deref() else {
                continue;
            };
            let Some(host_refs) = self.cluster_hosts.get(cluster_uuid) else {
                continue;
            };
            for host_ref in host_refs {
                persister.build_host_storage(HostStorageBuild {
                    host_ref: host_ref.clone(),
                    storage_ref: ds.ext_id.clone(),
                });
            }
        }
    }
}

fn parse_nics(vm: &Value, vm_ref: &str) -> Vec<NicBuild> {
    let Some(nics) = fieldmap::lookup_array(vm, &["nics"]) else {
        return Vec::new();
    };

    let mut builds = Vec::new();
    for (index, nic) in nics.iter().enumerate() {
        let Some(uid_ems) = fieldmap::lookup_str(nic, EXT_ID) else {
            warn!("虚拟机 {} 的网卡记录缺少 extId, 已跳过", vm_ref);
            continue;
        };

        // 没有可解析 IPv4 地址的网卡整体跳过
        let Some(ipaddress) = fieldmap::lookup_str(
            nic,
            &[
                "networkInfo.ipv4Config.ipAddress.value",
                "network_info.ipv4_config.ip_address.value",
            ],
        ) else {
            debug!("虚拟机 {} 的网卡 {} 无 IPv4 地址, 已跳过", vm_ref, uid_ems);
            continue;
        };

        // LAN 按子网引用解析，缺失时回退到网络 ID
        let lan_ref = fieldmap::lookup_str(
            nic,
            &[
                "networkInfo.subnet.extId",
                "network_info.subnet.ext_id",
            ],
        )
        .map(str::to_string)
        .or_else(|| {
            fieldmap::lookup(
                nic,
                &["networkInfo.networkId", "network_info.network_id"],
            )
            .map(value_as_key)
        });

        builds.push(NicBuild {
            uid_ems: uid_ems.to_string(),
            device_name: format!("NIC {index}"),
            address: Some(
                fieldmap::lookup_str(
                    nic,
                    &["backingInfo.macAddress", "backing_info.mac_address"],
                )
                .unwrap_or("unknown")
                .to_string(),
            ),
            ipaddress: Some(ipaddress.to_string()),
            ipv6address: None,
            lan_ref,
        });
    }
    builds
}

/// 操作系统标签推导链，先命中者生效：
/// 结构化客户机系统字段 → 机器类型 → 描述中的 `OS: (.+)` → "unknown"
fn derive_os_label(vm: &Value, description: Option<&str>) -> String {
    if let Some(os) = fieldmap::lookup_str(
        vm,
        &[
            "guestTools.guestOsVersion",
            "guest_tools.guest_os_version",
        ],
    ) {
        return os.to_string();
    }
    if let Some(machine_type) = fieldmap::lookup_str(vm, &["machineType", "machine_type"]) {
        return machine_type.to_string();
    }
    if let Some(description) = description {
        if let Some(captured) = capture_os_from_description(description) {
            return captured;
        }
    }
    "unknown".to_string()
}

fn capture_os_from_description(description: &str) -> Option<String> {
    static OS_PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let pattern = OS_PATTERN
        .get_or_init(|| regex::Regex::new(r"OS: (.+)").expect("静态正则必然合法"));
    pattern
        .captures(description)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn normalize_power_state(raw: Option<&str>) -> &'static str {
    match raw {
        Some("ON") => "on",
        Some("OFF") => "off",
        _ => "unknown",
    }
}

fn controller_type(device: &Value, default: &str) -> String {
    fieldmap::lookup_str(
        device,
        &["diskAddress.busType", "disk_address.bus_type"],
    )
    .map(|bus| bus.to_lowercase())
    .unwrap_or_else(|| default.to_string())
}

/// 设备地址与启动配置中的磁盘地址一致即视为启动盘
fn is_boot_device(device: &Value, boot_address: Option<&Value>) -> bool {
    let Some(boot_address) = boot_address else {
        return false;
    };
    let device_address = fieldmap::lookup(device, &["diskAddress", "disk_address"]);
    let bus = |v: &Value| {
        fieldmap::lookup_str(v, &["busType", "bus_type"]).map(|s| s.to_lowercase())
    };
    let index = |v: &Value| fieldmap::lookup_i64(v, &["index"]).unwrap_or(0);

    match device_address {
        Some(address) => {
            bus(address).is_some()
                && bus(address) == bus(boot_address)
                && index(address) == index(boot_address)
        }
        None => false,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// 取容量时间序列中时间戳最大的一个采样值
fn latest_stat(stats: &Value, paths: &[&str]) -> Option<i64> {
    let series = fieldmap::lookup_array(stats, paths)?;
    series
        .iter()
        .max_by_key(|sample| sample_order_key(sample))
        .and_then(|sample| fieldmap::lookup_i64(sample, &["value"]))
}

/// 时间戳既可能是 RFC3339 字符串也可能是整数纪元值；
/// RFC3339 字符串按字典序比较即按时间序比较
fn sample_order_key(sample: &Value) -> (i64, String) {
    match sample.get("timestamp") {
        Some(Value::Number(n)) => (n.as_i64().unwrap_or(0), String::new()),
        Some(Value::String(s)) => (0, s.clone()),
        _ => (i64::MIN, String::new()),
    }
}

/// 子网的稳定网络 UID，缺失时调用方回退到子网外部引用
fn network_uid(subnet: &Value) -> Option<String> {
    fieldmap::lookup(subnet, &["networkId", "network_id"]).map(value_as_key)
}

/// 引用键既可能是字符串也可能是数字（网络 ID）
fn value_as_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 已用容量 = 总量 - 剩余；剩余缺失按已用 0 处理，永不为负
pub(crate) fn used_bytes(total: i64, free: Option<i64>) -> i64 {
    total.saturating_sub(free.unwrap_or(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_os_label_prefers_structured_field() {
        let vm = json!({
            "guestTools": {"guestOsVersion": "CentOS 7"},
            "machineType": "PC",
            "description": "OS: Ubuntu 22.04"
        });
        assert_eq!(derive_os_label(&vm, Some("OS: Ubuntu 22.04")), "CentOS 7");
    }

    #[test]
    fn test_os_label_falls_back_to_machine_type() {
        let vm = json!({"machineType": "Q35", "description": "OS: Ubuntu"});
        assert_eq!(derive_os_label(&vm, Some("OS: Ubuntu")), "Q35");
    }

    #[test]
    fn test_os_label_extracts_from_description() {
        let vm = json!({"description": "Web tier. OS: Ubuntu 22.04"});
        assert_eq!(
            derive_os_label(&vm, Some("Web tier. OS: Ubuntu 22.04")),
            "Ubuntu 22.04"
        );
    }

    #[test]
    fn test_os_label_defaults_to_unknown() {
        let vm = json!({"description": "no hint here"});
        assert_eq!(derive_os_label(&vm, Some("no hint here")), "unknown");
        assert_eq!(derive_os_label(&json!({}), None), "unknown");
    }

    #[test]
    fn test_power_state_normalization() {
        assert_eq!(normalize_power_state(Some("ON")), "on");
        assert_eq!(normalize_power_state(Some("OFF")), "off");
        assert_eq!(normalize_power_state(Some("PAUSED")), "unknown");
        assert_eq!(normalize_power_state(None), "unknown");
    }

    #[test]
    fn test_used_bytes_never_negative() {
        assert_eq!(used_bytes(100, Some(30)), 70);
        assert_eq!(used_bytes(100, None), 0);
        assert_eq!(used_bytes(100, Some(150)), 0);
    }

    #[test]
    fn test_latest_stat_picks_most_recent_sample() {
        let stats = json!({
            "storageFreeBytes": [
                {"timestamp": "2026-08-29T10:00:00Z", "value": 10},
                {"timestamp": "2026-08-29T11:00:00Z", "value": 20},
                {"timestamp": "2026-08-29T09:00:00Z", "value": 30}
            ]
        });
        assert_eq!(
            latest_stat(&stats, &["storageFreeBytes", "storage_free_bytes"]),
            Some(20)
        );
    }

    #[test]
    fn test_latest_stat_empty_or_missing_series() {
        assert_eq!(
            latest_stat(&json!({"storageFreeBytes": []}), &["storageFreeBytes"]),
            None
        );
        assert_eq!(latest_stat(&json!({}), &["storageFreeBytes"]), None);
        assert_eq!(latest_stat(&Value::Null, &["storageFreeBytes"]), None);
    }

    #[test]
    fn test_nic_without_ipv4_is_skipped() {
        let vm = json!({
            "nics": [
                {"extId": "nic-1", "networkInfo": {"ipv4Config": {"ipAddress": {"value": "10.0.0.5"}}}},
                {"extId": "nic-2", "networkInfo": {}}
            ]
        });
        let nics = parse_nics(&vm, "vm-1");
        assert_eq!(nics.len(), 1);
        assert_eq!(nics[0].uid_ems, "nic-1");
        assert_eq!(nics[0].ipaddress.as_deref(), Some("10.0.0.5"));
        assert_eq!(nics[0].address.as_deref(), Some("unknown"));
    }

    #[test]
    fn test_boot_device_matching() {
        let boot = json!({"busType": "SCSI", "index": 0});
        let disk = json!({"diskAddress": {"busType": "SCSI", "index": 0}});
        let other = json!({"diskAddress": {"busType": "SCSI", "index": 1}});
        assert!(is_boot_device(&disk, Some(&boot)));
        assert!(!is_boot_device(&other, Some(&boot)));
        assert!(!is_boot_device(&disk, None));
    }
}
