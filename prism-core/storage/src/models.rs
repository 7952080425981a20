use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 托管端点数据库模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EndpointRecord {
    pub id: i64,
    pub name: String,
    pub hostname: String,
    pub port: i64,
    pub username: String,
    pub verify_ssl: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 集群数据库模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClusterRecord {
    pub id: i64,
    pub endpoint_id: i64,
    /// 远端平台分配的不可变外部引用（自然键）
    pub ems_ref: String,
    pub name: Option<String>,
    pub uid_ems: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// 主机数据库模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HostRecord {
    pub id: i64,
    pub endpoint_id: i64,
    pub ems_ref: String,
    pub name: Option<String>,
    pub cluster_id: Option<i64>,
    pub memory_mb: Option<i64>,
    pub cpu_sockets: Option<i64>,
    pub cpu_total_cores: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

/// 存储容器（数据存储）数据库模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StorageRecord {
    pub id: i64,
    pub endpoint_id: i64,
    pub ems_ref: String,
    pub name: Option<String>,
    pub store_type: Option<String>,
    pub total_space: Option<i64>,
    pub free_space: Option<i64>,
    pub uncommitted: Option<i64>,
    pub location: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// 虚拟机数据库模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VmRecord {
    pub id: i64,
    pub endpoint_id: i64,
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
    pub host_id: Option<i64>,
    pub cluster_id: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

/// 模板数据库模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TemplateRecord {
    pub id: i64,
    pub endpoint_id: i64,
    pub ems_ref: String,
    pub uid_ems: Option<String>,
    pub name: Option<String>,
    pub vendor: Option<String>,
    pub location: Option<String>,
    pub raw_power_state: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// 硬件数据库模型（每台虚拟机/模板恰有一条）
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HardwareRecord {
    pub id: i64,
    pub vm_id: i64,
    pub memory_mb: Option<i64>,
    pub cpu_sockets: Option<i64>,
    pub cpu_cores_per_socket: Option<i64>,
    pub cpu_total_cores: Option<i64>,
    pub guest_os: Option<String>,
}

/// 操作系统数据库模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OperatingSystemRecord {
    pub id: i64,
    pub vm_id: i64,
    pub product_name: Option<String>,
}

/// 磁盘数据库模型，槽位键为 (hardware_id, device_name)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DiskRecord {
    pub id: i64,
    pub hardware_id: i64,
    pub device_name: String,
    pub device_type: Option<String>,
    pub controller_type: Option<String>,
    pub size_mb: Option<i64>,
    pub location: Option<String>,
    /// 后端文件/磁盘外部引用
    pub filename: Option<String>,
    pub storage_id: Option<i64>,
    pub bootable: bool,
}

/// 网卡网络数据库模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NetworkRecord {
    pub id: i64,
    pub hardware_id: i64,
    pub description: String,
    pub ipaddress: Option<String>,
    pub ipv6address: Option<String>,
}

/// 客户设备（网卡）数据库模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GuestDeviceRecord {
    pub id: i64,
    pub hardware_id: i64,
    pub uid_ems: String,
    pub device_name: Option<String>,
    pub device_type: Option<String>,
    pub controller_type: Option<String>,
    /// MAC 地址
    pub address: Option<String>,
    pub network_id: Option<i64>,
    pub lan_id: Option<i64>,
}

/// LAN/子网数据库模型，自然键为 (endpoint_id, uid_ems)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LanRecord {
    pub id: i64,
    pub endpoint_id: i64,
    pub ems_ref: Option<String>,
    pub uid_ems: String,
    pub name: Option<String>,
    /// VLAN 标签
    pub tag: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

/// 主机-存储关联数据库模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HostStorageRecord {
    pub host_id: i64,
    pub storage_id: i64,
}
