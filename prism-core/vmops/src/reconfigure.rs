//! CPU / 内存 / 磁盘重配置
//!
//! 先在本地对照当前配置做校验（核数上界、整除性、内存上界、
//! 磁盘只增不减），校验通过后以令牌保护下发一次配置更新。

use serde_json::{json, Value};
use tracing::info;

use crate::error::{OpsError, Result};
use crate::power::VmOps;
use crate::retry::with_concurrency_token;

/// 单插槽最大核数
pub const MAX_CPU_CORES_PER_SOCKET: i64 = 16;
/// 最大内存 (MB)
pub const MAX_MEMORY_MB: i64 = 1024 * 1024;

const MIB: i64 = 1024 * 1024;

/// 重配置请求
#[derive(Debug, Clone, Default)]
pub struct ReconfigureRequest {
    /// 目标 vCPU 总数
    pub num_vcpus: Option<i64>,
    /// 每插槽核数，缺省沿用当前配置
    pub cores_per_socket: Option<i64>,
    /// 目标内存 (MB)
    pub memory_mb: Option<i64>,
    /// 磁盘扩容列表
    pub disk_resizes: Vec<DiskResize>,
}

/// 磁盘扩容项
#[derive(Debug, Clone)]
pub struct DiskResize {
    pub disk_ref: String,
    pub new_size_mb: i64,
}

impl<'a> VmOps<'a> {
    /// 重配置 CPU / 内存 / 磁盘
    pub async fn reconfigure(&self, vm_ref: &str, request: &ReconfigureRequest) -> Result<Value> {
        let current = self.client.vms().get_vm(vm_ref).await?;
        let spec = build_update_spec(&current, request)?;

        info!("重配置虚拟机: {}", vm_ref);
        with_concurrency_token(
            || self.fetch_token(vm_ref),
            |etag, request_id| {
                let spec = spec.clone();
                async move {
                    self.client
                        .vms()
                        .update_vm(vm_ref, &etag, &request_id, spec)
                        .await
                        .map_err(OpsError::from)
                }
            },
        )
        .await
    }
}

/// 基于当前配置构造更新载荷，所有校验在此完成
fn build_update_spec(current: &Value, request: &ReconfigureRequest) -> Result<Value> {
    let mut spec = current.clone();

    if let Some(num_vcpus) = request.num_vcpus {
        let mut cores_per_socket = request
            .cores_per_socket
            .or_else(|| current["numCoresPerSocket"].as_i64())
            .unwrap_or(1);
        if cores_per_socket == 0 {
            cores_per_socket = 1;
        }

        if cores_per_socket > MAX_CPU_CORES_PER_SOCKET {
            return Err(OpsError::Validation(format!(
                "每插槽核数不能超过 {}",
                MAX_CPU_CORES_PER_SOCKET
            )));
        }
        if num_vcpus % cores_per_socket != 0 {
            return Err(OpsError::Validation(
                "vCPU 总数必须能被每插槽核数整除".to_string(),
            ));
        }

        spec["numSockets"] = json!(num_vcpus / cores_per_socket);
        spec["numCoresPerSocket"] = json!(cores_per_socket);
    }

    if let Some(memory_mb) = request.memory_mb {
        if memory_mb > MAX_MEMORY_MB {
            return Err(OpsError::Validation(format!(
                "内存不能超过 {} MB",
                MAX_MEMORY_MB
            )));
        }
        spec["memorySizeBytes"] = json!(memory_mb * MIB);
    }

    for resize in &request.disk_resizes {
        apply_disk_resize(&mut spec, resize)?;
    }

    Ok(spec)
}

/// 磁盘只增不减；目标磁盘必须存在于当前配置
fn apply_disk_resize(spec: &mut Value, resize: &DiskResize) -> Result<()> {
    let disks = spec["disks"]
        .as_array_mut()
        .ok_or_else(|| OpsError::Validation(format!("磁盘不存在: {}", resize.disk_ref)))?;

    let disk = disks
        .iter_mut()
        .find(|d| d["extId"].as_str() == Some(resize.disk_ref.as_str()))
        .ok_or_else(|| OpsError::Validation(format!("磁盘不存在: {}", resize.disk_ref)))?;

    let current_bytes = disk["backingInfo"]["diskSizeBytes"]
        .as_i64()
        .or_else(|| disk["backing_info"]["disk_size_bytes"].as_i64())
        .unwrap_or(0);
    let new_bytes = resize.new_size_mb * MIB;

    if new_bytes < current_bytes {
        return Err(OpsError::Validation(format!(
            "磁盘 {} 新容量必须不小于当前容量",
            resize.disk_ref
        )));
    }

    disk["backingInfo"]["diskSizeBytes"] = json!(new_bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current_vm() -> Value {
        json!({
            "extId": "vm-1",
            "numSockets": 1,
            "numCoresPerSocket": 2,
            "memorySizeBytes": 4_294_967_296i64,
            "disks": [{
                "extId": "disk-1",
                "backingInfo": {"diskSizeBytes": 10_737_418_240i64}
            }]
        })
    }

    #[test]
    fn test_cpu_reconfigure_derives_sockets() {
        let spec = build_update_spec(
            &current_vm(),
            &ReconfigureRequest {
                num_vcpus: Some(8),
                cores_per_socket: Some(4),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(spec["numSockets"], 2);
        assert_eq!(spec["numCoresPerSocket"], 4);
    }

    #[test]
    fn test_cores_per_socket_bound() {
        let err = build_update_spec(
            &current_vm(),
            &ReconfigureRequest {
                num_vcpus: Some(64),
                cores_per_socket: Some(32),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, OpsError::Validation(_)));
    }

    #[test]
    fn test_vcpus_must_divide_evenly() {
        let err = build_update_spec(
            &current_vm(),
            &ReconfigureRequest {
                num_vcpus: Some(7),
                cores_per_socket: Some(2),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, OpsError::Validation(_)));
    }

    #[test]
    fn test_memory_bound() {
        let err = build_update_spec(
            &current_vm(),
            &ReconfigureRequest {
                memory_mb: Some(MAX_MEMORY_MB + 1),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, OpsError::Validation(_)));

        let spec = build_update_spec(
            &current_vm(),
            &ReconfigureRequest {
                memory_mb: Some(8192),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(spec["memorySizeBytes"], 8192i64 * 1024 * 1024);
    }

    #[test]
    fn test_disk_resize_is_grow_only() {
        let shrink = ReconfigureRequest {
            disk_resizes: vec![DiskResize {
                disk_ref: "disk-1".to_string(),
                new_size_mb: 5120,
            }],
            ..Default::default()
        };
        assert!(build_update_spec(&current_vm(), &shrink).is_err());

        let grow = ReconfigureRequest {
            disk_resizes: vec![DiskResize {
                disk_ref: "disk-1".to_string(),
                new_size_mb: 20480,
            }],
            ..Default::default()
        };
        let spec = build_update_spec(&current_vm(), &grow).unwrap();
        assert_eq!(
            spec["disks"][0]["backingInfo"]["diskSizeBytes"],
            20480i64 * 1024 * 1024
        );
    }

    #[test]
    fn test_unknown_disk_rejected() {
        let request = ReconfigureRequest {
            disk_resizes: vec![DiskResize {
                disk_ref: "disk-9".to_string(),
                new_size_mb: 20480,
            }],
            ..Default::default()
        };
        assert!(build_update_spec(&current_vm(), &request).is_err());
    }
}
