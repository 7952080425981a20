//! 虚拟机管理 API
//!
//! 提供虚拟机清单与生命周期操作，包括：
//! - 列表/详情查询（列表接口只返回摘要，完整配置需按 ID 拉取）
//! - 电源操作：开机、关机、ACPI 关机、客机关机、客机重启、复位
//! - 配置变更：CPU/内存更新、网卡挂载/卸载、删除
//!
//! 所有变更调用要求调用方携带紧邻获取的 ETag 并发令牌与新生成的
//! 请求 ID（令牌一次性有效，重试必须重新获取）。

use serde_json::Value;
use tracing::info;

use crate::client::PrismClient;
use crate::error::Result;

const BASE: &str = "/api/vmm/v4.0/ahv/config/vms";

/// 虚拟机管理 API
pub struct VmApi<'a> {
    client: &'a PrismClient,
}

impl<'a> VmApi<'a> {
    /// 创建新的虚拟机 API 实例
    pub(crate) fn new(client: &'a PrismClient) -> Self {
        Self { client }
    }

    /// 查询虚拟机列表（摘要，自动处理分页）
    pub async fn list_vms(&self) -> Result<Vec<Value>> {
        info!("查询虚拟机列表");
        self.client.get_list(BASE).await
    }

    /// 查询虚拟机完整配置（磁盘、网卡、启动配置）
    pub async fn get_vm(&self, ext_id: &str) -> Result<Value> {
        info!("查询虚拟机详情: {}", ext_id);
        self.client.get(&format!("{}/{}", BASE, ext_id)).await
    }

    /// 查询虚拟机详情并返回 ETag 并发令牌
    pub async fn get_vm_with_etag(&self, ext_id: &str) -> Result<(Value, String)> {
        self.client
            .get_with_etag(&format!("{}/{}", BASE, ext_id))
            .await
    }

    /// 开机
    pub async fn power_on(&self, ext_id: &str, etag: &str, request_id: &str) -> Result<Value> {
        info!("虚拟机开机: {}", ext_id);
        self.action(ext_id, "power-on", etag, request_id, None).await
    }

    /// 强制断电
    pub async fn power_off(&self, ext_id: &str, etag: &str, request_id: &str) -> Result<Value> {
        info!("虚拟机断电: {}", ext_id);
        self.action(ext_id, "power-off", etag, request_id, None).await
    }

    /// ACPI 关机
    pub async fn shutdown(&self, ext_id: &str, etag: &str, request_id: &str) -> Result<Value> {
        info!("虚拟机 ACPI 关机: {}", ext_id);
        self.action(ext_id, "shutdown", etag, request_id, None).await
    }

    /// 客机代理关机（需要来宾工具）
    pub async fn shutdown_guest(
        &self,
        ext_id: &str,
        etag: &str,
        request_id: &str,
        power_options: Value,
    ) -> Result<Value> {
        info!("虚拟机客机关机: {}", ext_id);
        self.action(ext_id, "guest-shutdown", etag, request_id, Some(power_options))
            .await
    }

    /// 客机代理重启（需要来宾工具）
    pub async fn reboot_guest(
        &self,
        ext_id: &str,
        etag: &str,
        request_id: &str,
        power_options: Value,
    ) -> Result<Value> {
        info!("虚拟机客机重启: {}", ext_id);
        self.action(ext_id, "guest-reboot", etag, request_id, Some(power_options))
            .await
    }

    /// 复位
    pub async fn reset(&self, ext_id: &str, etag: &str, request_id: &str) -> Result<Value> {
        info!("虚拟机复位: {}", ext_id);
        self.action(ext_id, "reset", etag, request_id, None).await
    }

    /// 删除虚拟机
    pub async fn delete_vm(&self, ext_id: &str, etag: &str, request_id: &str) -> Result<Value> {
        info!("删除虚拟机: {}", ext_id);
        self.client
            .delete_action(&format!("{}/{}", BASE, ext_id), etag, request_id)
            .await
    }

    /// 更新虚拟机配置（CPU/内存等）
    pub async fn update_vm(
        &self,
        ext_id: &str,
        etag: &str,
        request_id: &str,
        spec: Value,
    ) -> Result<Value> {
        info!("更新虚拟机配置: {}", ext_id);
        self.client
            .put_action(&format!("{}/{}", BASE, ext_id), etag, request_id, spec)
            .await
    }

    /// 挂载网卡
    pub async fn create_nic(
        &self,
        vm_ext_id: &str,
        etag: &str,
        request_id: &str,
        nic_spec: Value,
    ) -> Result<Value> {
        info!("虚拟机挂载网卡: {}", vm_ext_id);
        self.client
            .post_action(
                &format!("{}/{}/nics", BASE, vm_ext_id),
                etag,
                request_id,
                Some(nic_spec),
            )
            .await
    }

    /// 卸载网卡
    pub async fn delete_nic(
        &self,
        vm_ext_id: &str,
        nic_ext_id: &str,
        etag: &str,
        request_id: &str,
    ) -> Result<Value> {
        info!("虚拟机卸载网卡: {} / {}", vm_ext_id, nic_ext_id);
        self.client
            .delete_action(
                &format!("{}/{}/nics/{}", BASE, vm_ext_id, nic_ext_id),
                etag,
                request_id,
            )
            .await
    }

    async fn action(
        &self,
        ext_id: &str,
        action: &str,
        etag: &str,
        request_id: &str,
        body: Option<Value>,
    ) -> Result<Value> {
        self.client
            .post_action(
                &format!("{}/{}/$actions/{}", BASE, ext_id, action),
                etag,
                request_id,
                body,
            )
            .await
    }
}
