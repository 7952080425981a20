//! 网卡挂载/卸载
//!
//! 与电源操作同样走「取令牌 → 变更」；卸载前先在本地校验网卡
//! 引用是合法 UUID，不合法的引用不发出任何远端调用。

use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{OpsError, Result};
use crate::power::VmOps;
use crate::retry::with_concurrency_token;

impl<'a> VmOps<'a> {
    /// 挂载网卡到指定子网，可选指定 MAC 地址
    pub async fn attach_nic(
        &self,
        vm_ref: &str,
        subnet_ref: &str,
        mac_address: Option<&str>,
    ) -> Result<Value> {
        let nic_spec = build_nic_spec(subnet_ref, mac_address);
        with_concurrency_token(
            || self.fetch_token(vm_ref),
            |etag, request_id| {
                let nic_spec = nic_spec.clone();
                async move {
                    self.client
                        .vms()
                        .create_nic(vm_ref, &etag, &request_id, nic_spec)
                        .await
                        .map_err(OpsError::from)
                }
            },
        )
        .await
    }

    /// 卸载网卡
    pub async fn detach_nic(&self, vm_ref: &str, nic_ref: &str) -> Result<Value> {
        if Uuid::parse_str(nic_ref).is_err() {
            return Err(OpsError::Validation(format!(
                "网卡引用不是合法 UUID: {}",
                nic_ref
            )));
        }

        with_concurrency_token(
            || self.fetch_token(vm_ref),
            |etag, request_id| async move {
                self.client
                    .vms()
                    .delete_nic(vm_ref, nic_ref, &etag, &request_id)
                    .await
                    .map_err(OpsError::from)
            },
        )
        .await
    }
}

fn build_nic_spec(subnet_ref: &str, mac_address: Option<&str>) -> Value {
    let mut spec = json!({
        "networkInfo": {
            "subnet": {"extId": subnet_ref}
        }
    });
    if let Some(mac) = mac_address {
        spec["backingInfo"] = json!({"macAddress": mac});
    }
    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nic_spec_with_and_without_mac() {
        let bare = build_nic_spec("subnet-1", None);
        assert_eq!(bare["networkInfo"]["subnet"]["extId"], "subnet-1");
        assert!(bare.get("backingInfo").is_none());

        let with_mac = build_nic_spec("subnet-1", Some("50:6b:8d:00:00:01"));
        assert_eq!(with_mac["backingInfo"]["macAddress"], "50:6b:8d:00:00:01");
    }
}
