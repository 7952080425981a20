//! 虚拟机电源与客机操作
//!
//! 每个操作：守卫校验（本地已知状态）→ 取令牌 → 变更。客机级
//! 操作（客机关机/重启）要求来宾工具在位，否则回退到 ACPI 变体；
//! 下发成功后按固定间隔轮询远端任务直至完成或超时。

use serde_json::{json, Value};
use tokio::time::{sleep, Duration, Instant};
use tracing::{info, warn};

use prism_platform::{PrismClient, TaskStatus};

use crate::error::{OpsError, Result};
use crate::guards::{validate_transition, PowerOp};
use crate::retry::with_concurrency_token;

const TASK_POLL_INTERVAL: Duration = Duration::from_secs(10);
const TASK_TIMEOUT: Duration = Duration::from_secs(300);

/// 虚拟机生命周期操作入口
pub struct VmOps<'a> {
    pub(crate) client: &'a PrismClient,
}

impl<'a> VmOps<'a> {
    pub fn new(client: &'a PrismClient) -> Self {
        Self { client }
    }

    /// 开机，仅允许从 OFF 发起
    pub async fn start(&self, vm_ref: &str, known_raw_state: Option<&str>) -> Result<()> {
        validate_transition(PowerOp::Start, known_raw_state)?;
        self.power_action(vm_ref, PowerAction::PowerOn).await?;
        Ok(())
    }

    /// 强制断电，仅允许从 ON 发起
    pub async fn stop(&self, vm_ref: &str, known_raw_state: Option<&str>) -> Result<()> {
        validate_transition(PowerOp::Stop, known_raw_state)?;
        self.power_action(vm_ref, PowerAction::PowerOff).await?;
        Ok(())
    }

    /// 复位，仅允许从 ON 发起
    pub async fn reset(&self, vm_ref: &str, known_raw_state: Option<&str>) -> Result<()> {
        validate_transition(PowerOp::Reset, known_raw_state)?;
        self.power_action(vm_ref, PowerAction::Reset).await?;
        Ok(())
    }

    /// 删除虚拟机，仅允许在 OFF 状态下执行
    pub async fn terminate(&self, vm_ref: &str, known_raw_state: Option<&str>) -> Result<()> {
        validate_transition(PowerOp::Terminate, known_raw_state)?;
        with_concurrency_token(
            || self.fetch_token(vm_ref),
            |etag, request_id| async move {
                self.client
                    .vms()
                    .delete_vm(vm_ref, &etag, &request_id)
                    .await
                    .map_err(OpsError::from)
            },
        )
        .await?;
        Ok(())
    }

    /// 挂起：本平台永久不支持
    pub async fn suspend(&self, _vm_ref: &str, known_raw_state: Option<&str>) -> Result<()> {
        validate_transition(PowerOp::Suspend, known_raw_state)
    }

    /// 客机关机
    ///
    /// 来宾工具未安装时回退为 ACPI 关机；安装时下发客机关机并
    /// 轮询任务直至完成。
    pub async fn shutdown_guest(&self, vm_ref: &str, known_raw_state: Option<&str>) -> Result<()> {
        validate_transition(PowerOp::ShutdownGuest, known_raw_state)?;

        if !self.guest_agent_installed(vm_ref).await? {
            warn!("虚拟机 {} 未安装来宾工具, 回退为 ACPI 关机", vm_ref);
            self.power_action(vm_ref, PowerAction::Shutdown).await?;
            return Ok(());
        }

        let response = with_concurrency_token(
            || self.fetch_token(vm_ref),
            |etag, request_id| async move {
                self.client
                    .vms()
                    .shutdown_guest(vm_ref, &etag, &request_id, guest_power_options())
                    .await
                    .map_err(OpsError::from)
            },
        )
        .await?;

        self.wait_for_task(&task_ref(&response)?).await
    }

    /// 客机重启
    ///
    /// 来宾工具未安装时回退为复位；安装时下发客机重启并轮询任务。
    pub async fn reboot_guest(&self, vm_ref: &str, known_raw_state: Option<&str>) -> Result<()> {
        validate_transition(PowerOp::RebootGuest, known_raw_state)?;

        if !self.guest_agent_installed(vm_ref).await? {
            warn!("虚拟机 {} 未安装来宾工具, 回退为复位", vm_ref);
            self.power_action(vm_ref, PowerAction::Reset).await?;
            return Ok(());
        }

        let response = with_concurrency_token(
            || self.fetch_token(vm_ref),
            |etag, request_id| async move {
                self.client
                    .vms()
                    .reboot_guest(vm_ref, &etag, &request_id, guest_power_options())
                    .await
                    .map_err(OpsError::from)
            },
        )
        .await?;

        self.wait_for_task(&task_ref(&response)?).await
    }

    pub(crate) async fn fetch_token(&self, vm_ref: &str) -> Result<String> {
        let (_, etag) = self.client.vms().get_vm_with_etag(vm_ref).await?;
        Ok(etag)
    }

    async fn power_action(&self, vm_ref: &str, action: PowerAction) -> Result<Value> {
        with_concurrency_token(
            || self.fetch_token(vm_ref),
            |etag, request_id| async move {
                let vms = self.client.vms();
                let result = match action {
                    PowerAction::PowerOn => vms.power_on(vm_ref, &etag, &request_id).await,
                    PowerAction::PowerOff => vms.power_off(vm_ref, &etag, &request_id).await,
                    PowerAction::Shutdown => vms.shutdown(vm_ref, &etag, &request_id).await,
                    PowerAction::Reset => vms.reset(vm_ref, &etag, &request_id).await,
                };
                result.map_err(OpsError::from)
            },
        )
        .await
    }

    async fn guest_agent_installed(&self, vm_ref: &str) -> Result<bool> {
        let vm = self.client.vms().get_vm(vm_ref).await?;
        Ok(vm["isAgentVm"]
            .as_bool()
            .or_else(|| vm["is_agent_vm"].as_bool())
            .unwrap_or(false))
    }

    /// 以固定间隔轮询任务状态，直至成功/失败/超时
    async fn wait_for_task(&self, task: &str) -> Result<()> {
        let deadline = Instant::now() + TASK_TIMEOUT;
        loop {
            let (status, message) = self.client.tasks().get_task_status(task).await?;
            match status {
                TaskStatus::Succeeded => {
                    info!("任务完成: {}", task);
                    return Ok(());
                }
                TaskStatus::Failed => {
                    return Err(OpsError::TaskFailed(
                        message.unwrap_or_else(|| format!("任务 {} 失败", task)),
                    ));
                }
                _ => {
                    if Instant::now() >= deadline {
                        return Err(OpsError::TaskTimeout {
                            task: task.to_string(),
                            timeout_secs: TASK_TIMEOUT.as_secs(),
                        });
                    }
                    sleep(TASK_POLL_INTERVAL).await;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum PowerAction {
    PowerOn,
    PowerOff,
    Shutdown,
    Reset,
}

fn guest_power_options() -> Value {
    json!({
        "guestPowerStateTransitionConfig": {
            "shouldEnableScriptExec": false,
            "shouldFailOnScriptFailure": false
        }
    })
}

/// 从变更响应中取出待轮询的任务引用
fn task_ref(response: &Value) -> Result<String> {
    response["extId"]
        .as_str()
        .or_else(|| response["data"]["extId"].as_str())
        .map(str::to_string)
        .ok_or_else(|| OpsError::Validation("客机操作响应缺少任务引用".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_ref_extraction() {
        let direct = json!({"extId": "task-1"});
        let wrapped = json!({"data": {"extId": "task-2"}});
        let missing = json!({});
        assert_eq!(task_ref(&direct).unwrap(), "task-1");
        assert_eq!(task_ref(&wrapped).unwrap(), "task-2");
        assert!(task_ref(&missing).is_err());
    }
}
