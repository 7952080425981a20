//! 虚拟机生命周期命令
//!
//! 电源操作先以本地清单里的原始电源状态做守卫校验，操作成功后
//! 把期望状态回写本地；权威状态仍以下一轮刷新为准。

use anyhow::{Context, Result};
use colored::Colorize;

use prism_storage::{Storage, VmRecord};
use prism_vmops::{console_url, VmOps};

use crate::config::CliConfig;

use super::common;

pub async fn handle(action: crate::VmAction) -> Result<()> {
    match action {
        crate::VmAction::List { endpoint } => list_vms(&endpoint).await,
        crate::VmAction::Start { endpoint, vm_ref } => {
            power_op(&endpoint, &vm_ref, PowerCommand::Start).await
        }
        crate::VmAction::Stop { endpoint, vm_ref } => {
            power_op(&endpoint, &vm_ref, PowerCommand::Stop).await
        }
        crate::VmAction::Shutdown { endpoint, vm_ref } => {
            power_op(&endpoint, &vm_ref, PowerCommand::Shutdown).await
        }
        crate::VmAction::Reboot { endpoint, vm_ref } => {
            power_op(&endpoint, &vm_ref, PowerCommand::Reboot).await
        }
        crate::VmAction::Reset { endpoint, vm_ref } => {
            power_op(&endpoint, &vm_ref, PowerCommand::Reset).await
        }
        crate::VmAction::Terminate { endpoint, vm_ref } => {
            power_op(&endpoint, &vm_ref, PowerCommand::Terminate).await
        }
        crate::VmAction::Console { endpoint, vm_ref } => show_console(&endpoint, &vm_ref).await,
    }
}

#[derive(Debug, Clone, Copy)]
enum PowerCommand {
    Start,
    Stop,
    Shutdown,
    Reboot,
    Reset,
    Terminate,
}

impl PowerCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Shutdown => "shutdown",
            Self::Reboot => "reboot",
            Self::Reset => "reset",
            Self::Terminate => "terminate",
        }
    }

    /// 操作成功后的本地期望状态；None 表示不回写
    fn expected_state(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::Start | Self::Reboot | Self::Reset => Some(("ON", "on")),
            Self::Stop | Self::Shutdown => Some(("OFF", "off")),
            Self::Terminate => None,
        }
    }
}

async fn list_vms(endpoint_name: &str) -> Result<()> {
    let config = CliConfig::load()?;
    let storage = common::open_storage(&config).await?;
    let (_, endpoint_id) = common::resolve_endpoint(&config, &storage, endpoint_name).await?;

    let vms = storage.vms().list_by_endpoint(endpoint_id).await?;
    if vms.is_empty() {
        println!("本地清单为空, 请先执行 refresh");
        return Ok(());
    }

    for vm in vms {
        let state = vm.power_state.as_deref().unwrap_or("unknown");
        let state_colored = match state {
            "on" => state.green(),
            "off" => state.red(),
            _ => state.yellow(),
        };
        println!(
            "{:40} {:8} {}",
            vm.ems_ref,
            state_colored,
            vm.name.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn power_op(endpoint_name: &str, vm_ref: &str, command: PowerCommand) -> Result<()> {
    let config = CliConfig::load()?;
    let storage = common::open_storage(&config).await?;
    let (endpoint, endpoint_id) = common::resolve_endpoint(&config, &storage, endpoint_name).await?;
    let client = common::build_client(&endpoint)?;

    let vm = known_vm(&storage, endpoint_id, vm_ref).await?;
    let raw_state = vm.raw_power_state.as_deref();
    let ops = VmOps::new(&client);

    match command {
        PowerCommand::Start => ops.start(vm_ref, raw_state).await?,
        PowerCommand::Stop => ops.stop(vm_ref, raw_state).await?,
        PowerCommand::Shutdown => ops.shutdown_guest(vm_ref, raw_state).await?,
        PowerCommand::Reboot => ops.reboot_guest(vm_ref, raw_state).await?,
        PowerCommand::Reset => ops.reset(vm_ref, raw_state).await?,
        PowerCommand::Terminate => ops.terminate(vm_ref, raw_state).await?,
    }

    if let Some((raw, normalized)) = command.expected_state() {
        storage
            .vms()
            .update_power_state(vm.id, raw, normalized)
            .await?;
    }

    println!("{} {} 完成: {}", "✓".green(), command.name(), vm_ref);
    Ok(())
}

async fn show_console(endpoint_name: &str, vm_ref: &str) -> Result<()> {
    let config = CliConfig::load()?;
    let storage = common::open_storage(&config).await?;
    let (endpoint, endpoint_id) = common::resolve_endpoint(&config, &storage, endpoint_name).await?;

    let vm = known_vm(&storage, endpoint_id, vm_ref).await?;
    let url = console_url(
        &endpoint.hostname,
        vm.uid_ems.as_deref().unwrap_or(&vm.ems_ref),
        vm.name.as_deref().unwrap_or(&vm.ems_ref),
        vm.raw_power_state.as_deref(),
    )?;

    println!("{}", url);
    Ok(())
}

async fn known_vm(storage: &Storage, endpoint_id: i64, vm_ref: &str) -> Result<VmRecord> {
    storage
        .vms()
        .get_by_ref(endpoint_id, vm_ref)
        .await?
        .with_context(|| format!("虚拟机 {} 不在本地清单中, 请先执行 refresh", vm_ref))
}
