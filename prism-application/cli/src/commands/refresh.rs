//! 清单刷新命令

use anyhow::Result;
use colored::Colorize;

use prism_inventory::{RefreshTarget, Refresher, TargetSet};

use crate::config::CliConfig;

use super::common;

#[allow(clippy::too_many_arguments)]
pub async fn handle(
    endpoint_name: &str,
    vms: Vec<String>,
    hosts: Vec<String>,
    storages: Vec<String>,
    clusters: Vec<String>,
    templates: Vec<String>,
) -> Result<()> {
    let config = CliConfig::load()?;
    let storage = common::open_storage(&config).await?;
    let (endpoint, endpoint_id) = common::resolve_endpoint(&config, &storage, endpoint_name).await?;
    let client = common::build_client(&endpoint)?;

    let targets = TargetSet {
        vms,
        templates,
        hosts,
        storages,
        clusters,
    };
    let target = if targets.is_empty() {
        RefreshTarget::Full
    } else {
        RefreshTarget::Targets(targets)
    };

    let refresher = Refresher::new(&client, storage.pool());
    let stats = refresher.refresh(endpoint_id, &target).await?;

    println!(
        "{} 刷新完成: {} 集群, {} 主机, {} 存储, {} 模板, {} 虚拟机, {} 磁盘, {} 网卡",
        "✓".green(),
        stats.clusters,
        stats.hosts,
        stats.storages,
        stats.templates,
        stats.vms,
        stats.disks,
        stats.guest_devices
    );
    Ok(())
}
