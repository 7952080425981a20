//! 端点管理命令

use anyhow::Result;
use colored::Colorize;
use tracing::info;

use crate::config::{CliConfig, EndpointConfig};

use super::common;

pub async fn handle(action: crate::EndpointAction) -> Result<()> {
    match action {
        crate::EndpointAction::Add {
            name,
            hostname,
            port,
            username,
            password,
            verify_ssl,
        } => add_endpoint(&name, hostname, port, username, password, verify_ssl).await,
        crate::EndpointAction::List => list_endpoints(),
        crate::EndpointAction::Verify { name } => verify_endpoint(&name).await,
    }
}

async fn add_endpoint(
    name: &str,
    hostname: String,
    port: u16,
    username: String,
    password: String,
    verify_ssl: bool,
) -> Result<()> {
    let mut config = CliConfig::load()?;
    config.add_endpoint(
        name,
        EndpointConfig {
            hostname,
            port,
            username,
            password,
            verify_ssl,
        },
    )?;
    config.save()?;

    println!("{} 端点 {} 已添加", "✓".green(), name.bold());
    Ok(())
}

fn list_endpoints() -> Result<()> {
    let config = CliConfig::load()?;
    let endpoints = config.list_endpoints();

    if endpoints.is_empty() {
        println!("尚未配置任何端点");
        return Ok(());
    }

    for (name, endpoint) in endpoints {
        let default_mark = if config.default_endpoint.as_deref() == Some(name) {
            " (默认)".cyan().to_string()
        } else {
            String::new()
        };
        println!(
            "{}{}  {}:{}  用户 {}",
            name.bold(),
            default_mark,
            endpoint.hostname,
            endpoint.port,
            endpoint.username
        );
    }
    Ok(())
}

/// 只读探测：一次页大小为 1 的虚拟机列表调用，不做任何变更
async fn verify_endpoint(name: &str) -> Result<()> {
    let config = CliConfig::load()?;
    let endpoint = config.get_endpoint(name)?;
    let client = common::build_client(endpoint)?;

    info!("验证端点凭据: {}", name);
    match client.verify_credentials().await {
        Ok(()) => {
            println!("{} 端点 {} 凭据有效", "✓".green(), name.bold());
            Ok(())
        }
        Err(e) => {
            println!("{} 端点 {} 验证失败: {}", "✗".red(), name.bold(), e);
            Err(e.into())
        }
    }
}
