//! 数据库管理命令

use anyhow::Result;
use colored::Colorize;

use crate::config::CliConfig;

use super::common;

pub async fn handle(action: crate::DbAction) -> Result<()> {
    match action {
        crate::DbAction::Init => init_database().await,
        crate::DbAction::Path => show_path(),
    }
}

/// 建库并应用迁移；重复执行无副作用
async fn init_database() -> Result<()> {
    let config = CliConfig::load()?;
    let storage = common::open_storage(&config).await?;
    storage.pool().acquire().await?;

    println!("{} 数据库已就绪: {}", "✓".green(), config.db_path);
    Ok(())
}

fn show_path() -> Result<()> {
    let config = CliConfig::load()?;
    println!("{}", shellexpand::tilde(&config.db_path));
    Ok(())
}
