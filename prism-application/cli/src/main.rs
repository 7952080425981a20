//! Prism CLI 应用

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "prism")]
#[command(about = "Prism Inventory - Nutanix 平台清单调谐工具", long_about = None)]
#[command(version)]
struct Cli {
    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 端点管理
    Endpoint {
        #[command(subcommand)]
        action: EndpointAction,
    },

    /// 清单刷新（全量或定向）
    Refresh {
        /// 端点名称
        endpoint: String,

        /// 定向刷新：虚拟机外部引用（可重复）
        #[arg(long = "vm")]
        vms: Vec<String>,

        /// 定向刷新：主机外部引用（可重复）
        #[arg(long = "host")]
        hosts: Vec<String>,

        /// 定向刷新：存储容器外部引用（可重复）
        #[arg(long = "storage")]
        storages: Vec<String>,

        /// 定向刷新：集群外部引用（可重复）
        #[arg(long = "cluster")]
        clusters: Vec<String>,

        /// 定向刷新：模板外部引用（可重复）
        #[arg(long = "template")]
        templates: Vec<String>,
    },

    /// 虚拟机管理
    Vm {
        #[command(subcommand)]
        action: VmAction,
    },

    /// 数据库管理
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum EndpointAction {
    /// 添加端点
    Add {
        /// 端点名称
        name: String,
        /// 管理端主机名
        hostname: String,
        /// 管理端端口
        #[arg(long, default_value = "9440")]
        port: u16,
        /// 用户名
        #[arg(long, short = 'u')]
        username: String,
        /// 密码
        #[arg(long)]
        password: String,
        /// 校验 TLS 证书
        #[arg(long)]
        verify_ssl: bool,
    },
    /// 列出端点
    List,
    /// 验证端点凭据（只读探测）
    Verify {
        /// 端点名称
        name: String,
    },
}

#[derive(Subcommand)]
enum VmAction {
    /// 列出本地清单中的虚拟机
    List {
        /// 端点名称
        endpoint: String,
    },
    /// 开机
    Start {
        endpoint: String,
        /// 虚拟机外部引用
        vm_ref: String,
    },
    /// 强制断电
    Stop { endpoint: String, vm_ref: String },
    /// 客机关机（来宾工具缺失时回退 ACPI）
    Shutdown { endpoint: String, vm_ref: String },
    /// 客机重启
    Reboot { endpoint: String, vm_ref: String },
    /// 复位
    Reset { endpoint: String, vm_ref: String },
    /// 删除虚拟机（仅限关机状态）
    Terminate { endpoint: String, vm_ref: String },
    /// 输出远程控制台地址
    Console { endpoint: String, vm_ref: String },
}

#[derive(Subcommand)]
enum DbAction {
    /// 初始化数据库（建表/迁移）
    Init,
    /// 输出数据库文件路径
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt().with_max_level(log_level).init();

    info!("Prism CLI 启动");

    match cli.command {
        Commands::Endpoint { action } => commands::endpoint::handle(action).await?,
        Commands::Refresh {
            endpoint,
            vms,
            hosts,
            storages,
            clusters,
            templates,
        } => {
            commands::refresh::handle(&endpoint, vms, hosts, storages, clusters, templates).await?
        }
        Commands::Vm { action } => commands::vm::handle(action).await?,
        Commands::Db { action } => commands::db::handle(action).await?,
    }

    Ok(())
}
