//! CLI 配置管理
//!
//! **数据存储方式**: TOML 文件 (~/.config/prism/config.toml)
//!
//! 端点凭据由外部凭据管理方负责；配置文件仅为实验环境原样保存,
//! 生产部署应改由凭据管理方注入。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// CLI 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// 端点列表
    #[serde(default)]
    pub endpoints: HashMap<String, EndpointConfig>,

    /// 默认端点名称
    pub default_endpoint: Option<String>,

    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// 配置版本
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_db_path() -> String {
    "~/.local/share/prism/prism.db".to_string()
}

fn default_version() -> String {
    "1.0".to_string()
}

/// 端点配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// 管理端主机名
    pub hostname: String,

    /// 管理端端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 用户名
    pub username: String,

    /// 密码（实验环境原样保存）
    pub password: String,

    /// 是否校验 TLS 证书
    #[serde(default)]
    pub verify_ssl: bool,
}

fn default_port() -> u16 {
    9440
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            endpoints: HashMap::new(),
            default_endpoint: None,
            db_path: default_db_path(),
            version: default_version(),
        }
    }
}

impl CliConfig {
    /// 获取配置文件路径
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("无法获取用户主目录")?;
        Ok(home.join(".config").join("prism").join("config.toml"))
    }

    /// 加载配置
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("读取配置文件失败: {:?}", path))?;

        toml::from_str(&content).with_context(|| format!("解析配置文件失败: {:?}", path))
    }

    /// 保存配置
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("创建配置目录失败: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("序列化配置失败")?;

        fs::write(&path, content).with_context(|| format!("写入配置文件失败: {:?}", path))?;

        Ok(())
    }

    /// 添加端点
    pub fn add_endpoint(&mut self, name: &str, endpoint: EndpointConfig) -> Result<()> {
        if self.endpoints.contains_key(name) {
            anyhow::bail!("端点 {} 已存在", name);
        }

        self.endpoints.insert(name.to_string(), endpoint);

        // 第一个端点设为默认端点
        if self.default_endpoint.is_none() {
            self.default_endpoint = Some(name.to_string());
        }

        Ok(())
    }

    /// 获取端点配置
    pub fn get_endpoint(&self, name: &str) -> Result<&EndpointConfig> {
        self.endpoints
            .get(name)
            .with_context(|| format!("端点 {} 不存在", name))
    }

    /// 列出所有端点
    pub fn list_endpoints(&self) -> Vec<(&str, &EndpointConfig)> {
        let mut endpoints: Vec<_> = self
            .endpoints
            .iter()
            .map(|(name, config)| (name.as_str(), config))
            .collect();
        endpoints.sort_by_key(|(name, _)| *name);
        endpoints
    }
}
