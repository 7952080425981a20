//! Prism 平台错误定义

use thiserror::Error;

/// Prism 平台错误类型
#[derive(Error, Debug)]
pub enum PlatformError {
    /// 主机不可达 / TLS 握手失败 / 超时
    #[error("连接错误: {0}")]
    Connection(String),

    /// 凭据被拒绝 (HTTP 401)
    #[error("认证错误: {0}")]
    Auth(String),

    /// 会话有效但无权限 (HTTP 403)
    #[error("权限不足: {0}")]
    Forbidden(String),

    #[error("API 错误 [{0}]: {1}")]
    Api(u16, String),

    #[error("解析错误: {0}")]
    Parse(String),

    #[error("资源不存在: {0}")]
    NotFound(String),

    /// 并发令牌过期 (HTTP 409/412)
    #[error("并发冲突: {0}")]
    Conflict(String),

    #[error("操作不支持: {0}")]
    Unsupported(String),

    #[error("校验错误: {0}")]
    Validation(String),
}

/// Prism 平台结果类型
pub type Result<T> = std::result::Result<T, PlatformError>;
