//! 清单管线错误定义

use thiserror::Error;

/// 清单管线错误类型
#[derive(Error, Debug)]
pub enum InventoryError {
    /// 远端平台错误（连接/认证错误将中止本轮刷新）
    #[error("平台错误: {0}")]
    Platform(#[from] prism_platform::PlatformError),

    /// 存储层错误（提交失败整体回滚）
    #[error("存储错误: {0}")]
    Storage(#[from] prism_storage::StorageError),

    /// 定向刷新目标拉取失败
    #[error("目标拉取失败 [{family} {ems_ref}]: {source}")]
    TargetFetch {
        family: &'static str,
        ems_ref: String,
        #[source]
        source: prism_platform::PlatformError,
    },
}

/// 清单管线结果类型
pub type Result<T> = std::result::Result<T, InventoryError>;
