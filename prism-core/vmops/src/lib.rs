//! 虚拟机生命周期操作
//!
//! 电源/客机/网卡/重配置操作的统一入口，全部变更遵循
//! 「守卫校验 → 取令牌 → 变更」：
//!
//! - **守卫** (`guards`): 依据本地已知电源状态做前置校验
//! - **令牌重试** (`retry`): ETag 并发令牌 + 每次尝试新请求 ID
//! - **电源/客机** (`VmOps`): 开机/断电/复位/删除/客机关机/客机重启
//! - **网卡** (`attach_nic` / `detach_nic`)
//! - **重配置** (`reconfigure`): CPU/内存/磁盘扩容
//! - **控制台** (`console_url`): HTML5/VNC 代理地址
//!
//! # 示例
//!
//! ```ignore
//! use prism_vmops::VmOps;
//!
//! let ops = VmOps::new(&client);
//! ops.start("12e3f98c-...", vm.raw_power_state.as_deref()).await?;
//! ```

pub mod console;
pub mod error;
pub mod guards;
pub mod nics;
pub mod power;
pub mod reconfigure;
pub mod retry;

pub use console::console_url;
pub use error::{OpsError, Result};
pub use guards::{validate_transition, PowerOp};
pub use power::VmOps;
pub use reconfigure::{DiskResize, ReconfigureRequest, MAX_CPU_CORES_PER_SOCKET, MAX_MEMORY_MB};
pub use retry::{with_concurrency_token, MAX_MUTATION_ATTEMPTS};
