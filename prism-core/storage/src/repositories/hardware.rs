use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::Result;
use crate::models::{HardwareRecord, OperatingSystemRecord};

/// 硬件仓储
///
/// 每台虚拟机/模板恰有一条硬件记录，vm_id 上的唯一约束保证
/// 刷新是替换而非累积。
pub struct HardwareRepository {
    pool: SqlitePool,
}

impl HardwareRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 在事务内插入或替换硬件记录，返回本地代理键
    pub async fn upsert_tx(
        conn: &mut SqliteConnection,
        vm_id: i64,
        memory_mb: Option<i64>,
        cpu_sockets: Option<i64>,
        cpu_cores_per_socket: Option<i64>,
        cpu_total_cores: Option<i64>,
        guest_os: Option<&str>,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO hardwares (
                vm_id, memory_mb, cpu_sockets, cpu_cores_per_socket,
                cpu_total_cores, guest_os
            )
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(vm_id) DO UPDATE SET
                memory_mb = excluded.memory_mb,
                cpu_sockets = excluded.cpu_sockets,
                cpu_cores_per_socket = excluded.cpu_cores_per_socket,
                cpu_total_cores = excluded.cpu_total_cores,
                guest_os = excluded.guest_os
            RETURNING id
            "#,
        )
        .bind(vm_id)
        .bind(memory_mb)
        .bind(cpu_sockets)
        .bind(cpu_cores_per_socket)
        .bind(cpu_total_cores)
        .bind(guest_os)
        .fetch_one(conn)
        .await?;

        debug!("Upserted hardware for vm {}", vm_id);
        Ok(id)
    }

    /// 按虚拟机查询硬件
    pub async fn get_by_vm(&self, vm_id: i64) -> Result<Option<HardwareRecord>> {
        let record =
            sqlx::query_as::<_, HardwareRecord>("SELECT * FROM hardwares WHERE vm_id = ?")
                .bind(vm_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(record)
    }
}

/// 操作系统仓储
pub struct OperatingSystemRepository {
    pool: SqlitePool,
}

impl OperatingSystemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 在事务内插入或替换操作系统记录
    pub async fn upsert_tx(
        conn: &mut SqliteConnection,
        vm_id: i64,
        product_name: Option<&str>,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO operating_systems (vm_id, product_name)
            VALUES (?, ?)
            ON CONFLICT(vm_id) DO UPDATE SET
                product_name = excluded.product_name
            RETURNING id
            "#,
        )
        .bind(vm_id)
        .bind(product_name)
        .fetch_one(conn)
        .await?;
        Ok(id)
    }

    /// 按虚拟机查询操作系统
    pub async fn get_by_vm(&self, vm_id: i64) -> Result<Option<OperatingSystemRecord>> {
        let record = sqlx::query_as::<_, OperatingSystemRecord>(
            "SELECT * FROM operating_systems WHERE vm_id = ?",
        )
        .bind(vm_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }
}
