use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::Result;
use crate::models::VmRecord;

/// 虚拟机清单字段（事务内 upsert 的入参）
#[derive(Debug, Clone, Default)]
pub struct VmUpsert<'a> {
    pub ems_ref: &'a str,
    pub uid_ems: Option<&'a str>,
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
    pub vendor: Option<&'a str>,
    pub raw_power_state: Option<&'a str>,
    pub power_state: Option<&'a str>,
    pub connection_state: Option<&'a str>,
    pub boot_time: Option<DateTime<Utc>>,
    pub host_id: Option<i64>,
    pub cluster_id: Option<i64>,
}

/// 虚拟机仓储
pub struct VmRepository {
    pool: SqlitePool,
}

impl VmRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 在事务内插入或更新虚拟机，返回本地代理键
    pub async fn upsert_tx(
        conn: &mut SqliteConnection,
        endpoint_id: i64,
        vm: &VmUpsert<'_>,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO vms (
                endpoint_id, ems_ref, uid_ems, name, description, location, vendor,
                raw_power_state, power_state, connection_state, boot_time,
                host_id, cluster_id, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(endpoint_id, ems_ref) DO UPDATE SET
                uid_ems = excluded.uid_ems,
                name = excluded.name,
                description = excluded.description,
                location = excluded.location,
                vendor = excluded.vendor,
                raw_power_state = excluded.raw_power_state,
                power_state = excluded.power_state,
                connection_state = excluded.connection_state,
                boot_time = excluded.boot_time,
                host_id = excluded.host_id,
                cluster_id = excluded.cluster_id,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(endpoint_id)
        .bind(vm.ems_ref)
        .bind(vm.uid_ems)
        .bind(vm.name)
        .bind(vm.description)
        .bind(vm.location)
        .bind(vm.vendor)
        .bind(vm.raw_power_state)
        .bind(vm.power_state)
        .bind(vm.connection_state)
        .bind(vm.boot_time)
        .bind(vm.host_id)
        .bind(vm.cluster_id)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        debug!("Upserted vm: {}", vm.ems_ref);
        Ok(id)
    }

    /// 按自然键查询虚拟机
    pub async fn get_by_ref(&self, endpoint_id: i64, ems_ref: &str) -> Result<Option<VmRecord>> {
        let record = sqlx::query_as::<_, VmRecord>(
            "SELECT * FROM vms WHERE endpoint_id = ? AND ems_ref = ?",
        )
        .bind(endpoint_id)
        .bind(ems_ref)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// 列出端点下的全部虚拟机
    pub async fn list_by_endpoint(&self, endpoint_id: i64) -> Result<Vec<VmRecord>> {
        let records = sqlx::query_as::<_, VmRecord>(
            "SELECT * FROM vms WHERE endpoint_id = ? ORDER BY ems_ref",
        )
        .bind(endpoint_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// 统计端点下的虚拟机数量
    pub async fn count_by_endpoint(&self, endpoint_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vms WHERE endpoint_id = ?")
            .bind(endpoint_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// 更新电源状态（生命周期操作完成后的本地回写）
    pub async fn update_power_state(
        &self,
        id: i64,
        raw_power_state: &str,
        power_state: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE vms SET raw_power_state = ?, power_state = ?, updated_at = ? WHERE id = ?",
        )
        .bind(raw_power_state)
        .bind(power_state)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
