use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::Result;
use crate::models::HostRecord;

/// 主机仓储
pub struct HostRepository {
    pool: SqlitePool,
}

impl HostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 在事务内插入或更新主机，返回本地代理键
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_tx(
        conn: &mut SqliteConnection,
        endpoint_id: i64,
        ems_ref: &str,
        name: Option<&str>,
        cluster_id: Option<i64>,
        memory_mb: Option<i64>,
        cpu_sockets: Option<i64>,
        cpu_total_cores: Option<i64>,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO hosts (
                endpoint_id, ems_ref, name, cluster_id,
                memory_mb, cpu_sockets, cpu_total_cores, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(endpoint_id, ems_ref) DO UPDATE SET
                name = excluded.name,
                cluster_id = excluded.cluster_id,
                memory_mb = excluded.memory_mb,
                cpu_sockets = excluded.cpu_sockets,
                cpu_total_cores = excluded.cpu_total_cores,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(endpoint_id)
        .bind(ems_ref)
        .bind(name)
        .bind(cluster_id)
        .bind(memory_mb)
        .bind(cpu_sockets)
        .bind(cpu_total_cores)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        debug!("Upserted host: {}", ems_ref);
        Ok(id)
    }

    /// 按自然键查询主机
    pub async fn get_by_ref(&self, endpoint_id: i64, ems_ref: &str) -> Result<Option<HostRecord>> {
        let record = sqlx::query_as::<_, HostRecord>(
            "SELECT * FROM hosts WHERE endpoint_id = ? AND ems_ref = ?",
        )
        .bind(endpoint_id)
        .bind(ems_ref)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// 列出端点下的全部主机
    pub async fn list_by_endpoint(&self, endpoint_id: i64) -> Result<Vec<HostRecord>> {
        let records = sqlx::query_as::<_, HostRecord>(
            "SELECT * FROM hosts WHERE endpoint_id = ? ORDER BY ems_ref",
        )
        .bind(endpoint_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// 统计端点下的主机数量
    pub async fn count_by_endpoint(&self, endpoint_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM hosts WHERE endpoint_id = ?")
            .bind(endpoint_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
