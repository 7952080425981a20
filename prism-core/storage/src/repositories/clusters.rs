use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::Result;
use crate::models::ClusterRecord;

/// 集群仓储
pub struct ClusterRepository {
    pool: SqlitePool,
}

impl ClusterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 在事务内插入或更新集群，返回本地代理键
    pub async fn upsert_tx(
        conn: &mut SqliteConnection,
        endpoint_id: i64,
        ems_ref: &str,
        name: Option<&str>,
        uid_ems: Option<&str>,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO clusters (endpoint_id, ems_ref, name, uid_ems, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(endpoint_id, ems_ref) DO UPDATE SET
                name = excluded.name,
                uid_ems = excluded.uid_ems,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(endpoint_id)
        .bind(ems_ref)
        .bind(name)
        .bind(uid_ems)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        debug!("Upserted cluster: {}", ems_ref);
        Ok(id)
    }

    /// 按自然键查询集群
    pub async fn get_by_ref(
        &self,
        endpoint_id: i64,
        ems_ref: &str,
    ) -> Result<Option<ClusterRecord>> {
        let record = sqlx::query_as::<_, ClusterRecord>(
            "SELECT * FROM clusters WHERE endpoint_id = ? AND ems_ref = ?",
        )
        .bind(endpoint_id)
        .bind(ems_ref)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// 列出端点下的全部集群
    pub async fn list_by_endpoint(&self, endpoint_id: i64) -> Result<Vec<ClusterRecord>> {
        let records = sqlx::query_as::<_, ClusterRecord>(
            "SELECT * FROM clusters WHERE endpoint_id = ? ORDER BY ems_ref",
        )
        .bind(endpoint_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// 统计端点下的集群数量
    pub async fn count_by_endpoint(&self, endpoint_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM clusters WHERE endpoint_id = ?")
                .bind(endpoint_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
