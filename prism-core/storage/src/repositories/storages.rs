use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::Result;
use crate::models::StorageRecord;

/// 存储容器仓储
pub struct StorageRepository {
    pool: SqlitePool,
}

impl StorageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 在事务内插入或更新存储容器，返回本地代理键
    ///
    /// 容量字段以最新采样整体覆盖。
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_tx(
        conn: &mut SqliteConnection,
        endpoint_id: i64,
        ems_ref: &str,
        name: Option<&str>,
        store_type: Option<&str>,
        total_space: Option<i64>,
        free_space: Option<i64>,
        uncommitted: Option<i64>,
        location: Option<&str>,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO storages (
                endpoint_id, ems_ref, name, store_type,
                total_space, free_space, uncommitted, location, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(endpoint_id, ems_ref) DO UPDATE SET
                name = excluded.name,
                store_type = excluded.store_type,
                total_space = excluded.total_space,
                free_space = excluded.free_space,
                uncommitted = excluded.uncommitted,
                location = excluded.location,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(endpoint_id)
        .bind(ems_ref)
        .bind(name)
        .bind(store_type)
        .bind(total_space)
        .bind(free_space)
        .bind(uncommitted)
        .bind(location)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        debug!("Upserted storage container: {}", ems_ref);
        Ok(id)
    }

    /// 按自然键查询存储容器
    pub async fn get_by_ref(
        &self,
        endpoint_id: i64,
        ems_ref: &str,
    ) -> Result<Option<StorageRecord>> {
        let record = sqlx::query_as::<_, StorageRecord>(
            "SELECT * FROM storages WHERE endpoint_id = ? AND ems_ref = ?",
        )
        .bind(endpoint_id)
        .bind(ems_ref)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// 列出端点下的全部存储容器
    pub async fn list_by_endpoint(&self, endpoint_id: i64) -> Result<Vec<StorageRecord>> {
        let records = sqlx::query_as::<_, StorageRecord>(
            "SELECT * FROM storages WHERE endpoint_id = ? ORDER BY ems_ref",
        )
        .bind(endpoint_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// 统计端点下的存储容器数量
    pub async fn count_by_endpoint(&self, endpoint_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM storages WHERE endpoint_id = ?")
                .bind(endpoint_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
