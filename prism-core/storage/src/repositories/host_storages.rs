use sqlx::{SqliteConnection, SqlitePool};

use crate::error::Result;
use crate::models::HostStorageRecord;

/// 主机-存储关联仓储
pub struct HostStorageRepository {
    pool: SqlitePool,
}

impl HostStorageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 在事务内写入一条关联（已存在则忽略）
    pub async fn link_tx(
        conn: &mut SqliteConnection,
        host_id: i64,
        storage_id: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO host_storages (host_id, storage_id)
            VALUES (?, ?)
            ON CONFLICT(host_id, storage_id) DO NOTHING
            "#,
        )
        .bind(host_id)
        .bind(storage_id)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// 按主机列出关联
    pub async fn list_by_host(&self, host_id: i64) -> Result<Vec<HostStorageRecord>> {
        let records = sqlx::query_as::<_, HostStorageRecord>(
            "SELECT * FROM host_storages WHERE host_id = ?",
        )
        .bind(host_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// 统计全部关联数量
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM host_storages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
