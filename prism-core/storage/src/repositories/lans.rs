use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::Result;
use crate::models::LanRecord;

/// LAN/子网仓储
///
/// 自然键为 (endpoint_id, uid_ems)：同一网络 UID 的 LAN 在任意多轮
/// 刷新后都只有一行，ems_ref 变化时原行被原位更新。
pub struct LanRepository {
    pool: SqlitePool,
}

impl LanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 在事务内插入或更新 LAN，返回本地代理键
    pub async fn upsert_tx(
        conn: &mut SqliteConnection,
        endpoint_id: i64,
        uid_ems: &str,
        ems_ref: Option<&str>,
        name: Option<&str>,
        tag: Option<i64>,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO lans (endpoint_id, uid_ems, ems_ref, name, tag, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(endpoint_id, uid_ems) DO UPDATE SET
                ems_ref = excluded.ems_ref,
                name = excluded.name,
                tag = excluded.tag,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(endpoint_id)
        .bind(uid_ems)
        .bind(ems_ref)
        .bind(name)
        .bind(tag)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        debug!("Upserted lan: {}", uid_ems);
        Ok(id)
    }

    /// 按稳定网络 UID 查询 LAN
    pub async fn get_by_uid(&self, endpoint_id: i64, uid_ems: &str) -> Result<Option<LanRecord>> {
        let record = sqlx::query_as::<_, LanRecord>(
            "SELECT * FROM lans WHERE endpoint_id = ? AND uid_ems = ?",
        )
        .bind(endpoint_id)
        .bind(uid_ems)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// 列出端点下的全部 LAN
    pub async fn list_by_endpoint(&self, endpoint_id: i64) -> Result<Vec<LanRecord>> {
        let records = sqlx::query_as::<_, LanRecord>(
            "SELECT * FROM lans WHERE endpoint_id = ? ORDER BY uid_ems",
        )
        .bind(endpoint_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// 统计端点下的 LAN 数量
    pub async fn count_by_endpoint(&self, endpoint_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lans WHERE endpoint_id = ?")
            .bind(endpoint_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
