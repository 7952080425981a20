use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::Result;
use crate::models::TemplateRecord;

/// 模板仓储
pub struct TemplateRepository {
    pool: SqlitePool,
}

impl TemplateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 在事务内插入或更新模板，返回本地代理键
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_tx(
        conn: &mut SqliteConnection,
        endpoint_id: i64,
        ems_ref: &str,
        uid_ems: Option<&str>,
        name: Option<&str>,
        vendor: Option<&str>,
        location: Option<&str>,
        raw_power_state: Option<&str>,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO templates (
                endpoint_id, ems_ref, uid_ems, name, vendor, location,
                raw_power_state, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(endpoint_id, ems_ref) DO UPDATE SET
                uid_ems = excluded.uid_ems,
                name = excluded.name,
                vendor = excluded.vendor,
                location = excluded.location,
                raw_power_state = excluded.raw_power_state,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(endpoint_id)
        .bind(ems_ref)
        .bind(uid_ems)
        .bind(name)
        .bind(vendor)
        .bind(location)
        .bind(raw_power_state)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        debug!("Upserted template: {}", ems_ref);
        Ok(id)
    }

    /// 按自然键查询模板
    pub async fn get_by_ref(
        &self,
        endpoint_id: i64,
        ems_ref: &str,
    ) -> Result<Option<TemplateRecord>> {
        let record = sqlx::query_as::<_, TemplateRecord>(
            "SELECT * FROM templates WHERE endpoint_id = ? AND ems_ref = ?",
        )
        .bind(endpoint_id)
        .bind(ems_ref)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// 列出端点下的全部模板
    pub async fn list_by_endpoint(&self, endpoint_id: i64) -> Result<Vec<TemplateRecord>> {
        let records = sqlx::query_as::<_, TemplateRecord>(
            "SELECT * FROM templates WHERE endpoint_id = ? ORDER BY ems_ref",
        )
        .bind(endpoint_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// 统计端点下的模板数量
    pub async fn count_by_endpoint(&self, endpoint_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM templates WHERE endpoint_id = ?")
                .bind(endpoint_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
