use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;
use crate::models::EndpointRecord;

/// 托管端点仓储
pub struct EndpointRepository {
    pool: SqlitePool,
}

impl EndpointRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 插入或更新端点记录，返回当前记录
    pub async fn upsert(
        &self,
        name: &str,
        hostname: &str,
        port: i64,
        username: &str,
        verify_ssl: bool,
    ) -> Result<EndpointRecord> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, EndpointRecord>(
            r#"
            INSERT INTO endpoints (name, hostname, port, username, verify_ssl, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                hostname = excluded.hostname,
                port = excluded.port,
                username = excluded.username,
                verify_ssl = excluded.verify_ssl,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(hostname)
        .bind(port)
        .bind(username)
        .bind(verify_ssl)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        debug!("Upserted endpoint: {}", name);
        Ok(record)
    }

    /// 按名称查询端点
    pub async fn get_by_name(&self, name: &str) -> Result<Option<EndpointRecord>> {
        let record = sqlx::query_as::<_, EndpointRecord>("SELECT * FROM endpoints WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// 列出全部端点
    pub async fn list(&self) -> Result<Vec<EndpointRecord>> {
        let records =
            sqlx::query_as::<_, EndpointRecord>("SELECT * FROM endpoints ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(records)
    }
}
