//! 硬件子设备仓储（磁盘、网卡网络、客户设备）
//!
//! 子设备按刷新整体重建：持久化器先按 hardware_id 清除旧行，
//! 再写入本轮构建的行，两步都在同一事务内。

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::Result;
use crate::models::{DiskRecord, GuestDeviceRecord, NetworkRecord};

/// 磁盘仓储
pub struct DiskRepository {
    pool: SqlitePool,
}

impl DiskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 在事务内清除某硬件的全部磁盘行
    pub async fn delete_by_hardware_tx(conn: &mut SqliteConnection, hardware_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM disks WHERE hardware_id = ?")
            .bind(hardware_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// 在事务内写入一条磁盘行
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_tx(
        conn: &mut SqliteConnection,
        hardware_id: i64,
        device_name: &str,
        device_type: Option<&str>,
        controller_type: Option<&str>,
        size_mb: Option<i64>,
        location: Option<&str>,
        filename: Option<&str>,
        storage_id: Option<i64>,
        bootable: bool,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO disks (
                hardware_id, device_name, device_type, controller_type,
                size_mb, location, filename, storage_id, bootable
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(hardware_id, device_name) DO UPDATE SET
                device_type = excluded.device_type,
                controller_type = excluded.controller_type,
                size_mb = excluded.size_mb,
                location = excluded.location,
                filename = excluded.filename,
                storage_id = excluded.storage_id,
                bootable = excluded.bootable
            RETURNING id
            "#,
        )
        .bind(hardware_id)
        .bind(device_name)
        .bind(device_type)
        .bind(controller_type)
        .bind(size_mb)
        .bind(location)
        .bind(filename)
        .bind(storage_id)
        .bind(bootable)
        .fetch_one(conn)
        .await?;
        Ok(id)
    }

    /// 按硬件列出磁盘
    pub async fn list_by_hardware(&self, hardware_id: i64) -> Result<Vec<DiskRecord>> {
        let records = sqlx::query_as::<_, DiskRecord>(
            "SELECT * FROM disks WHERE hardware_id = ? ORDER BY device_name",
        )
        .bind(hardware_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}

/// 网卡网络仓储
pub struct NetworkRepository {
    pool: SqlitePool,
}

impl NetworkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 在事务内清除某硬件的全部网络行
    pub async fn delete_by_hardware_tx(conn: &mut SqliteConnection, hardware_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM networks WHERE hardware_id = ?")
            .bind(hardware_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// 在事务内写入一条网络行
    pub async fn insert_tx(
        conn: &mut SqliteConnection,
        hardware_id: i64,
        description: &str,
        ipaddress: Option<&str>,
        ipv6address: Option<&str>,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO networks (hardware_id, description, ipaddress, ipv6address)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(hardware_id, description) DO UPDATE SET
                ipaddress = excluded.ipaddress,
                ipv6address = excluded.ipv6address
            RETURNING id
            "#,
        )
        .bind(hardware_id)
        .bind(description)
        .bind(ipaddress)
        .bind(ipv6address)
        .fetch_one(conn)
        .await?;
        Ok(id)
    }

    /// 按硬件列出网络
    pub async fn list_by_hardware(&self, hardware_id: i64) -> Result<Vec<NetworkRecord>> {
        let records = sqlx::query_as::<_, NetworkRecord>(
            "SELECT * FROM networks WHERE hardware_id = ? ORDER BY description",
        )
        .bind(hardware_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}

/// 客户设备（网卡）仓储
pub struct GuestDeviceRepository {
    pool: SqlitePool,
}

impl GuestDeviceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 在事务内清除某硬件的全部设备行
    pub async fn delete_by_hardware_tx(conn: &mut SqliteConnection, hardware_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM guest_devices WHERE hardware_id = ?")
            .bind(hardware_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// 在事务内写入一条设备行
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_tx(
        conn: &mut SqliteConnection,
        hardware_id: i64,
        uid_ems: &str,
        device_name: Option<&str>,
        device_type: Option<&str>,
        controller_type: Option<&str>,
        address: Option<&str>,
        network_id: Option<i64>,
        lan_id: Option<i64>,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO guest_devices (
                hardware_id, uid_ems, device_name, device_type,
                controller_type, address, network_id, lan_id
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(hardware_id, uid_ems) DO UPDATE SET
                device_name = excluded.device_name,
                device_type = excluded.device_type,
                controller_type = excluded.controller_type,
                address = excluded.address,
                network_id = excluded.network_id,
                lan_id = excluded.lan_id
            RETURNING id
            "#,
        )
        .bind(hardware_id)
        .bind(uid_ems)
        .bind(device_name)
        .bind(device_type)
        .bind(controller_type)
        .bind(address)
        .bind(network_id)
        .bind(lan_id)
        .fetch_one(conn)
        .await?;
        Ok(id)
    }

    /// 按硬件列出设备
    pub async fn list_by_hardware(&self, hardware_id: i64) -> Result<Vec<GuestDeviceRecord>> {
        let records = sqlx::query_as::<_, GuestDeviceRecord>(
            "SELECT * FROM guest_devices WHERE hardware_id = ? ORDER BY uid_ems",
        )
        .bind(hardware_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}
