// 数据库集成测试
use prism_storage::{
    ClusterRepository, DiskRepository, HardwareRepository, Storage, StorageManager, VmRepository,
    VmUpsert,
};

/// 创建测试数据库 (内存模式)
async fn setup_test_storage() -> Storage {
    let manager = StorageManager::new_in_memory()
        .await
        .expect("Failed to create test database");
    Storage::from_manager(&manager)
}

async fn create_test_endpoint(storage: &Storage) -> i64 {
    storage
        .endpoints()
        .upsert("lab", "pc.lab.local", 9440, "admin", false)
        .await
        .expect("Failed to create endpoint")
        .id
}

#[tokio::test]
async fn test_endpoint_upsert_is_stable_by_name() {
    let storage = setup_test_storage().await;

    let first = storage
        .endpoints()
        .upsert("lab", "pc.lab.local", 9440, "admin", false)
        .await
        .unwrap();
    let second = storage
        .endpoints()
        .upsert("lab", "pc2.lab.local", 9440, "operator", true)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.hostname, "pc2.lab.local");
    assert_eq!(second.username, "operator");
    assert_eq!(storage.endpoints().list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cluster_upsert_updates_in_place() {
    let storage = setup_test_storage().await;
    let endpoint_id = create_test_endpoint(&storage).await;

    let mut tx = storage.pool().begin().await.unwrap();
    let id1 = ClusterRepository::upsert_tx(&mut tx, endpoint_id, "cl-1", Some("old"), Some("cl-1"))
        .await
        .unwrap();
    let id2 = ClusterRepository::upsert_tx(&mut tx, endpoint_id, "cl-1", Some("new"), Some("cl-1"))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(id1, id2);
    let record = storage
        .clusters()
        .get_by_ref(endpoint_id, "cl-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.name.as_deref(), Some("new"));
    assert_eq!(storage.clusters().count_by_endpoint(endpoint_id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_vm_natural_key_is_endpoint_scoped() {
    let storage = setup_test_storage().await;
    let endpoint_a = create_test_endpoint(&storage).await;
    let endpoint_b = storage
        .endpoints()
        .upsert("lab2", "pc2.lab.local", 9440, "admin", false)
        .await
        .unwrap()
        .id;

    let build = VmUpsert {
        ems_ref: "vm-1",
        uid_ems: None,
        name: Some("web-01"),
        description: None,
        location: None,
        vendor: Some("nutanix"),
        raw_power_state: Some("ON"),
        power_state: Some("on"),
        connection_state: Some("connected"),
        boot_time: None,
        host_id: None,
        cluster_id: None,
    };

    let mut tx = storage.pool().begin().await.unwrap();
    let id_a = VmRepository::upsert_tx(&mut tx, endpoint_a, &build).await.unwrap();
    let id_b = VmRepository::upsert_tx(&mut tx, endpoint_b, &build).await.unwrap();
    tx.commit().await.unwrap();

    // 相同 ems_ref 在不同端点下是两行
    assert_ne!(id_a, id_b);
    assert_eq!(storage.vms().count_by_endpoint(endpoint_a).await.unwrap(), 1);
    assert_eq!(storage.vms().count_by_endpoint(endpoint_b).await.unwrap(), 1);
}

#[tokio::test]
async fn test_hardware_is_unique_per_vm() {
    let storage = setup_test_storage().await;
    let endpoint_id = create_test_endpoint(&storage).await;

    let build = VmUpsert {
        ems_ref: "vm-1",
        uid_ems: None,
        name: Some("web-01"),
        description: None,
        location: None,
        vendor: None,
        raw_power_state: None,
        power_state: None,
        connection_state: None,
        boot_time: None,
        host_id: None,
        cluster_id: None,
    };

    let mut tx = storage.pool().begin().await.unwrap();
    let vm_id = VmRepository::upsert_tx(&mut tx, endpoint_id, &build).await.unwrap();
    let hw1 = HardwareRepository::upsert_tx(&mut tx, vm_id, Some(2048), Some(1), Some(2), Some(2), None)
        .await
        .unwrap();
    let hw2 = HardwareRepository::upsert_tx(&mut tx, vm_id, Some(4096), Some(2), Some(2), Some(4), None)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(hw1, hw2);
    let record = storage.hardwares().get_by_vm(vm_id).await.unwrap().unwrap();
    assert_eq!(record.memory_mb, Some(4096));
    assert_eq!(record.cpu_total_cores, Some(4));
}

#[tokio::test]
async fn test_disks_rebuild_replaces_previous_set() {
    let storage = setup_test_storage().await;
    let endpoint_id = create_test_endpoint(&storage).await;

    let build = VmUpsert {
        ems_ref: "vm-1",
        uid_ems: None,
        name: None,
        description: None,
        location: None,
        vendor: None,
        raw_power_state: None,
        power_state: None,
        connection_state: None,
        boot_time: None,
        host_id: None,
        cluster_id: None,
    };

    let mut tx = storage.pool().begin().await.unwrap();
    let vm_id = VmRepository::upsert_tx(&mut tx, endpoint_id, &build).await.unwrap();
    let hardware_id =
        HardwareRepository::upsert_tx(&mut tx, vm_id, None, None, None, None, None)
            .await
            .unwrap();
    for name in ["Disk 0", "Disk 1"] {
        DiskRepository::insert_tx(
            &mut tx,
            hardware_id,
            name,
            Some("disk"),
            Some("scsi"),
            Some(1024),
            None,
            None,
            None,
            false,
        )
        .await
        .unwrap();
    }
    tx.commit().await.unwrap();

    // 重建：清空后只写一块
    let mut tx = storage.pool().begin().await.unwrap();
    DiskRepository::delete_by_hardware_tx(&mut tx, hardware_id).await.unwrap();
    DiskRepository::insert_tx(
        &mut tx,
        hardware_id,
        "Disk 0",
        Some("disk"),
        Some("scsi"),
        Some(2048),
        None,
        None,
        None,
        true,
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let disks = storage.disks().list_by_hardware(hardware_id).await.unwrap();
    assert_eq!(disks.len(), 1);
    assert_eq!(disks[0].size_mb, Some(2048));
    assert!(disks[0].bootable);
}
