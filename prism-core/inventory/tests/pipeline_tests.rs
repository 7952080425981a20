// 调谐管线集成测试：解析 + 提交走内存数据库
use serde_json::{json, Value};

use prism_inventory::{
    CollectedInventory, DatastoreBundle, InventoryParser, InventoryPersister,
};
use prism_storage::{Storage, StorageManager};

/// 创建测试数据库 (内存模式) 与测试端点
async fn setup_test_storage() -> (Storage, i64) {
    let manager = StorageManager::new_in_memory()
        .await
        .expect("Failed to create test database");
    let storage = Storage::from_manager(&manager);
    let endpoint = storage
        .endpoints()
        .upsert("lab", "pc.lab.local", 9440, "admin", false)
        .await
        .expect("Failed to create test endpoint");
    (storage, endpoint.id)
}

/// 一套最小但连通的采集结果:
/// 1 集群 / 1 主机 / 1 虚拟机 (1 磁盘 + 1 网卡) / 1 存储容器 / 1 子网
fn sample_inventory() -> CollectedInventory {
    let cluster = json!({"extId": "cluster-1", "name": "Lab Cluster"});
    let host = json!({
        "extId": "host-1",
        "hostName": "node-1",
        "cluster": {"uuid": "cluster-1"},
        "memorySizeBytes": 68_719_476_736i64,
        "numberOfCpuSockets": 2,
        "numberOfCpuCores": 32
    });
    let vm = json!({
        "extId": "vm-1",
        "biosUuid": "9f3c2a10-0000-0000-0000-000000000001",
        "name": "web-01",
        "description": "Web tier. OS: Ubuntu 22.04",
        "powerState": "ON",
        "createTime": "2026-08-20T12:00:00Z",
        "cluster": {"extId": "cluster-1"},
        "host": {"extId": "host-1"},
        "memorySizeBytes": 4_294_967_296i64,
        "numSockets": 2,
        "numCoresPerSocket": 2,
        "disks": [{
            "extId": "disk-1",
            "diskAddress": {"busType": "SCSI", "index": 0},
            "backingInfo": {
                "diskSizeBytes": 10_737_418_240i64,
                "storageContainer": {"extId": "C1"}
            }
        }],
        "nics": [{
            "extId": "nic-1",
            "backingInfo": {"macAddress": "50:6b:8d:00:00:01"},
            "networkInfo": {
                "subnet": {"extId": "subnet-1"},
                "ipv4Config": {"ipAddress": {"value": "10.0.0.5"}}
            }
        }]
    });
    let subnet = json!({"extId": "subnet-1", "name": "vm-net", "networkId": 100, "vlanId": 100});
    let datastore = DatastoreBundle {
        ext_id: "C1".to_string(),
        name: Some("default-container".to_string()),
        max_capacity_bytes: Some(1_099_511_627_776),
        cluster_name: Some("Lab Cluster".to_string()),
        cluster_uuid: Some("cluster-1".to_string()),
        stats: json!({
            "storageCapacityBytes": [
                {"timestamp": "2026-08-29T10:00:00Z", "value": 1_099_511_627_776i64}
            ],
            "storageFreeBytes": [
                {"timestamp": "2026-08-29T10:00:00Z", "value": 549_755_813_888i64}
            ]
        }),
    };

    CollectedInventory {
        clusters: vec![cluster],
        hosts: vec![host],
        datastores: vec![datastore],
        templates: vec![json!({"extId": "tpl-1", "templateName": "ubuntu-gold"})],
        vms: vec![vm],
        subnets: vec![subnet],
    }
}

async fn run_pass(storage: &Storage, endpoint_id: i64, collected: &CollectedInventory) {
    let mut persister = InventoryPersister::new(endpoint_id);
    InventoryParser::new(collected).parse(&mut persister);
    persister
        .commit(storage.pool())
        .await
        .expect("Commit failed");
}

#[tokio::test]
async fn test_full_pass_links_whole_graph() {
    let (storage, endpoint_id) = setup_test_storage().await;
    run_pass(&storage, endpoint_id, &sample_inventory()).await;

    let cluster = storage
        .clusters()
        .get_by_ref(endpoint_id, "cluster-1")
        .await
        .unwrap()
        .expect("cluster missing");
    let host = storage
        .hosts()
        .get_by_ref(endpoint_id, "host-1")
        .await
        .unwrap()
        .expect("host missing");
    let vm = storage
        .vms()
        .get_by_ref(endpoint_id, "vm-1")
        .await
        .unwrap()
        .expect("vm missing");
    let container = storage
        .storages()
        .get_by_ref(endpoint_id, "C1")
        .await
        .unwrap()
        .expect("storage missing");

    assert_eq!(host.cluster_id, Some(cluster.id));
    assert_eq!(vm.host_id, Some(host.id));
    assert_eq!(vm.cluster_id, Some(cluster.id));
    assert_eq!(vm.vendor.as_deref(), Some("nutanix"));
    assert_eq!(vm.power_state.as_deref(), Some("on"));
    assert_eq!(vm.connection_state.as_deref(), Some("connected"));

    let hardware = storage
        .hardwares()
        .get_by_vm(vm.id)
        .await
        .unwrap()
        .expect("hardware missing");
    assert_eq!(hardware.memory_mb, Some(4096));
    assert_eq!(hardware.cpu_sockets, Some(2));
    assert_eq!(hardware.cpu_cores_per_socket, Some(2));
    assert_eq!(hardware.cpu_total_cores, Some(4));

    let os = storage
        .operating_systems()
        .get_by_vm(vm.id)
        .await
        .unwrap()
        .expect("operating system missing");
    assert_eq!(os.product_name.as_deref(), Some("Ubuntu 22.04"));

    let disks = storage.disks().list_by_hardware(hardware.id).await.unwrap();
    assert_eq!(disks.len(), 1);
    assert_eq!(disks[0].device_name, "Disk 0");
    assert_eq!(disks[0].controller_type.as_deref(), Some("scsi"));
    assert_eq!(disks[0].size_mb, Some(10240));
    assert_eq!(disks[0].storage_id, Some(container.id));

    let networks = storage
        .networks()
        .list_by_hardware(hardware.id)
        .await
        .unwrap();
    assert_eq!(networks.len(), 1);
    assert_eq!(networks[0].ipaddress.as_deref(), Some("10.0.0.5"));

    let lan = storage
        .lans()
        .get_by_uid(endpoint_id, "100")
        .await
        .unwrap()
        .expect("lan missing");
    let devices = storage
        .guest_devices()
        .list_by_hardware(hardware.id)
        .await
        .unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].uid_ems, "nic-1");
    assert_eq!(devices[0].address.as_deref(), Some("50:6b:8d:00:00:01"));
    assert_eq!(devices[0].network_id, Some(networks[0].id));
    assert_eq!(devices[0].lan_id, Some(lan.id));

    assert_eq!(container.total_space, Some(1_099_511_627_776));
    assert_eq!(container.free_space, Some(549_755_813_888));
    assert_eq!(container.store_type.as_deref(), Some("NutanixVolume"));

    let links = storage.host_storages().list_by_host(host.id).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].storage_id, container.id);
}

#[tokio::test]
async fn test_refresh_is_idempotent() {
    let (storage, endpoint_id) = setup_test_storage().await;
    let collected = sample_inventory();

    run_pass(&storage, endpoint_id, &collected).await;
    let vm_before = storage
        .vms()
        .get_by_ref(endpoint_id, "vm-1")
        .await
        .unwrap()
        .unwrap();

    run_pass(&storage, endpoint_id, &collected).await;
    let vm_after = storage
        .vms()
        .get_by_ref(endpoint_id, "vm-1")
        .await
        .unwrap()
        .unwrap();

    // 代理键与属性都保持不变
    assert_eq!(vm_before.id, vm_after.id);
    assert_eq!(vm_before.name, vm_after.name);
    assert_eq!(vm_before.host_id, vm_after.host_id);

    assert_eq!(storage.clusters().count_by_endpoint(endpoint_id).await.unwrap(), 1);
    assert_eq!(storage.hosts().count_by_endpoint(endpoint_id).await.unwrap(), 1);
    assert_eq!(storage.vms().count_by_endpoint(endpoint_id).await.unwrap(), 1);
    assert_eq!(storage.storages().count_by_endpoint(endpoint_id).await.unwrap(), 1);
    assert_eq!(storage.templates().count_by_endpoint(endpoint_id).await.unwrap(), 1);
    assert_eq!(storage.lans().count_by_endpoint(endpoint_id).await.unwrap(), 1);
    assert_eq!(storage.host_storages().count().await.unwrap(), 1);

    let vm = storage
        .vms()
        .get_by_ref(endpoint_id, "vm-1")
        .await
        .unwrap()
        .unwrap();
    let hardware = storage.hardwares().get_by_vm(vm.id).await.unwrap().unwrap();
    assert_eq!(storage.disks().list_by_hardware(hardware.id).await.unwrap().len(), 1);
    assert_eq!(storage.networks().list_by_hardware(hardware.id).await.unwrap().len(), 1);
    assert_eq!(
        storage.guest_devices().list_by_hardware(hardware.id).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_lazy_reference_order_independence() {
    use prism_inventory::{ClusterBuild, HostBuild};

    let (storage, endpoint_id) = setup_test_storage().await;

    // 先暂存主机再暂存其集群，提交后链接仍然成立
    let mut persister = InventoryPersister::new(endpoint_id);
    persister.build_host(HostBuild {
        ems_ref: "host-9".to_string(),
        name: Some("node-9".to_string()),
        cluster_ref: Some("cluster-9".to_string()),
        memory_mb: None,
        cpu_sockets: None,
        cpu_total_cores: None,
    });
    persister.build_cluster(ClusterBuild {
        ems_ref: "cluster-9".to_string(),
        name: Some("late".to_string()),
        uid_ems: Some("cluster-9".to_string()),
    });
    persister.commit(storage.pool()).await.expect("Commit failed");

    let cluster = storage
        .clusters()
        .get_by_ref(endpoint_id, "cluster-9")
        .await
        .unwrap()
        .unwrap();
    let host = storage
        .hosts()
        .get_by_ref(endpoint_id, "host-9")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(host.cluster_id, Some(cluster.id));
}

#[tokio::test]
async fn test_targeted_pass_preserves_existing_links() {
    let (storage, endpoint_id) = setup_test_storage().await;
    run_pass(&storage, endpoint_id, &sample_inventory()).await;

    // 定向轮只带虚拟机本身，宿主/集群不在暂存集内
    let targeted = CollectedInventory {
        vms: sample_inventory().vms,
        ..Default::default()
    };
    run_pass(&storage, endpoint_id, &targeted).await;

    let host = storage
        .hosts()
        .get_by_ref(endpoint_id, "host-1")
        .await
        .unwrap()
        .unwrap();
    let cluster = storage
        .clusters()
        .get_by_ref(endpoint_id, "cluster-1")
        .await
        .unwrap()
        .unwrap();
    let vm = storage
        .vms()
        .get_by_ref(endpoint_id, "vm-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(vm.host_id, Some(host.id));
    assert_eq!(vm.cluster_id, Some(cluster.id));
}

#[tokio::test]
async fn test_container_without_stats_stores_zero_capacity() {
    let (storage, endpoint_id) = setup_test_storage().await;

    // 统计拉取失败 (Null) 且配置无最大容量：容量字段落零而非 NULL
    let collected = CollectedInventory {
        datastores: vec![DatastoreBundle {
            ext_id: "C2".to_string(),
            name: Some("stats-less".to_string()),
            max_capacity_bytes: None,
            cluster_name: None,
            cluster_uuid: None,
            stats: Value::Null,
        }],
        ..Default::default()
    };
    run_pass(&storage, endpoint_id, &collected).await;

    let container = storage
        .storages()
        .get_by_ref(endpoint_id, "C2")
        .await
        .unwrap()
        .expect("storage missing");
    assert_eq!(container.total_space, Some(0));
    assert_eq!(container.free_space, Some(0));
    assert_eq!(container.uncommitted, Some(0));
}

#[tokio::test]
async fn test_malformed_vm_record_is_skipped() {
    let (storage, endpoint_id) = setup_test_storage().await;

    let mut collected = sample_inventory();
    collected.vms.push(Value::Null);
    collected.vms.push(json!({"name": "no-ext-id"}));
    run_pass(&storage, endpoint_id, &collected).await;

    assert_eq!(storage.vms().count_by_endpoint(endpoint_id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_lan_upsert_never_duplicates_uid() {
    let (storage, endpoint_id) = setup_test_storage().await;
    let collected = sample_inventory();

    run_pass(&storage, endpoint_id, &collected).await;

    // 同一网络 UID 换了名字也只更新既有行
    let mut renamed = collected.clone();
    renamed.subnets = vec![json!({"extId": "subnet-1", "name": "vm-net-renamed", "networkId": 100, "vlanId": 100})];
    run_pass(&storage, endpoint_id, &renamed).await;

    assert_eq!(storage.lans().count_by_endpoint(endpoint_id).await.unwrap(), 1);
    let lan = storage
        .lans()
        .get_by_uid(endpoint_id, "100")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lan.name.as_deref(), Some("vm-net-renamed"));
}
