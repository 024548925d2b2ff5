//! End-to-end scenarios exercising the engine through [`LedgerHandle`] only,
//! no direct KV access, the same boundary a real caller would use.

use std::{sync::Arc, time::Duration};

use metalocker_kv::MemKv;
use metalocker_ledger::{
    test_utils::MockRecordFactory, AssetState, LedgerConfig, LedgerHandle, NonceSource,
    RecordStatus,
};
use metalocker_notify::InMemoryBus;

fn instant_config() -> LedgerConfig {
    LedgerConfig { block_check_interval: Duration::ZERO, ..LedgerConfig::default() }
}

async fn spawn_instant() -> LedgerHandle {
    LedgerHandle::spawn(
        Arc::new(MemKv::new()),
        Arc::new(InMemoryBus::new()),
        instant_config(),
        NonceSource::Deterministic(1),
    )
    .await
    .unwrap()
}

/// Polls `GetRecordState` until the record leaves `Pending`, or panics after
/// a generous timeout. The engine seals asynchronously on its own task, so
/// callers can't assume a record is sealed the instant `submit_record`
/// returns.
async fn wait_until_settled(handle: &LedgerHandle, id: &str) -> metalocker_ledger::RecordState {
    for _ in 0..200 {
        let state = handle.get_record_state(id).await.unwrap();
        if state.status != RecordStatus::Pending {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("record {id} never left Pending");
}

#[tokio::test]
async fn s1_genesis_block_is_sealed_on_startup() {
    let handle = spawn_instant().await;

    let genesis = handle.get_genesis_block().await.unwrap();
    assert_eq!(genesis.number, 0);
    assert_eq!(genesis.parent_hash, "");

    let top = handle.get_top_block().await.unwrap();
    assert_eq!(top, genesis);
}

#[tokio::test]
async fn s2_single_lease_is_published_and_bumps_asset_counter() {
    let handle = spawn_instant().await;
    let mut factory = MockRecordFactory::new();

    let lease = factory.lease(&["asset-a"], "operation-addr");
    let id = lease.id.clone();
    handle.submit_record(lease).await.unwrap();

    let state = wait_until_settled(&handle, &id).await;
    assert_eq!(state.status, RecordStatus::Published);
    assert!(state.block_number > 0);

    let asset_state = handle.get_data_asset_state("asset-a").await.unwrap();
    assert_eq!(asset_state, AssetState::Keep);

    let top = handle.get_top_block().await.unwrap();
    let records = handle.get_block_records(top.number).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].record_id, id);
}

#[tokio::test]
async fn s3_revocation_publishes_and_decrements_assets() {
    let handle = spawn_instant().await;
    let mut factory = MockRecordFactory::new();

    let (lease, preimage) = factory.lease_with_proof(&["asset-b"], "operation-addr-2");
    let lease_id = lease.id.clone();
    handle.submit_record(lease).await.unwrap();
    wait_until_settled(&handle, &lease_id).await;

    let revocation = factory.revocation(&lease_id, &preimage);
    let revocation_id = revocation.id.clone();
    handle.submit_record(revocation).await.unwrap();
    let revocation_state = wait_until_settled(&handle, &revocation_id).await;
    assert_eq!(revocation_state.status, RecordStatus::Published);

    let lease_state = handle.get_record_state(&lease_id).await.unwrap();
    assert_eq!(lease_state.status, RecordStatus::Revoked);

    let asset_state = handle.get_data_asset_state("asset-b").await.unwrap();
    assert_eq!(asset_state, AssetState::Remove);
}

#[tokio::test]
async fn s4_bad_revocation_proof_aborts_without_sealing() {
    let handle = spawn_instant().await;
    let mut factory = MockRecordFactory::new();

    let lease = factory.lease(&["asset-c"], "operation-addr-3");
    let lease_id = lease.id.clone();
    handle.submit_record(lease).await.unwrap();
    wait_until_settled(&handle, &lease_id).await;

    let top_before = handle.get_top_block().await.unwrap();

    let bad = factory.bad_revocation(&lease_id);
    let bad_id = bad.id.clone();
    handle.submit_record(bad).await.unwrap();

    // Give the engine a moment to attempt (and fail) the seal.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let state = handle.get_record_state(&bad_id).await.unwrap();
    assert_eq!(state.status, RecordStatus::Pending);

    let top_after = handle.get_top_block().await.unwrap();
    assert_eq!(top_before.number, top_after.number);

    let lease_state = handle.get_record_state(&lease_id).await.unwrap();
    assert_eq!(lease_state.status, RecordStatus::Published);
}

#[tokio::test]
async fn s5_asset_head_succession_revokes_previous_pointer() {
    let handle = spawn_instant().await;
    let mut factory = MockRecordFactory::new();

    let first = factory.asset_head("head-x");
    let first_id = first.id.clone();
    handle.submit_record(first).await.unwrap();
    wait_until_settled(&handle, &first_id).await;

    assert_eq!(handle.get_asset_head("head-x").await.unwrap(), Some(first_id.clone()));

    let second = factory.asset_head("head-x");
    let second_id = second.id.clone();
    handle.submit_record(second).await.unwrap();
    wait_until_settled(&handle, &second_id).await;

    assert_eq!(handle.get_asset_head("head-x").await.unwrap(), Some(second_id.clone()));

    let first_state = handle.get_record_state(&first_id).await.unwrap();
    assert_eq!(first_state.status, RecordStatus::Revoked);
    let second_state = handle.get_record_state(&second_id).await.unwrap();
    assert_eq!(second_state.status, RecordStatus::Published);
}

#[tokio::test]
async fn s6_batching_seals_7_records_into_3_3_1() {
    let config = LedgerConfig {
        block_check_interval: Duration::from_millis(20),
        max_records_per_block: 3,
        ..LedgerConfig::default()
    };
    let handle = LedgerHandle::spawn(
        Arc::new(MemKv::new()),
        Arc::new(InMemoryBus::new()),
        config,
        NonceSource::Deterministic(7),
    )
    .await
    .unwrap();
    let mut factory = MockRecordFactory::new();

    let mut ids = Vec::new();
    for i in 0..7 {
        let record = factory.lease(&[&format!("asset-{i}")], &format!("addr-{i}"));
        ids.push(record.id.clone());
        handle.submit_record(record).await.unwrap();
    }

    // The first two batches of 3 seal as soon as the threshold is hit; the
    // trailing single record only seals once the ticker fires.
    for id in &ids {
        let state = wait_until_settled(&handle, id).await;
        assert_eq!(state.status, RecordStatus::Published);
    }

    let states: Vec<_> =
        futures::future::join_all(ids.iter().map(|id| handle.get_record_state(id)))
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();

    let first_block = states[0].block_number;
    let second_block = states[3].block_number;
    let third_block = states[6].block_number;
    assert_eq!(second_block, first_block + 1);
    assert_eq!(third_block, second_block + 1);
    for state in &states[0..3] {
        assert_eq!(state.block_number, first_block);
    }
    for state in &states[3..6] {
        assert_eq!(state.block_number, second_block);
    }
    assert_eq!(states[6].block_number, third_block);

    let block1_records = handle.get_block_records(first_block as u64).await.unwrap();
    let block2_records = handle.get_block_records(second_block as u64).await.unwrap();
    let block3_records = handle.get_block_records(third_block as u64).await.unwrap();
    assert_eq!(block1_records.len(), 3);
    assert_eq!(block2_records.len(), 3);
    assert_eq!(block3_records.len(), 1);

    let block1_ids: Vec<_> = block1_records.iter().map(|e| e.record_id.clone()).collect();
    let block2_ids: Vec<_> = block2_records.iter().map(|e| e.record_id.clone()).collect();
    let block3_ids: Vec<_> = block3_records.iter().map(|e| e.record_id.clone()).collect();
    assert_eq!(block1_ids, ids[0..3]);
    assert_eq!(block2_ids, ids[3..6]);
    assert_eq!(block3_ids, ids[6..7]);
}

#[tokio::test]
async fn get_chain_walks_from_genesis_to_top() {
    let handle = spawn_instant().await;
    let mut factory = MockRecordFactory::new();

    let lease = factory.lease(&["asset-d"], "addr-d");
    let id = lease.id.clone();
    handle.submit_record(lease).await.unwrap();
    wait_until_settled(&handle, &id).await;

    let chain = handle.get_chain().await.unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].number, 0);
    assert_eq!(chain[1].number, 1);
    assert_eq!(chain[1].parent_hash, chain[0].hash);
}

#[tokio::test]
async fn close_is_idempotent() {
    let handle = spawn_instant().await;
    handle.close();
    handle.close();
}
