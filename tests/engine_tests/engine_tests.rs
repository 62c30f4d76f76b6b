//! Tests for Engine
//!
//! These tests verify:
//! - Raw request execution end to end
//! - Proxy segregation and upgrades with storage kept in place
//! - Writer management by the access control owner
//! - Update notifications
//! - Crash recovery from WAL
//! - Concurrent reads during writes

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use alloy_primitives::Address;
use feedstore::access::AccessControl;
use feedstore::config::{Config, WalSyncStrategy};
use feedstore::engine::Engine;
use feedstore::error::{Result, StoreError};
use feedstore::events::{Notifier, UpdateEvent};
use feedstore::protocol::{
    decode_round, encode_read, encode_request, AdminCommand, ReadQuery, Request, SlotRange,
    WriteBatch,
};
use feedstore::storage::{Commit, SlotStorage};
use feedstore::store::{StandardLogic, StoreLogic};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn writer() -> Address {
    Address::with_last_byte(0x11)
}

fn reader() -> Address {
    Address::with_last_byte(0x22)
}

fn test_config(dir: &std::path::Path) -> Config {
    Config::builder()
        .data_dir(dir)
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .writer(writer())
        .build()
}

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(test_config(temp_dir.path())).unwrap();
    (temp_dir, engine)
}

fn latest(engine: &Engine, stride: u8, id: u128) -> Vec<u8> {
    engine
        .read(
            &reader(),
            &ReadQuery::LatestFeed {
                stride,
                id,
                range: SlotRange::FULL,
            },
        )
        .unwrap()
}

fn latest_round(engine: &Engine, stride: u8, id: u128) -> u16 {
    let word = engine
        .read(&reader(), &ReadQuery::LatestRound { stride, id })
        .unwrap();
    decode_round(&word).unwrap()
}

/// Standard behaviour plus call counters
struct CountingLogic {
    inner: StandardLogic,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl CountingLogic {
    fn new() -> Self {
        Self {
            inner: StandardLogic::new("counting"),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }
}

impl StoreLogic for CountingLogic {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn prepare_write(
        &self,
        storage: &SlotStorage,
        access: &AccessControl,
        caller: &Address,
        batch: &WriteBatch,
    ) -> Result<Commit> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.prepare_write(storage, access, caller, batch)
    }

    fn read(&self, storage: &SlotStorage, query: &ReadQuery) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(storage, query)
    }
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_engine_open_creates_directories() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("feeds");

    let engine = Engine::open(test_config(&data_dir)).unwrap();

    assert!(data_dir.exists());
    assert!(data_dir.join("wal.log").exists());
    assert_eq!(engine.data_dir(), data_dir.as_path());
    assert_eq!(engine.last_block_number(), 0);
    assert_eq!(engine.current_lsn(), 0);
}

#[test]
fn test_open_path_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path()).unwrap();

    assert_eq!(engine.implementation(), Config::default().implementation);
    assert_eq!(engine.admin_address(), Config::default().admin);
    assert!(!engine.is_writer(&writer()));
}

// =============================================================================
// Raw Execution Tests
// =============================================================================

#[test]
fn test_execute_write_and_reads() {
    let (_temp_dir, engine) = setup_temp_engine();
    let data = hex::decode("12343267643573").unwrap();
    let write = encode_request(&Request::Write(
        WriteBatch::new(1234).feed(1, 1, 6, data.clone()),
    ));

    assert_eq!(engine.execute(&writer(), &write).unwrap(), Vec::<u8>::new());
    assert_eq!(engine.last_block_number(), 1234);

    let value = engine
        .execute(
            &reader(),
            &encode_read(&ReadQuery::LatestFeed {
                stride: 1,
                id: 1,
                range: SlotRange::FULL,
            }),
        )
        .unwrap();
    let mut expected = data;
    expected.resize(64, 0);
    assert_eq!(value, expected);

    let word = engine
        .execute(&reader(), &encode_read(&ReadQuery::LatestRound { stride: 1, id: 1 }))
        .unwrap();
    assert_eq!(decode_round(&word).unwrap(), 6);
}

#[test]
fn test_execute_malformed_request() {
    let (_temp_dir, engine) = setup_temp_engine();

    assert!(matches!(
        engine.execute(&writer(), &[0x42]),
        Err(StoreError::Protocol(_))
    ));
    assert!(matches!(
        engine.execute(&writer(), &[]),
        Err(StoreError::Protocol(_))
    ));
}

// =============================================================================
// Write Path Tests
// =============================================================================

#[test]
fn test_unauthorized_write() {
    let (_temp_dir, engine) = setup_temp_engine();

    let result = engine.write(&reader(), &WriteBatch::new(1).feed(0, 0, 1, vec![1u8]));
    assert!(matches!(result, Err(StoreError::Authorization(_))));
    assert_eq!(engine.last_block_number(), 0);
    assert_eq!(engine.current_lsn(), 0);
}

#[test]
fn test_out_of_order_write_leaves_state() {
    let (_temp_dir, engine) = setup_temp_engine();
    engine
        .write(&writer(), &WriteBatch::new(10).feed(3, 0, 1, vec![0xaau8; 32]))
        .unwrap();

    let result = engine.write(&writer(), &WriteBatch::new(10).feed(3, 0, 2, vec![0xbbu8; 32]));
    assert!(matches!(result, Err(StoreError::Ordering { .. })));

    assert_eq!(latest_round(&engine, 0, 3), 1);
    assert_eq!(latest(&engine, 0, 3), vec![0xaau8; 32]);
    assert_eq!(engine.current_lsn(), 1);
}

// =============================================================================
// Proxy Tests
// =============================================================================

#[test]
fn test_admin_segregation() {
    let (_temp_dir, engine) = setup_temp_engine();
    let admin = engine.admin_address();

    let result = engine.read(&admin, &ReadQuery::LatestRound { stride: 0, id: 0 });
    assert!(matches!(result, Err(StoreError::AdminAccess(_))));

    let result = engine.write(&admin, &WriteBatch::new(1));
    assert!(matches!(result, Err(StoreError::AdminAccess(_))));

    let result = engine.admin(&writer(), AdminCommand::ChangeAdmin(writer()));
    assert!(matches!(result, Err(StoreError::AdminAccess(_))));
    assert_eq!(engine.admin_address(), admin);
}

#[test]
fn test_upgrade_preserves_storage() {
    let (_temp_dir, engine) = setup_temp_engine();
    engine
        .write(&writer(), &WriteBatch::new(1).feed(5, 1, 3, vec![7u8; 64]))
        .unwrap();

    let v2_address = Address::with_last_byte(0x02);
    let v2 = Arc::new(CountingLogic::new());
    engine.deploy(v2_address, v2.clone()).unwrap();

    let upgrade = encode_request(&Request::Admin(AdminCommand::UpgradeTo(v2_address)));
    engine.execute(&engine.admin_address(), &upgrade).unwrap();
    assert_eq!(engine.implementation(), v2_address);

    // Data written before the upgrade is served by the new logic
    assert_eq!(latest_round(&engine, 1, 5), 3);
    assert_eq!(latest(&engine, 1, 5), vec![7u8; 64]);
    assert_eq!(v2.reads.load(Ordering::SeqCst), 2);

    // Ordering carries over too
    let result = engine.write(&writer(), &WriteBatch::new(1));
    assert!(matches!(result, Err(StoreError::Ordering { .. })));
    engine
        .write(&writer(), &WriteBatch::new(2).feed(5, 1, 4, vec![8u8; 64]))
        .unwrap();
    assert_eq!(v2.writes.load(Ordering::SeqCst), 2);
    assert_eq!(latest_round(&engine, 1, 5), 4);
}

#[test]
fn test_upgrade_to_unknown_implementation() {
    let (_temp_dir, engine) = setup_temp_engine();
    let before = engine.implementation();

    let result = engine.admin(
        &engine.admin_address(),
        AdminCommand::UpgradeTo(Address::with_last_byte(0x99)),
    );
    assert!(matches!(result, Err(StoreError::Implementation(_))));
    assert_eq!(engine.implementation(), before);
}

#[test]
fn test_change_admin() {
    let (_temp_dir, engine) = setup_temp_engine();
    let old_admin = engine.admin_address();
    let new_admin = Address::with_last_byte(0xae);

    engine
        .admin(&old_admin, AdminCommand::ChangeAdmin(new_admin))
        .unwrap();

    assert_eq!(engine.admin_address(), new_admin);
    assert!(engine
        .read(&old_admin, &ReadQuery::LatestRound { stride: 0, id: 0 })
        .is_ok());
    assert!(matches!(
        engine.read(&new_admin, &ReadQuery::LatestRound { stride: 0, id: 0 }),
        Err(StoreError::AdminAccess(_))
    ));
}

// =============================================================================
// Writer Management Tests
// =============================================================================

#[test]
fn test_set_writer_requires_owner() {
    let (_temp_dir, engine) = setup_temp_engine();
    let owner = engine.config().owner;
    let newcomer = Address::with_last_byte(0x33);

    let result = engine.set_writer(&writer(), newcomer, true);
    assert!(matches!(result, Err(StoreError::Authorization(_))));
    assert!(!engine.is_writer(&newcomer));

    engine.set_writer(&owner, newcomer, true).unwrap();
    assert!(engine.is_writer(&newcomer));
    engine
        .write(&newcomer, &WriteBatch::new(1).feed(0, 0, 1, vec![1u8]))
        .unwrap();

    engine.set_writer(&owner, newcomer, false).unwrap();
    let result = engine.write(&newcomer, &WriteBatch::new(2));
    assert!(matches!(result, Err(StoreError::Authorization(_))));
}

#[test]
fn test_writer_changes_survive_restart() {
    let temp_dir = TempDir::new().unwrap();
    let newcomer = Address::with_last_byte(0x33);

    {
        let engine = Engine::open(test_config(temp_dir.path())).unwrap();
        let owner = engine.config().owner;
        engine.set_writer(&owner, newcomer, true).unwrap();
        engine.set_writer(&owner, writer(), false).unwrap();
        engine.close().unwrap();
    }

    let engine = Engine::open(test_config(temp_dir.path())).unwrap();
    assert!(engine.is_writer(&newcomer));
    assert!(!engine.is_writer(&writer()));
}

// =============================================================================
// Notification Tests
// =============================================================================

#[test]
fn test_one_event_per_committed_batch() {
    let (_temp_dir, engine) = setup_temp_engine();
    let events = engine.subscribe();

    engine
        .write(
            &writer(),
            &WriteBatch::new(5)
                .feed(0, 0, 1, vec![1u8])
                .feed(1, 0, 1, vec![2u8]),
        )
        .unwrap();
    assert_eq!(events.try_recv().unwrap(), UpdateEvent { block_number: 5 });
    assert!(events.try_recv().is_err());

    // Rejected batches publish nothing
    let _ = engine.write(&writer(), &WriteBatch::new(4));
    assert!(events.try_recv().is_err());

    engine.write(&writer(), &WriteBatch::new(6)).unwrap();
    assert_eq!(events.try_recv().unwrap().block_number, 6);
}

#[test]
fn test_dropped_subscriber_does_not_block_writes() {
    let (_temp_dir, engine) = setup_temp_engine();
    drop(engine.subscribe());
    let live = engine.subscribe();

    engine.write(&writer(), &WriteBatch::new(1)).unwrap();
    assert_eq!(live.try_recv().unwrap().block_number, 1);
}

#[test]
fn test_notifier_prunes_dropped_subscribers() {
    let notifier = Notifier::new();
    let live = notifier.subscribe();
    drop(notifier.subscribe());
    assert_eq!(notifier.subscriber_count(), 2);

    notifier.publish(UpdateEvent { block_number: 3 });

    assert_eq!(notifier.subscriber_count(), 1);
    assert_eq!(live.try_recv().unwrap(), UpdateEvent { block_number: 3 });
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_recovery_after_restart() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(test_config(temp_dir.path())).unwrap();
        for block in 1..=20u64 {
            engine
                .write(
                    &writer(),
                    &WriteBatch::new(block).feed(
                        block as u128 % 4,
                        1,
                        block as u16,
                        vec![block as u8; 40],
                    ),
                )
                .unwrap();
        }
        // Rejected batch must not be journaled
        assert!(engine.write(&writer(), &WriteBatch::new(3)).is_err());
        // Simulate crash - drop without close
    }

    let engine = Engine::open(test_config(temp_dir.path())).unwrap();

    assert_eq!(engine.last_block_number(), 20);
    assert_eq!(engine.current_lsn(), 20);
    assert_eq!(latest_round(&engine, 1, 0), 20);
    assert_eq!(latest_round(&engine, 1, 3), 19);

    let mut expected = vec![20u8; 40];
    expected.resize(64, 0);
    assert_eq!(latest(&engine, 1, 0), expected);

    let result = engine.write(&writer(), &WriteBatch::new(20));
    assert!(matches!(result, Err(StoreError::Ordering { .. })));
    engine.write(&writer(), &WriteBatch::new(21)).unwrap();
    assert_eq!(engine.current_lsn(), 21);
}

#[test]
fn test_admin_handover_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let new_admin = Address::with_last_byte(0xae);

    {
        let engine = Engine::open(test_config(temp_dir.path())).unwrap();
        let old_admin = engine.admin_address();
        engine
            .admin(&old_admin, AdminCommand::ChangeAdmin(new_admin))
            .unwrap();
        assert_eq!(engine.current_lsn(), 1);
        engine.close().unwrap();
    }

    let engine = Engine::open(test_config(temp_dir.path())).unwrap();
    assert_eq!(engine.admin_address(), new_admin);

    let old_admin = Config::default().admin;
    let result = engine.admin(&old_admin, AdminCommand::ChangeAdmin(old_admin));
    assert!(matches!(result, Err(StoreError::AdminAccess(_))));
}

#[test]
fn test_rejected_admin_command_is_not_journaled() {
    let (_temp_dir, engine) = setup_temp_engine();

    let result = engine.admin(&writer(), AdminCommand::ChangeAdmin(writer()));
    assert!(matches!(result, Err(StoreError::AdminAccess(_))));

    let result = engine.admin(
        &engine.admin_address(),
        AdminCommand::UpgradeTo(Address::with_last_byte(0x99)),
    );
    assert!(matches!(result, Err(StoreError::Implementation(_))));
    assert_eq!(engine.current_lsn(), 0);
}

#[test]
fn test_upgrade_to_runtime_deployment_reverts_after_restart() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(test_config(temp_dir.path())).unwrap();
        let v2_address = Address::with_last_byte(0x02);
        engine
            .deploy(v2_address, Arc::new(StandardLogic::new("v2")))
            .unwrap();
        engine
            .admin(&engine.admin_address(), AdminCommand::UpgradeTo(v2_address))
            .unwrap();
        engine
            .write(&writer(), &WriteBatch::new(1).feed(0, 0, 1, vec![3u8; 32]))
            .unwrap();
        engine.close().unwrap();
    }

    // The deployed code is gone, so the journaled upgrade is skipped
    let engine = Engine::open(test_config(temp_dir.path())).unwrap();
    assert_eq!(engine.implementation(), Config::default().implementation);
    assert_eq!(engine.current_lsn(), 2);
    assert_eq!(latest(&engine, 0, 0), vec![3u8; 32]);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_reads_see_whole_batches() {
    let (_temp_dir, engine) = setup_temp_engine();
    let engine = Arc::new(engine);

    let writer_engine = Arc::clone(&engine);
    let write_handle = thread::spawn(move || {
        for round in 1..=50u16 {
            writer_engine
                .write(
                    &writer(),
                    &WriteBatch::new(round as u64).feed(0, 1, round, vec![round as u8; 64]),
                )
                .unwrap();
        }
    });

    let mut read_handles = Vec::new();
    for _ in 0..4 {
        let engine = Arc::clone(&engine);
        read_handles.push(thread::spawn(move || {
            for _ in 0..200 {
                let response = engine
                    .read(
                        &reader(),
                        &ReadQuery::LatestFeedAndRound {
                            stride: 1,
                            id: 0,
                            range: SlotRange::FULL,
                        },
                    )
                    .unwrap();
                let round = decode_round(&response).unwrap();
                assert!(response[32..].iter().all(|&b| b == round as u8));
            }
        }));
    }

    write_handle.join().unwrap();
    for handle in read_handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.last_block_number(), 50);
    assert_eq!(latest_round(&engine, 1, 0), 50);
}
