//! Tests for the TCP server and client
//!
//! These tests verify:
//! - Writes and reads over a real socket
//! - Error statuses reach the client as rejections
//! - Multiple clients against one engine
//! - Graceful shutdown

use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use alloy_primitives::Address;
use feedstore::config::{Config, WalSyncStrategy};
use feedstore::engine::Engine;
use feedstore::error::StoreError;
use feedstore::network::{Client, Server};
use feedstore::protocol::{AdminCommand, ReadQuery, SlotRange, Status, WriteBatch};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn writer() -> Address {
    Address::with_last_byte(0x11)
}

struct TestServer {
    _temp_dir: TempDir,
    server: Arc<Server>,
    handle: Option<JoinHandle<()>>,
    addr: String,
}

impl TestServer {
    fn start() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::builder()
            .data_dir(temp_dir.path())
            .wal_sync_strategy(WalSyncStrategy::EveryWrite)
            .writer(writer())
            .listen_addr("127.0.0.1:0")
            .build();

        let engine = Arc::new(Engine::open(config.clone()).unwrap());
        let server = Arc::new(Server::bind(config, engine).unwrap());
        let addr = server.local_addr().unwrap().to_string();

        let run_server = Arc::clone(&server);
        let handle = thread::spawn(move || run_server.run().unwrap());

        Self {
            _temp_dir: temp_dir,
            server,
            handle: Some(handle),
            addr,
        }
    }

    fn client(&self, caller: Address) -> Client {
        Client::connect(&self.addr, caller).unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn rejected_status(err: StoreError) -> Status {
    match err {
        StoreError::Rejected { status, .. } => status,
        other => panic!("expected rejection, got {:?}", other),
    }
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_write_and_read_over_tcp() {
    let server = TestServer::start();
    let mut client = server.client(writer());
    let data = hex::decode("12343267643573").unwrap();

    client
        .write(WriteBatch::new(1234).feed(1, 1, 6, data.clone()))
        .unwrap();

    assert_eq!(client.latest_round(1, 1).unwrap(), 6);

    let value = client
        .read(ReadQuery::LatestFeed {
            stride: 1,
            id: 1,
            range: SlotRange::FULL,
        })
        .unwrap();
    let mut expected = data;
    expected.resize(64, 0);
    assert_eq!(value, expected);
}

#[test]
fn test_many_requests_on_one_connection() {
    let server = TestServer::start();
    let mut client = server.client(writer());

    for block in 1..=25u64 {
        client
            .write(WriteBatch::new(block).feed(2, 0, block as u16, vec![block as u8; 32]))
            .unwrap();
        assert_eq!(client.latest_round(0, 2).unwrap(), block as u16);
    }
}

#[test]
fn test_multiple_clients() {
    let server = TestServer::start();
    let mut writer_client = server.client(writer());
    writer_client
        .write(WriteBatch::new(1).feed(9, 0, 1, vec![0x5au8; 32]))
        .unwrap();

    let handles: Vec<_> = (0..4u8)
        .map(|n| {
            let mut client = server.client(Address::with_last_byte(0x40 + n));
            thread::spawn(move || {
                client
                    .read(ReadQuery::LatestSingleFeed { id: 9 })
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), vec![0x5au8; 32]);
    }

    // The writer's connection is still open and has been served
    assert!(server.server.active_connections() >= 1);
}

// =============================================================================
// Error Status Tests
// =============================================================================

#[test]
fn test_errors_map_to_statuses() {
    let server = TestServer::start();
    let mut client = server.client(writer());
    client.write(WriteBatch::new(5)).unwrap();

    let err = client.write(WriteBatch::new(5)).unwrap_err();
    assert_eq!(rejected_status(err), Status::OutOfOrder);

    let err = client
        .write(WriteBatch::new(6).feed(0, 0, 1, vec![0u8; 33]))
        .unwrap_err();
    assert_eq!(rejected_status(err), Status::OverCapacity);

    let err = client.latest_round(32, 0).unwrap_err();
    assert_eq!(rejected_status(err), Status::OutOfRange);

    let err = client
        .admin(AdminCommand::UpgradeTo(Address::with_last_byte(2)))
        .unwrap_err();
    assert_eq!(rejected_status(err), Status::AdminAccess);

    let err = client.call_raw(&[0x42]).unwrap_err();
    assert_eq!(rejected_status(err), Status::Malformed);

    // The connection survives every rejection
    assert_eq!(client.latest_round(0, 0).unwrap(), 0);
}

#[test]
fn test_unauthorized_writer_over_tcp() {
    let server = TestServer::start();
    let mut client = server.client(Address::with_last_byte(0x77));

    let err = client.write(WriteBatch::new(1)).unwrap_err();
    assert_eq!(rejected_status(err), Status::Unauthorized);
}

#[test]
fn test_admin_over_tcp() {
    let server = TestServer::start();
    let admin = Config::default().admin;
    let mut admin_client = server.client(admin);

    let err = admin_client
        .admin(AdminCommand::UpgradeTo(Address::with_last_byte(0x99)))
        .unwrap_err();
    assert_eq!(rejected_status(err), Status::BadImplementation);

    let err = admin_client.latest_round(0, 0).unwrap_err();
    assert_eq!(rejected_status(err), Status::AdminAccess);

    admin_client
        .admin(AdminCommand::ChangeAdmin(writer()))
        .unwrap();
    assert_eq!(admin_client.latest_round(0, 0).unwrap(), 0);
}

#[test]
fn test_abandoned_connections_do_not_stop_server() {
    let server = TestServer::start();

    for _ in 0..8 {
        let stream = TcpStream::connect(&server.addr).unwrap();
        stream.shutdown(Shutdown::Both).unwrap();
    }
    // A frame cut short also only ends its own connection
    let mut torn = TcpStream::connect(&server.addr).unwrap();
    torn.write_all(&[0x00, 0x00, 0x00, 0x10]).unwrap();
    drop(torn);

    let mut client = server.client(writer());
    client
        .write(WriteBatch::new(1).feed(1, 0, 1, vec![1u8; 32]))
        .unwrap();
    assert_eq!(client.latest_round(0, 1).unwrap(), 1);
}

// =============================================================================
// Shutdown Tests
// =============================================================================

#[test]
fn test_shutdown_stops_accept_loop() {
    let mut server = TestServer::start();
    server.server.shutdown();

    let handle = server.handle.take().unwrap();
    handle.join().unwrap();
    assert!(server.server.shutdown_handle().load(std::sync::atomic::Ordering::Relaxed));
}
