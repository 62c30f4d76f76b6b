//! Engine Module
//!
//! The deployed store: proxy-owned storage plus everything around it.
//!
//! ## Responsibilities
//! - Own the slot storage, access control and proxy state
//! - Route decoded requests through the proxy's capability check
//! - Journal every state change before applying it
//! - Publish one update event per committed batch
//! - Replay the journal on startup

use std::fs;
use std::path::Path;
use std::sync::Arc;

use alloy_primitives::Address;
use crossbeam::channel::Receiver;
use parking_lot::{Mutex, RwLock};

use crate::access::AccessControl;
use crate::config::Config;
use crate::error::Result;
use crate::events::{Notifier, UpdateEvent};
use crate::protocol::{decode_request, AdminCommand, ReadQuery, Request, RequestTag, WriteBatch};
use crate::proxy::UpgradeProxy;
use crate::storage::SlotStorage;
use crate::store::{StandardLogic, StoreLogic};
use crate::wal::{Operation, WalEntry, WalRecovery, WalWriter};

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (batches, writer-set changes): Serialized by `write_lock`
///   - Only ONE write operation at a time
///   - Validation runs under the storage read lock, so readers keep going
///   - Must acquire: write_lock → WAL → storage (write) to commit
///
/// - **Reads**: Concurrent under the storage read lock
///   - Each read sees either all or none of a batch
///
/// - **Admin commands**: Serialized by `write_lock` like writes
///   - Must acquire: write_lock → proxy (write) → WAL
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Feed slots, round table, last block number
    storage: RwLock<SlotStorage>,

    /// Authorized writers
    access: RwLock<AccessControl>,

    /// Admin identity and current implementation
    proxy: RwLock<UpgradeProxy>,

    /// Write-ahead log for durability (exclusive access needed)
    wal: Mutex<WalWriter>,

    /// Update event fan-out
    notifier: Notifier,

    /// Serializes write operations
    write_lock: Mutex<()>,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Open/create data directory
    /// 2. Deploy the built-in implementation, then recover and replay the WAL
    /// 3. Ready to serve requests
    ///
    /// The proxy starts from the configured admin and built-in implementation;
    /// journaled admin commands are replayed on top.
    pub fn open(config: Config) -> Result<Self> {
        // Step 1: Create data directory if it doesn't exist
        fs::create_dir_all(&config.data_dir)?;
        let wal_path = config.data_dir.join(Self::WAL_FILENAME);

        let mut storage = SlotStorage::new();
        let mut access = AccessControl::with_writers(config.owner, config.writers.iter().copied());

        // Proxy in front of the built-in implementation
        let logic: Arc<dyn StoreLogic> = Arc::new(StandardLogic::default());
        let mut proxy = UpgradeProxy::new(config.admin, config.implementation, logic);

        // Step 2: Replay committed batches, writer changes and admin commands
        let mut next_lsn = 1;
        if wal_path.exists() {
            let (entries, recovery_result) = WalRecovery::recover(&wal_path)?;

            if recovery_result.entries_recovered > 0 || recovery_result.entries_corrupted > 0 {
                tracing::info!(
                    recovered = recovery_result.entries_recovered,
                    corrupted = recovery_result.entries_corrupted,
                    last_lsn = recovery_result.last_lsn,
                    truncated = recovery_result.was_truncated,
                    "WAL recovery complete"
                );
            }

            for entry in &entries {
                Self::replay(entry, &mut storage, &mut access, &mut proxy);
            }
            next_lsn = recovery_result.last_lsn + 1;
        }
        let wal = WalWriter::open(&wal_path, config.wal_sync_strategy, next_lsn)?;

        tracing::info!(
            last_block_number = storage.last_block_number(),
            slots = storage.slot_count(),
            rows = storage.row_count(),
            admin = %proxy.admin(),
            implementation = %proxy.implementation(),
            "Engine opened"
        );

        Ok(Self {
            config,
            storage: RwLock::new(storage),
            access: RwLock::new(access),
            proxy: RwLock::new(proxy),
            wal: Mutex::new(wal),
            notifier: Notifier::new(),
            write_lock: Mutex::new(()),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    fn replay(
        entry: &WalEntry,
        storage: &mut SlotStorage,
        access: &mut AccessControl,
        proxy: &mut UpgradeProxy,
    ) {
        let operation = &entry.operation;
        if let Operation::SetWriter { writer, allowed } = operation {
            access.apply_writer(Address::from(*writer), *allowed);
        } else if let Some(commit) = operation.to_commit() {
            storage.apply(&commit);
        } else if let Some(command) = operation.to_admin() {
            // Implementations deployed at runtime are gone after a restart
            if let Err(e) = proxy.apply_admin(command) {
                tracing::warn!(lsn = entry.lsn, error = %e, "Skipping journaled upgrade");
            }
        }
    }

    /// Execute a raw request on behalf of `caller`
    ///
    /// Returns the raw response payload (empty for writes and admin commands).
    pub fn execute(&self, caller: &Address, request: &[u8]) -> Result<Vec<u8>> {
        let request = decode_request(request)?;
        self.dispatch(caller, request)
    }

    /// Route a decoded request
    pub fn dispatch(&self, caller: &Address, request: Request) -> Result<Vec<u8>> {
        match request {
            Request::Admin(command) => {
                self.admin(caller, command)?;
                Ok(Vec::new())
            }
            Request::Write(batch) => {
                self.write(caller, &batch)?;
                Ok(Vec::new())
            }
            Request::Read(query) => self.read(caller, &query),
        }
    }

    /// Apply a write batch through the current implementation
    ///
    /// Steps:
    /// 1. Proxy capability check
    /// 2. Acquire write lock
    /// 3. Validate and stage (authorization, ordering, ranges)
    /// 4. Append the commit to the WAL (durability)
    /// 5. Apply the commit to storage
    /// 6. Publish the update event
    pub fn write(&self, caller: &Address, batch: &WriteBatch) -> Result<()> {
        let logic = {
            let proxy = self.proxy.read();
            proxy.authorize(caller, RequestTag::Write)?;
            proxy.logic()?
        };

        // Acquire write lock to serialize writes
        let _write_guard = self.write_lock.lock();

        let commit = {
            let storage = self.storage.read();
            let access = self.access.read();
            logic.prepare_write(&storage, &access, caller, batch)
        };
        let commit = commit.map_err(|e| {
            tracing::warn!(%caller, block_number = batch.block_number, error = %e, "Write batch rejected");
            e
        })?;

        // Step 4: Write to WAL first (durability guarantee)
        self.wal.lock().append(Operation::commit(&commit))?;

        // Step 5: Apply to storage in one step
        self.storage.write().apply(&commit);

        tracing::info!(
            block_number = commit.block_number,
            feeds = batch.feeds.len(),
            slots = commit.slots.len(),
            rows = commit.rows.len(),
            "Write batch committed"
        );

        // Step 6: Notify
        self.notifier.publish(UpdateEvent {
            block_number: commit.block_number,
        });

        Ok(())
    }

    /// Answer a read query through the current implementation
    pub fn read(&self, caller: &Address, query: &ReadQuery) -> Result<Vec<u8>> {
        let logic = {
            let proxy = self.proxy.read();
            proxy.authorize(caller, query.tag())?;
            proxy.logic()?
        };

        let storage = self.storage.read();
        logic.read(&storage, query)
    }

    /// Execute a privileged proxy command
    ///
    /// The command is journaled before it takes effect, so an admin handover
    /// survives a restart.
    pub fn admin(&self, caller: &Address, command: AdminCommand) -> Result<()> {
        let _write_guard = self.write_lock.lock();

        let mut proxy = self.proxy.write();
        proxy.check_admin(caller, &command)?;

        self.wal.lock().append(Operation::admin(&command))?;
        proxy.apply_admin(command)
    }

    /// Make an implementation available for a later upgrade
    pub fn deploy(&self, address: Address, logic: Arc<dyn StoreLogic>) -> Result<()> {
        self.proxy.write().deploy(address, logic)
    }

    /// Grant or revoke write access (access control owner only)
    pub fn set_writer(&self, caller: &Address, writer: Address, allowed: bool) -> Result<()> {
        let _write_guard = self.write_lock.lock();

        let mut access = self.access.write();
        access.check_owner(caller)?;

        self.wal.lock().append(Operation::set_writer(&writer, allowed))?;
        access.apply_writer(writer, allowed);
        Ok(())
    }

    /// Is `address` currently an authorized writer
    pub fn is_writer(&self, address: &Address) -> bool {
        self.access.read().is_allowed(address)
    }

    /// Receive an event for every batch committed from now on
    pub fn subscribe(&self) -> Receiver<UpdateEvent> {
        self.notifier.subscribe()
    }

    /// Close the engine gracefully
    ///
    /// Syncs the WAL to disk
    pub fn close(self) -> Result<()> {
        self.wal.lock().sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Block number of the last committed batch
    pub fn last_block_number(&self) -> u64 {
        self.storage.read().last_block_number()
    }

    /// Number of nonzero data slots
    pub fn slot_count(&self) -> usize {
        self.storage.read().slot_count()
    }

    /// Current implementation address
    pub fn implementation(&self) -> Address {
        self.proxy.read().implementation()
    }

    /// Current proxy admin
    pub fn admin_address(&self) -> Address {
        self.proxy.read().admin()
    }

    /// LSN of the last journaled operation
    pub fn current_lsn(&self) -> u64 {
        self.wal.lock().current_lsn()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
