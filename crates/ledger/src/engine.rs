//! The Ledger Engine (component C5, spec §4.5): the single cooperative task
//! that owns block sealing, and the public [`LedgerHandle`] front door.
//!
//! Mirrors the teacher's handle/task split (`NetworkHandle` wraps a command
//! channel into `NetworkManager::run`; the transaction pool does the same
//! around its maintenance task): [`LedgerHandle`] is a cheap, `Clone`-able,
//! `Send + Sync` struct that only ever awaits channel capacity, never disk
//! I/O. The actual state, the in-memory pending list, the KV store, and the
//! notification bus, lives exclusively inside [`LedgerEngine::run`], spawned
//! once as a `tokio::task` and never touched from any other task.

use std::sync::Arc;

use metalocker_kv::{buckets, KvStore};
use metalocker_notify::{NewBlockMessage, NotificationBus, NEW_BLOCK_TOPIC};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{
    assets::{self, AssetState},
    block::{genesis_block, BlockSealInput, NonceSource},
    composition::{decimal_key, check_no_reserved_separator, CompositionEntry},
    config::LedgerConfig,
    controls, heads,
    error::{LedgerError, Result},
    record::{OperationKind, Record, RecordState, RecordStatus},
    session, storage,
};

/// A query or command sent to the engine task. `SubmitRecord` is
/// fire-and-forget (spec §4.5.1: "never blocks on disk I/O"); every other
/// variant carries a `oneshot` reply so the handle can await an answer
/// without ever touching the KV store itself.
enum EngineCommand {
    SubmitRecord(Record),
    GetRecord(String, oneshot::Sender<Result<(Record, RecordState)>>),
    GetRecordState(String, oneshot::Sender<Result<RecordState>>),
    GetBlock(u64, oneshot::Sender<Result<crate::block::Block>>),
    GetTopBlock(oneshot::Sender<Result<crate::block::Block>>),
    GetBlockRecords(u64, oneshot::Sender<Result<Vec<CompositionEntry>>>),
    GetDataAssetState(String, oneshot::Sender<Result<AssetState>>),
    GetAssetHead(String, oneshot::Sender<Result<Option<String>>>),
    CurrentSession(oneshot::Sender<Result<String>>),
}

/// Public, cheaply-cloneable front door to a running ledger engine (spec
/// §4.5.1). Every method either sends into the bounded command channel or
/// awaits a reply on a `oneshot`; none of them touch the store directly.
#[derive(Clone)]
pub struct LedgerHandle {
    commands: mpsc::Sender<EngineCommand>,
    shutdown: CancellationToken,
}

impl LedgerHandle {
    /// Spawns the engine task and returns its handle (spec §4.5.2: startup
    /// sequence runs before the task ever accepts commands).
    pub async fn spawn<K>(
        kv: Arc<K>,
        notify: Arc<dyn NotificationBus>,
        config: LedgerConfig,
        nonce_source: NonceSource,
    ) -> Result<Self>
    where
        K: KvStore,
    {
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let shutdown = CancellationToken::new();

        let mut engine = LedgerEngine {
            kv,
            notify,
            config,
            nonce_source,
            pending: Vec::new(),
            session_id: String::new(),
        };
        engine.startup()?;

        let task_shutdown = shutdown.clone();
        tokio::task::spawn(async move {
            engine.run(rx, task_shutdown).await;
        });

        Ok(Self { commands: tx, shutdown })
    }

    /// `SubmitRecord` (spec §4.5.1): validates shape synchronously, then
    /// enqueues. Returns once the record is on the channel, not once it is
    /// durable.
    pub async fn submit_record(&self, record: Record) -> Result<()> {
        record.validate()?;
        self.commands
            .send(EngineCommand::SubmitRecord(record))
            .await
            .map_err(|_| LedgerError::NoActiveSession)
    }

    /// `GetRecord` (spec §4.5.1): the stored record plus its current status.
    pub async fn get_record(&self, id: impl Into<String>) -> Result<(Record, RecordState)> {
        self.call(|reply| EngineCommand::GetRecord(id.into(), reply)).await
    }

    pub async fn get_record_state(&self, id: impl Into<String>) -> Result<RecordState> {
        self.call(|reply| EngineCommand::GetRecordState(id.into(), reply)).await
    }

    pub async fn get_block(&self, number: u64) -> Result<crate::block::Block> {
        self.call(|reply| EngineCommand::GetBlock(number, reply)).await
    }

    pub async fn get_genesis_block(&self) -> Result<crate::block::Block> {
        self.get_block(0).await
    }

    pub async fn get_top_block(&self) -> Result<crate::block::Block> {
        self.call(EngineCommand::GetTopBlock).await
    }

    /// `GetChain` (spec §4.5.1): walks blocks 0..=top via repeated
    /// `GetBlock` calls. No dedicated chain index: the teacher's
    /// `BlockchainProvider` resolves ranges the same way, one block read at
    /// a time, rather than materializing a side list.
    pub async fn get_chain(&self) -> Result<Vec<crate::block::Block>> {
        let top = self.get_top_block().await?;
        let mut chain = Vec::with_capacity(top.number as usize + 1);
        for number in 0..=top.number {
            chain.push(self.get_block(number).await?);
        }
        Ok(chain)
    }

    pub async fn get_block_records(&self, number: u64) -> Result<Vec<CompositionEntry>> {
        self.call(|reply| EngineCommand::GetBlockRecords(number, reply)).await
    }

    pub async fn get_data_asset_state(&self, asset_id: impl Into<String>) -> Result<AssetState> {
        self.call(|reply| EngineCommand::GetDataAssetState(asset_id.into(), reply)).await
    }

    pub async fn get_asset_head(&self, head_id: impl Into<String>) -> Result<Option<String>> {
        self.call(|reply| EngineCommand::GetAssetHead(head_id.into(), reply)).await
    }

    pub async fn current_block_session(&self) -> Result<String> {
        self.call(EngineCommand::CurrentSession).await
    }

    /// Idempotent shutdown (spec §4.5.1: "Close"). Cancelling twice is a
    /// no-op; `CancellationToken::cancel` already tolerates it.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> EngineCommand,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(make(reply_tx))
            .await
            .map_err(|_| LedgerError::NoActiveSession)?;
        reply_rx.await.map_err(|_| LedgerError::NoActiveSession)?
    }
}

/// Owns all mutable engine state. Never `Clone`, never shared: the single
/// task running [`LedgerEngine::run`] is the sole writer (spec §5).
struct LedgerEngine<K> {
    kv: Arc<K>,
    notify: Arc<dyn NotificationBus>,
    config: LedgerConfig,
    nonce_source: NonceSource,
    /// Ids of records accepted into the current session but not yet sealed
    /// into a block, in submission order.
    pending: Vec<String>,
    session_id: String,
}

impl<K: KvStore> LedgerEngine<K> {
    /// Spec §4.5.2: ensure schema, seal genesis if absent, open or rebuild
    /// the current session, ready the in-memory pending list.
    #[instrument(skip_all)]
    fn startup(&mut self) -> Result<()> {
        self.kv.ensure_buckets(buckets::ROOT_BUCKETS)?;

        let genesis_exists = self.kv.view(|tx| {
            tx.bucket_exists(buckets::BLOCKS)?;
            storage::get_block(tx, 0).map(|b| b.is_some())
        })?;

        if !genesis_exists {
            let genesis = genesis_block(self.nonce_source.next_nonce())?;
            self.kv.update(|tx| {
                storage::put_block(tx, &genesis)?;
                controls::write_top_block_number(tx, 0)?;
                session::open_new_session(tx, unix_seconds())?;
                Ok(())
            })?;
            info!(number = genesis.number, "sealed genesis block");
        }

        let session_id = self.kv.view(|tx| {
            controls::read_current_session_id(tx)?.ok_or(LedgerError::NoActiveSession)
        })?;
        let pending = self.kv.view(|tx| session::rebuild_pending(tx, &session_id))?;

        debug!(session_id, pending = pending.len(), "ledger session restored");
        self.session_id = session_id;
        self.pending = pending;
        Ok(())
    }

    /// The engine's only loop: consumes the records channel, an optional
    /// block-check ticker, and the shutdown token (spec §4.5.4). `instant
    /// mode` (zero interval) has no ticker at all; every accepted record is
    /// immediately eligible to trigger a seal.
    async fn run(&mut self, mut commands: mpsc::Receiver<EngineCommand>, shutdown: CancellationToken) {
        let mut ticker = (!self.config.is_instant_mode())
            .then(|| tokio::time::interval(self.config.block_check_interval));

        loop {
            let tick = async {
                match ticker.as_mut() {
                    Some(t) => {
                        t.tick().await;
                    }
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("ledger engine shutting down");
                    break;
                }
                maybe_cmd = commands.recv() => {
                    match maybe_cmd {
                        Some(cmd) => self.handle(cmd),
                        None => break,
                    }
                }
                _ = tick => {
                    if !self.pending.is_empty() {
                        if let Err(err) = self.generate_new_block() {
                            warn!(%err, "block generation failed on tick");
                        }
                    }
                }
            }
        }
    }

    fn handle(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::SubmitRecord(record) => {
                if let Err(err) = self.save_record(record) {
                    warn!(%err, "failed to persist submitted record");
                    return;
                }
                let should_seal =
                    self.config.is_instant_mode() || self.pending.len() >= self.config.max_records_per_block;
                if should_seal {
                    if let Err(err) = self.generate_new_block() {
                        warn!(%err, "block generation failed");
                    }
                }
            }
            EngineCommand::GetRecord(id, reply) => {
                let _ = reply.send(self.kv.view(|tx| {
                    let record =
                        storage::get_record(tx, &id)?.ok_or_else(|| LedgerError::RecordNotFound(id.clone()))?;
                    let state =
                        storage::get_state(tx, &id)?.ok_or_else(|| LedgerError::RecordNotFound(id.clone()))?;
                    Ok((record, state))
                }));
            }
            EngineCommand::GetRecordState(id, reply) => {
                let _ = reply.send(self.kv.view(|tx| {
                    storage::get_state(tx, &id)?.ok_or(LedgerError::RecordNotFound(id.clone()))
                }));
            }
            EngineCommand::GetBlock(number, reply) => {
                let _ = reply.send(self.kv.view(|tx| {
                    storage::get_block(tx, number)?.ok_or(LedgerError::BlockNotFound(number))
                }));
            }
            EngineCommand::GetTopBlock(reply) => {
                let _ = reply.send(self.kv.view(|tx| {
                    let top = controls::read_top_block_number(tx)?.ok_or(LedgerError::NoActiveSession)?;
                    storage::get_block(tx, top)?.ok_or(LedgerError::BlockNotFound(top))
                }));
            }
            EngineCommand::GetBlockRecords(number, reply) => {
                let _ = reply.send(self.kv.view(|tx| storage::get_block_composition(tx, number)));
            }
            EngineCommand::GetDataAssetState(asset_id, reply) => {
                let _ = reply.send(self.kv.view(|tx| assets::get_data_asset_state(tx, &asset_id)));
            }
            EngineCommand::GetAssetHead(head_id, reply) => {
                let _ = reply.send(self.kv.view(|tx| heads::get_asset_head(tx, &head_id)));
            }
            EngineCommand::CurrentSession(reply) => {
                let _ = reply.send(Ok(self.session_id.clone()));
            }
        }
    }

    /// `SaveRecord` (spec §4.5.5): persist the record body, mark it
    /// `Pending`, append its id to the current session's journal, and track
    /// it in memory. One KV update transaction.
    ///
    /// A resubmitted id that is already queued or already sealed overwrites
    /// its stored body only (spec §7: "duplicate id overwrites the existing
    /// entry silently"). It does not get a second pending-journal slot or a
    /// second in-memory queue entry, so it cannot be sealed, and have its
    /// assets bumped, twice.
    fn save_record(&mut self, record: Record) -> Result<()> {
        check_no_reserved_separator(&record.routing_key, &record.key_index)?;
        let session_id = self.session_id.clone();
        if session_id.is_empty() {
            return Err(LedgerError::NoActiveSession);
        }

        let id = record.id.clone();
        let already_queued = self.pending.contains(&id);
        let already_sealed = !already_queued
            && self
                .kv
                .view(|tx| storage::get_state(tx, &id))?
                .map(|state| state.status != RecordStatus::Pending)
                .unwrap_or(false);
        let needs_enqueue = !already_queued && !already_sealed;
        let index = self.pending.len() as u64;

        self.kv.update(|tx| {
            storage::put_record(tx, &record)?;
            if needs_enqueue {
                storage::put_state(tx, &record.id, RecordState::pending())?;
                session::append_pending(tx, &session_id, index, &record.id)?;
            }
            Ok(())
        })?;

        if needs_enqueue {
            self.pending.push(id);
        }
        crate::metrics::set_pending_records(self.pending.len());
        Ok(())
    }

    /// `generateNewBlock` (spec §4.5.6): resolve the pending batch, verify
    /// every revocation's proof up front (a genuine mismatch aborts the
    /// whole batch, spec §4.5.6 step 2), seal a new block, then run the
    /// per-record sealing algorithm and open the next session.
    #[instrument(skip(self))]
    fn generate_new_block(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let ids = std::mem::take(&mut self.pending);

        let batch: Vec<Record> = self.kv.view(|tx| {
            ids.iter()
                .map(|id| storage::get_record(tx, id)?.ok_or_else(|| LedgerError::RecordNotFound(id.clone())))
                .collect()
        })?;

        if let Err(err) = self.verify_revocation_proofs(&batch) {
            // Abort: nothing was sealed, the batch goes back to pending
            // untouched (spec §4.5.6 step 2: "the failing record remains
            // pending").
            self.pending = ids;
            return Err(err);
        }

        let parent = self.kv.view(|tx| {
            let top = controls::read_top_block_number(tx)?.ok_or(LedgerError::NoActiveSession)?;
            storage::get_block(tx, top)?.ok_or(LedgerError::BlockNotFound(top))
        })?;
        let block = BlockSealInput {
            parent_hash: parent.hash,
            nonce: self.nonce_source.next_nonce(),
            number: parent.number + 1,
        }
        .seal()?;

        self.submit_new_block(&block, &batch)?;

        let new_session = self.kv.update(|tx| session::open_new_session(tx, unix_seconds()))?;
        self.session_id = new_session;
        crate::metrics::set_pending_records(0);
        crate::metrics::record_block_sealed();

        self.notify.publish(
            NEW_BLOCK_TOPIC,
            serde_json::to_vec(&NewBlockMessage::new(block.number))?,
        );
        info!(number = block.number, records = batch.len(), "sealed block");
        Ok(())
    }

    /// Spec §4.5.6 step 2: for every `LeaseRevocation` in the batch whose
    /// subject exists, check `SHA256(decode64(proof)) ==
    /// decode64(subject's authorisingCommitment)` and abort the whole batch
    /// on a mismatch. A missing subject is *not* a proof mismatch (spec
    /// §4.5.3: it fails only that one revocation, handled later in
    /// [`LedgerEngine::submit_new_block`]), so it is skipped here rather
    /// than treated as a failure.
    fn verify_revocation_proofs(&self, batch: &[Record]) -> Result<()> {
        for record in batch {
            if record.operation != OperationKind::LeaseRevocation {
                continue;
            }
            let subject_id = record.subject_record.as_deref().unwrap_or_default();
            let Some(subject) = self.kv.view(|tx| storage::get_record(tx, subject_id))? else {
                continue;
            };

            if record.revocation_proof.len() != 1 {
                return Err(LedgerError::BadRevocationProof(record.id.clone()));
            }
            let commitment = subject.authorising_commitment.as_deref().unwrap_or_default();
            if !proof_matches_commitment(&record.revocation_proof[0], commitment) {
                return Err(LedgerError::BadRevocationProof(record.id.clone()));
            }
        }
        Ok(())
    }

    /// `SubmitNewBlock` (spec §4.5.3): one KV update transaction sealing the
    /// block, writing every record's terminal state, running the asset
    /// counter / head registry side effects, and recording the block's
    /// composition manifest.
    fn submit_new_block(&self, block: &crate::block::Block, batch: &[Record]) -> Result<()> {
        self.kv.update(|tx| {
            storage::put_block(tx, block)?;
            tx.create_nested(buckets::BLOCK_COMPOSITION, &block.number.to_string())?;
            let composition_bucket =
                buckets::nested_name(buckets::BLOCK_COMPOSITION, &block.number.to_string());

            for (index, record) in batch.iter().enumerate() {
                match record.operation {
                    OperationKind::Lease => {
                        for asset in record.affected_assets() {
                            assets::bump(tx, asset)?;
                        }
                        storage::transition_state(tx, &record.id, RecordState::published(block.number))?;
                    }
                    OperationKind::LeaseRevocation => {
                        let subject_id = record.subject_record.as_deref().unwrap_or_default();
                        match storage::get_record(tx, subject_id)? {
                            None => {
                                // Spec §4.5.3: subject does not exist, fail
                                // this revocation and continue the batch.
                                storage::transition_state(tx, &record.id, RecordState::failed(block.number))?;
                                crate::metrics::record_record_failed();
                            }
                            Some(subject) => {
                                let already_revoked = storage::get_state(tx, &subject.id)?
                                    .map(|s| s.is_revoked())
                                    .unwrap_or(false);
                                if already_revoked {
                                    storage::transition_state(tx, &record.id, RecordState::failed(block.number))?;
                                    crate::metrics::record_record_failed();
                                } else {
                                    storage::transition_state(tx, &subject.id, RecordState::revoked_without_block())?;
                                    for asset in subject.affected_assets() {
                                        assets::decrement(tx, asset)?;
                                    }
                                    storage::transition_state(tx, &record.id, RecordState::published(block.number))?;
                                }
                            }
                        }
                    }
                    OperationKind::AssetHead => {
                        let head_id = record.head_id.as_deref().unwrap_or_default();
                        if let Some(previous_id) = heads::redirect(tx, head_id, &record.id)? {
                            storage::transition_state(tx, &previous_id, RecordState::revoked_without_block())?;
                        }
                        storage::transition_state(tx, &record.id, RecordState::published(block.number))?;
                    }
                }

                let entry = CompositionEntry {
                    record_id: record.id.clone(),
                    routing_key: record.routing_key.clone(),
                    key_index: record.key_index.clone(),
                };
                tx.put(&composition_bucket, &decimal_key(index as u64), entry.pack().as_bytes())?;
            }

            controls::write_top_block_number(tx, block.number)?;
            Ok(())
        })
    }
}

/// `SHA256(decode64(proof)) == decode64(commitment)`, both sides compared as
/// raw bytes after base64-decoding the stored commitment (spec §4.5.6
/// step 2). Malformed base64 on either side is simply "does not match".
fn proof_matches_commitment(proof: &str, commitment: &str) -> bool {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use sha2::{Digest, Sha256};

    let Ok(proof_bytes) = STANDARD.decode(proof) else {
        return false;
    };
    let Ok(commitment_bytes) = STANDARD.decode(commitment) else {
        return false;
    };
    let digest = Sha256::digest(&proof_bytes);
    digest.as_slice() == commitment_bytes.as_slice()
}

/// Wall-clock seconds since the epoch, used only for session naming (spec
/// §3: `"block<unixSeconds>"`). Not a source of randomness or ordering.
fn unix_seconds() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
