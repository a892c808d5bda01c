//! Durable intent ledger: append-only WAL with a bounded queue.
//!
//! The trading loop must never block on disk, and nothing may dispatch
//! unrecorded. Those two constraints meet here: `append` is a `try_send`
//! into a bounded channel (full queue = refusal, not waiting), and a single
//! writer thread owns the file. An optional durability barrier upgrades
//! "recorded" to "fsynced" before dispatch for deployments that want it.
//!
//! The log is never compacted; replay folds it down instead.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::record::WalRecord;

fn default_queue_capacity() -> usize {
    1_024
}

fn default_barrier_timeout_ms() -> u64 {
    1_000
}

fn default_false() -> bool {
    false
}

/// WAL configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WalConfig {
    pub path: PathBuf,

    /// Bound on in-flight appends. A full queue fails the append.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// When set, `record_before_dispatch` waits for an fsync barrier, so a
    /// dispatched order is always durable, not merely enqueued.
    #[serde(default = "default_false")]
    pub require_fsync_before_dispatch: bool,

    #[serde(default = "default_barrier_timeout_ms")]
    pub barrier_timeout_ms: u64,

    /// Start the writer thread parked until `resume_writer` is called.
    /// Lets crash tests fill the queue and observe refusal deterministically.
    #[serde(default = "default_false")]
    pub writer_start_paused: bool,
}

impl WalConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            queue_capacity: default_queue_capacity(),
            require_fsync_before_dispatch: default_false(),
            barrier_timeout_ms: default_barrier_timeout_ms(),
            writer_start_paused: default_false(),
        }
    }
}

enum WalCommand {
    Append(WalRecord),
    Barrier(SyncSender<()>),
    Shutdown,
}

/// Handle to the intent WAL. Cloneable across the pipeline via `Arc`.
pub struct IntentWal {
    tx: SyncSender<WalCommand>,
    path: PathBuf,
    require_fsync_before_dispatch: bool,
    barrier_timeout_ms: u64,
    queue_capacity: usize,
    queue_depth: Arc<AtomicU64>,
    write_errors: Arc<AtomicU64>,
    enqueue_failures: AtomicU64,
    gate: Arc<WriterGate>,
    writer: Option<JoinHandle<()>>,
}

struct WriterGate {
    paused: parking_lot::Mutex<bool>,
    resumed: parking_lot::Condvar,
}

impl WriterGate {
    fn new(paused: bool) -> Self {
        Self {
            paused: parking_lot::Mutex::new(paused),
            resumed: parking_lot::Condvar::new(),
        }
    }

    fn wait_until_running(&self) {
        let mut paused = self.paused.lock();
        while *paused {
            self.resumed.wait(&mut paused);
        }
    }

    fn resume(&self) {
        *self.paused.lock() = false;
        self.resumed.notify_all();
    }
}

impl IntentWal {
    /// Open the log file and start the writer thread.
    pub fn open(config: WalConfig) -> LedgerResult<Self> {
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        let (tx, rx) = sync_channel(config.queue_capacity);
        let queue_depth = Arc::new(AtomicU64::new(0));
        let write_errors = Arc::new(AtomicU64::new(0));

        let gate = Arc::new(WriterGate::new(config.writer_start_paused));
        let depth = Arc::clone(&queue_depth);
        let errors = Arc::clone(&write_errors);
        let writer_gate = Arc::clone(&gate);
        let writer = std::thread::Builder::new()
            .name("wal-writer".to_string())
            .spawn(move || {
                writer_gate.wait_until_running();
                writer_loop(file, rx, depth, errors);
            })?;

        info!(path = %config.path.display(), capacity = config.queue_capacity, "intent WAL opened");

        Ok(Self {
            tx,
            path: config.path,
            require_fsync_before_dispatch: config.require_fsync_before_dispatch,
            barrier_timeout_ms: config.barrier_timeout_ms,
            queue_capacity: config.queue_capacity,
            queue_depth,
            write_errors,
            enqueue_failures: AtomicU64::new(0),
            gate,
            writer: Some(writer),
        })
    }

    /// Release a writer opened with `writer_start_paused`.
    pub fn resume_writer(&self) {
        self.gate.resume();
    }

    /// Enqueue a record. Never blocks: a full queue is an error the caller
    /// must surface as a dispatch refusal.
    pub fn append(&self, record: WalRecord) -> LedgerResult<()> {
        record.validate()?;
        match self.tx.try_send(WalCommand::Append(record)) {
            Ok(()) => {
                self.queue_depth.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.enqueue_failures.fetch_add(1, Ordering::Relaxed);
                warn!("WAL queue full; append refused");
                Err(LedgerError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(LedgerError::WriterClosed),
        }
    }

    /// Record an intent ahead of dispatch. With the fsync requirement on,
    /// this returns only after the record is durable on disk.
    pub fn record_before_dispatch(&self, record: WalRecord) -> LedgerResult<()> {
        self.append(record)?;
        if self.require_fsync_before_dispatch {
            self.barrier()?;
        }
        Ok(())
    }

    /// Wait until everything enqueued so far is fsynced. Unlike `append`
    /// this may block for queue space: a durability barrier exists to wait.
    pub fn barrier(&self) -> LedgerResult<()> {
        let (ack_tx, ack_rx) = sync_channel(1);
        self.tx
            .send(WalCommand::Barrier(ack_tx))
            .map_err(|_| LedgerError::WriterClosed)?;
        ack_rx
            .recv_timeout(Duration::from_millis(self.barrier_timeout_ms))
            .map_err(|_| LedgerError::BarrierTimeout(self.barrier_timeout_ms))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn queue_depth(&self) -> u64 {
        self.queue_depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    #[must_use]
    pub fn write_errors_total(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn enqueue_failures_total(&self) -> u64 {
        self.enqueue_failures.load(Ordering::Relaxed)
    }
}

impl Drop for IntentWal {
    fn drop(&mut self) {
        self.gate.resume();
        let _ = self.tx.try_send(WalCommand::Shutdown);
        if let Some(handle) = self.writer.take() {
            let _ = handle.join();
        }
    }
}

fn writer_loop(
    mut file: File,
    rx: Receiver<WalCommand>,
    depth: Arc<AtomicU64>,
    errors: Arc<AtomicU64>,
) {
    while let Ok(command) = rx.recv() {
        match command {
            WalCommand::Append(record) => {
                depth.fetch_sub(1, Ordering::Relaxed);
                let line = record.to_line();
                if let Err(err) = file
                    .write_all(line.as_bytes())
                    .and_then(|()| file.write_all(b"\n"))
                {
                    errors.fetch_add(1, Ordering::Relaxed);
                    error!(%err, intent_hash = format_args!("{:016x}", record.intent_hash), "WAL write failed");
                }
            }
            WalCommand::Barrier(ack) => {
                if let Err(err) = file.sync_data() {
                    errors.fetch_add(1, Ordering::Relaxed);
                    error!(%err, "WAL fsync failed");
                }
                // Receiver may have timed out already.
                let _ = ack.try_send(());
            }
            WalCommand::Shutdown => break,
        }
    }
    let _ = file.sync_data();
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordx_core::{IntentClass, LifecycleState, OrderSide, Price, Qty};
    use rust_decimal_macros::dec;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("ordx-wal-{}.log", uuid::Uuid::new_v4()))
    }

    fn record(hash: u64) -> WalRecord {
        WalRecord {
            intent_hash: hash,
            instrument_id: "BTC-PERPETUAL".to_string(),
            side: OrderSide::Buy,
            class: IntentClass::Open,
            qty_q: Qty::new(dec!(0.01)),
            limit_price_q: Price::new(dec!(100.0)),
            qty_steps: 1,
            price_ticks: 200,
            group_id: "grp-1".to_string(),
            leg_idx: 0,
            label: "s4:abcd1234:grp1:0:0000000000000001".to_string(),
            state: LifecycleState::Created,
            created_ts_ms: 1_000,
            sent_ts_ms: None,
        }
    }

    #[test]
    fn test_append_then_barrier_is_durable() {
        let path = temp_path();
        let wal = IntentWal::open(WalConfig::new(&path)).unwrap();

        wal.append(record(1)).unwrap();
        wal.append(record(2)).unwrap();
        wal.barrier().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        drop(wal);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_full_queue_refuses_without_blocking() {
        let path = temp_path();
        let mut config = WalConfig::new(&path);
        config.queue_capacity = 1;
        config.writer_start_paused = true;
        let wal = IntentWal::open(config).unwrap();

        wal.append(record(1)).unwrap();
        let err = wal.append(record(2)).unwrap_err();
        assert!(matches!(err, LedgerError::QueueFull));
        assert_eq!(wal.enqueue_failures_total(), 1);

        wal.resume_writer();
        wal.barrier().unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        drop(wal);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_shutdown_flushes() {
        let path = temp_path();
        {
            let wal = IntentWal::open(WalConfig::new(&path)).unwrap();
            wal.append(record(7)).unwrap();
            wal.barrier().unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("0000000000000007"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_invalid_record_never_enqueued() {
        let path = temp_path();
        let wal = IntentWal::open(WalConfig::new(&path)).unwrap();
        let mut bad = record(1);
        bad.group_id = String::new();
        assert!(matches!(wal.append(bad), Err(LedgerError::Schema(_))));
        assert_eq!(wal.queue_depth(), 0);
        drop(wal);
        std::fs::remove_file(&path).ok();
    }
}
