//! Serialized access to the validate/confirm/snapshot chasers, mirroring
//! `bn_protocols::handles` for the three chasers that crate has no reason
//! to depend on. Each wraps a chaser behind a mutex so every external call
//! — whether from a bus-reactor task or the control menu — funnels through
//! the same serialization point a real per-chaser mailbox would enforce
//! (§5.1).

use bn_confirm::ConfirmChaser;
use bn_snapshot::SnapshotChaser;
use bn_store::ChainStore;
use bn_validate::{BlockValidator, ValidateChaser};
use shared_types::errors::{Code, ValidateFault};
use tokio::sync::Mutex;

/// Serialized access to the validate chaser (C5).
pub struct ValidateHandle<S, V> {
    inner: Mutex<ValidateChaser<S, V>>,
}

impl<S, V> ValidateHandle<S, V>
where
    S: ChainStore + 'static,
    V: BlockValidator + 'static,
{
    #[must_use]
    pub fn new(chaser: ValidateChaser<S, V>) -> Self {
        Self {
            inner: Mutex::new(chaser),
        }
    }

    pub async fn set_mature(&self, mature: bool) {
        self.inner.lock().await.set_mature(mature);
    }

    pub async fn on_bump(&self) {
        self.inner.lock().await.on_bump().await;
    }

    pub async fn drain_completions(&self) {
        self.inner.lock().await.drain_completions().await;
    }

    pub async fn backlog(&self) -> usize {
        self.inner.lock().await.backlog()
    }

    pub async fn fault(&self) -> Option<ValidateFault> {
        self.inner.lock().await.fault()
    }

    pub async fn close(&self) {
        self.inner.lock().await.close();
    }
}

/// Serialized access to the confirm chaser (C6).
pub struct ConfirmHandle<S> {
    inner: Mutex<ConfirmChaser<S>>,
}

impl<S> ConfirmHandle<S>
where
    S: ChainStore,
{
    #[must_use]
    pub fn new(chaser: ConfirmChaser<S>) -> Self {
        Self {
            inner: Mutex::new(chaser),
        }
    }

    pub async fn on_event(&self, network_height: u64, is_current: bool) -> Result<(), Code> {
        self.inner.lock().await.on_event(network_height, is_current).await
    }

    pub async fn is_recent(&self) -> bool {
        self.inner.lock().await.is_recent()
    }
}

/// Serialized access to the snapshot chaser (C7).
pub struct SnapshotHandle<S> {
    inner: Mutex<SnapshotChaser<S>>,
}

impl<S> SnapshotHandle<S>
where
    S: ChainStore,
{
    #[must_use]
    pub fn new(chaser: SnapshotChaser<S>) -> Self {
        Self {
            inner: Mutex::new(chaser),
        }
    }

    pub async fn on_block(&self) {
        self.inner.lock().await.on_block().await;
    }

    pub async fn on_snap(&self, height: u64) -> Result<(), Code> {
        self.inner.lock().await.on_snap(height).await
    }

    pub async fn on_resume(&self) {
        self.inner.lock().await.on_resume();
    }

    pub async fn is_pruned(&self) -> bool {
        self.inner.lock().await.is_pruned()
    }
}
