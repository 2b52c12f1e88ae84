//! The validate chaser (C5): dispatches consensus validation across the
//! candidate index with a bounded backlog (§4.5, §4.5.1).

use crate::domain::{BlockValidator, ValidateOutcome, ValidateSettings};
use shared_bus::{ChainEvent, Component, EventKind, EventPublisher, EventValue};
use shared_types::entities::{BlockState, Link};
use shared_types::errors::{Code, ValidateFault};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A completed dispatch, fed back to the owning strand through an internal
/// channel rather than mutating chaser state from the worker task itself
/// (§5: "all mutations of store metadata... occur on the validate strand
/// after worker completion").
struct Completion {
    link: Link,
    height: u64,
    result: Result<u64, DispatchFailure>,
}

enum DispatchFailure {
    Rejected,
    Fault(ValidateFault),
}

async fn validate_block<S, V>(store: Arc<S>, checker: Arc<V>, link: Link, height: u64) -> Completion
where
    S: bn_store::ChainStore,
    V: BlockValidator,
{
    let Some(block) = store.get_block(link) else {
        return Completion {
            link,
            height,
            result: Err(DispatchFailure::Fault(ValidateFault::BlockFetch)),
        };
    };
    let Some(context) = store.get_context(link) else {
        return Completion {
            link,
            height,
            result: Err(DispatchFailure::Fault(ValidateFault::ContextFetch)),
        };
    };
    if let Err(err) = checker.populate(&block, &context) {
        let fault = match err {
            crate::domain::PopulateError::SelfPopulate => ValidateFault::SelfPopulate,
            crate::domain::PopulateError::PrevoutPopulate => ValidateFault::PrevoutPopulate,
        };
        return Completion {
            link,
            height,
            result: Err(DispatchFailure::Fault(fault)),
        };
    }
    match checker.accept_connect(&block, &context) {
        ValidateOutcome::Valid { fees } => Completion {
            link,
            height,
            result: Ok(fees),
        },
        ValidateOutcome::Rejected => Completion {
            link,
            height,
            result: Err(DispatchFailure::Rejected),
        },
    }
}

/// Owns `position_`/`backlog_`/`mature_` and drives the dispatch loop on
/// its single strand. `S` is the store port; `V` the consensus collaborator.
pub struct ValidateChaser<S, V> {
    store: Arc<S>,
    bus: Arc<dyn EventPublisher>,
    checker: Arc<V>,
    settings: ValidateSettings,
    position: u64,
    backlog: usize,
    mature: bool,
    closed: bool,
    fault: Option<ValidateFault>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl<S, V> ValidateChaser<S, V>
where
    S: bn_store::ChainStore + 'static,
    V: BlockValidator + 'static,
{
    /// Builds a chaser positioned at the current fork point, immature
    /// until `set_mature(true)` is called (§4.5: "maturity gate").
    pub fn new(store: Arc<S>, bus: Arc<dyn EventPublisher>, checker: V, settings: ValidateSettings) -> Self {
        let position = store.get_fork();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            store,
            bus,
            checker: Arc::new(checker),
            settings,
            position,
            backlog: 0,
            mature: false,
            closed: false,
            fault: None,
            completions_tx,
            completions_rx,
        }
    }

    /// Signals that C3's initial headers catch-up has completed.
    pub fn set_mature(&mut self, mature: bool) {
        self.mature = mature;
    }

    /// Current advance position along the candidate index.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Concurrently in-flight validation count.
    #[must_use]
    pub fn backlog(&self) -> usize {
        self.backlog
    }

    /// The fatal fault recorded against this chaser, if any.
    #[must_use]
    pub fn fault(&self) -> Option<ValidateFault> {
        self.fault
    }

    /// `start | bump | checked(height) | regressed(h) | disorganized(h)`:
    /// runs `do_bump` (§4.5.1).
    pub async fn on_bump(&mut self) {
        self.do_bump().await;
    }

    async fn do_bump(&mut self) {
        if self.fault.is_some() || self.closed {
            return;
        }
        while self.backlog < self.settings.maximum_backlog {
            let next = self.position + 1;
            let link = self.store.to_candidate(next);
            if link.is_terminal() {
                break;
            }
            let state = self.store.get_block_state(link);
            if state == BlockState::Unassociated {
                break;
            }
            if state == BlockState::BlockUnconfirmable {
                self.position = next;
                self.bus
                    .publish(ChainEvent::new(
                        Component::Validate,
                        EventKind::Unvalid,
                        EventValue::U64(next),
                        Code::Success,
                    ))
                    .await;
                break;
            }

            let decided = self.store.is_under_checkpoint(next) || self.store.is_milestone(link) || state.is_decidable();
            if !decided && !self.mature {
                break;
            }

            self.position = next;
            if decided {
                self.bus
                    .publish(ChainEvent::new(
                        Component::Validate,
                        EventKind::Valid,
                        EventValue::U64(next),
                        Code::Success,
                    ))
                    .await;
                continue;
            }

            self.backlog += 1;
            let store = Arc::clone(&self.store);
            let checker = Arc::clone(&self.checker);
            let tx = self.completions_tx.clone();
            tokio::spawn(async move {
                let completion = validate_block(store, checker, link, next).await;
                let _ = tx.send(completion);
            });
        }
    }

    /// Drains any completed dispatches, calling `complete_block` for each
    /// and re-entering `do_bump` directly once the backlog empties (§4.5.1:
    /// "an internal call, not a re-publish through the bus").
    pub async fn drain_completions(&mut self) {
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.complete_block(completion).await;
        }
    }

    async fn complete_block(&mut self, completion: Completion) {
        self.backlog = self.backlog.saturating_sub(1);
        match completion.result {
            Ok(fees) => {
                if self.store.set_block_valid(completion.link, fees).is_err() {
                    self.fault = Some(ValidateFault::SetBlockValid);
                    return;
                }
                self.bus
                    .publish(ChainEvent::new(
                        Component::Validate,
                        EventKind::Valid,
                        EventValue::U64(completion.height),
                        Code::Success,
                    ))
                    .await;
            }
            Err(DispatchFailure::Rejected) => {
                if self.store.set_block_unconfirmable(completion.link).is_err() {
                    self.fault = Some(ValidateFault::SetBlockUnconfirmable);
                    return;
                }
                self.bus
                    .publish(ChainEvent::new(
                        Component::Validate,
                        EventKind::Unvalid,
                        EventValue::U64(completion.height),
                        Code::Success,
                    ))
                    .await;
                self.bus
                    .publish(ChainEvent::new(
                        Component::Validate,
                        EventKind::Unconfirmable,
                        EventValue::U64(completion.height),
                        Code::Success,
                    ))
                    .await;
            }
            Err(DispatchFailure::Fault(fault)) => {
                self.fault = Some(fault);
                return;
            }
        }
        if self.backlog == 0 {
            self.do_bump().await;
        }
    }

    /// Stops the chaser; no further dispatch occurs.
    pub fn close(&mut self) {
        self.closed = true;
    }
}
