//! # Runtime Control Menu
//!
//! The single-letter stdin commands §6 enumerates: `b` backup, `c` close,
//! `e` errors, `h` hold (suspend/resume), `i` information, `t` test, `w`
//! work, `z` zoom (resume). Any other recognized character flips one of
//! the log-level toggles instead of acting on the store.
//!
//! The menu is deliberately thin: it is an operator convenience over the
//! same store/bus surface the chasers use, not a privileged code path.

use std::collections::HashSet;
use std::sync::Arc;

use bn_store::domain::progress::{StoreEvent, StoreTable};
use bn_store::ChainStore;
use shared_bus::{ChainEvent, Component, EventKind, EventPublisher, EventValue, SuspendState};
use shared_types::errors::Code;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// What the menu's driving loop should do after handling one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOutcome {
    /// Keep reading commands.
    Continue,
    /// `c` was issued: close the store and stop the process.
    Stop,
}

/// The log-toggle letters §6 names, excluding `w` (shadowed by the `work`
/// command — the same collision the source's own menu carries, per
/// SPEC_FULL's open question on ad-hoc menu code).
const TOGGLE_LETTERS: &[char] = &['a', 'n', 's', 'p', 'x', 'r', 'f', 'q', 'o', 'v'];

/// Operator-facing control surface over the store and bus.
pub struct ControlMenu<S> {
    store: Arc<S>,
    bus: Arc<dyn EventPublisher>,
    suspend: SuspendState,
    toggles: std::sync::Mutex<HashSet<char>>,
}

impl<S> ControlMenu<S>
where
    S: ChainStore,
{
    /// Builds a menu seeded with the toggle letters present in `seed`
    /// (§6: `log.toggles`).
    #[must_use]
    pub fn new(store: Arc<S>, bus: Arc<dyn EventPublisher>, suspend: SuspendState, seed: &str) -> Self {
        let toggles = seed.chars().filter(|c| TOGGLE_LETTERS.contains(c)).collect();
        Self {
            store,
            bus,
            suspend,
            toggles: std::sync::Mutex::new(toggles),
        }
    }

    /// Handles one command character, logging its effect.
    pub async fn handle(&self, command: char) -> MenuOutcome {
        match command {
            'b' => {
                self.backup().await;
                MenuOutcome::Continue
            }
            'c' => {
                self.close();
                MenuOutcome::Stop
            }
            'e' => {
                self.errors();
                MenuOutcome::Continue
            }
            'h' => {
                self.hold().await;
                MenuOutcome::Continue
            }
            'i' => {
                self.information();
                MenuOutcome::Continue
            }
            't' => {
                self.test();
                MenuOutcome::Continue
            }
            'w' => {
                self.work();
                MenuOutcome::Continue
            }
            'z' => {
                self.zoom().await;
                MenuOutcome::Continue
            }
            letter if TOGGLE_LETTERS.contains(&letter) => {
                self.toggle(letter);
                MenuOutcome::Continue
            }
            other => {
                info!(command = %other, "unrecognized control menu command");
                MenuOutcome::Continue
            }
        }
    }

    async fn backup(&self) {
        let mut progress = |event: StoreEvent, _table: StoreTable| {
            if event == StoreEvent::WaitLock {
                self.suspend.suspend();
            }
        };
        match self.store.snapshot(&mut progress) {
            Ok(()) => {
                info!("backup complete");
                if self.suspend.is_suspended() && !self.store.is_full() {
                    self.suspend.resume();
                    self.bus
                        .publish(ChainEvent::new(Component::Snapshot, EventKind::Resume, EventValue::Empty, Code::Success))
                        .await;
                }
            }
            Err(err) => info!(?err, "backup failed"),
        }
    }

    fn close(&self) {
        match self.store.close() {
            Ok(()) => info!("store closed, node stopping"),
            Err(err) => info!(?err, "store close reported an error"),
        }
    }

    fn errors(&self) {
        if let Some(fault) = self.store.get_fault() {
            info!(?fault, "recorded fault");
        } else {
            info!("no recorded faults");
        }
        self.store.clear_errors();
    }

    async fn hold(&self) {
        if self.suspend.is_suspended() {
            self.suspend.resume();
            self.bus
                .publish(ChainEvent::new(Component::Bus, EventKind::Resume, EventValue::Empty, Code::Success))
                .await;
            info!("peer channels resumed");
        } else {
            self.suspend.suspend();
            self.bus
                .publish(ChainEvent::new(Component::Bus, EventKind::Suspend, EventValue::Empty, Code::Success))
                .await;
            info!("peer channels suspended");
        }
    }

    fn information(&self) {
        info!(
            top_candidate = self.store.get_top_candidate(),
            top_confirmed = self.store.get_top_confirmed(),
            top_associated = self.store.get_top_associated(),
            fork = self.store.get_fork(),
            space = self.store.get_space(),
            "store information"
        );
    }

    fn test(&self) {
        info!(
            is_full = self.store.is_full(),
            is_fault = self.store.is_fault(),
            "read test"
        );
    }

    fn work(&self) {
        info!(
            unassociated = self.store.get_unassociated_count(),
            fork = self.store.get_fork(),
            "outstanding work"
        );
    }

    async fn zoom(&self) {
        self.suspend.resume();
        self.bus
            .publish(ChainEvent::new(Component::Bus, EventKind::Resume, EventValue::Empty, Code::Success))
            .await;
        info!("forced resume (zoom)");
    }

    fn toggle(&self, letter: char) {
        let mut toggles = self.toggles.lock().expect("toggle lock poisoned");
        if toggles.remove(&letter) {
            info!(toggle = %letter, "log category disabled");
        } else {
            toggles.insert(letter);
            info!(toggle = %letter, "log category enabled");
        }
    }

    /// True if `letter`'s log category is currently enabled.
    #[must_use]
    pub fn is_enabled(&self, letter: char) -> bool {
        self.toggles.lock().expect("toggle lock poisoned").contains(&letter)
    }
}

/// Drives the control menu from stdin until `c` (close) is read or stdin
/// closes. Reads one line at a time, taking only the first non-whitespace
/// character per line, matching the source's single-letter command style.
pub async fn run_from_stdin<S>(menu: Arc<ControlMenu<S>>) -> MenuOutcome
where
    S: ChainStore,
{
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Some(command) = line.trim().chars().next() else {
                    continue;
                };
                if menu.handle(command).await == MenuOutcome::Stop {
                    return MenuOutcome::Stop;
                }
            }
            Ok(None) | Err(_) => return MenuOutcome::Stop,
        }
    }
}
