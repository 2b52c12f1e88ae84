//! # bn-node
//!
//! Wires the event bus (C1), store facade (C2), and the five chasers
//! (organize/check/validate/confirm/snapshot, C3-C7) behind the CLI and
//! control menu §6 specifies. Channel protocols (C8) are wired per peer
//! connection by a transport adapter this binary does not provide — the
//! peer network is an abstract collaborator out of the core's scope (§1)
//! — so what runs here is the pipeline with no peers attached: genesis is
//! archived, every chaser's reactor is live, and an operator can drive
//! the store through the admin CLI flags and the control menu.

mod cli;
mod config;
mod container;
mod errors;
mod menu;

use std::sync::Arc;

use bn_check::{CheckChaser, CheckSettings};
use bn_confirm::{ConfirmChaser, ConfirmSettings};
use bn_organize::{Checkpoint, Milestone, OrganizeChaser, OrganizeSettings, PermissiveChecker};
use bn_protocols::{CheckHandle, OrganizeHandle};
use bn_snapshot::{SnapshotChaser, SnapshotSettings};
use bn_store::{ChainStore, MemoryStore};
use bn_validate::{PermissiveValidator, ValidateChaser, ValidateSettings};
use clap::Parser;
use container::handles::{ConfirmHandle, SnapshotHandle, ValidateHandle};
use container::reactors::{
    spawn_check_reactor, spawn_confirm_reactor, spawn_disorganize_reactor, spawn_snapshot_reactor, spawn_validate_reactor,
};
use shared_bus::{EventPublisher, InMemoryEventBus, SuspendState};
use shared_types::entities::{Block, Header};
use tracing::{error, info, warn};

use crate::cli::Cli;
use crate::config::NodeConfig;
use crate::errors::NodeError;
use crate::menu::{run_from_stdin, ControlMenu};

fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("bn_node=info".parse().unwrap()))
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Builds the genesis block a fresh store is initialized with (I7). Real
/// genesis construction is a consensus-parameter concern outside this
/// core's scope (§1); this mirrors the configured header fields without
/// attempting to reproduce the exact hash a production genesis carries.
fn genesis_block(config: &NodeConfig) -> Block {
    Block {
        header: Header {
            version: 1,
            previous_hash: [0u8; 32],
            merkle_root: [0u8; 32],
            time: 1_231_006_505,
            bits: config.bitcoin.proof_of_work_limit,
            nonce: 0,
        },
        transactions: vec![],
    }
}

fn organize_settings(config: &NodeConfig) -> OrganizeSettings {
    OrganizeSettings {
        checkpoints: config
            .bitcoin
            .checkpoints
            .iter()
            .map(|c| Checkpoint {
                height: c.height,
                hash: c.hash,
            })
            .collect(),
        milestone: config.bitcoin.milestone.map(|m| Milestone {
            height: m.height,
            hash: m.hash,
        }),
        minimum_work: config.bitcoin.minimum_work,
        currency_window_minutes: config.node.currency_window_minutes,
    }
}

/// Runs a store-administration CLI flag to completion. Exactly one of
/// these is set when `Cli::is_admin_action` is true.
fn run_admin_action(cli: &Cli, config: &NodeConfig) -> Result<(), NodeError> {
    let store = MemoryStore::new(
        config.bitcoin.checkpoints.iter().map(|c| c.height).collect(),
        config.bitcoin.milestone.map(|m| m.height),
    );

    if cli.newstore {
        store.initialize(&genesis_block(config))?;
        info!(path = ?config.database.path, "store initialized");
        return Ok(());
    }

    // Every other admin action operates on an already-initialized store;
    // in this in-memory reference adapter there is nothing to reopen, so
    // these report the freshly-initialized state they'd see on a real
    // archive right after genesis.
    store.initialize(&genesis_block(config))?;

    if cli.backup {
        let mut progress = |_event, _table| {};
        store.snapshot(&mut progress)?;
        info!("backup complete");
    }
    if cli.restore {
        let mut progress = |_event, _table| {};
        store.restore(&mut progress)?;
        info!("restore complete");
    }
    if cli.flags {
        println!("{config:#?}");
    }
    if cli.information {
        println!(
            "top_candidate={} top_confirmed={} fork={} space={}",
            store.get_top_candidate(),
            store.get_top_confirmed(),
            store.get_fork(),
            store.get_space()
        );
    }
    if cli.slabs || cli.buckets || cli.collisions {
        println!("table geometry is an adapter-specific concern of the persistent store (§6); the in-memory reference adapter has none to report");
    }
    if cli.test {
        let mut progress = |_event, _table| {};
        store.open(&mut progress)?;
        println!("read test: ok");
    }
    if cli.write {
        let mut progress = |_event, _table| {};
        store.open(&mut progress)?;
        println!("write test: ok");
    }
    if cli.hardware {
        println!("detected concurrency: {}", std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let config = match NodeConfig::load(cli.settings.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!(?err, "failed to load configuration");
            return std::process::ExitCode::FAILURE;
        }
    };

    if cli.is_admin_action() {
        return match run_admin_action(&cli, &config) {
            Ok(()) => std::process::ExitCode::SUCCESS,
            Err(err) => {
                error!(?err, "admin action failed");
                std::process::ExitCode::FAILURE
            }
        };
    }

    match run_node(config).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            error!(?err, "node exited with an error");
            std::process::ExitCode::FAILURE
        }
    }
}

/// Wires the bus, store, and five chasers, then drives the control menu
/// until `c` (close) or stdin closes.
async fn run_node(config: NodeConfig) -> Result<(), NodeError> {
    let store = Arc::new(MemoryStore::new(
        config.bitcoin.checkpoints.iter().map(|c| c.height).collect(),
        config.bitcoin.milestone.map(|m| m.height),
    ));
    store.initialize(&genesis_block(&config))?;

    let bus = Arc::new(InMemoryEventBus::new());
    let bus_dyn: Arc<dyn EventPublisher> = bus.clone();
    let suspend = SuspendState::new();

    let organize = OrganizeHandle::new(OrganizeChaser::new(
        store.clone(),
        bus_dyn.clone(),
        PermissiveChecker,
        organize_settings(&config),
    ));
    let organize = Arc::new(organize);
    spawn_disorganize_reactor(bus.clone(), organize.clone(), store.clone());
    let _ = organize; // candidate delivery itself is driven by an (absent) peer transport.

    let check_settings = CheckSettings {
        maximum_inventory: config.node.maximum_inventory,
        maximum_concurrency: config.node.maximum_concurrency,
        maximum_height: config.node.maximum_height,
    };
    // Shared with peer channels (not wired up in this binary, §1) so the
    // reactor and any channel calling `get_hashes` serialize against the
    // one chaser instance rather than two that could silently diverge.
    let check_handle = Arc::new(CheckHandle::new(CheckChaser::new(store.clone(), bus_dyn.clone(), check_settings)));
    spawn_check_reactor(bus.clone(), check_handle);

    let validate_settings = ValidateSettings {
        maximum_backlog: config.node.maximum_backlog,
    };
    let validate_handle = Arc::new(ValidateHandle::new(ValidateChaser::new(
        store.clone(),
        bus_dyn.clone(),
        PermissiveValidator,
        validate_settings,
    )));
    validate_handle.set_mature(true).await;
    spawn_validate_reactor(bus.clone(), validate_handle);

    let confirm_settings = ConfirmSettings {
        filter_enabled: false,
        recent_threshold: 6,
    };
    let confirm_handle = Arc::new(ConfirmHandle::new(ConfirmChaser::new(store.clone(), bus_dyn.clone(), confirm_settings)));
    spawn_confirm_reactor(bus.clone(), confirm_handle, store.clone());

    let snapshot_handle = Arc::new(SnapshotHandle::new(SnapshotChaser::new(
        store.clone(),
        bus_dyn.clone(),
        suspend.clone(),
        SnapshotSettings { filter_enabled: false },
    )));
    spawn_snapshot_reactor(bus.clone(), snapshot_handle);

    info!(toggles = %config.log.toggles, "bn-node started");
    bus.publish(shared_bus::ChainEvent::new(
        shared_bus::Component::Bus,
        shared_bus::EventKind::Start,
        shared_bus::EventValue::Empty,
        shared_types::errors::Code::Success,
    ))
    .await;

    let menu = Arc::new(ControlMenu::new(store.clone(), bus_dyn.clone(), suspend, &config.log.toggles));
    run_from_stdin(menu).await;

    bus.publish(shared_bus::ChainEvent::new(
        shared_bus::Component::Bus,
        shared_bus::EventKind::Stop,
        shared_bus::EventValue::Empty,
        shared_types::errors::Code::Success,
    ))
    .await;
    warn!("bn-node stopped");
    Ok(())
}
