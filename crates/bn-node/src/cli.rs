//! # Command-Line Surface
//!
//! The long/short flag pairs §6 enumerates. Most are store-administration
//! actions that run to completion and exit without starting the chaser
//! pipeline; the bare invocation (no admin flag) starts the node and
//! drops into the control menu (§6: "Runtime control menu").

use std::path::PathBuf;

use clap::Parser;

/// `bn-node`: the block-processing engine's wiring binary.
#[derive(Parser, Debug)]
#[command(name = "bn-node", version, about = "Header/block organize-check-validate-confirm pipeline")]
pub struct Cli {
    /// Path to the TOML settings file (`--settings/-s`).
    #[arg(short = 's', long = "settings")]
    pub settings: Option<PathBuf>,

    /// Initializes a new store at the configured database path and exits
    /// (`--newstore/-n`).
    #[arg(short = 'n', long = "newstore")]
    pub newstore: bool,

    /// Takes a store snapshot and exits (`--backup/-b`).
    #[arg(short = 'b', long = "backup")]
    pub backup: bool,

    /// Restores the store from its most recent snapshot and exits
    /// (`--restore/-r`).
    #[arg(short = 'r', long = "restore")]
    pub restore: bool,

    /// Prints the resolved configuration flags and exits (`--flags/-f`).
    #[arg(short = 'f', long = "flags")]
    pub flags: bool,

    /// Prints store information (top candidate/confirmed, fork point,
    /// space) and exits (`--information/-i`).
    #[arg(short = 'i', long = "information")]
    pub information: bool,

    /// Prints per-table slab counts and exits (`--slabs/-a`).
    #[arg(short = 'a', long = "slabs")]
    pub slabs: bool,

    /// Prints per-table bucket counts and exits (`--buckets/-k`).
    #[arg(short = 'k', long = "buckets")]
    pub buckets: bool,

    /// Prints hash-table collision statistics and exits (`--collisions/-l`).
    #[arg(short = 'l', long = "collisions")]
    pub collisions: bool,

    /// Opens the store read-only as a smoke test and exits (`--test/-t`).
    #[arg(short = 't', long = "test")]
    pub test: bool,

    /// Opens the store read-write as a smoke test and exits (`--write/-w`).
    #[arg(short = 'w', long = "write")]
    pub write: bool,

    /// Prints detected hardware concurrency and exits (`--hardware/-d`).
    #[arg(short = 'd', long = "hardware")]
    pub hardware: bool,
}

impl Cli {
    /// True if any store-administration flag was given, i.e. the process
    /// should run that action and exit rather than start the node.
    #[must_use]
    pub fn is_admin_action(&self) -> bool {
        self.newstore
            || self.backup
            || self.restore
            || self.flags
            || self.information
            || self.slabs
            || self.buckets
            || self.collisions
            || self.test
            || self.write
            || self.hardware
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_is_not_an_admin_action() {
        let cli = Cli::parse_from(["bn-node"]);
        assert!(!cli.is_admin_action());
    }

    #[test]
    fn newstore_flag_is_an_admin_action() {
        let cli = Cli::parse_from(["bn-node", "--newstore"]);
        assert!(cli.is_admin_action());
    }

    #[test]
    fn short_flags_parse_the_same_as_long() {
        let cli = Cli::parse_from(["bn-node", "-i"]);
        assert!(cli.information);
        assert!(cli.is_admin_action());
    }

    #[test]
    fn settings_path_is_captured() {
        let cli = Cli::parse_from(["bn-node", "-s", "bn.toml"]);
        assert_eq!(cli.settings, Some(PathBuf::from("bn.toml")));
    }
}
