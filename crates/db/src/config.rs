// Copyright (C) 2026 Workflow Engine Contributors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.

//! Configuration surface (§0.3, §6.4): `enable_preconditions` toggles foreign-key checking,
//! alongside `data_dir` and per-CF partition tuning that any real `fjall`-backed engine needs
//! — a feature flag living next to storage tuning rather than in isolation.

use std::path::PathBuf;

use fjall::PartitionCreateOptions;
use serde::{Deserialize, Serialize};

/// Process-wide configuration, set once at construction and never mutated (§9 "Global
/// option").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Turns on [`crate::fk::ForeignKeyChecker`] for every FK-guarded write (§4.6, §6.4).
    /// Default `false`.
    #[serde(default)]
    pub enable_preconditions: bool,

    /// On-disk location for the `fjall` keyspace backing [`crate::engine::FjallEngine`].
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Per-column-family tuning passed through to `fjall`'s partition options.
    #[serde(default)]
    pub table: TableConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_preconditions: false,
            data_dir: default_data_dir(),
            table: TableConfig::default(),
        }
    }
}

/// Partition-level tuning shared by every column family. `fjall` exposes these per
/// partition; the core doesn't need them to differ across tables, so one struct covers all
/// of them rather than a `HashMap<CfId, TableConfig>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Bytes of write-buffer memory before `fjall` flushes a partition's memtable to disk.
    #[serde(default = "default_max_memtable_size")]
    pub max_memtable_size: u32,

    /// Target on-disk block size for `fjall`'s sorted-string segments.
    #[serde(default = "default_block_size")]
    pub block_size: u32,
}

fn default_max_memtable_size() -> u32 {
    8 * 1024 * 1024
}

fn default_block_size() -> u32 {
    4 * 1024
}

impl TableConfig {
    /// Translates this config into the `fjall` options every `create_column_family` call
    /// passes through, so a registered partition actually reflects what `Config` says.
    pub fn partition_options(&self) -> PartitionCreateOptions {
        PartitionCreateOptions::default()
            .max_memtable_size(self.max_memtable_size)
            .block_size(self.block_size)
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            max_memtable_size: default_max_memtable_size(),
            block_size: default_block_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_disables_preconditions() {
        assert!(!Config::default().enable_preconditions);
    }

    #[test]
    fn deserializes_from_partial_json() {
        let cfg: Config = serde_json::from_str(r#"{"enable_preconditions": true}"#).unwrap();
        assert!(cfg.enable_preconditions);
        assert_eq!(cfg.data_dir, default_data_dir());
    }
}
