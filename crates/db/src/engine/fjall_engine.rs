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

use std::collections::HashMap;

use fjall::{Config as KeyspaceConfig, Keyspace, PartitionHandle};

use crate::codec::CfId;
use crate::config::{Config, TableConfig};
use crate::engine::{Continue, Engine, EngineTxn};
use crate::error::EngineError;

fn physical_key(cf: CfId, key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + key.len());
    out.extend_from_slice(&cf.to_be_bytes());
    out.extend_from_slice(key);
    out
}

/// `fjall`-backed engine adapter (§4.9): one `PartitionHandle` per registered column family,
/// addressed by the 8-byte big-endian `cf_id` prefix baked into every key (§6.3), which also
/// lets [`FjallTxn::get_cross_cf`] resolve any column family from its `cf_id` alone.
///
/// This is simpler than `moor-db`'s own `fjall_provider::FjallProvider`: there is no
/// background write thread and no MVCC conflict-detection cache, because §5 rules out
/// concurrent transactions within a partition — the overlay above this adapter is the only
/// buffering layer the core needs.
pub struct FjallEngine {
    keyspace: Keyspace,
    partitions: HashMap<CfId, PartitionHandle>,
    table_config: TableConfig,
}

impl FjallEngine {
    /// Opens the keyspace at `config.data_dir` and carries `config.table` forward so every
    /// partition registered through [`Engine::create_column_family`] picks up the same
    /// memtable/block tuning instead of `fjall`'s defaults.
    pub fn open(config: &Config) -> Result<Self, EngineError> {
        let keyspace = KeyspaceConfig::new(&config.data_dir)
            .open()
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        Ok(Self {
            keyspace,
            partitions: HashMap::new(),
            table_config: config.table.clone(),
        })
    }
}

impl Engine for FjallEngine {
    fn create_column_family(&mut self, cf_id: CfId, name: &str) -> Result<(), EngineError> {
        let handle = self
            .keyspace
            .open_partition(name, self.table_config.partition_options())
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        self.partitions.insert(cf_id, handle);
        Ok(())
    }

    fn begin(&self) -> Result<Box<dyn EngineTxn + '_>, EngineError> {
        Ok(Box::new(FjallTxn {
            partitions: &self.partitions,
            batch: self.keyspace.batch(),
        }))
    }
}

struct FjallTxn<'a> {
    partitions: &'a HashMap<CfId, PartitionHandle>,
    batch: fjall::Batch,
}

impl FjallTxn<'_> {
    fn partition(&self, cf: CfId) -> Result<&PartitionHandle, EngineError> {
        self.partitions
            .get(&cf)
            .ok_or(EngineError::UnknownColumnFamily(cf))
    }
}

impl EngineTxn for FjallTxn<'_> {
    fn get(&self, cf: CfId, key: &[u8]) -> Result<Option<Vec<u8>>, EngineError> {
        let partition = self.partition(cf)?;
        let pkey = physical_key(cf, key);
        partition
            .get(&pkey)
            .map(|opt| opt.map(|slice| slice.to_vec()))
            .map_err(|e| EngineError::Retrieval(e.to_string()))
    }

    fn put(&mut self, cf: CfId, key: &[u8], value: &[u8]) -> Result<(), EngineError> {
        let partition = self.partition(cf)?.clone();
        let pkey = physical_key(cf, key);
        self.batch.insert(&partition, pkey, value);
        Ok(())
    }

    fn delete(&mut self, cf: CfId, key: &[u8]) -> Result<(), EngineError> {
        let partition = self.partition(cf)?.clone();
        let pkey = physical_key(cf, key);
        self.batch.remove(&partition, pkey);
        Ok(())
    }

    fn scan_prefix(
        &self,
        cf: CfId,
        prefix: &[u8],
        visitor: &mut dyn FnMut(&[u8], &[u8]) -> Continue,
    ) -> Result<(), EngineError> {
        let partition = self.partition(cf)?;
        let mut full_prefix = cf.to_be_bytes().to_vec();
        full_prefix.extend_from_slice(prefix);

        for entry in partition.prefix(&full_prefix) {
            let (key, value) = entry.map_err(|e| EngineError::Retrieval(e.to_string()))?;
            if visitor(&key[8..], &value) == Continue::Stop {
                break;
            }
        }
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), EngineError> {
        self.batch
            .commit()
            .map_err(|e| EngineError::Storage(e.to_string()))
    }

    fn rollback(self: Box<Self>) {
        // An uncommitted `fjall::Batch` is simply dropped; nothing was ever applied.
        drop(self);
    }
}
