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

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::codec::CfId;
use crate::engine::{Continue, Engine, EngineTxn};
use crate::error::EngineError;

fn physical_key(cf: CfId, key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + key.len());
    out.extend_from_slice(&cf.to_be_bytes());
    out.extend_from_slice(key);
    out
}

/// In-process `BTreeMap`-backed engine double (§6.1), used by unit tests that exercise the
/// core without paying for real LSM persistence — the same role `moor-db`'s `tx_management`
/// tests give a `HashMap`-backed provider, except ordered, since this crate's scans depend
/// on lexicographic order rather than being a hash-keyed relation lookup.
#[derive(Debug, Default)]
pub struct MemEngine {
    store: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Engine for MemEngine {
    fn create_column_family(&mut self, _cf_id: CfId, _name: &str) -> Result<(), EngineError> {
        Ok(())
    }

    fn begin(&self) -> Result<Box<dyn EngineTxn + '_>, EngineError> {
        Ok(Box::new(MemEngineTxn {
            store: &self.store,
            writes: BTreeMap::new(),
        }))
    }
}

enum PendingWrite {
    Put(Vec<u8>),
    Delete,
}

struct MemEngineTxn<'a> {
    store: &'a Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
    writes: BTreeMap<Vec<u8>, PendingWrite>,
}

impl EngineTxn for MemEngineTxn<'_> {
    fn get(&self, cf: CfId, key: &[u8]) -> Result<Option<Vec<u8>>, EngineError> {
        let pkey = physical_key(cf, key);
        if let Some(pending) = self.writes.get(&pkey) {
            return Ok(match pending {
                PendingWrite::Put(v) => Some(v.clone()),
                PendingWrite::Delete => None,
            });
        }
        let store = self.store.lock().expect("mem engine lock poisoned");
        Ok(store.get(&pkey).cloned())
    }

    fn put(&mut self, cf: CfId, key: &[u8], value: &[u8]) -> Result<(), EngineError> {
        self.writes
            .insert(physical_key(cf, key), PendingWrite::Put(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, cf: CfId, key: &[u8]) -> Result<(), EngineError> {
        self.writes.insert(physical_key(cf, key), PendingWrite::Delete);
        Ok(())
    }

    fn scan_prefix(
        &self,
        cf: CfId,
        prefix: &[u8],
        visitor: &mut dyn FnMut(&[u8], &[u8]) -> Continue,
    ) -> Result<(), EngineError> {
        let mut full_prefix = cf.to_be_bytes().to_vec();
        full_prefix.extend_from_slice(prefix);

        let store = self.store.lock().expect("mem engine lock poisoned");
        let mut merged: BTreeMap<&[u8], Option<&[u8]>> = BTreeMap::new();
        for (k, v) in store.range(..) {
            if k.starts_with(&full_prefix) {
                merged.insert(k.as_slice(), Some(v.as_slice()));
            }
        }
        for (k, pending) in &self.writes {
            if k.starts_with(&full_prefix) {
                match pending {
                    PendingWrite::Put(v) => {
                        merged.insert(k.as_slice(), Some(v.as_slice()));
                    }
                    PendingWrite::Delete => {
                        merged.remove(k.as_slice());
                    }
                }
            }
        }
        for (k, v) in merged {
            let Some(v) = v else { continue };
            if visitor(&k[8..], v) == Continue::Stop {
                break;
            }
        }
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), EngineError> {
        let mut store = self.store.lock().expect("mem engine lock poisoned");
        for (k, pending) in self.writes {
            match pending {
                PendingWrite::Put(v) => {
                    store.insert(k, v);
                }
                PendingWrite::Delete => {
                    store.remove(&k);
                }
            }
        }
        Ok(())
    }

    fn rollback(self: Box<Self>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_is_visible_within_txn_but_not_across_txns_until_commit() {
        let mut engine = MemEngine::new();
        engine.create_column_family(CfId(1), "test").unwrap();

        let mut txn = engine.begin().unwrap();
        txn.put(CfId(1), b"k", b"v").unwrap();
        assert_eq!(txn.get(CfId(1), b"k").unwrap(), Some(b"v".to_vec()));

        let other = engine.begin().unwrap();
        assert_eq!(other.get(CfId(1), b"k").unwrap(), None);
        other.rollback();

        txn.commit().unwrap();
        let after = engine.begin().unwrap();
        assert_eq!(after.get(CfId(1), b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn rollback_discards_writes() {
        let mut engine = MemEngine::new();
        engine.create_column_family(CfId(1), "test").unwrap();

        let mut txn = engine.begin().unwrap();
        txn.put(CfId(1), b"k", b"v").unwrap();
        txn.rollback();

        let after = engine.begin().unwrap();
        assert_eq!(after.get(CfId(1), b"k").unwrap(), None);
    }

    #[test]
    fn scan_prefix_sees_uncommitted_writes_in_order() {
        let mut engine = MemEngine::new();
        engine.create_column_family(CfId(1), "test").unwrap();

        let mut txn = engine.begin().unwrap();
        txn.put(CfId(1), b"a", b"1").unwrap();
        txn.put(CfId(1), b"b", b"2").unwrap();

        let mut seen = Vec::new();
        txn.scan_prefix(CfId(1), b"", &mut |k, v| {
            seen.push((k.to_vec(), v.to_vec()));
            Continue::Continue
        })
        .unwrap();
        assert_eq!(seen, vec![(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec())]);
    }
}
