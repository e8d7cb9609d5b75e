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

//! L2 transaction (§4.2): a scoped unit of work that buffers writes in an in-memory overlay
//! ordered map and serves reads from the union of overlay and engine.
//!
//! The overlay is a `BTreeMap<Vec<u8>, OverlayEntry>` rather than an insertion-ordered map —
//! ordering by key, not insertion, is load-bearing here: `iter_prefix` must observe
//! uncommitted overlay entries interleaved with committed ones in strict ascending
//! lexicographic order (§5), and a `BTreeMap` gives that for free instead of requiring a sort
//! on every scan.

use std::collections::BTreeMap;

use crate::codec::CfId;
use crate::engine::{Continue, Engine, EngineTxn};
use crate::error::TransactionError;

enum OverlayEntry {
    Put(Vec<u8>),
    Delete,
}

fn physical_key(cf: CfId, key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + key.len());
    out.extend_from_slice(&cf.to_be_bytes());
    out.extend_from_slice(key);
    out
}

/// A single logical transaction (§4.2, §3.3). Opened per input record; terminates in
/// [`Transaction::commit`] or [`Transaction::abort`].
pub struct Transaction<'e> {
    engine_txn: Box<dyn EngineTxn + 'e>,
    overlay: BTreeMap<Vec<u8>, OverlayEntry>,
    on_commit: Vec<Box<dyn FnOnce() + 'e>>,
}

impl<'e> Transaction<'e> {
    /// Acquires a fresh native transaction handle from `engine` (§4.2 `begin()`).
    pub fn begin(engine: &'e dyn Engine) -> Result<Self, TransactionError> {
        let engine_txn = engine.begin()?;
        Ok(Self {
            engine_txn,
            overlay: BTreeMap::new(),
            on_commit: Vec::new(),
        })
    }

    /// Registers a closure that runs only once this transaction actually commits, and is
    /// dropped un-run on abort (I5, P3). Lets a table stage an in-memory overlay mutation
    /// (e.g. the subscription table's pending index, §4.7) alongside a durable write without
    /// the mutation becoming observable before the durable write is.
    pub fn defer_on_commit(&mut self, f: impl FnOnce() + 'e) {
        self.on_commit.push(Box::new(f));
    }

    /// Reads the overlay first, falling back to the engine snapshot (§4.2 `get`).
    pub fn get(&self, cf: CfId, key: &[u8]) -> Result<Option<Vec<u8>>, TransactionError> {
        let pkey = physical_key(cf, key);
        if let Some(entry) = self.overlay.get(&pkey) {
            return Ok(match entry {
                OverlayEntry::Put(v) => Some(v.clone()),
                OverlayEntry::Delete => None,
            });
        }
        Ok(self.engine_txn.get(cf, key)?)
    }

    /// Reads a key in a column family other than the one the caller's own handle addresses
    /// (§6.1 `get_cross_cf`), without requiring that family's typed handle. Used by
    /// [`crate::fk::ForeignKeyChecker`] to resolve an FK target.
    pub fn get_cross_cf(&self, cf: CfId, key: &[u8]) -> Result<Option<Vec<u8>>, TransactionError> {
        let pkey = physical_key(cf, key);
        if let Some(entry) = self.overlay.get(&pkey) {
            return Ok(match entry {
                OverlayEntry::Put(v) => Some(v.clone()),
                OverlayEntry::Delete => None,
            });
        }
        Ok(self.engine_txn.get_cross_cf(cf, key)?)
    }

    /// Short-circuited `get` (§4.2 `exists`).
    pub fn exists(&self, cf: CfId, key: &[u8]) -> Result<bool, TransactionError> {
        Ok(self.get(cf, key)?.is_some())
    }

    /// Records a write in both the overlay and the engine's write batch (§4.2 `put`).
    pub fn put(&mut self, cf: CfId, key: &[u8], value: &[u8]) -> Result<(), TransactionError> {
        self.engine_txn.put(cf, key, value)?;
        self.overlay
            .insert(physical_key(cf, key), OverlayEntry::Put(value.to_vec()));
        Ok(())
    }

    /// Records a tombstone in both the overlay and the engine's write batch (§4.2 `delete`).
    pub fn delete(&mut self, cf: CfId, key: &[u8]) -> Result<(), TransactionError> {
        self.engine_txn.delete(cf, key)?;
        self.overlay.insert(physical_key(cf, key), OverlayEntry::Delete);
        Ok(())
    }

    /// Iterates `cf` in ascending encoded-key order over records whose key starts with
    /// `prefix`, observing uncommitted overlay entries as well as engine state (§4.2
    /// `iter_prefix`). `visitor` returns [`Continue::Stop`] to halt early.
    pub fn iter_prefix(
        &self,
        cf: CfId,
        prefix: &[u8],
        mut visitor: impl FnMut(&[u8], &[u8]) -> Continue,
    ) -> Result<(), TransactionError> {
        let mut full_prefix = cf.to_be_bytes().to_vec();
        full_prefix.extend_from_slice(prefix);

        // Merge engine rows with overlay rows sharing the prefix, keeping strict ascending
        // order (I3/§5) and letting overlay entries shadow engine ones at the same key.
        let mut engine_rows = Vec::new();
        self.engine_txn.scan_prefix(cf, prefix, &mut |k, v| {
            engine_rows.push((k.to_vec(), v.to_vec()));
            Continue::Continue
        })?;

        let mut merged: BTreeMap<Vec<u8>, Option<Vec<u8>>> = BTreeMap::new();
        for (k, v) in engine_rows {
            merged.insert(k, Some(v));
        }
        for (pkey, entry) in self.overlay.range(full_prefix.clone()..) {
            if !pkey.starts_with(&full_prefix) {
                break;
            }
            let key = pkey[8..].to_vec();
            match entry {
                OverlayEntry::Put(v) => {
                    merged.insert(key, Some(v.clone()));
                }
                OverlayEntry::Delete => {
                    merged.insert(key, None);
                }
            }
        }

        for (key, value) in merged {
            let Some(value) = value else { continue };
            if visitor(&key, &value) == Continue::Stop {
                break;
            }
        }
        Ok(())
    }

    /// Flushes to the engine, then runs every closure registered via
    /// [`Transaction::defer_on_commit`] in registration order (§4.2 `commit`).
    pub fn commit(self) -> Result<(), TransactionError> {
        self.engine_txn.commit()?;
        for hook in self.on_commit {
            hook();
        }
        Ok(())
    }

    /// Discards the overlay, the engine-side batch, and every deferred commit hook without
    /// running it (§4.2 `abort`).
    pub fn abort(self) {
        self.engine_txn.rollback();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemEngine;

    #[test]
    fn put_visible_in_same_txn_not_across_txns_until_commit() {
        let mut engine = MemEngine::new();
        engine.create_column_family(CfId(1), "t").unwrap();

        let mut txn = Transaction::begin(&engine).unwrap();
        txn.put(CfId(1), b"k", b"v").unwrap();
        assert_eq!(txn.get(CfId(1), b"k").unwrap(), Some(b"v".to_vec()));
        txn.commit().unwrap();

        let txn2 = Transaction::begin(&engine).unwrap();
        assert_eq!(txn2.get(CfId(1), b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn abort_discards_all_writes() {
        let mut engine = MemEngine::new();
        engine.create_column_family(CfId(1), "t").unwrap();

        let mut txn = Transaction::begin(&engine).unwrap();
        txn.put(CfId(1), b"k", b"v").unwrap();
        txn.abort();

        let txn2 = Transaction::begin(&engine).unwrap();
        assert_eq!(txn2.get(CfId(1), b"k").unwrap(), None);
    }

    #[test]
    fn iter_prefix_observes_uncommitted_overlay_in_order() {
        let mut engine = MemEngine::new();
        engine.create_column_family(CfId(1), "t").unwrap();

        let mut txn = Transaction::begin(&engine).unwrap();
        txn.put(CfId(1), b"a", b"1").unwrap();
        txn.put(CfId(1), b"c", b"3").unwrap();
        txn.put(CfId(1), b"b", b"2").unwrap();

        let mut seen = Vec::new();
        txn.iter_prefix(CfId(1), b"", |k, v| {
            seen.push((k.to_vec(), v.to_vec()));
            Continue::Continue
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![
                (b"a".to_vec(), b"1".to_vec()),
                (b"b".to_vec(), b"2".to_vec()),
                (b"c".to_vec(), b"3".to_vec()),
            ]
        );
    }

    #[test]
    fn delete_removes_overlay_visibility() {
        let mut engine = MemEngine::new();
        engine.create_column_family(CfId(1), "t").unwrap();

        let mut txn = Transaction::begin(&engine).unwrap();
        txn.put(CfId(1), b"k", b"v").unwrap();
        txn.commit().unwrap();

        let mut txn2 = Transaction::begin(&engine).unwrap();
        assert!(txn2.exists(CfId(1), b"k").unwrap());
        txn2.delete(CfId(1), b"k").unwrap();
        assert!(!txn2.exists(CfId(1), b"k").unwrap());
        txn2.commit().unwrap();

        let txn3 = Transaction::begin(&engine).unwrap();
        assert!(!txn3.exists(CfId(1), b"k").unwrap());
    }

    #[test]
    fn commit_hook_runs_on_commit_not_on_abort() {
        use std::cell::Cell;

        let mut engine = MemEngine::new();
        engine.create_column_family(CfId(1), "t").unwrap();

        let ran = Cell::new(false);
        let mut txn = Transaction::begin(&engine).unwrap();
        txn.put(CfId(1), b"k", b"v").unwrap();
        txn.defer_on_commit(|| ran.set(true));
        txn.abort();
        assert!(!ran.get());

        let ran = Cell::new(false);
        let mut txn = Transaction::begin(&engine).unwrap();
        txn.put(CfId(1), b"k", b"v").unwrap();
        txn.defer_on_commit(|| ran.set(true));
        txn.commit().unwrap();
        assert!(ran.get());
    }
}
