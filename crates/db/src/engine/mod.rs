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

//! L1 engine adapter (§6.1). The core is built against this trait pair, never against a
//! concrete store directly, so unit tests can run against [`MemEngine`] while production
//! wiring uses [`FjallEngine`].
//!
//! Every record crossing this boundary uses the bit-exact physical layout of §6.3:
//! `cf_id (8 bytes, big-endian) || encoded_key`, stored against `encoded_value` as the engine
//! value. The `cf_id` prefix is carried even though a given adapter may additionally
//! partition storage per column family, because it is what lets [`EngineTxn::get_cross_cf`]
//! address an arbitrary column family without the caller first resolving a typed handle —
//! the "default unprefixed handle" of §6.1, named for the fact that callers never construct
//! the prefix themselves.

mod fjall_engine;
mod mem_engine;

pub use fjall_engine::FjallEngine;
pub use mem_engine::MemEngine;

use crate::codec::CfId;
use crate::error::EngineError;

/// Visitor control flow shared by every ordered scan in the crate (§4.3).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Continue {
    Continue,
    Stop,
}

/// One row observed during an engine-level scan.
pub struct EngineRow {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// The embedded engine adapter (§6.1, bottom edge). Registration of column families happens
/// once at startup, before any transaction begins; `&mut self` reflects that.
pub trait Engine: Send + Sync {
    /// Registers a column family, idempotently across restarts (opening an existing
    /// partition is not an error).
    fn create_column_family(&mut self, cf_id: CfId, name: &str) -> Result<(), EngineError>;

    /// Opens a fresh transaction. The native handle backing it is owned by the returned
    /// value; reuse across logical transactions is an adapter-internal detail.
    fn begin(&self) -> Result<Box<dyn EngineTxn + '_>, EngineError>;
}

/// A single logical transaction against the engine (§4.2's L1-facing half).
pub trait EngineTxn {
    fn get(&self, cf: CfId, key: &[u8]) -> Result<Option<Vec<u8>>, EngineError>;

    /// Reads a key in a column family other than the one a table would normally address,
    /// without requiring the caller to resolve that family's own handle. Used exclusively
    /// by the foreign-key checker (§4.5).
    fn get_cross_cf(&self, target_cf: CfId, key: &[u8]) -> Result<Option<Vec<u8>>, EngineError> {
        self.get(target_cf, key)
    }

    fn put(&mut self, cf: CfId, key: &[u8], value: &[u8]) -> Result<(), EngineError>;

    fn delete(&mut self, cf: CfId, key: &[u8]) -> Result<(), EngineError>;

    /// Ascending lexicographic scan of `cf` over keys starting with `prefix`, calling
    /// `visitor` with each row until it returns `Continue::Stop` or the scan is exhausted.
    fn scan_prefix(
        &self,
        cf: CfId,
        prefix: &[u8],
        visitor: &mut dyn FnMut(&[u8], &[u8]) -> Continue,
    ) -> Result<(), EngineError>;

    /// Commits every `put`/`delete` issued on this handle atomically.
    fn commit(self: Box<Self>) -> Result<(), EngineError>;

    /// Discards every `put`/`delete` issued on this handle.
    fn rollback(self: Box<Self>);
}
