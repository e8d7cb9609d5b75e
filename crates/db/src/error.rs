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

//! Error kinds for the substrate, per §7 of the design: decode failures, integrity
//! violations, engine failures, and startup corruption. Nothing in this module retries
//! or swallows an error — everything surfaces to the transaction boundary.

use crate::codec::CfId;

/// A key or value could not be reconstructed from its stored bytes.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// A length-prefixed field declared more bytes than remained in the buffer.
    #[error("truncated buffer: needed {needed} bytes, had {available}")]
    Truncated { needed: usize, available: usize },
    /// A length-prefixed field declared a negative or otherwise invalid length.
    #[error("invalid length prefix: {0}")]
    InvalidLength(i64),
    /// A string field's bytes were not valid UTF-8.
    #[error("invalid utf-8 in string field")]
    InvalidUtf8,
}

/// A foreign-key-guarded write referenced a key absent from its target column family.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
#[error("foreign key violation: {fk_name} has no matching row in cf {target_cf:?}")]
pub struct IntegrityError {
    pub fk_name: &'static str,
    pub target_cf: CfId,
}

/// Errors raised by the L1 engine adapter (§6.1). The adapter's own error type never
/// crosses this boundary directly; its `Display` text is captured here instead, mirroring
/// how `tx_management::Error::StorageFailure` wraps a backing store failure in `moor-db`.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("engine retrieval failure: {0}")]
    Retrieval(String),
    #[error("engine storage failure: {0}")]
    Storage(String),
    #[error("column family {0:?} does not exist")]
    UnknownColumnFamily(CfId),
}

/// Raised by the engine adapter on startup when the durable store itself cannot be
/// trusted (e.g. a write-ahead log failed to replay cleanly). Not recoverable by the
/// core; the caller must decide whether to terminate or attempt external repair.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
#[error("engine corruption detected: {0}")]
pub struct CorruptionError(pub String);

/// The unified error type returned from transaction and table operations.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum TransactionError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Corruption(#[from] CorruptionError),
}
