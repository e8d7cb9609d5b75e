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

//! Element-instance table (§4.4.3): hosts the column family whose keys are the targets of
//! every foreign-key reference from subscriptions and timers. It carries no overlay of its
//! own; its contribution to the core is being the FK source, not a lifecycle state machine.

use crate::cf::ColumnFamily;
use crate::codec::{CfId, Int64Codec, NilCodec, Value};
use crate::error::TransactionError;
use crate::txn::Transaction;

pub const ELEMENT_INSTANCE_CF: CfId = CfId(1);

/// A single element instance, identified by its process-wide unique key. The record body
/// is deliberately empty (`Nil`) — the table's sole job is to answer "does this key exist",
/// which any FK-guarded write against it relies on.
pub struct ElementInstanceTable {
    cf: ColumnFamily,
}

impl ElementInstanceTable {
    pub fn new() -> Self {
        Self {
            cf: ColumnFamily::new(ELEMENT_INSTANCE_CF, Box::new(Int64Codec), Box::new(NilCodec)),
        }
    }

    pub fn put(&mut self, txn: &mut Transaction, element_instance_key: i64) -> Result<(), TransactionError> {
        self.cf.put(txn, &Value::Int(element_instance_key), &Value::Nil)
    }

    /// Deletion must be preceded, by the caller, by deletion of every referring FK row
    /// (§4.4.3) — this table does not cascade on its own.
    pub fn remove(&mut self, txn: &mut Transaction, element_instance_key: i64) -> Result<(), TransactionError> {
        self.cf.delete(txn, &Value::Int(element_instance_key))
    }

    pub fn exists(&mut self, txn: &Transaction, element_instance_key: i64) -> Result<bool, TransactionError> {
        self.cf.exists(txn, &Value::Int(element_instance_key))
    }
}

impl Default for ElementInstanceTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, MemEngine};

    #[test]
    fn put_then_exists() {
        let mut engine = MemEngine::new();
        engine.create_column_family(ELEMENT_INSTANCE_CF, "element_instance").unwrap();
        let mut txn = Transaction::begin(&engine).unwrap();
        let mut table = ElementInstanceTable::new();

        assert!(!table.exists(&txn, 42).unwrap());
        table.put(&mut txn, 42).unwrap();
        assert!(table.exists(&txn, 42).unwrap());
        table.remove(&mut txn, 42).unwrap();
        assert!(!table.exists(&txn, 42).unwrap());
    }
}
