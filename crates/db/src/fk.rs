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

//! Foreign-key checker (§4.5): centralizes integrity verification so table code stays
//! ignorant of whether checks are even enabled (§4.6). Toggling `enable_preconditions` flips
//! behavior for every FK-guarded write without touching a single table.

use tracing::warn;

use crate::codec::CfId;
use crate::error::{IntegrityError, TransactionError};
use crate::txn::Transaction;

/// Verifies that an FK-tagged key refers to a live row in its target column family,
/// including that transaction's own uncommitted overlay (I4).
pub struct ForeignKeyChecker {
    fk_name: &'static str,
    target_cf: CfId,
}

impl ForeignKeyChecker {
    pub fn new(fk_name: &'static str, target_cf: CfId) -> Self {
        Self { fk_name, target_cf }
    }

    /// `encoded_inner_key` is the FK-wrapped codec's own encoding, identical byte-for-byte to
    /// the inner key codec's encoding (§4.1, §9 "the FK relation is schema, not data").
    pub fn assert_exists(
        &self,
        txn: &Transaction,
        encoded_inner_key: &[u8],
    ) -> Result<(), TransactionError> {
        if txn.get_cross_cf(self.target_cf, encoded_inner_key)?.is_some() {
            Ok(())
        } else {
            warn!(
                fk_name = self.fk_name,
                target_cf = self.target_cf.0,
                "foreign key violation"
            );
            Err(IntegrityError {
                fk_name: self.fk_name,
                target_cf: self.target_cf,
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, MemEngine};

    #[test]
    fn fails_when_target_key_absent() {
        let mut engine = MemEngine::new();
        engine.create_column_family(CfId(1), "elements").unwrap();
        let txn = Transaction::begin(&engine).unwrap();

        let checker = ForeignKeyChecker::new("element_instance_key", CfId(1));
        let err = checker.assert_exists(&txn, b"missing").unwrap_err();
        assert!(matches!(err, TransactionError::Integrity(_)));
    }

    #[test]
    fn succeeds_against_an_uncommitted_overlay_entry() {
        let mut engine = MemEngine::new();
        engine.create_column_family(CfId(1), "elements").unwrap();
        let mut txn = Transaction::begin(&engine).unwrap();

        let checker = ForeignKeyChecker::new("element_instance_key", CfId(1));
        txn.put(CfId(1), b"present", b"").unwrap();
        checker.assert_exists(&txn, b"present").unwrap();
    }
}
