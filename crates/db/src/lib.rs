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

//! Transactional, typed column-family key/value substrate for the workflow engine core.
//!
//! Four layers, leaves first: an [`engine`] adapter over an embedded LSM store, a
//! [`txn::Transaction`] that overlays writes in memory until commit, a [`cf::ColumnFamily`]
//! typed handle library built on a small [`codec`] capability abstraction, and the
//! domain [`tables`] layered on top of all three.
//!
//! Concurrency model: single-threaded cooperative per partition (no internal locking, no
//! suspension points within a transaction); callers coordinate across partitions
//! externally. See `DESIGN.md` for the grounding of each module.

pub mod cf;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod fk;
pub mod tables;
pub mod txn;

pub use cf::ColumnFamily;
pub use config::Config;
pub use engine::{Engine, EngineTxn, FjallEngine, MemEngine};
pub use error::{CorruptionError, DecodeError, EngineError, IntegrityError, TransactionError};
pub use fk::ForeignKeyChecker;
pub use tables::Tables;
pub use txn::Transaction;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Continue;
    use crate::tables::subscription::{SubscriptionRecord, SubscriptionState};
    use crate::tables::timer::{TimerRecord, VisitOutcome};

    /// §8.2 scenario 4: prefix scan across subscriptions for two different elements.
    #[test]
    fn prefix_scan_visits_only_matching_element() {
        let mut engine = MemEngine::new();
        Tables::register_column_families(&mut engine).unwrap();
        let config = Config { enable_preconditions: true, ..Config::default() };
        let mut tables = Tables::new(&config);

        let mut txn = Transaction::begin(&engine).unwrap();
        tables.element_instances.put(&mut txn, 7).unwrap();
        tables.element_instances.put(&mut txn, 9).unwrap();
        for (elem, msg) in [(7, "A"), (7, "B"), (9, "A")] {
            tables
                .subscriptions
                .put(
                    &mut txn,
                    SubscriptionRecord {
                        element_instance_key: elem,
                        message_name: msg.to_owned(),
                        state: SubscriptionState::Opened,
                        command_sent_time: 0,
                    },
                )
                .unwrap();
        }

        let mut seen = Vec::new();
        tables
            .subscriptions
            .for_each_for_element(&txn, 7, |msg, _state| {
                seen.push(msg.to_owned());
                Ok(Continue::Continue)
            })
            .unwrap();

        assert_eq!(seen, vec!["A".to_owned(), "B".to_owned()]);
    }

    /// §8.2 scenario 5: FK integrity check rejects a timer referencing a non-existent
    /// element instance when `enable_preconditions` is on.
    #[test]
    fn fk_violation_rejects_write_and_leaves_store_unchanged() {
        let mut engine = MemEngine::new();
        Tables::register_column_families(&mut engine).unwrap();
        let config = Config { enable_preconditions: true, ..Config::default() };
        let mut tables = Tables::new(&config);

        let mut txn = Transaction::begin(&engine).unwrap();
        let err = tables
            .timers
            .put(&mut txn, &TimerRecord { element_instance_key: 42, timer_key: 1, due_date: 100 })
            .unwrap_err();
        assert!(matches!(err, TransactionError::Integrity(_)));
        txn.abort();

        let txn2 = Transaction::begin(&engine).unwrap();
        let next = tables
            .timers
            .find_due_before(&txn2, i64::MAX, |_| VisitOutcome::Consumed)
            .unwrap();
        assert_eq!(next, tables::NO_NEXT_DUE_DATE);
    }

    /// §8.2 scenario 6: crash/recovery fidelity for a subscription left `Opening`.
    #[test]
    fn recovery_after_restart_repopulates_pending_overlay() {
        let mut engine = MemEngine::new();
        Tables::register_column_families(&mut engine).unwrap();
        let config = Config { enable_preconditions: true, ..Config::default() };

        {
            let mut tables = Tables::new(&config);
            let mut txn = Transaction::begin(&engine).unwrap();
            tables.element_instances.put(&mut txn, 3).unwrap();
            tables
                .subscriptions
                .put(
                    &mut txn,
                    SubscriptionRecord {
                        element_instance_key: 3,
                        message_name: "Ready".to_owned(),
                        state: SubscriptionState::Opening,
                        command_sent_time: 0,
                    },
                )
                .unwrap();
            txn.commit().unwrap();
        }

        // Simulate a restart: a fresh `Tables` with an empty in-memory overlay.
        let mut restarted = Tables::new(&config);
        let txn = Transaction::begin(&engine).unwrap();
        restarted.recover_all(&txn).unwrap();

        let mut seen = 0;
        restarted.subscriptions.visit_pending_before(i64::MAX, |_, _, _| {
            seen += 1;
            Continue::Continue
        });
        assert_eq!(seen, 1);
    }
}
