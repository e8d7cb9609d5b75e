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

//! L4 state collections (§2, §4.4): typed tables built on top of column families, some
//! layering a transient in-memory overlay over their durable backing CF.

pub mod element_instance;
pub mod subscription;
pub mod timer;

pub use element_instance::{ElementInstanceTable, ELEMENT_INSTANCE_CF};
pub use subscription::{SubscriptionRecord, SubscriptionState, SubscriptionTable, SUBSCRIPTION_CF};
pub use timer::{TimerRecord, TimerTable, VisitOutcome, NO_NEXT_DUE_DATE, TIMERS_CF, TIMER_DUE_DATES_CF};

use tracing::debug;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::TransactionError;
use crate::txn::Transaction;

/// Bundles every table the core ships with and registers their backing column families
/// (§4.8: "a top-level `Tables::recover_all` that a process calls once at startup").
pub struct Tables {
    pub element_instances: ElementInstanceTable,
    pub subscriptions: SubscriptionTable,
    pub timers: TimerTable,
}

impl Tables {
    /// Consults `config.enable_preconditions` once, here, so every FK-guarded table is built
    /// with the same policy rather than each call site passing its own bool (§4.5, §4.6).
    pub fn new(config: &Config) -> Self {
        Self {
            element_instances: ElementInstanceTable::new(),
            subscriptions: SubscriptionTable::new(config.enable_preconditions),
            timers: TimerTable::new(config.enable_preconditions),
        }
    }

    /// Registers every column family this table set owns against `engine`. Must run before
    /// the first [`Transaction::begin`] of the process (§3.3).
    pub fn register_column_families(engine: &mut dyn Engine) -> Result<(), TransactionError> {
        engine.create_column_family(ELEMENT_INSTANCE_CF, "element_instance")?;
        engine.create_column_family(SUBSCRIPTION_CF, "subscription")?;
        engine.create_column_family(TIMERS_CF, "timers")?;
        engine.create_column_family(TIMER_DUE_DATES_CF, "timer_due_dates")?;
        Ok(())
    }

    /// Runs every table's recovery pass inside one transaction (§4.8), consistent with I6:
    /// the overlay ends up exactly as it would have been had no crash occurred. The timer
    /// table and element-instance table carry no transient overlay of their own, so only
    /// the subscription table has recovery work to do; both are still listed here so a
    /// future table-with-overlay only needs to add one line.
    pub fn recover_all(&mut self, txn: &Transaction) -> Result<(), TransactionError> {
        debug!("running recovery pass");
        self.subscriptions.recover(txn)?;
        Ok(())
    }
}

impl Default for Tables {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemEngine;

    #[test]
    fn recover_all_runs_without_error_on_empty_store() {
        let mut engine = MemEngine::new();
        Tables::register_column_families(&mut engine).unwrap();
        let txn = Transaction::begin(&engine).unwrap();
        let mut tables = Tables::new(&Config::default());
        tables.recover_all(&txn).unwrap();
    }
}
