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

//! Timer table with due-date index (§4.4.2). Timers are written to a primary column family
//! keyed by `(element_instance_key, timer_key)` and mirrored into a secondary column family
//! keyed by `(due_date, primary_key_bytes)`, so the scheduler can answer "when next?" by
//! scanning the secondary index instead of every timer.

use tracing::trace;

use crate::cf::ColumnFamily;
use crate::codec::{BytesCodec, CfId, Codec, CompositeCodec, ForeignKeyCodec, Int64Codec, NilCodec, Value};
use crate::engine::Continue;
use crate::error::TransactionError;
use crate::fk::ForeignKeyChecker;
use crate::tables::element_instance::ELEMENT_INSTANCE_CF;
use crate::txn::Transaction;

pub const TIMERS_CF: CfId = CfId(3);
pub const TIMER_DUE_DATES_CF: CfId = CfId(4);

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TimerRecord {
    pub element_instance_key: i64,
    pub timer_key: i64,
    pub due_date: i64,
}

/// Whether `find_due_before`'s visitor consumed the timer it was shown (§4.4.2).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum VisitOutcome {
    Consumed,
    NotConsumed,
}

/// Sentinel meaning "no timers pending" (§4.4.2, §9 open question: the source's `-1` return
/// is preserved as-is rather than reshaped into an `Option`, since no other value in the
/// due-date domain is reserved and changing the return shape would ripple into every caller).
pub const NO_NEXT_DUE_DATE: i64 = -1;

pub struct TimerTable {
    primary: ColumnFamily,
    due_dates: ColumnFamily,
}

fn primary_key_codec() -> CompositeCodec {
    CompositeCodec::new(vec![
        Box::new(ForeignKeyCodec::new(
            Box::new(Int64Codec),
            "element_instance_key",
            ELEMENT_INSTANCE_CF,
        )),
        Box::new(Int64Codec),
    ])
}

fn due_date_key_codec() -> CompositeCodec {
    CompositeCodec::new(vec![Box::new(Int64Codec), Box::new(BytesCodec)])
}

fn primary_key(element_instance_key: i64, timer_key: i64) -> Value {
    Value::Tuple(vec![Value::Int(element_instance_key), Value::Int(timer_key)])
}

impl TimerTable {
    pub fn new(enable_preconditions: bool) -> Self {
        let checker = ForeignKeyChecker::new("element_instance_key", ELEMENT_INSTANCE_CF);
        Self {
            primary: ColumnFamily::new(TIMERS_CF, Box::new(primary_key_codec()), Box::new(Int64Codec))
                .with_fk_checker(checker)
                .with_preconditions(enable_preconditions),
            due_dates: ColumnFamily::new(
                TIMER_DUE_DATES_CF,
                Box::new(due_date_key_codec()),
                Box::new(NilCodec),
            ),
        }
    }

    fn encode_primary_key_bytes(&self, timer: &TimerRecord) -> Result<Vec<u8>, TransactionError> {
        let codec = primary_key_codec();
        let mut buf = Vec::new();
        codec
            .write(&primary_key(timer.element_instance_key, timer.timer_key), &mut buf)
            .map_err(TransactionError::from)?;
        Ok(buf)
    }

    /// Writes both column families atomically within the current transaction (§4.4.2
    /// `put`).
    pub fn put(&mut self, txn: &mut Transaction, timer: &TimerRecord) -> Result<(), TransactionError> {
        let primary_key_bytes = self.encode_primary_key_bytes(timer)?;
        self.primary.put(
            txn,
            &primary_key(timer.element_instance_key, timer.timer_key),
            &Value::Int(timer.due_date),
        )?;
        let due_key = Value::Tuple(vec![Value::Int(timer.due_date), Value::Bytes(primary_key_bytes)]);
        self.due_dates.put(txn, &due_key, &Value::Nil)
    }

    /// Deletes from both column families (§4.4.2 `remove`).
    pub fn remove(&mut self, txn: &mut Transaction, timer: &TimerRecord) -> Result<(), TransactionError> {
        let primary_key_bytes = self.encode_primary_key_bytes(timer)?;
        self.primary
            .delete(txn, &primary_key(timer.element_instance_key, timer.timer_key))?;
        let due_key = Value::Tuple(vec![Value::Int(timer.due_date), Value::Bytes(primary_key_bytes)]);
        self.due_dates.delete(txn, &due_key)
    }

    /// `while_equal_prefix` over the primary CF for the element-instance prefix (§4.4.2
    /// `for_each_for_element`).
    pub fn for_each_for_element(
        &mut self,
        txn: &Transaction,
        element_instance_key: i64,
        mut visitor: impl FnMut(i64, i64) -> Result<Continue, TransactionError>,
    ) -> Result<(), TransactionError> {
        let codec = primary_key_codec();
        let mut prefix = Vec::new();
        codec
            .write_prefix(&[Value::Int(element_instance_key)], 1, &mut prefix)
            .map_err(TransactionError::from)?;
        self.primary.while_equal_prefix(txn, &prefix, |_k, due_date| {
            let due_date = due_date.as_int().ok_or(crate::error::DecodeError::InvalidLength(0))?;
            visitor(element_instance_key, due_date)
        })
    }

    /// Scans the due-date index in ascending order; for each entry with `due_date <= now`,
    /// resolves the primary record and invokes `visitor` (§4.4.2 `find_due_before`). Returns
    /// the next wake-up hint, or [`NO_NEXT_DUE_DATE`] if nothing is pending.
    pub fn find_due_before(
        &mut self,
        txn: &Transaction,
        now: i64,
        mut visitor: impl FnMut(&TimerRecord) -> VisitOutcome,
    ) -> Result<i64, TransactionError> {
        let mut next_due = NO_NEXT_DUE_DATE;
        let mut halted = false;
        let mut first_err: Option<TransactionError> = None;

        self.due_dates.while_true(txn, |_k, due_key| {
            if first_err.is_some() {
                return Ok(Continue::Stop);
            }
            let Some(fields) = due_key.as_tuple() else {
                return Ok(Continue::Continue);
            };
            let Some(due_date) = fields.first().and_then(Value::as_int) else {
                return Ok(Continue::Continue);
            };
            let Some(primary_key_bytes) = fields.get(1).and_then(Value::as_bytes) else {
                return Ok(Continue::Continue);
            };

            if due_date > now {
                next_due = due_date;
                halted = true;
                return Ok(Continue::Stop);
            }

            let record = match resolve_primary(txn, primary_key_bytes, due_date) {
                Ok(Some(r)) => r,
                Ok(None) => {
                    trace!(due_date, "due-date index entry has no primary record");
                    return Ok(Continue::Continue);
                }
                Err(e) => {
                    first_err = Some(e);
                    return Ok(Continue::Stop);
                }
            };

            match visitor(&record) {
                VisitOutcome::Consumed => Ok(Continue::Continue),
                VisitOutcome::NotConsumed => {
                    next_due = due_date;
                    halted = true;
                    Ok(Continue::Stop)
                }
            }
        })?;

        if let Some(e) = first_err {
            return Err(e);
        }
        let _ = halted;
        Ok(next_due)
    }

}

/// Resolves a due-date index entry back to its primary timer record. A free function (not a
/// `TimerTable` method) so the borrow checker doesn't see it as touching `self.primary` while
/// `find_due_before`'s visitor closure already holds `self.due_dates` mutably borrowed.
fn resolve_primary(
    txn: &Transaction,
    primary_key_bytes: &[u8],
    due_date: i64,
) -> Result<Option<TimerRecord>, TransactionError> {
    let codec = primary_key_codec();
    let (decoded_key, _) = codec.read(primary_key_bytes).map_err(TransactionError::from)?;
    let Some(key_fields) = decoded_key.as_tuple() else {
        return Ok(None);
    };
    let (Some(element_instance_key), Some(timer_key)) = (
        key_fields.first().and_then(Value::as_int),
        key_fields.get(1).and_then(Value::as_int),
    ) else {
        return Ok(None);
    };
    if txn.get(TIMERS_CF, primary_key_bytes)?.is_none() {
        return Ok(None);
    }
    Ok(Some(TimerRecord {
        element_instance_key,
        timer_key,
        due_date,
    }))
}

impl Default for TimerTable {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, MemEngine};
    use crate::tables::element_instance::ElementInstanceTable;

    fn setup() -> (MemEngine, ElementInstanceTable, TimerTable) {
        let mut engine = MemEngine::new();
        engine.create_column_family(ELEMENT_INSTANCE_CF, "element_instance").unwrap();
        engine.create_column_family(TIMERS_CF, "timers").unwrap();
        engine.create_column_family(TIMER_DUE_DATES_CF, "timer_due_dates").unwrap();
        (engine, ElementInstanceTable::new(), TimerTable::new(false))
    }

    #[test]
    fn find_due_before_with_consuming_visitor_reports_next_due() {
        let (engine, mut elements, mut timers) = setup();
        let mut txn = Transaction::begin(&engine).unwrap();
        elements.put(&mut txn, 1).unwrap();
        timers
            .put(&mut txn, &TimerRecord { element_instance_key: 1, timer_key: 10, due_date: 100 })
            .unwrap();
        timers
            .put(&mut txn, &TimerRecord { element_instance_key: 1, timer_key: 11, due_date: 200 })
            .unwrap();

        let mut visited = Vec::new();
        let next = timers
            .find_due_before(&txn, 150, |t| {
                visited.push(t.due_date);
                VisitOutcome::Consumed
            })
            .unwrap();

        assert_eq!(visited, vec![100]);
        assert_eq!(next, 200);
    }

    #[test]
    fn find_due_before_with_non_consuming_visitor_stops_immediately() {
        let (engine, mut elements, mut timers) = setup();
        let mut txn = Transaction::begin(&engine).unwrap();
        elements.put(&mut txn, 1).unwrap();
        timers
            .put(&mut txn, &TimerRecord { element_instance_key: 1, timer_key: 10, due_date: 100 })
            .unwrap();
        timers
            .put(&mut txn, &TimerRecord { element_instance_key: 1, timer_key: 11, due_date: 200 })
            .unwrap();

        let mut visited = Vec::new();
        let next = timers
            .find_due_before(&txn, 250, |t| {
                visited.push(t.due_date);
                VisitOutcome::NotConsumed
            })
            .unwrap();

        assert_eq!(visited, vec![100]);
        assert_eq!(next, 100);
    }

    #[test]
    fn find_due_before_returns_sentinel_when_nothing_pending() {
        let (engine, _elements, mut timers) = setup();
        let txn = Transaction::begin(&engine).unwrap();
        let next = timers.find_due_before(&txn, 1000, |_| VisitOutcome::Consumed).unwrap();
        assert_eq!(next, NO_NEXT_DUE_DATE);
    }
}
