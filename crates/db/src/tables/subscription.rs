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

//! Subscription table with pending overlay (§4.4.1). A subscription is keyed by
//! `(element_instance_key, message_name)` and carries a lifecycle state plus a
//! `commandSentTime`; the overlay is an ordered, transient index over subscriptions
//! currently `Opening` or `Closing` (§4.7's state machine).

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use tracing::trace;

use crate::cf::ColumnFamily;
use crate::codec::{CfId, Codec, CompositeCodec, ForeignKeyCodec, Int64Codec, StrCodec, Value};
use crate::engine::Continue;
use crate::error::{DecodeError, TransactionError};
use crate::fk::ForeignKeyChecker;
use crate::tables::element_instance::ELEMENT_INSTANCE_CF;
use crate::txn::Transaction;

pub const SUBSCRIPTION_CF: CfId = CfId(2);

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SubscriptionState {
    Opening,
    Opened,
    Closing,
    Closed,
}

impl SubscriptionState {
    fn to_code(self) -> i64 {
        match self {
            SubscriptionState::Opening => 0,
            SubscriptionState::Opened => 1,
            SubscriptionState::Closing => 2,
            SubscriptionState::Closed => 3,
        }
    }

    fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(SubscriptionState::Opening),
            1 => Some(SubscriptionState::Opened),
            2 => Some(SubscriptionState::Closing),
            3 => Some(SubscriptionState::Closed),
            _ => None,
        }
    }

    fn is_pending(self) -> bool {
        matches!(self, SubscriptionState::Opening | SubscriptionState::Closing)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SubscriptionRecord {
    pub element_instance_key: i64,
    pub message_name: String,
    pub state: SubscriptionState,
    pub command_sent_time: i64,
}

/// The ordered overlay key (§4.4.1, §9): `(commandSentTime, element_instance_key,
/// message_name)`. Deriving `Ord` on the tuple gives exactly the ascending visit order
/// `visit_pending_before` needs, oldest first.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd)]
struct PendingKey {
    command_sent_time: i64,
    element_instance_key: i64,
    message_name: String,
}

pub struct SubscriptionTable {
    cf: ColumnFamily,
    /// Shared so a [`Transaction::defer_on_commit`] hook can mutate it after the method that
    /// registered it has returned, without holding a borrow of `self` for the transaction's
    /// whole lifetime (I5, P3: the overlay must not change until the durable write commits).
    pending: Rc<RefCell<BTreeSet<PendingKey>>>,
}

fn key_codec() -> CompositeCodec {
    CompositeCodec::new(vec![
        Box::new(ForeignKeyCodec::new(
            Box::new(Int64Codec),
            "element_instance_key",
            ELEMENT_INSTANCE_CF,
        )),
        Box::new(StrCodec),
    ])
}

fn value_codec() -> CompositeCodec {
    CompositeCodec::new(vec![Box::new(Int64Codec), Box::new(Int64Codec)])
}

fn encode_key(element_instance_key: i64, message_name: &str) -> Value {
    Value::Tuple(vec![Value::Int(element_instance_key), Value::Str(message_name.to_owned())])
}

fn record_to_value(record: &SubscriptionRecord) -> Value {
    Value::Tuple(vec![
        Value::Int(record.state.to_code()),
        Value::Int(record.command_sent_time),
    ])
}

fn value_to_record(
    element_instance_key: i64,
    message_name: String,
    value: &Value,
) -> Option<SubscriptionRecord> {
    let fields = value.as_tuple()?;
    let state = SubscriptionState::from_code(fields.first()?.as_int()?)?;
    let command_sent_time = fields.get(1)?.as_int()?;
    Some(SubscriptionRecord {
        element_instance_key,
        message_name,
        state,
        command_sent_time,
    })
}

impl SubscriptionTable {
    pub fn new(enable_preconditions: bool) -> Self {
        let checker = ForeignKeyChecker::new("element_instance_key", ELEMENT_INSTANCE_CF);
        Self {
            cf: ColumnFamily::new(SUBSCRIPTION_CF, Box::new(key_codec()), Box::new(value_codec()))
                .with_fk_checker(checker)
                .with_preconditions(enable_preconditions),
            pending: Rc::new(RefCell::new(BTreeSet::new())),
        }
    }

    fn pending_key(record: &SubscriptionRecord) -> PendingKey {
        PendingKey {
            command_sent_time: record.command_sent_time,
            element_instance_key: record.element_instance_key,
            message_name: record.message_name.clone(),
        }
    }

    /// `while_equal_prefix` over the durable CF restricted to one element instance's
    /// subscriptions, in ascending `message_name` order — the "all subscriptions for
    /// element X" primitive (§4.3, §9).
    pub fn for_each_for_element(
        &mut self,
        txn: &Transaction,
        element_instance_key: i64,
        mut visitor: impl FnMut(&str, SubscriptionState) -> Result<Continue, TransactionError>,
    ) -> Result<(), TransactionError> {
        let key_codec = key_codec();
        let mut prefix = Vec::new();
        key_codec
            .write_prefix(&[Value::Int(element_instance_key)], 1, &mut prefix)
            .map_err(TransactionError::from)?;
        self.cf.while_equal_prefix(txn, &prefix, |k, value| {
            let Some(state_fields) = value.as_tuple() else {
                return Ok(Continue::Continue);
            };
            let Some(state) = state_fields
                .first()
                .and_then(Value::as_int)
                .and_then(SubscriptionState::from_code)
            else {
                return Ok(Continue::Continue);
            };
            let Ok((decoded_key, _)) = key_codec.read(k) else {
                return Ok(Continue::Continue);
            };
            let Some(message_name) = decoded_key.as_tuple().and_then(|f| f.get(1)).and_then(Value::as_str)
            else {
                return Ok(Continue::Continue);
            };
            visitor(message_name, state)
        })
    }

    /// Writes durably and stages an overlay insert with `commandSentTime = 0`, applied only
    /// once `txn` actually commits (§4.4.1 `put`; I5, P3). Replaces an existing row, staging
    /// its re-insertion into the overlay per §4.7.
    pub fn put(
        &mut self,
        txn: &mut Transaction,
        mut record: SubscriptionRecord,
    ) -> Result<(), TransactionError> {
        record.command_sent_time = 0;
        let key = encode_key(&record.element_instance_key, &record.message_name);
        self.cf.put(txn, &key, &record_to_value(&record))?;
        let pending_key = Self::pending_key(&record);
        let pending = Rc::clone(&self.pending);
        txn.defer_on_commit(move || {
            pending.borrow_mut().insert(pending_key);
        });
        Ok(())
    }

    /// Durably updates the value to `Opened` and stages the overlay entry's removal for
    /// `txn`'s commit (§4.4.1 `transition_to_opened`; I5, P3). A no-op if the subscription is
    /// absent (§9 open question: the source's silent-no-op behavior is preserved, logged at
    /// `trace` rather than escalated to a warning).
    pub fn transition_to_opened(
        &mut self,
        txn: &mut Transaction,
        element_instance_key: i64,
        message_name: &str,
    ) -> Result<(), TransactionError> {
        let key = encode_key(element_instance_key, message_name);
        let Some(existing) = self.cf.get(txn, &key)? else {
            trace!(element_instance_key, message_name, "transition_to_opened on missing subscription");
            return Ok(());
        };
        let mut record = value_to_record(element_instance_key, message_name.to_owned(), &existing)
            .ok_or(DecodeError::InvalidLength(0))?;
        let old_key = Self::pending_key(&record);
        record.state = SubscriptionState::Opened;
        self.cf.put(txn, &key, &record_to_value(&record))?;
        let pending = Rc::clone(&self.pending);
        txn.defer_on_commit(move || {
            pending.borrow_mut().remove(&old_key);
        });
        Ok(())
    }

    /// Durably updates the value to `Closing` and stages the overlay swap (remove the old
    /// key, insert the new one) for `txn`'s commit (§4.4.1 `transition_to_closing`; I5, P3).
    pub fn transition_to_closing(
        &mut self,
        txn: &mut Transaction,
        element_instance_key: i64,
        message_name: &str,
        command_sent_time: i64,
    ) -> Result<(), TransactionError> {
        let key = encode_key(element_instance_key, message_name);
        let Some(existing) = self.cf.get(txn, &key)? else {
            trace!(element_instance_key, message_name, "transition_to_closing on missing subscription");
            return Ok(());
        };
        let mut record = value_to_record(element_instance_key, message_name.to_owned(), &existing)
            .ok_or(DecodeError::InvalidLength(0))?;
        let old_key = Self::pending_key(&record);
        record.state = SubscriptionState::Closing;
        record.command_sent_time = command_sent_time;
        self.cf.put(txn, &key, &record_to_value(&record))?;
        let new_key = Self::pending_key(&record);
        let pending = Rc::clone(&self.pending);
        txn.defer_on_commit(move || {
            let mut pending = pending.borrow_mut();
            pending.remove(&old_key);
            pending.insert(new_key);
        });
        Ok(())
    }

    /// Durably deletes and stages the overlay entry's removal, if present, for `txn`'s
    /// commit (§4.4.1 `remove`; I5, P3).
    pub fn remove(
        &mut self,
        txn: &mut Transaction,
        element_instance_key: i64,
        message_name: &str,
    ) -> Result<(), TransactionError> {
        let key = encode_key(element_instance_key, message_name);
        if let Some(existing) = self.cf.get(txn, &key)? {
            if let Some(record) = value_to_record(element_instance_key, message_name.to_owned(), &existing) {
                let old_key = Self::pending_key(&record);
                let pending = Rc::clone(&self.pending);
                txn.defer_on_commit(move || {
                    pending.borrow_mut().remove(&old_key);
                });
            }
        }
        self.cf.delete(txn, &key)
    }

    /// Updates the overlay key for this subscription's sent time; the durable value is
    /// unchanged (§4.4.1 `update_sent_time`). Not staged against any transaction: there is
    /// no durable write here to roll back, so the overlay mutation takes effect immediately.
    /// Silent no-op if the subscription has no pending overlay entry (§9 open question,
    /// preserved as specified).
    pub fn update_sent_time(&mut self, element_instance_key: i64, message_name: &str, t: i64) {
        let mut pending = self.pending.borrow_mut();
        let Some(existing) = pending
            .iter()
            .find(|p| p.element_instance_key == element_instance_key && p.message_name == message_name)
            .cloned()
        else {
            trace!(element_instance_key, message_name, "update_sent_time on non-pending subscription");
            return;
        };
        pending.remove(&existing);
        pending.insert(PendingKey {
            command_sent_time: t,
            ..existing
        });
    }

    /// Enumerates overlay entries with `commandSentTime <= deadline`, oldest first, until
    /// the visitor halts (§4.4.1 `visit_pending_before`).
    pub fn visit_pending_before(
        &self,
        deadline: i64,
        mut visitor: impl FnMut(i64, &str, i64) -> Continue,
    ) {
        let pending = self.pending.borrow();
        for entry in pending.iter() {
            if entry.command_sent_time > deadline {
                break;
            }
            if visitor(entry.element_instance_key, &entry.message_name, entry.command_sent_time) == Continue::Stop {
                break;
            }
        }
    }

    /// Rebuilds the overlay from durable state (§4.4.1 "Recovery pass", I6): every
    /// `Opening` or `Closing` row is re-inserted with `commandSentTime = 0`. Runs outside any
    /// transaction's commit/abort lifecycle (startup only), so it mutates the overlay
    /// directly rather than staging through [`Transaction::defer_on_commit`].
    pub fn recover(&mut self, txn: &Transaction) -> Result<(), TransactionError> {
        self.pending.borrow_mut().clear();
        let codec = key_codec();
        let mut rows: Vec<(Vec<u8>, Value)> = Vec::new();
        self.cf.while_true(txn, |k, v| {
            rows.push((k.to_vec(), v));
            Ok(Continue::Continue)
        })?;
        for (key_bytes, value) in rows {
            let (decoded_key, _) = codec.read(&key_bytes).map_err(TransactionError::from)?;
            let Some(key_fields) = decoded_key.as_tuple() else { continue };
            let Some(element_instance_key) = key_fields.first().and_then(Value::as_int) else {
                continue;
            };
            let Some(message_name) = key_fields.get(1).and_then(Value::as_str) else {
                continue;
            };
            let Some(record) =
                value_to_record(element_instance_key, message_name.to_owned(), &value)
            else {
                continue;
            };
            if record.state.is_pending() {
                self.pending.borrow_mut().insert(PendingKey {
                    command_sent_time: 0,
                    element_instance_key: record.element_instance_key,
                    message_name: record.message_name,
                });
            }
        }
        Ok(())
    }
}

impl Default for SubscriptionTable {
    fn default() -> Self {
        Self::new(false)
    }
}
