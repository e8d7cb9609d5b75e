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

//! L3 column family (§4.3): a thin typed handle bundling `(cf_id, key_codec, value_codec)`
//! over a [`Transaction`]. Each `ColumnFamily` owns one scratch buffer per key/value role and
//! clears it before every encode (§4.1, §9 "mutable codec buffers") instead of the codec
//! itself holding mutable state — callers must not retain a reference to an encoded buffer
//! across the next `put`/`get`/`delete` call on the same `ColumnFamily`.

use crate::codec::{CfId, Codec, Value};
use crate::engine::Continue;
use crate::error::{DecodeError, TransactionError};
use crate::fk::ForeignKeyChecker;
use crate::txn::Transaction;

/// A typed view over one column family (§4.3). `K` and `V` are the codecs' `Value`
/// representations; table code is expected to convert to/from its own domain types at this
/// boundary.
pub struct ColumnFamily {
    cf_id: CfId,
    key_codec: Box<dyn Codec>,
    value_codec: Box<dyn Codec>,
    fk_checker: Option<ForeignKeyChecker>,
    enable_preconditions: bool,
    key_buf: Vec<u8>,
    value_buf: Vec<u8>,
}

impl ColumnFamily {
    pub fn new(cf_id: CfId, key_codec: Box<dyn Codec>, value_codec: Box<dyn Codec>) -> Self {
        Self {
            cf_id,
            key_codec,
            value_codec,
            fk_checker: None,
            enable_preconditions: false,
            key_buf: Vec::new(),
            value_buf: Vec::new(),
        }
    }

    /// Attaches a foreign-key checker to this family's key codec (§4.3 "FK-guarded
    /// writes"); every `put` thereafter consults it when preconditions are on.
    pub fn with_fk_checker(mut self, checker: ForeignKeyChecker) -> Self {
        self.fk_checker = Some(checker);
        self
    }

    /// Sets, once at construction, whether `put` consults the FK checker (§4.6). Consulted
    /// here rather than passed to every `put` call, so a table can never forget to thread it
    /// and silently disable checking on one call site (§4.5).
    pub fn with_preconditions(mut self, enable_preconditions: bool) -> Self {
        self.enable_preconditions = enable_preconditions;
        self
    }

    pub fn cf_id(&self) -> CfId {
        self.cf_id
    }

    fn encode_key(&mut self, key: &Value) -> Result<(), DecodeError> {
        self.key_buf.clear();
        self.key_codec.write(key, &mut self.key_buf)
    }

    fn encode_value(&mut self, value: &Value) -> Result<(), DecodeError> {
        self.value_buf.clear();
        self.value_codec.write(value, &mut self.value_buf)
    }

    pub fn put(
        &mut self,
        txn: &mut Transaction,
        key: &Value,
        value: &Value,
    ) -> Result<(), TransactionError> {
        self.encode_key(key)?;
        if self.enable_preconditions {
            if let Some(checker) = &self.fk_checker {
                checker.assert_exists(txn, &self.key_buf)?;
            }
        }
        self.encode_value(value)?;
        txn.put(self.cf_id, &self.key_buf, &self.value_buf)
    }

    pub fn get(&mut self, txn: &Transaction, key: &Value) -> Result<Option<Value>, TransactionError> {
        self.encode_key(key)?;
        match txn.get(self.cf_id, &self.key_buf)? {
            Some(bytes) => Ok(Some(self.value_codec.read(&bytes)?.0)),
            None => Ok(None),
        }
    }

    pub fn delete(&mut self, txn: &mut Transaction, key: &Value) -> Result<(), TransactionError> {
        self.encode_key(key)?;
        txn.delete(self.cf_id, &self.key_buf)
    }

    pub fn exists(&mut self, txn: &Transaction, key: &Value) -> Result<bool, TransactionError> {
        Ok(self.get(txn, key)?.is_some())
    }

    /// Visits every record, in ascending encoded-key order (§4.3 `for_each`).
    pub fn for_each(
        &mut self,
        txn: &Transaction,
        mut visitor: impl FnMut(&[u8], Value) -> Result<Continue, TransactionError>,
    ) -> Result<(), TransactionError> {
        self.while_true_raw(txn, &[], &mut visitor)
    }

    /// Visits every record whose encoded key starts with the encoding of `prefix_value`'s
    /// leading sub-codecs (§4.3 `while_equal_prefix`). The scan primitive behind "all timers
    /// for element X", "all subscriptions for element X".
    pub fn while_equal_prefix(
        &mut self,
        txn: &Transaction,
        prefix: &[u8],
        mut visitor: impl FnMut(&[u8], Value) -> Result<Continue, TransactionError>,
    ) -> Result<(), TransactionError> {
        self.while_true_raw(txn, prefix, &mut visitor)
    }

    /// The unrestricted ordered scan (§4.3 `while_true`), parameterized by a visitor
    /// returning `Continue::Continue` / `Continue::Stop`.
    pub fn while_true(
        &mut self,
        txn: &Transaction,
        mut visitor: impl FnMut(&[u8], Value) -> Result<Continue, TransactionError>,
    ) -> Result<(), TransactionError> {
        self.while_true_raw(txn, &[], &mut visitor)
    }

    fn while_true_raw(
        &mut self,
        txn: &Transaction,
        prefix: &[u8],
        visitor: &mut dyn FnMut(&[u8], Value) -> Result<Continue, TransactionError>,
    ) -> Result<(), TransactionError> {
        let value_codec = &self.value_codec;
        let mut first_err: Option<TransactionError> = None;
        let mut result_continue = Continue::Continue;
        txn.iter_prefix(self.cf_id, prefix, |k, v| {
            if first_err.is_some() {
                return Continue::Stop;
            }
            match value_codec.read(v) {
                Ok((decoded, _)) => match visitor(k, decoded) {
                    Ok(c) => {
                        result_continue = c;
                        c
                    }
                    Err(e) => {
                        first_err = Some(e);
                        Continue::Stop
                    }
                },
                Err(e) => {
                    first_err = Some(e.into());
                    Continue::Stop
                }
            }
        })?;
        if let Some(e) = first_err {
            return Err(e);
        }
        let _ = result_continue;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{BytesCodec, Int64Codec};
    use crate::engine::{Engine, MemEngine};

    fn cf() -> ColumnFamily {
        ColumnFamily::new(CfId(1), Box::new(Int64Codec), Box::new(BytesCodec))
    }

    #[test]
    fn put_get_round_trip() {
        let mut engine = MemEngine::new();
        engine.create_column_family(CfId(1), "t").unwrap();
        let mut txn = Transaction::begin(&engine).unwrap();
        let mut c = cf();

        c.put(&mut txn, &Value::Int(7), &Value::Bytes(b"hi".to_vec()))
            .unwrap();
        let got = c.get(&txn, &Value::Int(7)).unwrap();
        assert_eq!(got, Some(Value::Bytes(b"hi".to_vec())));
    }

    #[test]
    fn for_each_visits_in_ascending_key_order() {
        let mut engine = MemEngine::new();
        engine.create_column_family(CfId(1), "t").unwrap();
        let mut txn = Transaction::begin(&engine).unwrap();
        let mut c = cf();

        for (k, v) in [(3i64, "c"), (1, "a"), (2, "b")] {
            c.put(&mut txn, &Value::Int(k), &Value::Bytes(v.as_bytes().to_vec()))
                .unwrap();
        }

        let mut seen = Vec::new();
        c.for_each(&txn, |_k, v| {
            seen.push(v);
            Ok(Continue::Continue)
        })
        .unwrap();

        assert_eq!(
            seen,
            vec![
                Value::Bytes(b"a".to_vec()),
                Value::Bytes(b"b".to_vec()),
                Value::Bytes(b"c".to_vec()),
            ]
        );
    }
}
