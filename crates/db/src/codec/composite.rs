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

use crate::codec::{Codec, Value};
use crate::error::DecodeError;

/// Concatenation of N sub-codecs, encoded in field order (§4.1). Used for multi-column
/// keys such as the subscription table's `(commandSentTime, element_instance_key,
/// message_name)` ordering key — encoding each field with an order-preserving codec and
/// concatenating preserves lexicographic order across the whole tuple (I3) as long as
/// every prefix field's encoding is fixed-length, or the field is last.
///
/// `write`/`read` operate on a full tuple (`Value::Tuple` of exactly `codecs.len()`
/// entries). `write_prefix`/`encode_prefix` below support partial-key range scans: encoding
/// just the leading `k` fields gives a byte string that is a valid lower bound for every
/// key whose first `k` fields match.
pub struct CompositeCodec {
    codecs: Vec<Box<dyn Codec>>,
}

impl CompositeCodec {
    pub fn new(codecs: Vec<Box<dyn Codec>>) -> Self {
        Self { codecs }
    }

    /// Encodes only the first `prefix_len` fields of `values`, for use as a scan bound.
    /// Every field up to and including `prefix_len` must be present in `values`.
    pub fn write_prefix(
        &self,
        values: &[Value],
        prefix_len: usize,
        buf: &mut Vec<u8>,
    ) -> Result<(), DecodeError> {
        assert!(prefix_len <= self.codecs.len());
        for (codec, value) in self.codecs.iter().zip(values.iter()).take(prefix_len) {
            codec.write(value, buf)?;
        }
        Ok(())
    }
}

impl Codec for CompositeCodec {
    fn write(&self, value: &Value, buf: &mut Vec<u8>) -> Result<(), DecodeError> {
        let fields = match value {
            Value::Tuple(fields) if fields.len() == self.codecs.len() => fields,
            _ => return Err(DecodeError::InvalidLength(0)),
        };
        for (codec, field) in self.codecs.iter().zip(fields.iter()) {
            codec.write(field, buf)?;
        }
        Ok(())
    }

    fn read(&self, buf: &[u8]) -> Result<(Value, usize), DecodeError> {
        let mut fields = Vec::with_capacity(self.codecs.len());
        let mut offset = 0;
        for codec in &self.codecs {
            let (field, consumed) = codec.read(&buf[offset..])?;
            fields.push(field);
            offset += consumed;
        }
        Ok((Value::Tuple(fields), offset))
    }

    fn fixed_len(&self) -> Option<usize> {
        self.codecs.iter().try_fold(0usize, |acc, c| {
            c.fixed_len().map(|len| acc + len)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{BytesCodec, Int64Codec};

    fn codec() -> CompositeCodec {
        CompositeCodec::new(vec![Box::new(Int64Codec), Box::new(BytesCodec)])
    }

    #[test]
    fn composite_round_trips() {
        let codec = codec();
        let value = Value::Tuple(vec![Value::Int(42), Value::Bytes(b"abc".to_vec())]);
        let mut buf = Vec::new();
        codec.write(&value, &mut buf).unwrap();
        let (decoded, len) = codec.read(&buf).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(len, buf.len());
    }

    #[test]
    fn prefix_write_produces_a_valid_scan_bound() {
        let codec = codec();
        let full = vec![Value::Int(42), Value::Bytes(b"abc".to_vec())];
        let mut full_buf = Vec::new();
        codec.write(&Value::Tuple(full.clone()), &mut full_buf).unwrap();

        let mut prefix_buf = Vec::new();
        codec.write_prefix(&full, 1, &mut prefix_buf).unwrap();
        assert!(full_buf.starts_with(&prefix_buf));
    }

    #[test]
    fn fixed_len_is_none_when_any_sub_codec_is_variable() {
        assert_eq!(codec().fixed_len(), None);
    }
}
