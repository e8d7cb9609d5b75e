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

/// 4-byte big-endian length prefix followed by raw bytes (§4.1). Length-prefixing, not a
/// sentinel terminator, so arbitrary byte strings containing any value (including zero
/// bytes) round-trip exactly.
#[derive(Debug, Default, Copy, Clone)]
pub struct BytesCodec;

fn write_len_prefixed(bytes: &[u8], buf: &mut Vec<u8>) -> Result<(), DecodeError> {
    let len: u32 = bytes
        .len()
        .try_into()
        .map_err(|_| DecodeError::InvalidLength(bytes.len() as i64))?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

fn read_len_prefixed(buf: &[u8]) -> Result<(&[u8], usize), DecodeError> {
    if buf.len() < 4 {
        return Err(DecodeError::Truncated {
            needed: 4,
            available: buf.len(),
        });
    }
    let mut len_raw = [0u8; 4];
    len_raw.copy_from_slice(&buf[..4]);
    let len = u32::from_be_bytes(len_raw) as usize;
    let total = 4 + len;
    if buf.len() < total {
        return Err(DecodeError::Truncated {
            needed: total,
            available: buf.len(),
        });
    }
    Ok((&buf[4..total], total))
}

impl Codec for BytesCodec {
    fn write(&self, value: &Value, buf: &mut Vec<u8>) -> Result<(), DecodeError> {
        let v = match value {
            Value::Bytes(v) => v.as_slice(),
            _ => return Err(DecodeError::InvalidLength(0)),
        };
        write_len_prefixed(v, buf)
    }

    fn read(&self, buf: &[u8]) -> Result<(Value, usize), DecodeError> {
        let (bytes, consumed) = read_len_prefixed(buf)?;
        Ok((Value::Bytes(bytes.to_vec()), consumed))
    }

    fn fixed_len(&self) -> Option<usize> {
        None
    }
}

/// UTF-8 string, same length-prefixed framing as `BytesCodec` (§4.1: "String codec:
/// UTF-8 byte-sequence codec; no normalization"). No NFC/NFKC or case folding is applied —
/// two strings that differ only by normalization form are different keys.
#[derive(Debug, Default, Copy, Clone)]
pub struct StrCodec;

impl Codec for StrCodec {
    fn write(&self, value: &Value, buf: &mut Vec<u8>) -> Result<(), DecodeError> {
        let v = match value {
            Value::Str(v) => v.as_bytes(),
            _ => return Err(DecodeError::InvalidLength(0)),
        };
        write_len_prefixed(v, buf)
    }

    fn read(&self, buf: &[u8]) -> Result<(Value, usize), DecodeError> {
        let (bytes, consumed) = read_len_prefixed(buf)?;
        let s = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
        Ok((Value::Str(s.to_owned()), consumed))
    }

    fn fixed_len(&self) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_round_trips_including_empty_and_zero_bytes() {
        let codec = BytesCodec;
        for sample in [&b""[..], &b"\x00\x00"[..], &b"hello world"[..]] {
            let mut buf = Vec::new();
            codec.write(&Value::Bytes(sample.to_vec()), &mut buf).unwrap();
            let (decoded, len) = codec.read(&buf).unwrap();
            assert_eq!(decoded, Value::Bytes(sample.to_vec()));
            assert_eq!(len, buf.len());
        }
    }

    #[test]
    fn bytes_rejects_truncated_length_prefix() {
        let codec = BytesCodec;
        assert!(codec.read(&[0, 0]).is_err());
    }

    #[test]
    fn bytes_rejects_truncated_payload() {
        let codec = BytesCodec;
        let mut buf = Vec::new();
        buf.extend_from_slice(&10u32.to_be_bytes());
        buf.extend_from_slice(b"short");
        let err = codec.read(&buf).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                needed: 14,
                available: 9
            }
        );
    }

    #[test]
    fn str_round_trips() {
        let codec = StrCodec;
        let mut buf = Vec::new();
        codec
            .write(&Value::Str("hello".to_owned()), &mut buf)
            .unwrap();
        let (decoded, len) = codec.read(&buf).unwrap();
        assert_eq!(decoded, Value::Str("hello".to_owned()));
        assert_eq!(len, buf.len());
    }

    #[test]
    fn str_rejects_invalid_utf8() {
        let codec = StrCodec;
        let mut buf = Vec::new();
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&[0xff, 0xfe]);
        assert_eq!(codec.read(&buf).unwrap_err(), DecodeError::InvalidUtf8);
    }
}
