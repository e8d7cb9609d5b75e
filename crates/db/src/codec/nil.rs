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

/// Zero-byte encoding, used for values that carry no information beyond key presence
/// (§4.1), e.g. a set-style column family where the key alone is the payload.
#[derive(Debug, Default, Copy, Clone)]
pub struct NilCodec;

impl Codec for NilCodec {
    fn write(&self, value: &Value, _buf: &mut Vec<u8>) -> Result<(), DecodeError> {
        match value {
            Value::Nil => Ok(()),
            _ => Err(DecodeError::InvalidLength(0)),
        }
    }

    fn read(&self, _buf: &[u8]) -> Result<(Value, usize), DecodeError> {
        Ok((Value::Nil, 0))
    }

    fn fixed_len(&self) -> Option<usize> {
        Some(0)
    }
}
