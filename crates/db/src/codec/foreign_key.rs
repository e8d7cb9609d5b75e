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

use crate::codec::{CfId, Codec, Value};
use crate::error::DecodeError;

/// Wraps an inner codec and tags it with the column family it must reference (§4.5). The
/// `target_cf` is metadata consulted by the foreign-key checker at write time; it never
/// appears in the encoded bytes, so a `ForeignKeyCodec` round-trips byte-for-byte
/// identically to its inner codec alone.
pub struct ForeignKeyCodec {
    inner: Box<dyn Codec>,
    fk_name: &'static str,
    target_cf: CfId,
}

impl ForeignKeyCodec {
    pub fn new(inner: Box<dyn Codec>, fk_name: &'static str, target_cf: CfId) -> Self {
        Self {
            inner,
            fk_name,
            target_cf,
        }
    }

    pub fn fk_name(&self) -> &'static str {
        self.fk_name
    }

    pub fn target_cf(&self) -> CfId {
        self.target_cf
    }
}

impl Codec for ForeignKeyCodec {
    fn write(&self, value: &Value, buf: &mut Vec<u8>) -> Result<(), DecodeError> {
        self.inner.write(value, buf)
    }

    fn read(&self, buf: &[u8]) -> Result<(Value, usize), DecodeError> {
        self.inner.read(buf)
    }

    fn fixed_len(&self) -> Option<usize> {
        self.inner.fixed_len()
    }
}
