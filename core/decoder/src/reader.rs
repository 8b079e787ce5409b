//! Positioned byte reader over the input module.
//!
//! All primitive reads are bounds-checked and report failures with the
//! absolute byte offset (`base + pos`), so section sub-readers produced by
//! [`Reader::sub_reader`] keep diagnostics pointing into the original file.

use crate::errors::{DecodeError, DecodeErrorKind};

pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            base: 0,
        }
    }

    /// A reader restricted to the next `len` bytes, reporting offsets
    /// relative to the same origin as `self`. Advances `self` past them.
    pub(crate) fn sub_reader(&mut self, len: usize) -> Result<Reader<'a>, DecodeError> {
        let bytes = self.read_exact(len)?;
        Ok(Reader {
            bytes,
            pos: 0,
            base: self.base + self.pos - len,
        })
    }

    /// A reader over a detached body slice whose first byte sat at
    /// absolute offset `base` in the original file.
    pub(crate) fn at_offset(bytes: &'a [u8], base: usize) -> Self {
        Self {
            bytes,
            pos: 0,
            base,
        }
    }

    /// Absolute offset of the next unread byte.
    pub(crate) fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos == self.bytes.len()
    }

    pub(crate) fn fail(&self, kind: DecodeErrorKind) -> DecodeError {
        DecodeError::new(kind, self.offset())
    }

    pub(crate) fn fail_at(&self, kind: DecodeErrorKind, offset: usize) -> DecodeError {
        DecodeError::new(kind, offset)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let b = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| self.fail(DecodeErrorKind::TruncatedSection))?;
        self.pos += 1;
        Ok(b)
    }

    pub(crate) fn read_exact(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(self.fail(DecodeErrorKind::TruncatedSection));
        }
        let out = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub(crate) fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        let b = self.read_exact(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn read_var_u64(&mut self) -> Result<u64, DecodeError> {
        let start = self.offset();
        let mut cursor = &self.bytes[self.pos..];
        let before = cursor.len();
        let value = leb128::read::unsigned(&mut cursor)
            .map_err(|_| self.fail_at(DecodeErrorKind::InvalidLEB, start))?;
        self.pos += before - cursor.len();
        Ok(value)
    }

    pub(crate) fn read_var_u32(&mut self) -> Result<u32, DecodeError> {
        let start = self.offset();
        let value = self.read_var_u64()?;
        u32::try_from(value).map_err(|_| self.fail_at(DecodeErrorKind::InvalidLEB, start))
    }

    pub(crate) fn read_var_i64(&mut self) -> Result<i64, DecodeError> {
        let start = self.offset();
        let mut cursor = &self.bytes[self.pos..];
        let before = cursor.len();
        let value = leb128::read::signed(&mut cursor)
            .map_err(|_| self.fail_at(DecodeErrorKind::InvalidLEB, start))?;
        self.pos += before - cursor.len();
        Ok(value)
    }

    pub(crate) fn read_var_i32(&mut self) -> Result<i32, DecodeError> {
        let start = self.offset();
        let value = self.read_var_i64()?;
        i32::try_from(value).map_err(|_| self.fail_at(DecodeErrorKind::InvalidLEB, start))
    }

    pub(crate) fn read_f32_bits(&mut self) -> Result<u32, DecodeError> {
        let b = self.read_exact(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn read_f64_bits(&mut self) -> Result<u64, DecodeError> {
        let b = self.read_exact(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// A `u32` vector length, checked against the remaining input so a
    /// corrupt prefix cannot drive allocations.
    pub(crate) fn read_vec_len(&mut self) -> Result<usize, DecodeError> {
        let start = self.offset();
        let len = self.read_var_u32()? as usize;
        if len > self.remaining() {
            return Err(self.fail_at(DecodeErrorKind::OversizedVector, start));
        }
        Ok(len)
    }

    /// A length-prefixed UTF-8 name. Ill-formed byte sequences are replaced
    /// rather than rejected; names only feed identifiers and lookups.
    pub(crate) fn read_name(&mut self) -> Result<String, DecodeError> {
        let len = self.read_vec_len()?;
        let bytes = self.read_exact(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}
