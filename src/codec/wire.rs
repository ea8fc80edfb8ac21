//! Primitive wire reads and writes: varints, field keys, byte runs.

use crate::error::{CodecError, Result};
use crate::schema::{WireType, MAX_TAG};
use crate::tx::{UnknownField, UnknownValue};

/// A varint never needs more than 10 bytes for 64 bits.
pub(crate) const MAX_VARINT_LEN: usize = 10;

pub(crate) fn put_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

pub(crate) fn put_key(out: &mut Vec<u8>, tag: u32, wire_type: WireType) {
    put_varint(out, (u64::from(tag) << 3) | wire_type as u64);
}

pub(crate) fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    put_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

pub(crate) fn put_unknown(out: &mut Vec<u8>, field: &UnknownField) {
    match &field.value {
        UnknownValue::Varint(v) => {
            put_key(out, field.tag, WireType::Varint);
            put_varint(out, *v);
        }
        UnknownValue::Fixed64(v) => {
            put_key(out, field.tag, WireType::Fixed64);
            out.extend_from_slice(&v.to_le_bytes());
        }
        UnknownValue::LengthDelimited(bytes) => {
            put_key(out, field.tag, WireType::LengthDelimited);
            put_bytes(out, bytes);
        }
        UnknownValue::Fixed32(v) => {
            put_key(out, field.tag, WireType::Fixed32);
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
}

/// Forward-only cursor over an encoded message.
///
/// `base` is the absolute offset of `buffer[0]` in the outermost input so
/// errors from nested readers point at the right byte.
pub(crate) struct Reader<'a> {
    buffer: &'a [u8],
    read_pos: usize,
    base: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buffer: &'a [u8]) -> Self {
        Self::nested(buffer, 0)
    }

    pub(crate) fn nested(buffer: &'a [u8], base: usize) -> Self {
        Self {
            buffer,
            read_pos: 0,
            base,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.read_pos >= self.buffer.len()
    }

    /// Absolute offset of the next unread byte.
    pub(crate) fn offset(&self) -> usize {
        self.base + self.read_pos
    }

    pub(crate) fn consumed(&self) -> usize {
        self.read_pos
    }

    fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.read_pos)
    }

    pub(crate) fn varint(&mut self) -> Result<u64> {
        let start = self.offset();
        let mut value: u64 = 0;
        for i in 0..MAX_VARINT_LEN {
            let byte = match self.buffer.get(self.read_pos) {
                Some(b) => *b,
                None => {
                    return Err(CodecError::TruncatedInput {
                        offset: self.offset(),
                        needed: 1,
                    })
                }
            };
            self.read_pos += 1;
            // The tenth byte may only contribute the top bit.
            if i == MAX_VARINT_LEN - 1 && byte > 1 {
                return Err(CodecError::malformed(start, "varint overflows 64 bits"));
            }
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(CodecError::malformed(start, "varint longer than 10 bytes"))
    }

    /// Reads a field key, returning the tag, the wire type and the offset
    /// the key started at.
    pub(crate) fn key(&mut self) -> Result<(u32, WireType, usize)> {
        let start = self.offset();
        let key = self.varint()?;
        let tag = key >> 3;
        if tag == 0 || tag > u64::from(MAX_TAG) {
            return Err(CodecError::malformed(start, format!("invalid field tag {}", tag)));
        }
        let wire_type = WireType::from_u8((key & 0x7) as u8).ok_or_else(|| {
            CodecError::malformed(start, format!("invalid wire type {}", key & 0x7))
        })?;
        Ok((tag as u32, wire_type, start))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(CodecError::TruncatedInput {
                offset: self.offset(),
                needed: len - self.remaining(),
            });
        }
        let start = self.read_pos;
        self.read_pos += len;
        Ok(&self.buffer[start..self.read_pos])
    }

    /// Reads a length-prefixed byte run and returns it with its absolute
    /// starting offset.
    pub(crate) fn bytes(&mut self) -> Result<(&'a [u8], usize)> {
        let len = self.varint()?;
        let offset = self.offset();
        let len = usize::try_from(len)
            .map_err(|_| CodecError::malformed(offset, "length exceeds address space"))?;
        Ok((self.take(len)?, offset))
    }

    pub(crate) fn string(&mut self) -> Result<String> {
        let (bytes, offset) = self.bytes()?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| CodecError::malformed(offset, format!("text field is not UTF-8: {}", e)))
    }

    /// Reads the value of a field whose tag is not in the schema.
    pub(crate) fn unknown(
        &mut self,
        wire_type: WireType,
        key_offset: usize,
    ) -> Result<UnknownValue> {
        match wire_type {
            WireType::Varint => Ok(UnknownValue::Varint(self.varint()?)),
            WireType::Fixed64 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(self.take(8)?);
                Ok(UnknownValue::Fixed64(u64::from_le_bytes(raw)))
            }
            WireType::LengthDelimited => {
                Ok(UnknownValue::LengthDelimited(self.bytes()?.0.to_vec()))
            }
            WireType::Fixed32 => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(self.take(4)?);
                Ok(UnknownValue::Fixed32(u32::from_le_bytes(raw)))
            }
            WireType::StartGroup | WireType::EndGroup => Err(CodecError::malformed(
                key_offset,
                "group wire types are not supported",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varint_bytes(v: u64) -> Vec<u8> {
        let mut out = Vec::new();
        put_varint(&mut out, v);
        out
    }

    #[test]
    fn varint_known_encodings() {
        assert_eq!(varint_bytes(0), vec![0x00]);
        assert_eq!(varint_bytes(1), vec![0x01]);
        assert_eq!(varint_bytes(300), vec![0xac, 0x02]);
        assert_eq!(varint_bytes(1_000_000), vec![0xc0, 0x84, 0x3d]);
        assert_eq!(varint_bytes(u64::MAX).len(), MAX_VARINT_LEN);
        assert_eq!(varint_bytes(-1i64 as u64).len(), MAX_VARINT_LEN);
    }

    #[test]
    fn varint_reads_back() {
        for v in [0u64, 127, 128, 16_383, 16_384, 1 << 35, u64::MAX] {
            let buf = varint_bytes(v);
            let mut reader = Reader::new(&buf);
            assert_eq!(reader.varint().unwrap(), v);
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn varint_truncated() {
        let mut reader = Reader::new(&[0x80, 0x80]);
        assert_eq!(
            reader.varint(),
            Err(CodecError::TruncatedInput { offset: 2, needed: 1 })
        );
    }

    #[test]
    fn varint_overflow() {
        let buf = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02];
        assert!(matches!(
            Reader::new(&buf).varint(),
            Err(CodecError::MalformedEncoding { offset: 0, .. })
        ));

        let long = [0x80; 11];
        assert!(matches!(
            Reader::new(&long).varint(),
            Err(CodecError::MalformedEncoding { .. })
        ));
    }

    #[test]
    fn key_validation() {
        let mut out = Vec::new();
        put_key(&mut out, 7, WireType::LengthDelimited);
        assert_eq!(out, vec![0x3a]);
        assert_eq!(
            Reader::new(&out).key().unwrap(),
            (7, WireType::LengthDelimited, 0)
        );

        // tag 0
        assert!(matches!(
            Reader::new(&[0x02]).key(),
            Err(CodecError::MalformedEncoding { .. })
        ));
        // wire type 6
        assert!(matches!(
            Reader::new(&[0x0e]).key(),
            Err(CodecError::MalformedEncoding { .. })
        ));
    }

    #[test]
    fn nested_reader_reports_absolute_offsets() {
        let mut reader = Reader::nested(&[0x05, b'a'], 40);
        assert_eq!(
            reader.bytes().map(|(b, _)| b.len()),
            Err(CodecError::TruncatedInput { offset: 41, needed: 4 })
        );
    }

    #[cfg(target_pointer_width = "32")]
    #[test]
    fn length_beyond_address_space_is_malformed() {
        // 2^32
        let mut reader = Reader::new(&[0x80, 0x80, 0x80, 0x80, 0x10]);
        assert!(matches!(
            reader.bytes(),
            Err(CodecError::MalformedEncoding { offset: 5, .. })
        ));
    }

    #[test]
    fn string_rejects_invalid_utf8() {
        let mut reader = Reader::new(&[0x02, 0xc3, 0x28]);
        assert!(matches!(
            reader.string(),
            Err(CodecError::MalformedEncoding { offset: 1, .. })
        ));
    }

    #[test]
    fn unknown_values_round_trip() {
        let fields = vec![
            UnknownField {
                tag: 20,
                value: UnknownValue::Varint(99),
            },
            UnknownField {
                tag: 21,
                value: UnknownValue::Fixed64(0x0102_0304_0506_0708),
            },
            UnknownField {
                tag: 22,
                value: UnknownValue::LengthDelimited(vec![1, 2, 3]),
            },
            UnknownField {
                tag: 23,
                value: UnknownValue::Fixed32(0xdead_beef),
            },
        ];
        let mut out = Vec::new();
        for field in &fields {
            put_unknown(&mut out, field);
        }

        let mut reader = Reader::new(&out);
        let mut read = Vec::new();
        while !reader.is_empty() {
            let (tag, wire_type, at) = reader.key().unwrap();
            read.push(UnknownField {
                tag,
                value: reader.unknown(wire_type, at).unwrap(),
            });
        }
        assert_eq!(read, fields);
    }

    #[test]
    fn groups_are_rejected() {
        let mut reader = Reader::new(&[0x00]);
        assert!(matches!(
            reader.unknown(WireType::StartGroup, 0),
            Err(CodecError::MalformedEncoding { .. })
        ));
    }
}
