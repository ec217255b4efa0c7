//! Unaligned, explicit-endian access to an [`ArrayBuffer`].

use crate::error::{JsError, JsResult};
use crate::runtime::array_buffer::ArrayBuffer;
use crate::runtime::typed_array::{Endian, TypedArrayKind, decode, encode};
use crate::types::JsValue;

#[derive(Debug, Clone)]
pub struct DataView {
    buffer: ArrayBuffer,
    byte_offset: usize,
    byte_length: usize,
}

impl DataView {
    pub fn new(
        buffer: ArrayBuffer,
        byte_offset: usize,
        byte_length: Option<usize>,
    ) -> JsResult<Self> {
        let buffer_len = buffer.byte_length();
        if byte_offset > buffer_len {
            return Err(JsError::range_error(format!(
                "Start offset {byte_offset} is outside the bounds of the buffer"
            )));
        }
        let byte_length = match byte_length {
            Some(len) if byte_offset.checked_add(len).is_none_or(|end| end > buffer_len) => {
                return Err(JsError::range_error(format!(
                    "Invalid DataView length {len}"
                )));
            }
            Some(len) => len,
            None => buffer_len - byte_offset,
        };
        Ok(Self {
            buffer,
            byte_offset,
            byte_length,
        })
    }

    pub fn buffer(&self) -> &ArrayBuffer {
        &self.buffer
    }

    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    fn check(&self, offset: usize, kind: TypedArrayKind) -> JsResult<usize> {
        let width = kind.bytes_per_element();
        if offset
            .checked_add(width)
            .is_none_or(|end| end > self.byte_length)
        {
            return Err(JsError::range_error("Offset is outside the bounds of the DataView"));
        }
        Ok(self.byte_offset + offset)
    }

    // §25.3.1.5 GetViewValue
    pub fn get(&self, offset: usize, kind: TypedArrayKind, endian: Endian) -> JsResult<JsValue> {
        let start = self.check(offset, kind)?;
        let mut bytes = vec![0u8; kind.bytes_per_element()];
        self.buffer.read(start, &mut bytes);
        Ok(decode(kind, &bytes, endian))
    }

    // §25.3.1.6 SetViewValue
    pub fn set(
        &self,
        offset: usize,
        kind: TypedArrayKind,
        value: &JsValue,
        endian: Endian,
    ) -> JsResult<()> {
        let bytes = encode(kind, value, endian)?;
        let start = self.check(offset, kind)?;
        self.buffer.write(start, &bytes);
        Ok(())
    }
}
