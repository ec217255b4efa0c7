//! Typed, bounds-checked windows over an [`ArrayBuffer`].
//!
//! A view is `(buffer, byte_offset, length, kind)`. Several views may alias
//! one buffer; writes through one are visible through all of them. The view's
//! bounds are fixed at construction.

use num_bigint::BigInt;

use crate::error::{JsError, JsResult};
use crate::runtime::array_buffer::ArrayBuffer;
use crate::runtime::helpers::{relative_to, strict_equality, to_big_int, to_number};
use crate::types::{JsBigInt, JsValue, bigint_ops, number_ops};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypedArrayKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    BigInt64,
    BigUint64,
}

impl TypedArrayKind {
    pub const ALL: [TypedArrayKind; 11] = [
        TypedArrayKind::Int8,
        TypedArrayKind::Uint8,
        TypedArrayKind::Uint8Clamped,
        TypedArrayKind::Int16,
        TypedArrayKind::Uint16,
        TypedArrayKind::Int32,
        TypedArrayKind::Uint32,
        TypedArrayKind::Float32,
        TypedArrayKind::Float64,
        TypedArrayKind::BigInt64,
        TypedArrayKind::BigUint64,
    ];

    pub fn bytes_per_element(self) -> usize {
        match self {
            TypedArrayKind::Int8 | TypedArrayKind::Uint8 | TypedArrayKind::Uint8Clamped => 1,
            TypedArrayKind::Int16 | TypedArrayKind::Uint16 => 2,
            TypedArrayKind::Int32 | TypedArrayKind::Uint32 | TypedArrayKind::Float32 => 4,
            TypedArrayKind::Float64 | TypedArrayKind::BigInt64 | TypedArrayKind::BigUint64 => 8,
        }
    }

    /// Constructor name, e.g. `"Uint8ClampedArray"`.
    pub fn name(self) -> &'static str {
        match self {
            TypedArrayKind::Int8 => "Int8Array",
            TypedArrayKind::Uint8 => "Uint8Array",
            TypedArrayKind::Uint8Clamped => "Uint8ClampedArray",
            TypedArrayKind::Int16 => "Int16Array",
            TypedArrayKind::Uint16 => "Uint16Array",
            TypedArrayKind::Int32 => "Int32Array",
            TypedArrayKind::Uint32 => "Uint32Array",
            TypedArrayKind::Float32 => "Float32Array",
            TypedArrayKind::Float64 => "Float64Array",
            TypedArrayKind::BigInt64 => "BigInt64Array",
            TypedArrayKind::BigUint64 => "BigUint64Array",
        }
    }

    pub fn is_bigint(self) -> bool {
        matches!(self, TypedArrayKind::BigInt64 | TypedArrayKind::BigUint64)
    }

    /// Accepts the constructor name or its short element form (`"int8"`,
    /// `"uint8clamped"`, `"float64"`, ...), case-insensitively.
    pub fn from_name(name: &str) -> Option<TypedArrayKind> {
        let lower = name.to_ascii_lowercase();
        let short = lower.strip_suffix("array").unwrap_or(&lower);
        TypedArrayKind::ALL
            .into_iter()
            .find(|k| k.name().to_ascii_lowercase().trim_end_matches("array") == short)
    }
}

/// Byte order used when encoding elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Native,
    Little,
    Big,
}

impl Endian {
    fn is_big(self) -> bool {
        match self {
            Endian::Native => cfg!(target_endian = "big"),
            Endian::Little => false,
            Endian::Big => true,
        }
    }
}

/// Converts `value` to the element type and returns its bytes in `endian`
/// order. Numeric kinds take ToNumber, the 64-bit BigInt kinds take ToBigInt.
pub fn encode(kind: TypedArrayKind, value: &JsValue, endian: Endian) -> JsResult<Vec<u8>> {
    let mut bytes = if kind.is_bigint() {
        let n = to_big_int(value)?;
        match kind {
            TypedArrayKind::BigInt64 => bigint_ops::to_big_int64(&n).to_le_bytes().to_vec(),
            _ => bigint_ops::to_big_uint64(&n).to_le_bytes().to_vec(),
        }
    } else {
        let n = to_number(value)?;
        match kind {
            TypedArrayKind::Int8 => number_ops::to_int8(n).to_le_bytes().to_vec(),
            TypedArrayKind::Uint8 => vec![number_ops::to_uint8(n)],
            TypedArrayKind::Uint8Clamped => vec![number_ops::to_uint8_clamp(n)],
            TypedArrayKind::Int16 => number_ops::to_int16(n).to_le_bytes().to_vec(),
            TypedArrayKind::Uint16 => number_ops::to_uint16(n).to_le_bytes().to_vec(),
            TypedArrayKind::Int32 => number_ops::to_int32(n).to_le_bytes().to_vec(),
            TypedArrayKind::Uint32 => number_ops::to_uint32(n).to_le_bytes().to_vec(),
            TypedArrayKind::Float32 => (n as f32).to_le_bytes().to_vec(),
            _ => n.to_le_bytes().to_vec(),
        }
    };
    if endian.is_big() {
        bytes.reverse();
    }
    Ok(bytes)
}

/// Reads one element from `bytes` (exactly `bytes_per_element` long).
pub fn decode(kind: TypedArrayKind, bytes: &[u8], endian: Endian) -> JsValue {
    let mut raw = [0u8; 8];
    let width = kind.bytes_per_element();
    raw[..width].copy_from_slice(&bytes[..width]);
    if endian.is_big() {
        raw[..width].reverse();
    }
    let [b0, b1, b2, b3, ..] = raw;
    let number = |n: f64| JsValue::Number(n);
    match kind {
        TypedArrayKind::Int8 => number(f64::from(b0 as i8)),
        TypedArrayKind::Uint8 | TypedArrayKind::Uint8Clamped => number(f64::from(b0)),
        TypedArrayKind::Int16 => number(f64::from(i16::from_le_bytes([b0, b1]))),
        TypedArrayKind::Uint16 => number(f64::from(u16::from_le_bytes([b0, b1]))),
        TypedArrayKind::Int32 => number(f64::from(i32::from_le_bytes([b0, b1, b2, b3]))),
        TypedArrayKind::Uint32 => number(f64::from(u32::from_le_bytes([b0, b1, b2, b3]))),
        TypedArrayKind::Float32 => number(f64::from(f32::from_le_bytes([b0, b1, b2, b3]))),
        TypedArrayKind::Float64 => number(f64::from_le_bytes(raw)),
        TypedArrayKind::BigInt64 => JsValue::BigInt(JsBigInt {
            value: BigInt::from(i64::from_le_bytes(raw)),
        }),
        TypedArrayKind::BigUint64 => JsValue::BigInt(JsBigInt {
            value: BigInt::from(u64::from_le_bytes(raw)),
        }),
    }
}

#[derive(Debug, Clone)]
pub struct TypedArrayView {
    buffer: ArrayBuffer,
    byte_offset: usize,
    length: usize,
    kind: TypedArrayKind,
}

impl TypedArrayView {
    /// Creates a view over an existing buffer. Without `length` the view
    /// extends to the end of the buffer, which must then be a whole number of
    /// elements past `byte_offset`.
    pub fn new(
        buffer: ArrayBuffer,
        byte_offset: usize,
        length: Option<usize>,
        kind: TypedArrayKind,
    ) -> JsResult<Self> {
        let size = kind.bytes_per_element();
        if byte_offset % size != 0 {
            return Err(JsError::range_error(format!(
                "start offset of {} should be a multiple of {size}",
                kind.name()
            )));
        }
        let buffer_len = buffer.byte_length();
        let length = match length {
            Some(length) => {
                let end = length
                    .checked_mul(size)
                    .and_then(|bytes| bytes.checked_add(byte_offset));
                if end.is_none_or(|end| end > buffer_len) {
                    return Err(JsError::range_error(format!(
                        "Invalid typed array length: {length}"
                    )));
                }
                length
            }
            None => {
                if byte_offset > buffer_len {
                    return Err(JsError::range_error(format!(
                        "Start offset {byte_offset} is outside the bounds of the buffer"
                    )));
                }
                if (buffer_len - byte_offset) % size != 0 {
                    return Err(JsError::range_error(format!(
                        "byte length of {} should be a multiple of {size}",
                        kind.name()
                    )));
                }
                (buffer_len - byte_offset) / size
            }
        };
        Ok(Self {
            buffer,
            byte_offset,
            length,
            kind,
        })
    }

    /// A view over a fresh zeroed buffer of `length` elements.
    pub fn with_length(kind: TypedArrayKind, length: usize) -> JsResult<Self> {
        let bytes = length
            .checked_mul(kind.bytes_per_element())
            .ok_or_else(|| JsError::range_error("Invalid typed array length"))?;
        Self::new(ArrayBuffer::new(bytes), 0, Some(length), kind)
    }

    /// A view over a fresh buffer holding `values` converted to `kind`.
    pub fn from_values(kind: TypedArrayKind, values: &[JsValue]) -> JsResult<Self> {
        let view = Self::with_length(kind, values.len())?;
        view.set_from_values(values, 0)?;
        Ok(view)
    }

    /// Copies another view element-wise into a fresh buffer of `kind`.
    pub fn from_view(kind: TypedArrayKind, source: &TypedArrayView) -> JsResult<Self> {
        check_content_type(kind, source.kind)?;
        let view = Self::with_length(kind, source.length)?;
        view.set_from_view(source, 0)?;
        Ok(view)
    }

    pub fn buffer(&self) -> &ArrayBuffer {
        &self.buffer
    }

    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn byte_length(&self) -> usize {
        self.length * self.kind.bytes_per_element()
    }

    pub fn kind(&self) -> TypedArrayKind {
        self.kind
    }

    fn element_offset(&self, index: usize) -> usize {
        self.byte_offset + index * self.kind.bytes_per_element()
    }

    /// Element at `index`, or `None` when out of bounds.
    pub fn get(&self, index: usize) -> Option<JsValue> {
        if index >= self.length {
            return None;
        }
        let mut bytes = [0u8; 8];
        let width = self.kind.bytes_per_element();
        self.buffer
            .read(self.element_offset(index), &mut bytes[..width]);
        Some(decode(self.kind, &bytes[..width], Endian::Native))
    }

    /// Converts and stores `value`. Conversion errors surface even when
    /// `index` is out of bounds; the write itself is then dropped.
    pub fn set(&self, index: usize, value: &JsValue) -> JsResult<()> {
        let bytes = encode(self.kind, value, Endian::Native)?;
        if index < self.length {
            self.buffer.write(self.element_offset(index), &bytes);
        }
        Ok(())
    }

    /// A view of `begin..end` (relative, clamped) sharing this view's buffer.
    pub fn subarray(&self, begin: f64, end: Option<f64>) -> TypedArrayView {
        let (first, last) = self.range(begin, end);
        TypedArrayView {
            buffer: self.buffer.clone(),
            byte_offset: self.element_offset(first),
            length: last.saturating_sub(first),
            kind: self.kind,
        }
    }

    /// A copy of `begin..end` (relative, clamped) in a new buffer.
    pub fn slice(&self, begin: f64, end: Option<f64>) -> TypedArrayView {
        let (first, last) = self.range(begin, end);
        let count = last.saturating_sub(first);
        let mut bytes = vec![0u8; count * self.kind.bytes_per_element()];
        self.buffer.read(self.element_offset(first), &mut bytes);
        TypedArrayView {
            buffer: ArrayBuffer::from_bytes(bytes),
            byte_offset: 0,
            length: count,
            kind: self.kind,
        }
    }

    fn range(&self, begin: f64, end: Option<f64>) -> (usize, usize) {
        let len = self.length as f64;
        let first = relative_to(begin, len) as usize;
        let last = end.map_or(len, |e| relative_to(e, len)) as usize;
        (first, last.max(first))
    }

    /// Writes `values` starting at element `offset`.
    pub fn set_from_values(&self, values: &[JsValue], offset: usize) -> JsResult<()> {
        if offset.checked_add(values.len()).is_none_or(|end| end > self.length) {
            return Err(JsError::range_error("offset is out of bounds"));
        }
        for (i, value) in values.iter().enumerate() {
            self.set(offset + i, value)?;
        }
        Ok(())
    }

    /// Writes every element of `source` starting at element `offset`. The
    /// source is read in full before anything is written, so overlapping
    /// views of one buffer copy correctly.
    pub fn set_from_view(&self, source: &TypedArrayView, offset: usize) -> JsResult<()> {
        check_content_type(self.kind, source.kind)?;
        if offset.checked_add(source.length).is_none_or(|end| end > self.length) {
            return Err(JsError::range_error("offset is out of bounds"));
        }
        if source.kind == self.kind {
            let mut bytes = vec![0u8; source.byte_length()];
            source.buffer.read(source.byte_offset, &mut bytes);
            self.buffer.write(self.element_offset(offset), &bytes);
            return Ok(());
        }
        let snapshot = source.to_values();
        for (i, value) in snapshot.iter().enumerate() {
            self.set(offset + i, value)?;
        }
        Ok(())
    }

    /// Stores `value` in every element of `start..end` (relative, clamped).
    pub fn fill(&self, value: &JsValue, start: f64, end: Option<f64>) -> JsResult<()> {
        let bytes = encode(self.kind, value, Endian::Native)?;
        let (first, last) = self.range(start, end);
        for index in first..last {
            self.buffer.write(self.element_offset(index), &bytes);
        }
        Ok(())
    }

    /// Copies `start..end` to `target` within this view (memmove semantics).
    pub fn copy_within(&self, target: f64, start: f64, end: Option<f64>) {
        let len = self.length as f64;
        let to = relative_to(target, len) as usize;
        let (from, last) = self.range(start, end);
        let count = (last - from).min(self.length - to);
        if count == 0 {
            return;
        }
        let size = self.kind.bytes_per_element();
        self.buffer.copy_within(
            self.element_offset(from),
            self.element_offset(to),
            count * size,
        );
    }

    /// First index at or after `from` whose element is strictly equal to
    /// `value`.
    pub fn index_of(&self, value: &JsValue, from: f64) -> Option<usize> {
        let start = relative_to(from, self.length as f64) as usize;
        (start..self.length).find(|&i| {
            self.get(i)
                .is_some_and(|element| strict_equality(&element, value))
        })
    }

    pub fn to_values(&self) -> Vec<JsValue> {
        (0..self.length).filter_map(|i| self.get(i)).collect()
    }
}

fn check_content_type(target: TypedArrayKind, source: TypedArrayKind) -> JsResult<()> {
    if target.is_bigint() != source.is_bigint() {
        return Err(JsError::type_error(format!(
            "Cannot mix BigInt and other types: {} and {}",
            source.name(),
            target.name()
        )));
    }
    Ok(())
}
