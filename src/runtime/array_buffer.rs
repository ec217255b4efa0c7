//! Fixed-length, zero-initialised byte storage shared by typed array views.

use std::cell::RefCell;
use std::rc::Rc;

use super::helpers::relative_to;
use crate::error::{JsError, JsResult};

/// Largest byte length an ArrayBuffer may be allocated with.
pub const MAX_BYTE_LENGTH: usize = 1 << 32;

#[derive(Debug, Clone)]
pub struct ArrayBuffer {
    data: Rc<RefCell<Vec<u8>>>,
}

impl ArrayBuffer {
    pub fn new(byte_length: usize) -> Self {
        Self {
            data: Rc::new(RefCell::new(vec![0; byte_length])),
        }
    }

    /// Allocates from a script-supplied length, rejecting negative and
    /// oversized requests.
    pub fn allocate(byte_length: f64) -> JsResult<Self> {
        let len = if byte_length.is_nan() {
            0.0
        } else {
            byte_length.trunc()
        };
        if len < 0.0 || len > MAX_BYTE_LENGTH as f64 {
            return Err(JsError::range_error("Invalid array buffer length"));
        }
        Ok(Self::new(len as usize))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            data: Rc::new(RefCell::new(bytes)),
        }
    }

    pub fn byte_length(&self) -> usize {
        self.data.borrow().len()
    }

    /// Copies `begin..end` into a new buffer. Both bounds are relative
    /// indices; `end` defaults to the byte length.
    pub fn slice(&self, begin: f64, end: Option<f64>) -> ArrayBuffer {
        let data = self.data.borrow();
        let len = data.len();
        let first = relative_to(begin, len as f64) as usize;
        let last = end.map_or(len, |e| relative_to(e, len as f64) as usize);
        if first >= last {
            return ArrayBuffer::new(0);
        }
        ArrayBuffer::from_bytes(data[first..last].to_vec())
    }

    pub fn read(&self, offset: usize, out: &mut [u8]) {
        let data = self.data.borrow();
        out.copy_from_slice(&data[offset..offset + out.len()]);
    }

    pub fn write(&self, offset: usize, bytes: &[u8]) {
        let mut data = self.data.borrow_mut();
        data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn copy_within(&self, src: usize, dst: usize, len: usize) {
        self.data.borrow_mut().copy_within(src..src + len, dst);
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.data.borrow().clone()
    }

    /// Whether both handles refer to the same byte region.
    pub fn ptr_eq(&self, other: &ArrayBuffer) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffers_are_zeroed() {
        let buf = ArrayBuffer::new(8);
        assert_eq!(buf.byte_length(), 8);
        assert_eq!(buf.to_vec(), vec![0; 8]);
    }

    #[test]
    fn allocate_rejects_bad_lengths() {
        assert!(matches!(
            ArrayBuffer::allocate(-1.0),
            Err(JsError::RangeError(_))
        ));
        assert_eq!(ArrayBuffer::allocate(f64::NAN).unwrap().byte_length(), 0);
        assert_eq!(ArrayBuffer::allocate(3.7).unwrap().byte_length(), 3);
    }

    #[test]
    fn slice_copies_with_relative_bounds() {
        let buf = ArrayBuffer::from_bytes(vec![1, 2, 3, 4, 5]);
        let tail = buf.slice(-2.0, None);
        assert_eq!(tail.to_vec(), vec![4, 5]);
        let mid = buf.slice(1.0, Some(-1.0));
        assert_eq!(mid.to_vec(), vec![2, 3, 4]);
        assert_eq!(buf.slice(4.0, Some(2.0)).byte_length(), 0);

        mid.write(0, &[9]);
        assert_eq!(buf.to_vec()[1], 2);
        assert!(!mid.ptr_eq(&buf));
    }

    #[test]
    fn clones_share_storage() {
        let buf = ArrayBuffer::new(2);
        let alias = buf.clone();
        alias.write(1, &[7]);
        assert_eq!(buf.to_vec(), vec![0, 7]);
        assert!(buf.ptr_eq(&alias));
    }

    #[test]
    fn slice_bounds_are_relative_and_clamped() {
        let buf = ArrayBuffer::from_bytes(vec![1, 2, 3, 4]);
        assert_eq!(buf.slice(-10.0, None).to_vec(), vec![1, 2, 3, 4]);
        assert_eq!(buf.slice(1.9, Some(f64::INFINITY)).to_vec(), vec![2, 3, 4]);
        assert_eq!(buf.slice(f64::NEG_INFINITY, Some(-2.0)).to_vec(), vec![1, 2]);
        assert!(buf.slice(3.0, Some(1.0)).to_vec().is_empty());
        assert_eq!(buf.slice(f64::NAN, Some(1.0)).to_vec(), vec![1]);
    }
}
