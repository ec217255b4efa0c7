//! Conversions between engine values and plain host data.

use super::Realm;
use super::array_buffer::ArrayBuffer;
use super::helpers::to_boolean;
use crate::error::{JsError, JsResult};
use crate::types::{JsString, JsValue, number_ops};

/// A value as the embedding sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<HostValue>),
    Bytes(Vec<u8>),
}

/// Element conversion applied by [`Realm::to_host_array`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostElementType {
    /// Primitives pass through; objects become their string form.
    #[default]
    Any,
    Number,
    String,
    Bool,
    Int32,
}

impl Realm {
    /// Engine value for `value`. Lists become Arrays and byte vectors become
    /// ArrayBuffers; nested lists are converted as well.
    pub fn import_host_value(&mut self, value: HostValue) -> JsResult<JsValue> {
        Ok(match value {
            HostValue::Undefined => JsValue::Undefined,
            HostValue::Null => JsValue::Null,
            HostValue::Bool(b) => JsValue::Boolean(b),
            HostValue::Number(n) => JsValue::Number(n),
            HostValue::String(s) => JsValue::String(JsString::from_str(&s)),
            HostValue::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.import_host_value(item)?);
                }
                self.create_array(values)?.into()
            }
            HostValue::Bytes(bytes) => self.create_array_buffer(ArrayBuffer::from_bytes(bytes))?.into(),
        })
    }

    /// Converts a host value and boxes primitives in their wrapper objects.
    pub fn wrap_as_object(&mut self, value: HostValue) -> JsResult<JsValue> {
        if matches!(value, HostValue::Undefined | HostValue::Null) {
            return Err(JsError::type_error("Cannot convert undefined or null to object"));
        }
        let value = self.import_host_value(value)?;
        Ok(self.to_object(&value)?.into())
    }

    /// Reads an array-like, typed array or ArrayBuffer out as host data.
    /// ArrayBuffers yield their bytes; everything else yields a list with each
    /// element converted to `element_type`.
    pub fn to_host_array(&mut self, value: &JsValue, element_type: HostElementType) -> JsResult<HostValue> {
        let Some(obj) = value.as_object() else {
            return Err(JsError::type_error(format!(
                "{} is not an array-like object",
                self.describe(value)
            )));
        };
        if let Some(buffer) = self.array_buffer_of(value) {
            return Ok(HostValue::Bytes(buffer.to_vec()));
        }
        let elements = match self.typed_array_view(value, "") {
            Ok((view, _)) => view.to_values(),
            Err(_) => self.array_to_vec(obj)?,
        };
        let mut out = Vec::with_capacity(elements.len());
        for element in &elements {
            out.push(self.to_host_element(element, element_type)?);
        }
        Ok(HostValue::List(out))
    }

    fn to_host_element(&mut self, value: &JsValue, element_type: HostElementType) -> JsResult<HostValue> {
        Ok(match element_type {
            HostElementType::Number => HostValue::Number(self.to_number(value)?),
            HostElementType::Int32 => {
                HostValue::Number(f64::from(number_ops::to_int32(self.to_number(value)?)))
            }
            HostElementType::Bool => HostValue::Bool(to_boolean(value)),
            HostElementType::String => HostValue::String(self.to_js_string(value)?.to_rust_string()),
            HostElementType::Any => match value {
                JsValue::Undefined => HostValue::Undefined,
                JsValue::Null => HostValue::Null,
                JsValue::Boolean(b) => HostValue::Bool(*b),
                JsValue::Number(n) => HostValue::Number(*n),
                other => HostValue::String(self.to_js_string(other)?.to_rust_string()),
            },
        })
    }
}
